use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE queries (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT NOT NULL CHECK (length(trim(title)) > 0),
                content     TEXT NOT NULL CHECK (length(trim(content)) > 0),
                description TEXT,
                tags        TEXT,
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_queries_created
                ON queries(created_at DESC, id DESC);

            CREATE TABLE collections (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                description TEXT,
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            CREATE INDEX idx_collections_user
                ON collections(user_id, created_at);

            CREATE TABLE collection_queries (
                collection_id   TEXT NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
                query_id        INTEGER NOT NULL REFERENCES queries(id) ON DELETE CASCADE,
                added_at        TEXT NOT NULL,
                PRIMARY KEY (collection_id, query_id)
            );

            CREATE TABLE favorites (
                user_id     TEXT NOT NULL REFERENCES users(id),
                query_id    INTEGER NOT NULL REFERENCES queries(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (user_id, query_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
