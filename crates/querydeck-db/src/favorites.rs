use rusqlite::params;

use crate::models::FavoriteRow;
use crate::queries::{QUERY_COLUMNS, QUERY_FROM, query_from_row};
use crate::{Database, DbError, Result, now_timestamp};

impl Database {
    /// Toggle a favorite: removes if exists, inserts if not.
    /// Returns true when the query is favorited afterwards.
    pub fn toggle_favorite(&self, user_id: &str, query_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let removed = tx.execute(
                "DELETE FROM favorites WHERE user_id = ?1 AND query_id = ?2",
                params![user_id, query_id],
            )?;

            let favorited = if removed > 0 {
                false
            } else {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS (SELECT 1 FROM queries WHERE id = ?1)",
                    [query_id],
                    |r| r.get(0),
                )?;
                if !exists {
                    return Err(DbError::NotFound(format!("Query {query_id}")));
                }

                tx.execute(
                    "INSERT INTO favorites (user_id, query_id, created_at) VALUES (?1, ?2, ?3)",
                    params![user_id, query_id, now_timestamp()],
                )?;
                true
            };

            tx.commit()?;
            Ok(favorited)
        })
    }

    pub fn is_favorite(&self, user_id: &str, query_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM favorites WHERE user_id = ?1 AND query_id = ?2)",
                params![user_id, query_id],
                |r| r.get(0),
            )?;
            Ok(exists)
        })
    }

    /// The caller's favorites with their queries, most recent first.
    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<FavoriteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUERY_COLUMNS}, f.created_at {QUERY_FROM}
                 JOIN favorites f ON f.query_id = q.id
                 WHERE f.user_id = ?1
                 ORDER BY f.created_at DESC, q.id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(FavoriteRow {
                        query: query_from_row(row)?,
                        created_at: row.get(9)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryDraft;

    const USER: &str = "00000000-0000-0000-0000-0000000000aa";
    const OTHER: &str = "00000000-0000-0000-0000-0000000000bb";

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        db.create_user(USER, "ada@example.com", "hash").unwrap();
        db.create_user(OTHER, "bob@example.com", "hash").unwrap();
        let query = db
            .create_query(
                USER,
                QueryDraft {
                    title: "Errors".into(),
                    content: "dataset | where level == 'error'".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        (db, query.id)
    }

    #[test]
    fn toggle_twice_round_trips() {
        let (db, query_id) = setup();
        assert!(!db.is_favorite(USER, query_id).unwrap());

        assert!(db.toggle_favorite(USER, query_id).unwrap());
        assert!(db.is_favorite(USER, query_id).unwrap());

        assert!(!db.toggle_favorite(USER, query_id).unwrap());
        assert!(!db.is_favorite(USER, query_id).unwrap());
    }

    #[test]
    fn favorites_are_per_user() {
        let (db, query_id) = setup();
        db.toggle_favorite(USER, query_id).unwrap();

        assert!(!db.is_favorite(OTHER, query_id).unwrap());
        assert!(db.list_favorites(OTHER).unwrap().is_empty());

        let mine = db.list_favorites(USER).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].query.id, query_id);
        assert_eq!(mine[0].query.author_email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn favoriting_missing_query_is_not_found() {
        let (db, _) = setup();
        assert!(matches!(db.toggle_favorite(USER, 4242), Err(DbError::NotFound(_))));
    }
}
