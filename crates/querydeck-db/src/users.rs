use rusqlite::{Connection, Row};

use crate::error::{OptionalExt, is_unique_violation};
use crate::models::UserRow;
use crate::{Database, DbError, Result, now_timestamp};

impl Database {
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<UserRow> {
        let created_at = now_timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, email, password_hash, &created_at),
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::Duplicate("An account with this email already exists".into())
                } else {
                    e.into()
                }
            })?;

            Ok(UserRow {
                id: id.to_string(),
                email: email.to_string(),
                password: password_hash.to_string(),
                created_at,
            })
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, email, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    stmt.query_row([value], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_email_is_distinct_error() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@example.com", "hash").unwrap();

        let err = db.create_user("u2", "a@example.com", "hash").unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[test]
    fn lookup_by_email_and_id() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "a@example.com", "hash").unwrap();

        let by_email = db.get_user_by_email("a@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, "u1");
        assert_eq!(db.get_user_by_id("u1").unwrap().unwrap().email, "a@example.com");
        assert!(db.get_user_by_id("missing").unwrap().is_none());
    }
}
