use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::error::{OptionalExt, is_unique_violation};
use crate::models::{CollectionDraft, CollectionRow, MembershipRow, QueryRow};
use crate::queries::{QUERY_COLUMNS, QUERY_FROM, query_from_row};
use crate::{Database, DbError, Result, now_timestamp};

const COLLECTION_COLUMNS: &str = "id, name, description, user_id, created_at, updated_at";

impl Database {
    pub fn create_collection(&self, user_id: &str, draft: CollectionDraft) -> Result<CollectionRow> {
        let draft = draft.validated()?;
        let now = now_timestamp();
        let row = CollectionRow {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            description: draft.description,
            user_id: user_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collections (id, name, description, user_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.id,
                    row.name,
                    row.description,
                    row.user_id,
                    row.created_at,
                    row.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(row)
    }

    /// The caller's collections, newest first.
    pub fn list_collections(&self, user_id: &str) -> Result<Vec<CollectionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLLECTION_COLUMNS} FROM collections
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([user_id], collection_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn get_collection(&self, id: &str, user_id: &str) -> Result<CollectionRow> {
        self.with_conn(|conn| owned_collection(conn, id, user_id))
    }

    /// Queries in a collection, most recently added first.
    pub fn collection_queries(&self, id: &str, user_id: &str) -> Result<Vec<QueryRow>> {
        self.with_conn(|conn| {
            owned_collection(conn, id, user_id)?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {QUERY_COLUMNS} {QUERY_FROM}
                 JOIN collection_queries cq ON cq.query_id = q.id
                 WHERE cq.collection_id = ?1
                 ORDER BY cq.added_at DESC, q.id DESC"
            ))?;
            let rows = stmt
                .query_map([id], query_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Add a query to one of the caller's collections. Adding the same query
    /// twice fails with `DbError::Duplicate`.
    pub fn add_query_to_collection(
        &self,
        id: &str,
        query_id: i64,
        user_id: &str,
    ) -> Result<MembershipRow> {
        if id.is_empty() {
            return Err(DbError::Validation("Collection ID is required".into()));
        }
        if query_id <= 0 {
            return Err(DbError::Validation("Query ID is required".into()));
        }

        // Ownership check and insert are separate statements; a concurrent
        // delete of either side surfaces as a constraint failure.
        self.with_conn(|conn| owned_collection(conn, id, user_id))?;

        let added_at = now_timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collection_queries (collection_id, query_id, added_at) VALUES (?1, ?2, ?3)",
                params![id, query_id, added_at],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DbError::Duplicate("Query is already in this collection".into())
                } else {
                    e.into()
                }
            })?;

            Ok(MembershipRow {
                collection_id: id.to_string(),
                query_id,
                added_at,
            })
        })
    }

    pub fn remove_query_from_collection(&self, id: &str, query_id: i64, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            owned_collection(conn, id, user_id)?;

            let removed = conn.execute(
                "DELETE FROM collection_queries WHERE collection_id = ?1 AND query_id = ?2",
                params![id, query_id],
            )?;
            if removed == 0 {
                return Err(DbError::NotFound(format!("Query {query_id} in collection")));
            }
            Ok(())
        })
    }
}

fn owned_collection(conn: &Connection, id: &str, user_id: &str) -> Result<CollectionRow> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?1 AND user_id = ?2"
    ))?;
    stmt.query_row([id, user_id], collection_from_row)
        .optional()?
        .ok_or_else(|| DbError::NotFound("Collection".into()))
}

fn collection_from_row(row: &Row<'_>) -> rusqlite::Result<CollectionRow> {
    Ok(CollectionRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        user_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
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

    fn collection(db: &Database, user: &str, name: &str) -> CollectionRow {
        db.create_collection(
            user,
            CollectionDraft {
                name: name.into(),
                description: Some(" Things I run daily ".into()),
            },
        )
        .unwrap()
    }

    #[test]
    fn create_and_list_own_collections() {
        let (db, _) = setup();
        let first = collection(&db, USER, "Daily");
        let second = collection(&db, USER, "Weekly");
        collection(&db, OTHER, "Not mine");

        assert_eq!(first.description.as_deref(), Some("Things I run daily"));

        let listed: Vec<String> = db
            .list_collections(USER)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&first.id) && listed.contains(&second.id));
    }

    #[test]
    fn invalid_collection_is_rejected() {
        let (db, _) = setup();
        let err = db
            .create_collection(USER, CollectionDraft { name: " ".into(), description: None })
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(db.list_collections(USER).unwrap().is_empty());
    }

    #[test]
    fn duplicate_membership_is_distinct() {
        let (db, query_id) = setup();
        let c = collection(&db, USER, "Daily");

        db.add_query_to_collection(&c.id, query_id, USER).unwrap();
        let err = db.add_query_to_collection(&c.id, query_id, USER).unwrap_err();
        assert!(matches!(err, DbError::Duplicate(ref msg) if msg == "Query is already in this collection"));

        let queries = db.collection_queries(&c.id, USER).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].id, query_id);
    }

    #[test]
    fn missing_query_is_generic_failure() {
        let (db, _) = setup();
        let c = collection(&db, USER, "Daily");

        let err = db.add_query_to_collection(&c.id, 9999, USER).unwrap_err();
        assert!(matches!(err, DbError::Unavailable(_)));
    }

    #[test]
    fn collections_are_private() {
        let (db, query_id) = setup();
        let c = collection(&db, USER, "Daily");

        assert!(matches!(db.get_collection(&c.id, OTHER), Err(DbError::NotFound(_))));
        assert!(matches!(
            db.add_query_to_collection(&c.id, query_id, OTHER),
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(db.collection_queries(&c.id, OTHER), Err(DbError::NotFound(_))));
    }

    #[test]
    fn remove_membership() {
        let (db, query_id) = setup();
        let c = collection(&db, USER, "Daily");
        db.add_query_to_collection(&c.id, query_id, USER).unwrap();

        db.remove_query_from_collection(&c.id, query_id, USER).unwrap();
        assert!(db.collection_queries(&c.id, USER).unwrap().is_empty());
        assert!(matches!(
            db.remove_query_from_collection(&c.id, query_id, USER),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn deleting_query_drops_membership() {
        let (db, query_id) = setup();
        let c = collection(&db, USER, "Daily");
        db.add_query_to_collection(&c.id, query_id, USER).unwrap();

        db.delete_query(query_id, USER).unwrap();
        assert!(db.collection_queries(&c.id, USER).unwrap().is_empty());
    }
}
