//! Row-to-model conversion. Corrupt stored values are logged and replaced
//! with defaults rather than failing the whole response.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use querydeck_db::models::{CollectionRow, MembershipRow, QueryRow};
use querydeck_types::models::{Collection, CollectionMembership, Query};

pub fn query(row: QueryRow) -> Query {
    Query {
        user_id: parse_uuid(&row.user_id, "user_id", &row.id.to_string()),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id.to_string()),
        updated_at: parse_timestamp(&row.updated_at, "updated_at", &row.id.to_string()),
        id: row.id,
        title: row.title,
        content: row.content,
        description: row.description,
        tags: row.tags,
        author_email: row.author_email,
    }
}

pub fn collection(row: CollectionRow) -> Collection {
    Collection {
        id: parse_uuid(&row.id, "id", &row.id),
        user_id: parse_uuid(&row.user_id, "user_id", &row.id),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        updated_at: parse_timestamp(&row.updated_at, "updated_at", &row.id),
        name: row.name,
        description: row.description,
    }
}

pub fn membership(row: MembershipRow) -> CollectionMembership {
    CollectionMembership {
        collection_id: parse_uuid(&row.collection_id, "collection_id", &row.collection_id),
        added_at: parse_timestamp(&row.added_at, "added_at", &row.collection_id),
        query_id: row.query_id,
    }
}

/// Collection id taken from the request path.
pub fn collection_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation("Invalid collection ID".into()))
}

/// Query id taken from the request path.
pub fn query_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation("Invalid query ID".into()))
}

pub fn parse_uuid(raw: &str, field: &str, owner: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", field, raw, owner, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str, field: &str, owner: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') form carries no timezone; treat it as UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}' on row '{}': {}", field, raw, owner, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_in_both_stored_forms() {
        let rfc = parse_timestamp("2024-03-01T12:30:00.250Z", "created_at", "1");
        assert_eq!(rfc.timestamp_millis(), 1_709_296_200_250);

        let sqlite = parse_timestamp("2024-03-01 12:30:00", "created_at", "1");
        assert_eq!(sqlite.timestamp(), 1_709_296_200);

        assert_eq!(parse_timestamp("yesterday", "created_at", "1"), DateTime::<Utc>::default());
    }

    #[test]
    fn corrupt_uuid_defaults() {
        assert_eq!(parse_uuid("nope", "user_id", "1"), Uuid::default());
    }

    #[test]
    fn malformed_path_ids_are_validation_errors() {
        assert!(matches!(collection_id("not-a-uuid"), Err(ApiError::Validation(_))));
        assert!(collection_id(&Uuid::new_v4().to_string()).is_ok());
        assert!(matches!(query_id("12abc"), Err(ApiError::Validation(_))));
        assert_eq!(query_id("12").unwrap(), 12);
    }
}
