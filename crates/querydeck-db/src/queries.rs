use std::collections::BTreeSet;

use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::warn;

use querydeck_types::filter::{ListParams, SearchFilter};
use querydeck_types::models::Page;

use crate::error::OptionalExt;
use crate::models::{QueryDraft, QueryRow};
use crate::{Database, DbError, Result, now_timestamp};

/// Query columns plus the author's email, in `query_from_row` order.
pub(crate) const QUERY_COLUMNS: &str =
    "q.id, q.title, q.content, q.description, q.tags, q.user_id, u.email, q.created_at, q.updated_at";
pub(crate) const QUERY_FROM: &str = "FROM queries q LEFT JOIN users u ON u.id = q.user_id";

impl Database {
    pub fn create_query(&self, user_id: &str, draft: QueryDraft) -> Result<QueryRow> {
        let draft = draft.validated()?;
        let now = now_timestamp();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO queries (title, content, description, tags, user_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![
                    draft.title,
                    draft.content,
                    draft.description,
                    encode_tags(&draft.tags),
                    user_id,
                    now,
                ],
            )?;

            let id = conn.last_insert_rowid();
            query_by_id(conn, id)?.ok_or_else(|| not_found(id))
        })
    }

    pub fn get_query(&self, id: i64) -> Result<QueryRow> {
        self.with_conn(|conn| query_by_id(conn, id)?.ok_or_else(|| not_found(id)))
    }

    /// Replace title, content, description and tags. Only the owner's row is
    /// touched; anything else reads as not found.
    pub fn update_query(&self, id: i64, user_id: &str, draft: QueryDraft) -> Result<QueryRow> {
        let draft = draft.validated()?;
        let now = now_timestamp();

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE queries
                 SET title = ?1, content = ?2, description = ?3, tags = ?4, updated_at = ?5
                 WHERE id = ?6 AND user_id = ?7",
                params![
                    draft.title,
                    draft.content,
                    draft.description,
                    encode_tags(&draft.tags),
                    now,
                    id,
                    user_id,
                ],
            )?;
            if changed == 0 {
                return Err(not_found(id));
            }

            query_by_id(conn, id)?.ok_or_else(|| not_found(id))
        })
    }

    pub fn delete_query(&self, id: i64, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM queries WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            if changed == 0 {
                return Err(not_found(id));
            }
            Ok(())
        })
    }

    /// Run the listing pipeline: filter, order newest first, slice one page
    /// and count the whole filtered set.
    ///
    /// Rows with equal `created_at` are ordered by id descending so pages never
    /// overlap. A page past the end yields no items but still reports the count.
    pub fn list_queries(&self, params: &ListParams) -> Result<Page<QueryRow>> {
        let predicate = Predicate::from_params(params);
        let where_clause = predicate.where_clause();

        self.with_conn(|conn| {
            // Count and page are read from one snapshot
            let tx = conn.unchecked_transaction()?;

            let total: i64 = tx.query_row(
                &format!("SELECT COUNT(*) FROM queries q {where_clause}"),
                params_from_iter(predicate.values.iter()),
                |r| r.get(0),
            )?;

            let mut values = predicate.values.clone();
            values.push(Value::Integer(i64::from(params.page_size)));
            values.push(Value::Integer(i64::try_from(params.offset()).unwrap_or(i64::MAX)));

            let items = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {QUERY_COLUMNS} {QUERY_FROM} {where_clause} ORDER BY q.created_at DESC, q.id DESC LIMIT ? OFFSET ?"
                ))?;
                let rows = stmt
                    .query_map(params_from_iter(values.iter()), query_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            };

            tx.commit()?;

            Ok(Page {
                items,
                total_count: u64::try_from(total).unwrap_or_default(),
            })
        })
    }

    /// Every distinct tag in use, sorted. Rows with a missing or unreadable
    /// tag column count as untagged.
    pub fn all_tags(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, tags FROM queries")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
            })?;

            let mut tags = BTreeSet::new();
            for row in rows {
                let (id, raw) = row?;
                tags.extend(decode_tags(id, raw.as_deref()));
            }

            Ok(tags.into_iter().collect())
        })
    }
}

/// WHERE clause plus positional values built from a `ListParams`.
/// User input only ever reaches SQLite as a bound value.
#[derive(Debug, Default)]
struct Predicate {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Predicate {
    fn from_params(params: &ListParams) -> Self {
        let mut predicate = Self::default();
        if let Some(search) = &params.search {
            predicate.push_search(search);
        }
        if !params.tags.is_empty() {
            predicate.push_tag_overlap(&params.tags);
        }
        predicate
    }

    fn push_search(&mut self, filter: &SearchFilter) {
        if filter.fields.is_empty() {
            self.clauses.push("0".into());
            return;
        }

        let mut alternatives = Vec::with_capacity(filter.fields.len());
        for field in &filter.fields {
            let column = field.column();
            if filter.case_sensitive {
                alternatives.push(format!("instr(q.{column}, ?) > 0"));
                self.values.push(Value::Text(filter.term.clone()));
            } else {
                alternatives.push(format!("unicode_lower(q.{column}) LIKE ? ESCAPE '\\'"));
                self.values.push(Value::Text(like_pattern(&filter.term.to_lowercase())));
            }
        }
        self.clauses.push(format!("({})", alternatives.join(" OR ")));
    }

    fn push_tag_overlap(&mut self, tags: &[String]) {
        let distinct: BTreeSet<&String> = tags.iter().collect();
        let placeholders = vec!["?"; distinct.len()].join(", ");
        self.clauses.push(format!(
            "EXISTS (SELECT 1 FROM json_each(CASE WHEN json_valid(q.tags) THEN q.tags ELSE '[]' END) t \
             WHERE t.value IN ({placeholders}))"
        ));
        self.values
            .extend(distinct.into_iter().map(|t| Value::Text(t.clone())));
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// `%term%` with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn query_by_id(conn: &Connection, id: i64) -> Result<Option<QueryRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {QUERY_COLUMNS} {QUERY_FROM} WHERE q.id = ?1"))?;
    stmt.query_row([id], query_from_row).optional()
}

pub(crate) fn query_from_row(row: &Row<'_>) -> rusqlite::Result<QueryRow> {
    let id: i64 = row.get(0)?;
    let raw_tags: Option<String> = row.get(4)?;

    Ok(QueryRow {
        id,
        title: row.get(1)?,
        content: row.get(2)?,
        description: row.get(3)?,
        tags: decode_tags(id, raw_tags.as_deref()),
        user_id: row.get(5)?,
        author_email: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn encode_tags(tags: &[String]) -> String {
    serde_json::Value::from(tags.to_vec()).to_string()
}

fn decode_tags(id: i64, raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Unreadable tags on query {}: {}", id, e);
        Vec::new()
    })
}

fn not_found(id: i64) -> DbError {
    DbError::NotFound(format!("Query {id}"))
}
