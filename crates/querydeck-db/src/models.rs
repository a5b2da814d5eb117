//! Database row types. These map directly to SQLite rows.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct QueryRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub user_id: String,
    pub author_email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CollectionRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MembershipRow {
    pub collection_id: String,
    pub query_id: i64,
    pub added_at: String,
}

#[derive(Debug, Clone)]
pub struct FavoriteRow {
    pub query: QueryRow,
    pub created_at: String,
}

/// Caller-supplied fields for creating or replacing a query.
#[derive(Debug, Clone, Default)]
pub struct QueryDraft {
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Caller-supplied fields for creating a collection.
#[derive(Debug, Clone, Default)]
pub struct CollectionDraft {
    pub name: String,
    pub description: Option<String>,
}
