use crate::contract::{ColumnDef, Entity, TableDescriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentEntity {
    pub id: i64,
    pub text: String,
    /// Comment being replied to.
    pub parent_id: Option<i64>,
    /// White-label identity of the owning record, e.g. `1-4-12`.
    pub unique_identity: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A comment before the store has assigned its id.
#[derive(Clone, Debug, Serialize)]
pub struct CommentDraft {
    pub text: String,
    pub parent_id: Option<i64>,
    pub unique_identity: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for CommentEntity {
    type Id = i64;
    type Draft = CommentDraft;

    const TABLE: TableDescriptor = TableDescriptor {
        schema: "public",
        name: "comments",
        primary_key: "id",
        columns: &[
            ColumnDef { name: "id", pg_type: Some("bigint"), has_default: true },
            ColumnDef { name: "text", pg_type: Some("text"), has_default: false },
            ColumnDef { name: "parent_id", pg_type: Some("bigint"), has_default: false },
            ColumnDef { name: "unique_identity", pg_type: Some("text"), has_default: false },
            ColumnDef { name: "created_at", pg_type: Some("timestamptz"), has_default: true },
            ColumnDef { name: "updated_at", pg_type: Some("timestamptz"), has_default: false },
        ],
    };

    fn id(&self) -> i64 {
        self.id
    }
}
