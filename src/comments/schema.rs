use crate::migration::{Migration, SchemaDefinition};

const CREATE_COMMENTS_TABLE: &str = r#"CREATE TABLE "public"."comments" (
    "id" BIGSERIAL PRIMARY KEY,
    "text" TEXT NOT NULL,
    "parent_id" BIGINT REFERENCES "public"."comments" ("id") ON DELETE SET NULL,
    "unique_identity" TEXT,
    "created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    "updated_at" TIMESTAMPTZ
)"#;

const CREATE_UNIQUE_IDENTITY_INDEX: &str =
    r#"CREATE INDEX "comments_unique_identity_idx" ON "public"."comments" ("unique_identity")"#;

/// Current comment model plus every migration that led to it, oldest first.
/// Applying all migrations to an empty database must yield exactly `model`.
pub static COMMENT_SCHEMA: SchemaDefinition = SchemaDefinition {
    sentinel_table: "public.comments",
    model: &[CREATE_COMMENTS_TABLE, CREATE_UNIQUE_IDENTITY_INDEX],
    migrations: &[
        Migration {
            id: "20230807120000_InitialComments",
            statements: &[CREATE_COMMENTS_TABLE],
        },
        Migration {
            id: "20231002093000_CommentsUniqueIdentityIndex",
            statements: &[CREATE_UNIQUE_IDENTITY_INDEX],
        },
    ],
};
