//! Convert serde_json::Value to types that sqlx can bind, guided by the column type.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value that can be bound to a PostgreSQL query.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Json(Value),
}

impl PgBindValue {
    /// Strings stay strings unless the column is declared `uuid`; the value alone never
    /// decides, so text that happens to parse as a UUID is stored as written.
    pub fn from_json(v: &Value, pg_type: Option<&str>) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else {
                    PgBindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => match pg_type {
                Some(t) if t.eq_ignore_ascii_case("uuid") => uuid::Uuid::parse_str(s)
                    .map(PgBindValue::Uuid)
                    .unwrap_or_else(|_| PgBindValue::String(s.clone())),
                _ => PgBindValue::String(s.clone()),
            },
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
            PgBindValue::Json(v) => <serde_json::Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    /// Each variant declares its own wire type; `$n::type` casts in the SQL do the rest,
    /// including typing a NULL.
    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => PgTypeInfo::with_name("TEXT"),
            PgBindValue::Bool(_) => PgTypeInfo::with_name("BOOL"),
            PgBindValue::I64(_) => PgTypeInfo::with_name("INT8"),
            PgBindValue::F64(_) => PgTypeInfo::with_name("FLOAT8"),
            PgBindValue::Uuid(_) => PgTypeInfo::with_name("UUID"),
            PgBindValue::Json(_) => PgTypeInfo::with_name("JSONB"),
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_map_to_bind_variants() {
        assert_eq!(PgBindValue::from_json(&Value::Null, Some("bigint")), PgBindValue::Null);
        assert_eq!(PgBindValue::from_json(&json!(7), Some("bigint")), PgBindValue::I64(7));
        assert_eq!(PgBindValue::from_json(&json!(1.5), None), PgBindValue::F64(1.5));
        assert_eq!(PgBindValue::from_json(&json!(true), None), PgBindValue::Bool(true));
        assert_eq!(PgBindValue::from_json(&json!("text"), Some("text")), PgBindValue::String("text".into()));
        assert_eq!(PgBindValue::from_json(&json!({"a": 1}), Some("jsonb")), PgBindValue::Json(json!({"a": 1})));
    }

    #[test]
    fn uuid_shaped_text_stays_text() {
        for s in [
            "0123456789ABCDEF0123456789ABCDEF",
            "6f1c2f0e-8f8a-4f53-9a57-1b7c1e9c1d11",
            "{6f1c2f0e-8f8a-4f53-9a57-1b7c1e9c1d11}",
            "urn:uuid:6f1c2f0e-8f8a-4f53-9a57-1b7c1e9c1d11",
        ] {
            assert_eq!(PgBindValue::from_json(&json!(s), Some("text")), PgBindValue::String(s.into()));
            assert_eq!(PgBindValue::from_json(&json!(s), None), PgBindValue::String(s.into()));
        }
    }

    #[test]
    fn uuid_columns_parse_uuids() {
        assert!(matches!(
            PgBindValue::from_json(&json!("6f1c2f0e-8f8a-4f53-9a57-1b7c1e9c1d11"), Some("uuid")),
            PgBindValue::Uuid(_)
        ));
        assert_eq!(
            PgBindValue::from_json(&json!("not-a-uuid"), Some("uuid")),
            PgBindValue::String("not-a-uuid".into())
        );
    }
}
