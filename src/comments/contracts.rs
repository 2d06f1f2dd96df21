use super::entity::{CommentDraft, CommentEntity};
use crate::contract::{AddContract, FieldRule, ReadContract, UpdateContract};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MAX_TEXT_LENGTH: usize = 4000;
const UNIQUE_IDENTITY_PATTERN: &str = r"^[0-9A-Za-z]+(-[0-9A-Za-z]+)*$";

const TEXT_RULE: FieldRule = FieldRule {
    field: "text",
    required: true,
    min_length: Some(1),
    max_length: Some(MAX_TEXT_LENGTH),
    pattern: None,
};

const UNIQUE_IDENTITY_RULE: FieldRule = FieldRule {
    field: "unique_identity",
    required: false,
    min_length: None,
    max_length: Some(450),
    pattern: Some(UNIQUE_IDENTITY_PATTERN),
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddCommentContract {
    /// Missing text deserializes as empty and is rejected by validation.
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_identity: Option<String>,
}

impl AddContract<CommentEntity> for AddCommentContract {
    const RULES: &'static [FieldRule] = &[TEXT_RULE, UNIQUE_IDENTITY_RULE];

    fn into_draft(self, now: DateTime<Utc>) -> CommentDraft {
        CommentDraft {
            text: self.text,
            parent_id: self.parent_id,
            unique_identity: self.unique_identity,
            created_at: now,
            updated_at: None,
        }
    }
}

/// `None` leaves the stored value unchanged. `parent_id` cannot be changed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateCommentContract {
    #[serde(default)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_identity: Option<String>,
}

impl UpdateContract<CommentEntity> for UpdateCommentContract {
    const RULES: &'static [FieldRule] = &[TEXT_RULE, UNIQUE_IDENTITY_RULE];

    fn id(&self) -> i64 {
        self.id
    }

    fn apply(self, entity: &mut CommentEntity, now: DateTime<Utc>) {
        let mut touched = false;
        if let Some(text) = self.text {
            entity.text = text;
            touched = true;
        }
        if let Some(unique_identity) = self.unique_identity {
            entity.unique_identity = Some(unique_identity);
            touched = true;
        }
        if touched {
            entity.updated_at = Some(now);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentContract {
    pub id: i64,
    pub text: String,
    pub parent_id: Option<i64>,
    pub unique_identity: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_edited: bool,
}

impl ReadContract<CommentEntity> for CommentContract {
    fn from_entity(entity: &CommentEntity) -> Self {
        CommentContract {
            id: entity.id,
            text: entity.text.clone(),
            parent_id: entity.parent_id,
            unique_identity: entity.unique_identity.clone(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            is_edited: entity.updated_at.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored() -> CommentEntity {
        CommentEntity {
            id: 3,
            text: "first".into(),
            parent_id: Some(1),
            unique_identity: Some("1-2".into()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        let mut entity = stored();
        UpdateCommentContract {
            id: 3,
            text: Some("second".into()),
            unique_identity: None,
        }
        .apply(&mut entity, now);
        assert_eq!(entity.text, "second");
        assert_eq!(entity.unique_identity.as_deref(), Some("1-2"));
        assert_eq!(entity.parent_id, Some(1));
        assert_eq!(entity.updated_at, Some(now));
    }

    #[test]
    fn empty_update_does_not_mark_edited() {
        let mut entity = stored();
        UpdateCommentContract { id: 3, ..Default::default() }.apply(&mut entity, Utc::now());
        assert_eq!(entity, stored());
    }

    #[test]
    fn unset_update_fields_are_not_serialized() {
        let json = serde_json::to_value(UpdateCommentContract {
            id: 3,
            text: None,
            unique_identity: Some("9".into()),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"id": 3, "unique_identity": "9"}));
    }

    #[test]
    fn read_projection_derives_is_edited() {
        let mut entity = stored();
        assert!(!CommentContract::from_entity(&entity).is_edited);
        entity.updated_at = Some(Utc::now());
        assert!(CommentContract::from_entity(&entity).is_edited);
    }
}
