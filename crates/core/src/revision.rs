//! Revision records: immutable snapshots of an entity's live fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Versionable;
use crate::error::CoreError;
use crate::types::{DbId, Metadata, Snapshot, Timestamp};

// ---------------------------------------------------------------------------
// Action tags
// ---------------------------------------------------------------------------

pub const ACTION_INITIAL_PUBLISH: &str = "initial_publish";
pub const ACTION_PUBLISH: &str = "publish";
pub const ACTION_DISCARD_DRAFT: &str = "discard_draft";
pub const ACTION_REVERT: &str = "revert";
pub const ACTION_UPDATE: &str = "update";

/// Maximum length of an action tag.
pub const MAX_ACTION_LEN: usize = 64;

/// Validate a caller-supplied action tag. The set of tags is open; only the
/// shape is checked.
pub fn validate_action(action: &str) -> Result<(), CoreError> {
    if action.trim().is_empty() {
        return Err(CoreError::Validation("Action must not be empty".into()));
    }
    if action.len() > MAX_ACTION_LEN {
        return Err(CoreError::Validation(format!(
            "Action must be at most {MAX_ACTION_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A stored revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: DbId,
    pub entity_type: String,
    pub entity_id: DbId,
    pub action: String,
    pub description: Option<String>,
    pub metadata: Metadata,
    pub is_published: bool,
    pub data: Snapshot,
    pub created_at: Timestamp,
}

impl Revision {
    /// Fail with [`CoreError::InvalidRevision`] unless this revision was
    /// taken from `entity`.
    pub fn ensure_owned_by(&self, entity: &impl Versionable) -> Result<(), CoreError> {
        if self.entity_type == entity.entity_type() && self.entity_id == entity.entity_id() {
            return Ok(());
        }
        Err(CoreError::InvalidRevision {
            revision_id: self.id,
            owner_type: self.entity_type.clone(),
            owner_id: self.entity_id,
            entity_type: entity.entity_type(),
            entity_id: entity.entity_id(),
        })
    }
}

/// A revision about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRevision {
    pub entity_type: &'static str,
    pub entity_id: DbId,
    pub action: String,
    pub description: Option<String>,
    pub metadata: Metadata,
    pub is_published: bool,
    pub data: Snapshot,
}

impl NewRevision {
    /// Snapshot the live fields of `entity` as they are right now.
    pub fn capture(
        entity: &impl Versionable,
        action: &str,
        description: Option<&str>,
        metadata: Metadata,
        is_published: bool,
    ) -> Result<Self, CoreError> {
        validate_action(action)?;
        Ok(Self {
            entity_type: entity.entity_type(),
            entity_id: entity.entity_id(),
            action: action.to_string(),
            description: description.map(str::to_string),
            metadata,
            is_published,
            data: entity.versioned_field_values(),
        })
    }
}

/// The `{action, timestamp}` metadata recorded by engine operations.
pub fn action_metadata(action: &str, now: Timestamp) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("action".into(), Value::String(action.to_string()));
    metadata.insert("timestamp".into(), Value::String(now.to_rfc3339()));
    metadata
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::entity::ContentEntity;
    use crate::schema::EntityKind;

    fn form(id: DbId) -> ContentEntity {
        let live = json!({ "name": { "en": "Contact" } });
        ContentEntity::new(EntityKind::Form, id, live.as_object().unwrap(), Utc::now())
    }

    fn stored(entity_type: &str, entity_id: DbId) -> Revision {
        Revision {
            id: 99,
            entity_type: entity_type.to_string(),
            entity_id,
            action: ACTION_PUBLISH.into(),
            description: None,
            metadata: Metadata::new(),
            is_published: true,
            data: Snapshot::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_action_is_invalid() {
        assert!(validate_action("").is_err());
        assert!(validate_action("   ").is_err());
        assert!(validate_action(&"x".repeat(MAX_ACTION_LEN + 1)).is_err());
        assert!(validate_action("custom_import").is_ok());
    }

    #[test]
    fn capture_snapshots_live_values() {
        let mut form = form(3);
        form.fields.get_mut("name").unwrap().draft = Some(json!({ "en": "Draft" }));
        let rev = NewRevision::capture(&form, ACTION_UPDATE, Some("manual"), Metadata::new(), false)
            .unwrap();
        assert_eq!(rev.entity_type, "form");
        assert_eq!(rev.entity_id, 3);
        assert_eq!(rev.data["name"], json!({ "en": "Contact" }));
        assert_eq!(rev.description.as_deref(), Some("manual"));
        assert!(!rev.is_published);
    }

    #[test]
    fn ownership_check_compares_type_and_id() {
        let form = form(3);
        assert!(stored("form", 3).ensure_owned_by(&form).is_ok());
        assert_matches!(
            stored("form", 4).ensure_owned_by(&form),
            Err(CoreError::InvalidRevision { revision_id: 99, owner_id: 4, entity_id: 3, .. })
        );
        assert_matches!(
            stored("page", 3).ensure_owned_by(&form),
            Err(CoreError::InvalidRevision { .. })
        );
    }

    #[test]
    fn action_metadata_has_action_and_timestamp() {
        let metadata = action_metadata(ACTION_PUBLISH, Utc::now());
        assert_eq!(metadata["action"], json!("publish"));
        assert!(metadata["timestamp"].is_string());
    }
}
