//! Versioned content entities and the `Versionable` capability.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::schema::{EntityKind, EntitySchema, FieldSpec};
use crate::types::{DbId, Snapshot, Timestamp};

static NULL: Value = Value::Null;

/// The two slots of one versioned field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSlots {
    /// Canonical, publicly visible value.
    pub live: Value,
    /// Pending value. `None` means no draft override.
    pub draft: Option<Value>,
}

impl FieldSlots {
    pub fn new(live: Value) -> Self {
        Self { live, draft: None }
    }
}

/// A Form, Page or ContentBlock row with its live and draft slots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentEntity {
    pub id: DbId,
    pub kind: EntityKind,
    pub fields: BTreeMap<String, FieldSlots>,
    pub last_draft_at: Option<Timestamp>,
    pub published_at: Option<Timestamp>,
    pub lock_version: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentEntity {
    /// Build an entity with every schema field present. Missing live values
    /// default to `{}` for localized fields and `null` otherwise.
    pub fn new(kind: EntityKind, id: DbId, live: &Snapshot, now: Timestamp) -> Self {
        let fields = kind
            .schema()
            .fields
            .iter()
            .map(|spec| {
                let value = live
                    .get(spec.name)
                    .cloned()
                    .unwrap_or_else(|| empty_value(spec));
                (spec.name.to_string(), FieldSlots::new(value))
            })
            .collect();
        Self {
            id,
            kind,
            fields,
            last_draft_at: None,
            published_at: None,
            lock_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.kind.schema()
    }

    pub fn slots(&self, field: &str) -> Option<&FieldSlots> {
        self.fields.get(field)
    }

    /// Mutable slots for a schema field, inserting empty slots if the row
    /// predates the field.
    pub fn slots_mut(&mut self, spec: &FieldSpec) -> &mut FieldSlots {
        self.fields
            .entry(spec.name.to_string())
            .or_insert_with(|| FieldSlots::new(empty_value(spec)))
    }

    /// Live value of a field, `Value::Null` if absent.
    pub fn live(&self, field: &str) -> &Value {
        self.fields.get(field).map_or(&NULL, |s| &s.live)
    }

    /// Draft slot of a field, if any.
    pub fn draft(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).and_then(|s| s.draft.as_ref())
    }
}

/// The empty live value for a field.
pub fn empty_value(spec: &FieldSpec) -> Value {
    if spec.is_localized() {
        Value::Object(Default::default())
    } else {
        Value::Null
    }
}

// ---------------------------------------------------------------------------
// Versionable
// ---------------------------------------------------------------------------

/// Anything whose canonical field values can be snapshotted and restored.
pub trait Versionable {
    /// The value stored in `revisions.entity_type`.
    fn entity_type(&self) -> &'static str;

    fn entity_id(&self) -> DbId;

    fn versioned_fields(&self) -> &'static [FieldSpec];

    /// Deep copy of the canonical values of every versioned field.
    fn versioned_field_values(&self) -> Snapshot;

    /// Overwrite canonical values with those present in `snapshot`.
    /// Fields absent from the snapshot keep their current value.
    fn apply_versioned_field_values(&mut self, snapshot: &Snapshot);
}

impl Versionable for ContentEntity {
    fn entity_type(&self) -> &'static str {
        self.kind.as_str()
    }

    fn entity_id(&self) -> DbId {
        self.id
    }

    fn versioned_fields(&self) -> &'static [FieldSpec] {
        self.schema().fields
    }

    fn versioned_field_values(&self) -> Snapshot {
        self.versioned_fields()
            .iter()
            .map(|spec| (spec.name.to_string(), self.live(spec.name).clone()))
            .collect()
    }

    fn apply_versioned_field_values(&mut self, snapshot: &Snapshot) {
        for spec in self.versioned_fields() {
            if let Some(value) = snapshot.get(spec.name) {
                self.slots_mut(spec).live = value.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page() -> ContentEntity {
        let live = json!({ "title": { "en": "Home" }, "blocks": [] });
        ContentEntity::new(
            EntityKind::Page,
            7,
            live.as_object().unwrap(),
            chrono::Utc::now(),
        )
    }

    #[test]
    fn new_fills_missing_fields_with_empty_values() {
        let page = page();
        assert_eq!(page.live("title"), &json!({ "en": "Home" }));
        assert_eq!(page.live("content"), &json!({}));
        assert_eq!(page.live("seo"), &Value::Null);
        assert_eq!(page.fields.len(), page.schema().fields.len());
        assert!(page.fields.values().all(|s| s.draft.is_none()));
    }

    #[test]
    fn snapshot_contains_only_live_values() {
        let mut page = page();
        page.fields.get_mut("title").unwrap().draft = Some(json!({ "en": "Draft" }));
        let snapshot = page.versioned_field_values();
        assert_eq!(snapshot["title"], json!({ "en": "Home" }));
        assert_eq!(snapshot.len(), page.schema().fields.len());
    }

    #[test]
    fn apply_leaves_absent_fields_untouched() {
        let mut page = page();
        let snapshot = json!({ "title": { "en": "Restored" } });
        page.apply_versioned_field_values(snapshot.as_object().unwrap());
        assert_eq!(page.live("title"), &json!({ "en": "Restored" }));
        assert_eq!(page.live("blocks"), &json!([]));
    }
}
