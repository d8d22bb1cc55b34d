//! Draft overlay: reading and writing the shadow slots of an entity.
//!
//! A draft slot is either empty (no pending change) or a complete replacement
//! for the live value. Localized values are the exception: each locale is
//! drafted on its own and unset locales read through to the live value.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::entity::ContentEntity;
use crate::error::CoreError;
use crate::schema::FieldSpec;
use crate::types::Timestamp;

/// Returns `true` for values that count as "no draft": null, empty string,
/// empty array and empty object.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// True iff the entity has pending draft content.
pub fn has_draft_changes(entity: &ContentEntity) -> bool {
    let any_draft = entity
        .fields
        .values()
        .any(|slots| slots.draft.as_ref().is_some_and(|d| !is_blank(d)));
    if any_draft {
        return true;
    }
    match (entity.last_draft_at, entity.published_at) {
        (Some(drafted), Some(published)) => drafted > published,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// The value a reader of the draft should see for a whole field.
///
/// Localized drafts are overlaid on the live map per locale; other drafts
/// replace the live value outright.
pub fn effective_draft_value(entity: &ContentEntity, spec: &FieldSpec) -> Value {
    let live = entity.live(spec.name);
    match entity.draft(spec.name) {
        None => live.clone(),
        Some(draft) if spec.is_localized() => overlay_locales(live, draft),
        Some(draft) => draft.clone(),
    }
}

/// Read one locale of a translatable path from the draft, falling back to
/// the live value when the draft does not set that locale.
pub fn get_draft_translation(
    entity: &ContentEntity,
    field_path: &str,
    locale: &str,
) -> Result<Option<Value>, CoreError> {
    let (spec, rest) = split_path(entity, field_path)?;
    let live = value_at(entity.live(spec.name), &rest).and_then(|v| v.get(locale));
    let drafted = entity
        .draft(spec.name)
        .and_then(|d| value_at(d, &rest))
        .and_then(|v| v.get(locale))
        .filter(|v| !v.is_null());
    Ok(drafted.or(live).cloned())
}

/// Write one locale of a translatable path into the draft, leaving sibling
/// locales as they were.
pub fn set_translation(
    entity: &mut ContentEntity,
    field_path: &str,
    locale: &str,
    value: Value,
) -> Result<(), CoreError> {
    let mut entries = Map::new();
    entries.insert(locale.to_string(), value);
    merge_translations(entity, field_path, entries)
}

/// Updates split by how they are applied to the draft.
#[derive(Debug, Default, PartialEq)]
pub struct PartitionedUpdates {
    pub translatable: Vec<(String, Value)>,
    pub settings: Vec<(String, Value)>,
}

/// Split incoming updates into per-locale and whole-value writes using the
/// entity schema. Unknown fields are rejected.
pub fn partition_updates(
    entity: &ContentEntity,
    updates: &Map<String, Value>,
) -> Result<PartitionedUpdates, CoreError> {
    let schema = entity.schema();
    let mut parts = PartitionedUpdates::default();
    for (path, value) in updates {
        let field = path.split('.').next().unwrap_or_default();
        let spec = schema.require_field(field)?;
        if schema.is_translatable(path) {
            parts.translatable.push((path.clone(), value.clone()));
        } else if spec.is_localized() {
            // `name.fr` style: the remainder is the locale itself.
            parts.translatable.push((field.to_string(), locale_entry(path, value)?));
        } else {
            parts.settings.push((path.clone(), value.clone()));
        }
    }
    Ok(parts)
}

/// Apply a batch of draft updates for `locale` and stamp `last_draft_at`.
pub fn apply_draft_updates(
    entity: &mut ContentEntity,
    updates: &Map<String, Value>,
    locale: &str,
    now: Timestamp,
) -> Result<(), CoreError> {
    let parts = partition_updates(entity, updates)?;
    for (path, value) in parts.translatable {
        let entries = match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert(locale.to_string(), other);
                map
            }
        };
        merge_translations(entity, &path, entries)?;
    }
    for (path, value) in parts.settings {
        set_draft_value(entity, &path, value)?;
    }
    entity.last_draft_at = Some(now);
    Ok(())
}

/// Replace the draft value at `field_path`. Writing a nested path seeds the
/// draft from the live value first so the slot stays a complete value.
pub fn set_draft_value(
    entity: &mut ContentEntity,
    field_path: &str,
    value: Value,
) -> Result<(), CoreError> {
    let (spec, rest) = split_path(entity, field_path)?;
    let draft = seeded_draft(entity, spec);
    *slot_at(draft, &rest)? = value;
    Ok(())
}

/// Copy every non-blank draft into the live slot and clear all drafts.
///
/// Returns the names of the fields whose live value changed.
pub fn promote_drafts(entity: &mut ContentEntity) -> Vec<&'static str> {
    let mut promoted = Vec::new();
    for spec in entity.schema().fields {
        let slots = entity.slots_mut(spec);
        let Some(draft) = slots.draft.take() else {
            continue;
        };
        if is_blank(&draft) {
            continue;
        }
        let next = if spec.is_localized() {
            overlay_locales(&slots.live, &draft)
        } else {
            draft
        };
        if next != slots.live {
            slots.live = next;
            promoted.push(spec.name);
        }
    }
    entity.last_draft_at = None;
    promoted
}

/// Drop every draft slot and the draft timestamp.
pub fn clear_drafts(entity: &mut ContentEntity) {
    for slots in entity.fields.values_mut() {
        slots.draft = None;
    }
    entity.last_draft_at = None;
}

/// One field whose draft differs from its live value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub live: Value,
    pub draft: Value,
}

/// Per-field comparison of live and effective draft values, for review
/// screens. Fields without a non-blank draft are omitted.
pub fn pending_changes(entity: &ContentEntity) -> Vec<FieldChange> {
    entity
        .schema()
        .fields
        .iter()
        .filter(|spec| entity.draft(spec.name).is_some_and(|d| !is_blank(d)))
        .filter_map(|spec| {
            let live = entity.live(spec.name).clone();
            let draft = effective_draft_value(entity, spec);
            (live != draft).then_some(FieldChange {
                field: spec.name,
                live,
                draft,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn merge_translations(
    entity: &mut ContentEntity,
    field_path: &str,
    entries: Map<String, Value>,
) -> Result<(), CoreError> {
    let (spec, rest) = split_path(entity, field_path)?;
    let target = if spec.is_localized() && rest.is_empty() {
        // Top-level localized drafts only hold the locales that were touched.
        entity
            .slots_mut(spec)
            .draft
            .get_or_insert_with(|| Value::Object(Map::new()))
    } else {
        let draft = seeded_draft(entity, spec);
        slot_at(draft, &rest)?
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        map.extend(entries);
    }
    Ok(())
}

/// The draft slot of a plain field, initialised from the live value.
fn seeded_draft<'a>(entity: &'a mut ContentEntity, spec: &FieldSpec) -> &'a mut Value {
    let slots = entity.slots_mut(spec);
    let live = &slots.live;
    if slots.draft.is_none() {
        slots.draft = Some(live.clone());
    }
    slots.draft.get_or_insert(Value::Null)
}

fn split_path<'p>(
    entity: &ContentEntity,
    field_path: &'p str,
) -> Result<(&'static FieldSpec, Vec<&'p str>), CoreError> {
    let mut segments = field_path.split('.');
    let field = segments.next().unwrap_or_default();
    let spec = entity.schema().require_field(field)?;
    let rest: Vec<&str> = segments.collect();
    if rest.iter().any(|s| s.is_empty()) {
        return Err(CoreError::Validation(format!(
            "Invalid field path '{field_path}'"
        )));
    }
    Ok((spec, rest))
}

/// Turn `name.fr = "x"` into `{"fr": "x"}` for a localized field.
fn locale_entry(path: &str, value: &Value) -> Result<Value, CoreError> {
    match path.split_once('.') {
        Some((_, locale)) if !locale.is_empty() && !locale.contains('.') => {
            let mut map = Map::new();
            map.insert(locale.to_string(), value.clone());
            Ok(Value::Object(map))
        }
        _ => Err(CoreError::Validation(format!(
            "Invalid localized field path '{path}'"
        ))),
    }
}

/// Live locales overlaid with the non-null draft locales.
fn overlay_locales(live: &Value, draft: &Value) -> Value {
    let mut merged = live.as_object().cloned().unwrap_or_default();
    if let Some(entries) = draft.as_object() {
        for (locale, text) in entries {
            if !text.is_null() {
                merged.insert(locale.clone(), text.clone());
            }
        }
    }
    Value::Object(merged)
}

/// Navigate `segments` below `root`. Numeric segments index arrays.
fn value_at<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match node {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        Value::Object(map) => map.get(*segment),
        _ => None,
    })
}

/// Navigate `segments` below `root`, creating objects along the way. An
/// array index equal to the array length appends a new element.
fn slot_at<'a>(root: &'a mut Value, segments: &[&str]) -> Result<&'a mut Value, CoreError> {
    let Some((head, tail)) = segments.split_first() else {
        return Ok(root);
    };
    if !root.is_object() && !root.is_array() {
        *root = Value::Object(Map::new());
    }
    let next = match root {
        Value::Array(items) => {
            let index: usize = head.parse().map_err(|_| {
                CoreError::Validation(format!("Expected an array index, got '{head}'"))
            })?;
            if index == items.len() {
                items.push(Value::Null);
            }
            items.get_mut(index).ok_or_else(|| {
                CoreError::Validation(format!("Array index {index} is out of range"))
            })?
        }
        Value::Object(map) => map.entry((*head).to_string()).or_insert(Value::Null),
        _ => return Err(CoreError::Internal("draft path root is not a container".into())),
    };
    slot_at(next, tail)
}
