//! Declared schemas for versioned entity kinds.
//!
//! Each kind lists its versioned fields with the canonical and draft column
//! that back them, and the field paths whose values are per-locale maps.
//! Nothing here is derived from naming conventions at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Field declarations
// ---------------------------------------------------------------------------

/// How a versioned field's value is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any JSON value. A draft write replaces the value at the written path.
    Plain,
    /// A `{locale: text}` object. Locales are drafted independently.
    Localized,
}

/// A single versioned field and the columns holding its two slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub draft_column: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn plain(name: &'static str, column: &'static str, draft_column: &'static str) -> Self {
        Self {
            name,
            column,
            draft_column,
            kind: FieldKind::Plain,
        }
    }

    const fn localized(
        name: &'static str,
        column: &'static str,
        draft_column: &'static str,
    ) -> Self {
        Self {
            name,
            column,
            draft_column,
            kind: FieldKind::Localized,
        }
    }

    pub fn is_localized(&self) -> bool {
        self.kind == FieldKind::Localized
    }
}

/// Everything the engine needs to know about one entity kind.
#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
    /// Nested field paths holding locale maps. `*` matches one path segment.
    pub translatable: &'static [&'static str],
}

impl EntitySchema {
    /// Look up a versioned field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a versioned field by name or fail with a validation error.
    pub fn require_field(&self, name: &str) -> Result<&'static FieldSpec, CoreError> {
        self.field(name).ok_or_else(|| {
            CoreError::Validation(format!(
                "Unknown field '{name}' for {}. Valid fields: {}",
                self.kind,
                self.field_names().join(", ")
            ))
        })
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Returns `true` if the value at `path` is a per-locale map.
    ///
    /// A bare localized field name is translatable, as is any path matching
    /// one of the declared nested patterns.
    pub fn is_translatable(&self, path: &str) -> bool {
        if self.field(path).is_some_and(FieldSpec::is_localized) {
            return true;
        }
        self.translatable
            .iter()
            .any(|pattern| path_matches(pattern, path))
    }
}

/// Match a dotted path against a pattern where `*` stands for exactly one
/// segment: `buttons.*.text` matches `buttons.0.text` but not `buttons.text`.
pub fn path_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('.');
    let mut path_segments = path.split('.');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) if p == "*" || p == s => continue,
            _ => return false,
        }
    }
}

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// The entity kinds that carry drafts and revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Form,
    Page,
    ContentBlock,
}

/// All kinds, in declaration order.
pub const ALL_KINDS: &[EntityKind] = &[
    EntityKind::Form,
    EntityKind::Page,
    EntityKind::ContentBlock,
];

impl EntityKind {
    /// The value stored in `revisions.entity_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Form => "form",
            EntityKind::Page => "page",
            EntityKind::ContentBlock => "content_block",
        }
    }

    pub fn schema(self) -> &'static EntitySchema {
        match self {
            EntityKind::Form => &FORM_SCHEMA,
            EntityKind::Page => &PAGE_SCHEMA,
            EntityKind::ContentBlock => &CONTENT_BLOCK_SCHEMA,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KINDS
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid entity type '{s}'. Must be one of: {}",
                    ALL_KINDS
                        .iter()
                        .map(|k| k.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

pub static FORM_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Form,
    table: "forms",
    fields: &[
        FieldSpec::localized("name", "name", "draft_name"),
        FieldSpec::localized("description", "description", "draft_description"),
        FieldSpec::plain("elements", "elements", "draft_elements"),
        FieldSpec::plain("settings", "settings", "draft_settings"),
    ],
    translatable: &[
        "elements.*.label",
        "elements.*.placeholder",
        "elements.*.options.*.label",
        "settings.success_message",
        "settings.submit_label",
    ],
};

pub static PAGE_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::Page,
    table: "pages",
    fields: &[
        FieldSpec::localized("title", "title", "draft_title"),
        FieldSpec::localized("slug", "slug", "draft_slug"),
        FieldSpec::localized("content", "content", "draft_content"),
        FieldSpec::plain("blocks", "blocks", "draft_blocks"),
        FieldSpec::plain("seo", "seo", "draft_seo"),
    ],
    translatable: &["blocks.*.heading", "seo.title", "seo.description"],
};

pub static CONTENT_BLOCK_SCHEMA: EntitySchema = EntitySchema {
    kind: EntityKind::ContentBlock,
    table: "content_blocks",
    fields: &[
        FieldSpec::localized("title", "title", "draft_title"),
        FieldSpec::localized("content", "content", "draft_content"),
        FieldSpec::plain("settings", "settings", "draft_settings"),
    ],
    translatable: &[
        "settings.buttons.*.text",
        "settings.subtitle",
        "settings.image_alt",
    ],
};
