//! Generator profile definitions and validation for the copybook toolchain.
//!
//! A profile tunes code generation without touching the copybook: it can
//! replace the target type chosen for a semantic type, change the derives
//! placed on generated structs, rename the layout attribute, or add a
//! header comment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Semantic type names accepted as `type_overrides` keys.
pub const SEMANTIC_TYPE_NAMES: &[&str] = &[
    "unknown",
    "unsigned",
    "signed",
    "decimal",
    "alpha",
    "alphanumeric",
];

/// Errors that can occur when loading or validating a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// JSON deserialization failed.
    #[error("invalid profile JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A field value failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// The name of the field that failed validation.
        field: String,
        /// A human-readable explanation of why the field value is invalid.
        reason: String,
    },
}

/// Code generation settings.
///
/// Every field is optional; an empty JSON object is a valid profile that
/// keeps all defaults.
///
/// # Example
/// ```
/// let profile = copybook_toolchain_profile::load_profile_from_str(
///     r#"{ "type_overrides": { "decimal": "f64" }, "derives": ["Debug"] }"#,
/// )
/// .unwrap();
/// assert_eq!(profile.type_overrides["decimal"], "f64");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Profile schema version for forward compatibility (e.g., `"1.0.0"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Semantic type name → target type. Each entry replaces the default
    /// for that key only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_overrides: BTreeMap<String, String>,
    /// Derives for generated structs. Replaces the default list when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derives: Option<Vec<String>>,
    /// Name of the field attribute that carries the layout tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// Extra comment written under the generated-file header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

/// The semantic type a `type_overrides` key names, with `alpha` folded into
/// `alphanumeric`. `None` for unknown keys.
fn semantic_key(key: &str) -> Option<&'static str> {
    let name: &'static str = SEMANTIC_TYPE_NAMES
        .iter()
        .copied()
        .find(|name| name.eq_ignore_ascii_case(key.trim()))?;
    Some(if name == "alpha" { "alphanumeric" } else { name })
}

/// Whether `s` is a plain Rust identifier (ASCII only, no `r#`).
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && s != "_"
}

/// Whether `s` is a `::`-separated Rust path such as `serde::Deserialize`.
fn is_path(s: &str) -> bool {
    let s = s.strip_prefix("::").unwrap_or(s);
    !s.is_empty() && s.split("::").all(is_identifier)
}

/// Load and validate a [`Profile`] from a JSON string.
///
/// Performs structural validation after deserialization:
/// - `schema_version` must be non-empty (if present)
/// - `type_overrides` keys must name a semantic type (see
///   [`SEMANTIC_TYPE_NAMES`], case-insensitive), at most one key per type
///   (`alpha` and `alphanumeric` are the same type), and targets must be
///   non-empty
/// - `derives` entries must be Rust paths
/// - `attribute` must be a Rust path (if present)
pub fn load_profile_from_str(s: &str) -> Result<Profile, ProfileError> {
    let profile: Profile = serde_json::from_str(s)?;

    // -- Schema version --
    if let Some(version) = &profile.schema_version
        && version.trim().is_empty()
    {
        return Err(ProfileError::InvalidField {
            field: "schema_version".into(),
            reason: "must not be empty".into(),
        });
    }

    // -- Type overrides --
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for (key, target) in &profile.type_overrides {
        let Some(semantic) = semantic_key(key) else {
            return Err(ProfileError::InvalidField {
                field: format!("type_overrides.{key}"),
                reason: format!(
                    "unknown semantic type (expected one of: {})",
                    SEMANTIC_TYPE_NAMES.join(", ")
                ),
            });
        };
        if let Some(first) = seen.insert(semantic, key.as_str()) {
            return Err(ProfileError::InvalidField {
                field: format!("type_overrides.{key}"),
                reason: format!("{first:?} already overrides the {semantic} type"),
            });
        }
        if target.trim().is_empty() {
            return Err(ProfileError::InvalidField {
                field: format!("type_overrides.{key}"),
                reason: "target type must not be empty".into(),
            });
        }
    }

    // -- Derives --
    if let Some(derives) = &profile.derives {
        for derive in derives {
            if !is_path(derive) {
                return Err(ProfileError::InvalidField {
                    field: "derives".into(),
                    reason: format!("{derive:?} is not a Rust path"),
                });
            }
        }
    }

    // -- Attribute --
    if let Some(attribute) = &profile.attribute
        && !is_path(attribute)
    {
        return Err(ProfileError::InvalidField {
            field: "attribute".into(),
            reason: format!("{attribute:?} is not a Rust path"),
        });
    }

    Ok(profile)
}
