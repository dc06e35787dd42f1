//! Renders emitted type definitions as Rust source or JSON.

use std::fmt::Write as _;

use crate::emit::TypeDef;
use copybook_toolchain_profile::Profile;

/// First line of every generated Rust file.
pub const GENERATED_HEADER: &str = "// This file is generated by copybook. DO NOT EDIT.";

// ── Configuration ───────────────────────────────────────────────────────

/// Configuration for the Rust renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Derives attached to every generated struct.
    pub derives: Vec<String>,
    /// Extra comment line written under the generated-file header.
    pub header: Option<String>,
    /// Name of the field attribute carrying the layout tag.
    pub attribute: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            derives: vec!["Debug".into(), "Clone".into(), "PartialEq".into()],
            header: None,
            attribute: "copybook".into(),
        }
    }
}

impl RenderConfig {
    /// Defaults, with any value the profile sets taking precedence.
    pub fn from_profile(profile: &Profile) -> Self {
        let mut config = Self::default();
        if let Some(derives) = &profile.derives {
            config.derives.clone_from(derives);
        }
        if let Some(header) = &profile.header {
            config.header = Some(header.clone());
        }
        if let Some(attribute) = &profile.attribute {
            config.attribute.clone_from(attribute);
        }
        config
    }
}

// ── Public API ──────────────────────────────────────────────────────────

/// Render type definitions as a Rust module.
pub fn render_rust(types: &[TypeDef], config: &RenderConfig) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push('\n');
    if let Some(header) = &config.header {
        for line in header.lines() {
            let _ = writeln!(out, "// {line}");
        }
    }

    for ty in types {
        out.push('\n');
        render_struct(&mut out, ty, config);
    }
    out
}

/// Serialize type definitions to a pretty-printed JSON string.
pub fn to_pretty_json(types: &[TypeDef]) -> String {
    serde_json::to_string_pretty(types).expect("TypeDef serialization cannot fail")
}

// ── Struct emission ─────────────────────────────────────────────────────

fn render_struct(out: &mut String, ty: &TypeDef, config: &RenderConfig) {
    let _ = writeln!(out, "/// Representation of `{}`.", ty.name);
    if !config.derives.is_empty() {
        let _ = writeln!(out, "#[derive({})]", config.derives.join(", "));
    }
    let _ = writeln!(out, "pub struct {} {{", ty.identifier);
    for member in &ty.members {
        let _ = write!(
            out,
            "    /// start:{} end:{}",
            member.global_start, member.global_end
        );
        if let Some(target) = &member.redefines {
            let _ = write!(out, " REDEFINES {target}");
        }
        out.push('\n');
        let _ = writeln!(
            out,
            "    #[{}(pic = \"{}\")]",
            config.attribute,
            member.pic.escape_default()
        );
        let _ = writeln!(out, "    pub {}: {},", member.identifier, member.ty);
    }
    out.push_str("}\n");
}
