mod render;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use copybook_toolchain_core::normalise::normalise;
use copybook_toolchain_core::{
    CompileError, CompileOptions, Compiled, RenderConfig, TypeMapping, compile_normalised,
    layout_rows, parse_str, render_rust, to_pretty_json,
};
use copybook_toolchain_diagnostics as diag;
use copybook_toolchain_profile::{Profile, load_profile_from_str};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::render::{Format, layout_table, locate, print_json, print_summary, report_failure};

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "copybook",
    version,
    about = "Copybook toolchain: normalise, parse and lay out COBOL copybooks, and generate Rust types from them"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate Rust types (or their JSON description) from a copybook.
    Generate {
        file: PathBuf,
        /// Copybook name. Names the container type and prefixes root
        /// fillers. Defaults to the file name without its extension.
        #[arg(long)]
        name: Option<String>,
        /// Path to a generator profile (JSON).
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Output file or directory; `-` writes to stdout. Defaults to
        /// `<lowercase name>.generated.rs` next to the copybook.
        #[arg(long, short)]
        out: Option<String>,
        /// What to write.
        #[arg(long, value_enum, default_value_t = Emit::Rust)]
        emit: Emit,
    },

    /// Print the size and byte positions of every field.
    Layout {
        file: PathBuf,
        /// Copybook name (see `generate --help`).
        #[arg(long)]
        name: Option<String>,
    },

    /// Parse a copybook and print its declarations.
    Parse { file: PathBuf },

    /// Print a copybook in normalised reference format.
    Normalise { file: PathBuf },

    /// Explain a diagnostic ID (e.g. CPY1103).
    Explain { id: String },
}

/// Output kind for `generate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Rust source with one struct per record and group.
    Rust,
    /// The emitted type definitions as JSON.
    Json,
}

impl Emit {
    fn extension(self) -> &'static str {
        match self {
            Emit::Rust => "rs",
            Emit::Json => "json",
        }
    }
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = Format::resolve_or_detect(cli.output.as_deref());

    match cli.cmd {
        Cmd::Generate {
            file,
            name,
            profile,
            out,
            emit,
        } => cmd_generate(
            &file,
            name.as_deref(),
            profile.as_deref(),
            out.as_deref(),
            emit,
            format,
        )?,
        Cmd::Layout { file, name } => cmd_layout(&file, name.as_deref(), format)?,
        Cmd::Parse { file } => cmd_parse(&file, format)?,
        Cmd::Normalise { file } => cmd_normalise(&file, format)?,
        Cmd::Explain { id } => cmd_explain(&id, format)?,
    }

    Ok(())
}

// ── Commands ────────────────────────────────────────────────────────────

/// What `generate` reports in JSON mode after writing a file.
#[derive(Debug, Serialize)]
struct GenerateSummary<'a> {
    ok: bool,
    name: &'a str,
    out: String,
    types: usize,
}

fn cmd_generate(
    file: &Path,
    name: Option<&str>,
    profile_path: Option<&Path>,
    out: Option<&str>,
    emit: Emit,
    format: Format,
) -> Result<()> {
    let profile = match profile_path {
        Some(path) => load_profile(path)?,
        None => Profile::default(),
    };
    let mapping = TypeMapping::from_profile(&profile)
        .with_context(|| format!("invalid profile {}", display_path(profile_path)))?;

    let name = copybook_name(file, name)?;
    let compiled = compile_file(file, CompileOptions::new(name.as_str()).with_mapping(mapping), format)?;

    let rendered = match emit {
        Emit::Rust => render_rust(&compiled.types, &RenderConfig::from_profile(&profile)),
        Emit::Json => to_pretty_json(&compiled.types) + "\n",
    };

    if out == Some("-") {
        print!("{rendered}");
        return Ok(());
    }

    let target = output_path(file, &name, out, emit);
    fs::write(&target, &rendered)
        .with_context(|| format!("failed to write {}", target.display()))?;
    info!(path = %target.display(), types = compiled.types.len(), "wrote generated output");

    match format {
        Format::Json => {
            let summary = GenerateSummary {
                ok: true,
                name: &name,
                out: target.display().to_string(),
                types: compiled.types.len(),
            };
            print_json(&serde_json::to_value(&summary)?);
        }
        Format::Pretty => eprintln!("generated {}", target.display()),
    }
    Ok(())
}

fn cmd_layout(file: &Path, name: Option<&str>, format: Format) -> Result<()> {
    let name = copybook_name(file, name)?;
    let compiled = compile_file(file, CompileOptions::new(name), format)?;
    let rows = layout_rows(&compiled.forest, &compiled.layout)
        .context("layout is missing a placement")?;

    match format {
        Format::Json => print_json(&serde_json::json!({ "ok": true, "fields": rows })),
        Format::Pretty => print!("{}", layout_table(&rows)),
    }
    Ok(())
}

fn cmd_parse(file: &Path, format: Format) -> Result<()> {
    let filename = file.display().to_string();
    let text = read_normalised(file, format)?;
    let res = parse_str(&text);

    match format {
        Format::Json => print_json(&serde_json::json!({
            "declarations": res.declarations,
            "diagnostics": locate(&text, &res.diagnostics),
        })),
        Format::Pretty => {
            // Declarations to stdout, diagnostics to stderr.
            println!(
                "{}",
                serde_json::to_string_pretty(&res.declarations)
                    .context("failed to serialize declarations")?
            );
            if !res.diagnostics.is_empty() {
                render::render_diagnostics_pretty(&text, &filename, &res.diagnostics);
                print_summary(&res.diagnostics);
            }
        }
    }

    if res.has_errors() {
        process::exit(1);
    }
    Ok(())
}

fn cmd_normalise(file: &Path, format: Format) -> Result<()> {
    let text = read_normalised(file, format)?;
    match format {
        Format::Json => print_json(&serde_json::json!({ "ok": true, "text": text })),
        Format::Pretty => print!("{text}"),
    }
    Ok(())
}

fn cmd_explain(id: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => print_json(&serde_json::json!({
            "id": id,
            "explanation": diag::explain(id),
        })),
        Format::Pretty => {
            if let Some(text) = diag::explain(id) {
                use ariadne::Fmt;
                println!("{}: {}", id.fg(ariadne::Color::Cyan), text);
            } else {
                println!("{id}: (no explanation available)");
            }
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

/// Read and normalise a copybook. Exits with code 1 after reporting when the
/// text has no `01` entry.
fn read_normalised(file: &Path, format: Format) -> Result<String> {
    let source = read_source(file)?;
    match normalise(&source) {
        Ok(text) => Ok(text),
        Err(err) => {
            report_failure(&source, &file.display().to_string(), &[err.to_diagnostic()], format);
            process::exit(1);
        }
    }
}

/// Normalise and compile a copybook. Diagnostics are rendered against the
/// normalised text, where their spans point. Exits with code 1 on failure.
fn compile_file(file: &Path, options: CompileOptions, format: Format) -> Result<Compiled> {
    let text = read_normalised(file, format)?;
    debug!(file = %file.display(), name = %options.name, "compiling copybook");
    match compile_normalised(&text, &options) {
        Ok(compiled) => Ok(compiled),
        Err(err) => {
            if let CompileError::Build { error, .. } = &err
                && error.is_internal()
            {
                return Err(anyhow::Error::new(err).context("internal compiler error"));
            }
            report_failure(&text, &file.display().to_string(), &err.diagnostics(), format);
            process::exit(1);
        }
    }
}

fn load_profile(path: &Path) -> Result<Profile> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read profile {}", path.display()))?;
    load_profile_from_str(&json).with_context(|| format!("invalid profile {}", path.display()))
}

/// The explicit name, or the file name without its extension.
fn copybook_name(file: &Path, explicit: Option<&str>) -> Result<String> {
    if let Some(name) = explicit {
        return Ok(name.to_string());
    }
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .with_context(|| format!("cannot derive a copybook name from {}", file.display()))
}

/// Resolve where `generate` writes. An existing directory receives the
/// default file name.
fn output_path(file: &Path, name: &str, out: Option<&str>, emit: Emit) -> PathBuf {
    let default_name = format!("{}.generated.{}", name.to_lowercase(), emit.extension());
    match out {
        Some(out) => {
            let out = PathBuf::from(out);
            if out.is_dir() { out.join(default_name) } else { out }
        }
        None => file
            .parent()
            .map_or_else(|| PathBuf::from(&default_name), |dir| dir.join(&default_name)),
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "(default)".to_string(), |p| p.display().to_string())
}
