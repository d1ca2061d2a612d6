//! Command implementations
//!
//! Each command writes its report to `out`; failures come back as errors
//! so the binary can exit non-zero.

use crate::cli::{Cli, Commands};
use anyhow::{anyhow, bail, Context, Result};
use std::io::Write;
use std::path::Path;
use tcb_config::{
    extract_editable_sections, ConfigDiff, ConfigDiffer, ConfigMergeEngine, EditableSection,
    SectionClassifier, TenantConfig,
};
use tcb_core::{ConfigStore, EditorConfig, FsConfigStore, SaveOptions};
use tcb_deps::DependencyResolver;

/// Run one parsed command line
///
/// # Errors
/// Returns error if an input cannot be read, a payload is invalid or the
/// store rejects a deploy
pub async fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let config = match &cli.settings {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    match cli.command {
        Commands::Validate { payload } => validate(&payload, out),
        Commands::Extract { config: path, out: target } => extract(&path, target.as_deref(), out),
        Commands::Merge { base, edits, out: target } => {
            merge(&config, &base, &edits, target.as_deref(), out)
        }
        Commands::Diff { old, new, json } => diff(&old, &new, json, out),
        Commands::Deps { config: path, section, id } => deps(&path, &section, &id, out),
        Commands::Deploy { store, tenant, edits } => {
            deploy(&config, &store, &tenant, &edits, out).await
        }
    }
}

/// Read a document, choosing YAML or JSON by extension
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub fn read_document(path: &Path) -> Result<TenantConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let document = if is_yaml {
        TenantConfig::from_yaml_str(&text)
    } else {
        TenantConfig::from_json_str(&text)
    };
    document.with_context(|| format!("parsing {}", path.display()))
}

fn emit(document: &TenantConfig, target: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let text = document.to_json_pretty()?;
    match target {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "document written");
        }
        None => writeln!(out, "{text}")?,
    }
    Ok(())
}

fn validated_edits(path: &Path) -> Result<TenantConfig> {
    let edits = read_document(path)?;
    SectionClassifier::new()
        .validate_edit_payload(edits.as_map())
        .with_context(|| format!("{} is not a valid edit payload", path.display()))?;
    Ok(edits)
}

fn validate(payload: &Path, out: &mut dyn Write) -> Result<()> {
    let edits = validated_edits(payload)?;
    writeln!(out, "{}: ok ({} fields)", payload.display(), edits.as_map().len())?;
    Ok(())
}

fn extract(path: &Path, target: Option<&Path>, out: &mut dyn Write) -> Result<()> {
    let full = read_document(path)?;
    emit(&extract_editable_sections(&full), target, out)
}

fn merge(
    config: &EditorConfig,
    base: &Path,
    edits: &Path,
    target: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    let edits = validated_edits(edits)?;
    let base = read_document(base)?;
    let engine = ConfigMergeEngine::new().with_default_version(config.default_version.clone());
    emit(&engine.merge(&base, &edits), target, out)
}

fn diff(old: &Path, new: &Path, json: bool, out: &mut dyn Write) -> Result<()> {
    let diff = ConfigDiffer::new().diff(&read_document(old)?, &read_document(new)?);
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&diff)?)?;
    } else {
        write_diff(&diff, out)?;
    }
    Ok(())
}

fn write_diff(diff: &ConfigDiff, out: &mut dyn Write) -> Result<()> {
    if !diff.has_changes {
        writeln!(out, "no changes")?;
        return Ok(());
    }
    if !diff.metadata_changes.is_empty() {
        writeln!(out, "metadata:")?;
        for (field, change) in &diff.metadata_changes {
            writeln!(out, "  {field}: {} -> {}", change.old, change.new)?;
        }
    }
    for (section, change) in &diff.section_changes {
        if change.replaced {
            writeln!(out, "{section}: (replaced)")?;
        } else if change.reordered {
            writeln!(out, "{section}: (reordered)")?;
        } else {
            writeln!(out, "{section}:")?;
        }
        for id in &change.added {
            writeln!(out, "  + {id}")?;
        }
        for id in &change.removed {
            writeln!(out, "  - {id}")?;
        }
        for id in &change.modified {
            writeln!(out, "  ~ {id}")?;
        }
    }
    Ok(())
}

fn deps(path: &Path, section: &str, id: &str, out: &mut dyn Write) -> Result<()> {
    let section = EditableSection::from_key(section)
        .ok_or_else(|| anyhow!("'{section}' is not an editable section"))?;
    let document = read_document(path)?;
    match DependencyResolver::default().get_dependencies(&document, section, id) {
        Some(report) => {
            writeln!(out, "{}", report.summary)?;
            for (kind, ids) in &report.dependents {
                for dependent in ids {
                    writeln!(out, "  {}: {dependent}", kind.label())?;
                }
            }
        }
        None => writeln!(out, "nothing references {section} '{id}'")?,
    }
    Ok(())
}

async fn deploy(
    config: &EditorConfig,
    root: &Path,
    tenant: &str,
    edits: &Path,
    out: &mut dyn Write,
) -> Result<()> {
    let edits = validated_edits(edits)?;
    if let Some(found) = edits.tenant_id() {
        if found != tenant {
            bail!("payload belongs to tenant '{found}', not '{tenant}'");
        }
    }
    let engine = ConfigMergeEngine::new().with_default_version(config.default_version.clone());
    let store = FsConfigStore::new(root).with_merge_engine(engine);
    let options = SaveOptions::default()
        .with_merge(true)
        .with_backup(config.create_backup_on_deploy);
    let result = store
        .save_config(tenant, &edits, options)
        .await
        .with_context(|| format!("deploying to tenant '{tenant}'"))?;
    let version = store
        .get_metadata(tenant)
        .await?
        .version
        .unwrap_or_else(|| "unset".to_string());
    writeln!(out, "deployed {tenant} (version {version}) at {}", result.timestamp.to_rfc3339())?;
    Ok(())
}
