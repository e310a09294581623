//! Catalog command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use scripto_core::{ApiClient, CatalogView, NewScript};

use crate::editor::{edit_text, extension_for, prompt_required};
use crate::output::Output;

/// Fields for a manual entry; missing ones are prompted for
#[derive(Debug, Default)]
pub struct ManualEntry {
    pub title: Option<String>,
    pub language: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub how_it_works: Option<String>,
    pub category: Option<String>,
    /// Read content from this file instead of opening the editor
    pub file: Option<PathBuf>,
}

/// List every script
pub async fn list(api: &ApiClient, output: &Output) -> Result<()> {
    let mut view = CatalogView::new();
    view.load(api).await;
    output.print_catalog(view.state(), view.empty_message());
    Ok(())
}

/// Show one script with its content
pub async fn show(api: &ApiClient, id: String, output: &Output) -> Result<()> {
    let script_id = resolve_script_id(api, &id).await?;
    let item = api.get_script(&script_id).await?;
    output.print_item(&item);
    Ok(())
}

/// Upload a script file, optionally fulfilling a request
pub async fn upload(
    api: &ApiClient,
    file: PathBuf,
    request_id: Option<String>,
    output: &Output,
) -> Result<()> {
    match api.upload_script(&file, request_id.as_deref()).await {
        Ok(item) => {
            output.success(&format!("Uploaded {} as {}", item.title, item.id));
            output.print_item(&item);
            Ok(())
        }
        Err(e) => {
            output.api_failure(&e);
            for field in e.field_errors().iter().skip(1) {
                output.failure(&field.to_string());
            }
            bail!("Upload failed")
        }
    }
}

/// Enter a script by hand
pub async fn add(api: &ApiClient, entry: ManualEntry, output: &Output) -> Result<()> {
    let title = value_or_prompt(entry.title, "Title")?;
    let language = value_or_prompt(entry.language, "Language")?;
    let category = value_or_prompt(entry.category, "Category")?;
    let description = value_or_prompt(entry.description, "Description")?;
    let how_it_works = value_or_prompt(entry.how_it_works, "How it works")?;
    let tags = if entry.tags.is_empty() {
        prompt_required("Tags (comma-separated)")?
    } else {
        entry.tags.join(",")
    };

    let script_content = match entry.file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read script file: {:?}", path))?,
        None => edit_text("", extension_for(&language))?,
    };
    if script_content.trim().is_empty() {
        bail!("Script content is empty. Nothing was submitted.");
    }

    let script = NewScript {
        title,
        language,
        tags,
        description,
        how_it_works,
        category,
        script_content,
    };

    match api.input_script(&script).await {
        Ok(item) => {
            output.success(&format!("Added {} as {}", item.title, item.id));
            Ok(())
        }
        Err(e) => {
            for field in e.field_errors() {
                output.failure(&field.to_string());
            }
            if e.field_errors().is_empty() {
                output.api_failure(&e);
            }
            bail!("Script was not added")
        }
    }
}

/// List all tags
pub async fn tags(api: &ApiClient, output: &Output) -> Result<()> {
    match api.all_tags().await {
        Ok(tags) => output.print_tags(&tags),
        Err(e) => output.banner(&e.message()),
    }
    Ok(())
}

/// Scripts with the most likes
pub async fn trending(api: &ApiClient, limit: u32, output: &Output) -> Result<()> {
    match api.trending_scripts(limit).await {
        Ok(items) => output.print_items(&items, "No trending scripts yet."),
        Err(e) => output.banner(&e.message()),
    }
    Ok(())
}

/// Most recently uploaded scripts
pub async fn recent(api: &ApiClient, limit: u32, output: &Output) -> Result<()> {
    match api.recent_scripts(limit).await {
        Ok(items) => output.print_items(&items, "No scripts uploaded yet."),
        Err(e) => output.banner(&e.message()),
    }
    Ok(())
}

/// Resolve a script ID (full UUID or unique prefix)
pub async fn resolve_script_id(api: &ApiClient, id: &str) -> Result<String> {
    if let Ok(uuid) = Uuid::parse_str(id) {
        return Ok(uuid.to_string());
    }

    let items = api
        .list_scripts()
        .await
        .context("Failed to look up script IDs")?;
    let candidates: Vec<(&str, &str)> = items
        .iter()
        .map(|i| (i.id.as_str(), i.title.as_str()))
        .collect();
    match_prefix(id, &candidates, "script")
}

/// Pick the single candidate whose id starts with `prefix`
pub fn match_prefix(prefix: &str, candidates: &[(&str, &str)], kind: &str) -> Result<String> {
    let matches: Vec<_> = candidates
        .iter()
        .filter(|(id, _)| id.starts_with(prefix))
        .collect();

    match matches.len() {
        0 => bail!("No {} found matching: {}", kind, prefix),
        1 => Ok(matches[0].0.to_string()),
        _ => {
            eprintln!("Multiple {}s match '{}':", kind, prefix);
            for (id, title) in &matches {
                eprintln!("  {} - {}", id, title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => prompt_required(prompt),
    }
}
