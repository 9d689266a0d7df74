use crate::app::App;
use crate::cli::GroupCommands;
use crate::commands::Status;
use crate::output::{render_errors, render_json, render_rows, GroupRow, LocaleRow, OutputFormat};
use anyhow::{Context, Result};
use canopy_core::{CategoryGroup, SaveOutcome, UserId};
use std::path::Path;
use tracing::debug;

pub fn execute(app: &App, command: GroupCommands, format: OutputFormat) -> Result<Status> {
    match command {
        GroupCommands::List => {
            let groups = app.service.groups().all_groups()?;
            print_groups(&groups, format)
        }
        GroupCommands::Show { handle } => show(app, &handle, format),
        GroupCommands::Save { file } => save(app, &file, format),
        GroupCommands::Delete { handle } => {
            let group = app.require_group(&handle)?;
            let id = group.id.context("Stored group has no ID")?;
            app.service.groups().delete_by_id(id)?;
            println!("Deleted category group '{}'", handle);
            Ok(Status::Success)
        }
        GroupCommands::Editable { user } => {
            let groups = app.service.groups().editable_groups(UserId(user))?;
            print_groups(&groups, format)
        }
        GroupCommands::CheckTemplate { handle } => check_template(app, &handle),
    }
}

fn print_groups(groups: &[CategoryGroup], format: OutputFormat) -> Result<Status> {
    let rows: Vec<GroupRow> = groups.iter().map(GroupRow::from).collect();
    println!("{}", render_rows(&rows, format)?);
    Ok(Status::Success)
}

fn show(app: &App, handle: &str, format: OutputFormat) -> Result<Status> {
    let group = app.require_group(handle)?;

    match format {
        OutputFormat::Json => println!("{}", render_json(&group)?),
        OutputFormat::Table => {
            println!("{}", render_rows(&[GroupRow::from(&group)], format)?);
            let locales: Vec<LocaleRow> = group.locales.values().map(LocaleRow::from).collect();
            if !locales.is_empty() {
                println!("{}", render_rows(&locales, format)?);
            }
            if !group.field_layout.is_empty() {
                let fields: Vec<String> = group
                    .field_layout
                    .fields
                    .iter()
                    .map(|f| if f.required { format!("{}*", f.handle) } else { f.handle.clone() })
                    .collect();
                println!("Fields: {}", fields.join(", "));
            }
        }
    }
    Ok(Status::Success)
}

/// Parse a group definition; `.json` files are JSON, anything else TOML
pub fn read_group_file(path: &Path) -> Result<CategoryGroup> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read group file: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse group file: {}", path.display()))
    } else {
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse group file: {}", path.display()))
    }
}

fn save(app: &App, file: &Path, format: OutputFormat) -> Result<Status> {
    let mut group = read_group_file(file)?;

    if group.id.is_none() {
        if let Some(existing) = app.service.groups().group_by_handle(&group.handle)? {
            debug!(handle = %group.handle, id = ?existing.id, "Updating existing group");
            group.id = existing.id;
        }
    }

    match app.service.groups().save(&mut group)? {
        SaveOutcome::Saved => {
            if format.is_machine_readable() {
                println!("{}", render_json(&group)?);
            } else {
                println!("Saved category group '{}'", group.handle);
            }
            Ok(Status::Success)
        }
        SaveOutcome::Invalid => {
            eprintln!("Category group '{}' is invalid:", group.handle);
            eprintln!("{}", render_errors(group.errors()));
            Ok(Status::Rejected)
        }
        SaveOutcome::Cancelled => {
            eprintln!("Saving category group '{}' was cancelled", group.handle);
            Ok(Status::Rejected)
        }
    }
}

fn check_template(app: &App, handle: &str) -> Result<Status> {
    let group = app.require_group(handle)?;

    if !group.has_urls {
        eprintln!("Category group '{}' has no URLs", handle);
        return Ok(Status::Rejected);
    }

    let template = group.template.as_deref().unwrap_or_default();
    if app.service.groups().is_group_template_valid(&group) {
        println!("Template '{}' found", template);
        Ok(Status::Success)
    } else {
        eprintln!("Template '{}' not found", template);
        Ok(Status::Rejected)
    }
}
