use crate::app::App;
use crate::cli::{CategoryCommands, MoveArgs};
use crate::commands::Status;
use crate::output::{render_errors, render_json, render_rows, CategoryRow, OutputFormat};
use anyhow::{Context, Result};
use canopy_core::{Category, CategoryError, ElementId, LocaleId, NewParent, SaveOutcome};

pub fn execute(app: &App, command: CategoryCommands, format: OutputFormat) -> Result<Status> {
    match command {
        CategoryCommands::Create {
            group,
            title,
            locale,
            parent,
            slug,
        } => {
            let group = app.require_group(&group)?;
            let group_id = group.id.context("Stored group has no ID")?;
            let locale = locale
                .map(LocaleId::from)
                .or_else(|| group.locales.keys().next().cloned())
                .unwrap_or_else(|| LocaleId::new("en"));

            let mut category = Category::new(group_id, locale, title);
            if let Some(parent) = parent {
                category = category.with_parent(ElementId(parent));
            }
            if let Some(slug) = slug {
                category = category.with_slug(slug);
            }
            save(app, &mut category, format)
        }
        CategoryCommands::Move(args) => move_category(app, args, format),
        CategoryCommands::Show { id, locale } => {
            let locale = locale.map(LocaleId::from);
            let category = app
                .service
                .categories()
                .category_by_id(ElementId(id), locale.as_ref())?
                .ok_or(CategoryError::CategoryNotFound { id: ElementId(id) })?;
            print_category(&category, format)
        }
        CategoryCommands::Delete { ids } => {
            let ids: Vec<ElementId> = ids.into_iter().map(ElementId).collect();
            if app.service.categories().delete_by_ids(&ids)? {
                println!("Deleted categories {}", join_ids(&ids));
                Ok(Status::Success)
            } else {
                eprintln!("No categories deleted");
                Ok(Status::Rejected)
            }
        }
        CategoryCommands::Tree { group } => print_tree(app, &group, format),
    }
}

fn move_category(app: &App, args: MoveArgs, format: OutputFormat) -> Result<Status> {
    let id = ElementId(args.id);
    let mut category = app
        .service
        .categories()
        .category_by_id(id, None)?
        .ok_or(CategoryError::CategoryNotFound { id })?;

    category.new_parent = match args.parent {
        Some(parent) => NewParent::Parent(ElementId(parent)),
        None => NewParent::Root,
    };
    save(app, &mut category, format)
}

fn save(app: &App, category: &mut Category, format: OutputFormat) -> Result<Status> {
    match app.service.categories().save(category)? {
        SaveOutcome::Saved => {
            print_category(category, format)?;
            Ok(Status::Success)
        }
        SaveOutcome::Invalid => {
            eprintln!("Category '{}' is invalid:", category.title);
            eprintln!("{}", render_errors(category.errors()));
            Ok(Status::Rejected)
        }
        SaveOutcome::Cancelled => {
            eprintln!("Saving category '{}' was cancelled", category.title);
            Ok(Status::Rejected)
        }
    }
}

fn print_category(category: &Category, format: OutputFormat) -> Result<Status> {
    match format {
        OutputFormat::Json => println!("{}", render_json(category)?),
        OutputFormat::Table => println!("{}", render_rows(&[CategoryRow::from(category)], format)?),
    }
    Ok(Status::Success)
}

/// Every category of a group in tree order, titles indented by level
fn print_tree(app: &App, handle: &str, format: OutputFormat) -> Result<Status> {
    let group = app.require_group(handle)?;
    let Some(structure_id) = group.structure_id else {
        return Ok(Status::Success);
    };

    let tree = app.backends.trees.load_tree(structure_id)?;
    let mut nodes = tree.nodes().to_vec();
    nodes.sort_by_key(|node| node.position.lft);
    let ids: Vec<ElementId> = nodes.iter().map(|node| node.element_id).collect();

    let categories = app.backends.elements.find_by_ids(&ids, None)?;
    let rows: Vec<CategoryRow> = categories
        .iter()
        .map(|category| {
            let mut row = CategoryRow::from(category);
            if !format.is_machine_readable() {
                let depth = row.level.saturating_sub(1) as usize;
                row.title = format!("{}{}", "  ".repeat(depth), row.title);
            }
            row
        })
        .collect();

    println!("{}", render_rows(&rows, format)?);
    Ok(Status::Success)
}

fn join_ids(ids: &[ElementId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
