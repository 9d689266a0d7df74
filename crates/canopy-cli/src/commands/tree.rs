use crate::app::App;
use crate::cli::TreeCommands;
use crate::commands::Status;
use crate::output::{render_json, OutputFormat};
use anyhow::Result;
use canopy_core::ElementId;

pub fn execute(app: &App, command: TreeCommands, format: OutputFormat) -> Result<Status> {
    match command {
        TreeCommands::FillGaps { ids } => {
            let ids: Vec<ElementId> = ids.into_iter().map(ElementId).collect();
            let filled = app.service.categories().fill_gaps(&ids)?;

            match format {
                OutputFormat::Json => println!("{}", render_json(&filled)?),
                OutputFormat::Table => {
                    for id in &filled {
                        println!("{}", id);
                    }
                }
            }
            Ok(Status::Success)
        }
    }
}
