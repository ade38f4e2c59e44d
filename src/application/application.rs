use std::io;
use std::path::Path;

use compio::fs;
use rustyline::error::ReadlineError;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::shell::{Prompt, ScriptError, Shell, run_interactive, run_script, script_lines};
use crate::vfs::{Vfs, VfsLoadError};

const HEADER_RULE_WIDTH: usize = 50;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        colored::control::set_override(app_config.colorize);

        let vfs = Self::load_vfs(&app_config.description_path).await?;
        let mut shell = Shell::new(vfs, app_config.home.clone());
        let prompt = Prompt::detect(app_config.colorize);

        match &app_config.script_path {
            Some(script_path) => {
                let script = read_to_string(script_path)
                    .await
                    .context(ScriptReadSnafu {
                        file_path: script_path.display().to_string(),
                    })?;
                let lines = script_lines(&script);
                info!("Running {} script lines", lines.len());

                print_header(&app_config.description_path, script_path);
                run_script(&mut shell, &prompt, &lines, &mut io::stdout().lock())
                    .context(ScriptSnafu)?;
            }
            None => {
                debug!("No script given, starting interactive mode");
                run_interactive(&mut shell, &prompt).context(EditorSnafu)?;
            }
        }

        Ok(())
    }

    pub async fn load_vfs(path: &Path) -> Result<Vfs, ApplicationError> {
        debug!("Reading filesystem description: {}", path.display());
        let description = read_to_string(path).await.context(DescriptionReadSnafu {
            file_path: path.display().to_string(),
        })?;

        Vfs::try_from(description.as_str()).context(VfsLoadSnafu)
    }
}

async fn read_to_string(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path).await?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn print_header(description_path: &Path, script_path: &Path) {
    let rule = "=".repeat(HEADER_RULE_WIDTH);
    println!("{rule}");
    println!("Filesystem description: {}", description_path.display());
    println!("Script: {}", script_path.display());
    println!("{rule}");
    println!();
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Failed to read the filesystem description: {}", file_path))]
    DescriptionReadError {
        file_path: String,
        source: io::Error,
    },
    #[snafu(display("Critical failure while building the virtual filesystem"))]
    VfsLoadError { source: VfsLoadError },
    #[snafu(display("Failed to read the script: {}", file_path))]
    ScriptReadError {
        file_path: String,
        source: io::Error,
    },
    #[snafu(display("Script execution stopped"))]
    ScriptError { source: ScriptError },
    #[snafu(display("Line editor failure"))]
    EditorError { source: ReadlineError },
}
