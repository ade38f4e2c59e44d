use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

const DEFAULT_DESCRIPTION_PATH: &str = "utils/vfs_structure.json";

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Shell emulator over an in-memory virtual filesystem")]
pub struct Cli {
    /// Filesystem description (JSON or YAML)
    #[clap(default_value = DEFAULT_DESCRIPTION_PATH)]
    pub vfs: PathBuf,

    /// Script to run instead of the interactive prompt
    pub script: Option<PathBuf>,

    /// Starting directory, also the target of a bare `cd`
    #[clap(long, default_value = "/home/user")]
    pub home: String,

    /// Disable colored prompts even on a color-capable terminal
    #[clap(long)]
    pub no_color: bool,

    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,
}
