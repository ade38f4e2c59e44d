use std::path::PathBuf;

use supports_color::Stream;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub description_path: PathBuf,
    pub script_path: Option<PathBuf>,
    pub home: String,
    pub colorize: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        let colorize = !cli.no_color && supports_color::on(Stream::Stdout).is_some();
        Self {
            description_path: cli.vfs,
            script_path: cli.script,
            home: cli.home,
            colorize,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::*;

    #[test]
    fn no_color_flag_wins() {
        let cli = Cli::parse_from(["vfshell", "fs.json", "--no-color", "--home", "/root"]);
        let config = RuntimeConfig::from(cli);
        assert!(!config.colorize);
        assert_eq!(config.home, "/root");
        assert_eq!(config.description_path, PathBuf::from("fs.json"));
    }
}
