use std::io::{self, Write};

use snafu::prelude::*;
use tracing::{debug, warn};

use crate::vfs::{EntryKind, InvalidModeError, Permissions, Vfs};

use super::command::Command;
use super::tokenizer::{TokenizeError, split_line};

const HOME_SHORTHAND: &str = "~";
const PREVIOUS_DIRECTORY: &str = "-";

/// What the caller should do after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Command interpreter holding the working directory over a [`Vfs`].
///
/// The shell only keeps path strings; every filesystem access goes through
/// the VFS resolver and mutators.
#[derive(Debug)]
pub struct Shell {
    vfs: Vfs,
    home: String,
    current_path: String,
    previous_path: Option<String>,
}

impl Shell {
    /// Starts in `home`, canonicalized against the root when it names an
    /// existing directory.
    pub fn new(vfs: Vfs, home: impl Into<String>) -> Self {
        let home = home.into();
        let home = match vfs
            .resolve("/", &home)
            .filter(|id| vfs.is_directory(*id))
            .and_then(|id| vfs.path_of(id))
        {
            Some(canonical) => canonical,
            None => {
                warn!("Home directory '{}' does not exist in the filesystem", home);
                home
            }
        };
        debug!("Starting in '{}'", home);

        Self {
            vfs,
            current_path: home.clone(),
            home,
            previous_path: None,
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    /// Splits, parses and runs one line of input.
    pub fn execute_line(&mut self, line: &str, out: &mut impl Write) -> Result<Flow, ShellError> {
        let words = split_line(line).context(TokenizeSnafu)?;
        match Command::parse(words)? {
            Some(command) => self.execute(command, out),
            None => Ok(Flow::Continue),
        }
    }

    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> Result<Flow, ShellError> {
        debug!("Executing {:?} in '{}'", command, self.current_path);

        match command {
            Command::Ls { path } => self.ls(path.as_deref(), out)?,
            Command::Cd { path } => self.cd(path.as_deref())?,
            Command::Pwd => writeln!(out, "{}", self.current_path).context(OutputSnafu)?,
            Command::Cat { paths } => self.cat(&paths, out)?,
            Command::Echo { words } => writeln!(out, "{}", words.join(" ")).context(OutputSnafu)?,
            Command::Mkdir { paths } => self.mkdir(&paths)?,
            Command::Touch { paths } => self.touch(&paths)?,
            Command::Rmdir { paths } => self.rmdir(&paths)?,
            Command::Chmod { mode, paths } => self.chmod(&mode, &paths)?,
            Command::Exit => return Ok(Flow::Exit),
        }

        Ok(Flow::Continue)
    }

    /// Expands a leading `~` to the home directory.
    fn expand_home(&self, path: &str) -> String {
        match path.strip_prefix(HOME_SHORTHAND) {
            Some("") => self.home.clone(),
            Some(rest) if rest.starts_with('/') => format!("{}{}", self.home, rest),
            _ => path.to_string(),
        }
    }

    fn missing(&self, command: &str, path: &str) -> ShellError {
        ShellError::NoSuchFile {
            command: command.to_string(),
            path: path.to_string(),
        }
    }

    fn ls(&self, path: Option<&str>, out: &mut impl Write) -> Result<(), ShellError> {
        let target = path.map(|p| self.expand_home(p));
        let target = target.as_deref().unwrap_or(".");

        let Some(mut entries) = self.vfs.list_directory(&self.current_path, target) else {
            return match self.vfs.resolve(&self.current_path, target) {
                Some(_) => writeln!(out, "{}", path.unwrap_or(target)).context(OutputSnafu),
                None => Err(self.missing("ls", path.unwrap_or(target))),
            };
        };

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        for entry in entries {
            let marker = match entry.kind {
                EntryKind::Directory => "/",
                EntryKind::File => "",
            };
            writeln!(out, "{}{}", entry.name, marker).context(OutputSnafu)?;
        }
        Ok(())
    }

    fn cd(&mut self, path: Option<&str>) -> Result<(), ShellError> {
        let target = match path {
            None => self.home.clone(),
            Some(PREVIOUS_DIRECTORY) => self
                .previous_path
                .clone()
                .context(NoPreviousDirectorySnafu)?,
            Some(path) => self.expand_home(path),
        };
        let shown = path.unwrap_or(HOME_SHORTHAND);

        let id = self
            .vfs
            .resolve(&self.current_path, &target)
            .ok_or_else(|| self.missing("cd", shown))?;
        if !self.vfs.is_directory(id) {
            return NotADirectorySnafu {
                command: "cd",
                path: shown,
            }
            .fail();
        }

        let new_path = self
            .vfs
            .path_of(id)
            .ok_or_else(|| self.missing("cd", shown))?;
        debug!("Changing directory from '{}' to '{}'", self.current_path, new_path);
        self.previous_path = Some(std::mem::replace(&mut self.current_path, new_path));
        Ok(())
    }

    fn cat(&self, paths: &[String], out: &mut impl Write) -> Result<(), ShellError> {
        for path in paths {
            let target = self.expand_home(path);
            if let Some(content) = self.vfs.get_file_content(&self.current_path, &target) {
                writeln!(out, "{content}").context(OutputSnafu)?;
                continue;
            }

            return match self.vfs.resolve(&self.current_path, &target) {
                Some(_) => IsADirectorySnafu {
                    command: "cat",
                    path: path.as_str(),
                }
                .fail(),
                None => Err(self.missing("cat", path)),
            };
        }
        Ok(())
    }

    fn mkdir(&mut self, paths: &[String]) -> Result<(), ShellError> {
        for path in paths {
            let target = self.expand_home(path);
            ensure!(
                self.vfs.create_directory(&self.current_path, &target),
                CannotCreateSnafu {
                    command: "mkdir",
                    path: path.as_str(),
                }
            );
        }
        Ok(())
    }

    fn touch(&mut self, paths: &[String]) -> Result<(), ShellError> {
        for path in paths {
            let target = self.expand_home(path);
            ensure!(
                self.vfs.create_file(&self.current_path, &target),
                CannotCreateSnafu {
                    command: "touch",
                    path: path.as_str(),
                }
            );
        }
        Ok(())
    }

    fn rmdir(&mut self, paths: &[String]) -> Result<(), ShellError> {
        for path in paths {
            let target = self.expand_home(path);
            ensure!(
                self.vfs.remove_directory(&self.current_path, &target),
                CannotRemoveSnafu {
                    path: path.as_str()
                }
            );
        }
        Ok(())
    }

    fn chmod(&mut self, mode: &str, paths: &[String]) -> Result<(), ShellError> {
        mode.parse::<Permissions>().context(InvalidModeSnafu)?;

        for path in paths {
            let target = self.expand_home(path);
            if !self.vfs.change_permissions(&self.current_path, &target, mode) {
                return Err(self.missing("chmod", path));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ShellError {
    #[snafu(display("Failed to parse the command line: {}", source))]
    TokenizeError { source: TokenizeError },
    #[snafu(display("{}: command not found", command))]
    UnknownCommand { command: String },
    #[snafu(display("{}: too many arguments", command))]
    TooManyArguments { command: String },
    #[snafu(display("{}: missing operand", command))]
    MissingOperand { command: String },
    #[snafu(display("{}: cannot access '{}': No such file or directory", command, path))]
    NoSuchFile { command: String, path: String },
    #[snafu(display("{}: '{}': Not a directory", command, path))]
    NotADirectory { command: String, path: String },
    #[snafu(display("{}: '{}': Is a directory", command, path))]
    IsADirectory { command: String, path: String },
    #[snafu(display("cd: no previous directory"))]
    NoPreviousDirectory,
    #[snafu(display("chmod: {}", source))]
    InvalidMode { source: InvalidModeError },
    #[snafu(display("{}: cannot create '{}'", command, path))]
    CannotCreate { command: String, path: String },
    #[snafu(display("rmdir: failed to remove '{}': not an empty directory", path))]
    CannotRemove { path: String },
    #[snafu(display("Failed to write command output"))]
    OutputError { source: io::Error },
}
