use super::ShellError;

/// A parsed shell command with its arguments checked for arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ls { path: Option<String> },
    Cd { path: Option<String> },
    Pwd,
    Cat { paths: Vec<String> },
    Echo { words: Vec<String> },
    Mkdir { paths: Vec<String> },
    Touch { paths: Vec<String> },
    Rmdir { paths: Vec<String> },
    Chmod { mode: String, paths: Vec<String> },
    Exit,
}

impl Command {
    pub const NAMES: [&'static str; 10] = [
        "ls", "cd", "pwd", "cat", "echo", "mkdir", "touch", "rmdir", "chmod", "exit",
    ];

    /// Builds a command from already split words. Returns `Ok(None)` for an
    /// empty line.
    pub fn parse(words: Vec<String>) -> Result<Option<Self>, ShellError> {
        let mut words = words.into_iter();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<String> = words.collect();

        let command = match name.as_str() {
            "ls" => Command::Ls {
                path: at_most_one(&name, args)?,
            },
            "cd" => Command::Cd {
                path: at_most_one(&name, args)?,
            },
            "pwd" => {
                no_arguments(&name, &args)?;
                Command::Pwd
            }
            "cat" => Command::Cat {
                paths: at_least_one(&name, args)?,
            },
            "echo" => Command::Echo { words: args },
            "mkdir" => Command::Mkdir {
                paths: at_least_one(&name, args)?,
            },
            "touch" => Command::Touch {
                paths: at_least_one(&name, args)?,
            },
            "rmdir" => Command::Rmdir {
                paths: at_least_one(&name, args)?,
            },
            "chmod" => {
                let mut args = at_least_one(&name, args)?.into_iter();
                let mode = args.next().unwrap_or_default();
                let paths: Vec<String> = args.collect();
                if paths.is_empty() {
                    return Err(ShellError::MissingOperand { command: name });
                }
                Command::Chmod { mode, paths }
            }
            "exit" => Command::Exit,
            _ => return Err(ShellError::UnknownCommand { command: name }),
        };

        Ok(Some(command))
    }
}

fn no_arguments(command: &str, args: &[String]) -> Result<(), ShellError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ShellError::TooManyArguments {
            command: command.to_string(),
        })
    }
}

fn at_most_one(command: &str, args: Vec<String>) -> Result<Option<String>, ShellError> {
    if args.len() > 1 {
        return Err(ShellError::TooManyArguments {
            command: command.to_string(),
        });
    }
    Ok(args.into_iter().next())
}

fn at_least_one(command: &str, args: Vec<String>) -> Result<Vec<String>, ShellError> {
    if args.is_empty() {
        return Err(ShellError::MissingOperand {
            command: command.to_string(),
        });
    }
    Ok(args)
}
