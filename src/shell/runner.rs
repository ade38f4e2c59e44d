use std::io::{self, Write};

use rustyline::{DefaultEditor, error::ReadlineError};
use snafu::prelude::*;
use tracing::{debug, info};

use super::command::Command;
use super::prompt::Prompt;
use super::shell::{Flow, Shell, ShellError};

const COMMENT_PREFIX: char = '#';
const BANNER_RULE_WIDTH: usize = 50;

fn welcome_banner() -> String {
    format!(
        "Welcome to the virtual filesystem shell!\n\
         Available commands: {}\n\
         Type 'exit' or press Ctrl-D to leave.\n\
         {}",
        Command::NAMES.join(", "),
        "-".repeat(BANNER_RULE_WIDTH)
    )
}

/// Keeps the executable lines of a script: trimmed, without blank lines and
/// `#` comments.
pub fn script_lines(script: &str) -> Vec<String> {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_PREFIX))
        .map(str::to_string)
        .collect()
}

/// Runs script lines in order, echoing each after the prompt.
///
/// The first failing line aborts the rest of the script. `exit` ends it
/// successfully.
pub fn run_script(
    shell: &mut Shell,
    prompt: &Prompt,
    lines: &[String],
    out: &mut impl Write,
) -> Result<(), ScriptError> {
    for (index, line) in lines.iter().enumerate() {
        write!(out, "{}", prompt.render(shell.current_path(), shell.home())).context(OutputSnafu)?;
        writeln!(out, "{line}").context(OutputSnafu)?;

        let flow = shell.execute_line(line, out).context(LineFailedSnafu {
            line_number: index + 1,
            line: line.as_str(),
        })?;
        if flow == Flow::Exit {
            info!("Script requested exit at line {}", index + 1);
            return Ok(());
        }

        writeln!(out).context(OutputSnafu)?;
    }

    debug!("Script finished after {} lines", lines.len());
    Ok(())
}

/// Reads commands from the terminal until `exit` or end of input. Command
/// failures are reported and the loop carries on.
pub fn run_interactive(shell: &mut Shell, prompt: &Prompt) -> Result<(), ReadlineError> {
    let mut editor = DefaultEditor::new()?;
    println!("{}", welcome_banner());

    loop {
        match editor.readline(&prompt.render(shell.current_path(), shell.home())) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = editor.add_history_entry(line.as_str()) {
                    tracing::warn!("Failed to add history entry: {}", e);
                }

                let mut stdout = io::stdout().lock();
                match shell.execute_line(&line, &mut stdout) {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Continue) => {}
                    Err(error) => eprintln!("{error}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                println!("Type 'exit' to leave");
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => return Err(err),
        }
    }

    println!("Leaving the shell");
    Ok(())
}

#[derive(Debug, Snafu)]
pub enum ScriptError {
    #[snafu(display("Script aborted at line {}: {}", line_number, line))]
    LineFailed {
        line_number: usize,
        line: String,
        source: ShellError,
    },
    #[snafu(display("Failed to write script output"))]
    OutputError { source: io::Error },
}

#[cfg(test)]
mod tests {
    use crate::vfs::Vfs;

    use super::*;

    const DESCRIPTION: &str = r#"
{
  "type": "directory",
  "content": {
    "home": { "type": "directory", "content": { "user": { "type": "directory" } } },
    "notes.txt": { "type": "file", "content": "first line" }
  }
}
"#;

    fn shell() -> Shell {
        Shell::new(Vfs::try_from(DESCRIPTION).unwrap(), "/home/user")
    }

    fn prompt() -> Prompt {
        Prompt::new("tester", "host", false)
    }

    #[test]
    fn script_lines_skip_blanks_and_comments() {
        let script = "# setup\n\n  ls  \n   # indented comment\ncd /\n";
        assert_eq!(script_lines(script), vec!["ls", "cd /"]);
    }

    #[test]
    fn runs_every_line_and_echoes_prompts() {
        let mut shell = shell();
        let lines = script_lines("mkdir work\ncd work\npwd\ncat /notes.txt");
        let mut out = Vec::<u8>::new();

        run_script(&mut shell, &prompt(), &lines, &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert_eq!(
            output,
            "tester@host:~$ mkdir work\n\n\
             tester@host:~$ cd work\n\n\
             tester@host:~/work$ pwd\n/home/user/work\n\n\
             tester@host:~/work$ cat /notes.txt\nfirst line\n\n"
        );
    }

    #[test]
    fn stops_at_the_first_failure() {
        let mut shell = shell();
        let lines = script_lines("mkdir a\ncat missing\nmkdir b");
        let mut out = Vec::<u8>::new();

        let error = run_script(&mut shell, &prompt(), &lines, &mut out).unwrap_err();

        assert!(matches!(
            error,
            ScriptError::LineFailed { line_number: 2, .. }
        ));
        assert!(shell.execute_line("cd a", &mut std::io::sink()).is_ok());
        assert!(shell.execute_line("cd ../b", &mut std::io::sink()).is_err());
    }

    #[test]
    fn unknown_command_aborts_the_script() {
        let mut shell = shell();
        let lines = script_lines("frobnicate\npwd");
        let error = run_script(&mut shell, &prompt(), &lines, &mut std::io::sink()).unwrap_err();
        assert!(matches!(
            error,
            ScriptError::LineFailed {
                source: ShellError::UnknownCommand { .. },
                ..
            }
        ));
    }

    #[test]
    fn exit_ends_the_script_successfully() {
        let mut shell = shell();
        let lines = script_lines("exit\nfrobnicate");
        assert!(run_script(&mut shell, &prompt(), &lines, &mut std::io::sink()).is_ok());
    }

    #[test]
    fn banner_lists_commands() {
        let banner = welcome_banner();
        for name in Command::NAMES {
            assert!(banner.contains(name));
        }
    }
}
