// Command dispatcher: turns argv into one of the two workflows and the
// workflow result into a process exit code.

use crate::api::PortalClient;
use crate::config::Config;
use crate::error::ReleaseError;
use crate::release::{self, ReleaseOutcome};
use crate::ui::{Prompt, TerminalPrompt};
use anyhow::{Context, Result};
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_UNKNOWN_COMMAND: i32 = 2;

/// Package a Factorio mod and upload it to the mod portal.
#[derive(Parser, Debug)]
#[command(name = "factorio-mod-release", version, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Zip the mod, pass the test gate and upload the archive.
    Release {
        /// Mod directory; its name should contain the `0.0.0` placeholder.
        mod_path: PathBuf,
    },
    /// Run the manual test gate only.
    Test { mod_path: PathBuf },
}

/// What the command line asked for, once parsing is done.
#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    Run(Command),
    Unknown(String),
    Usage(String),
    /// `--help` or `--version`; clap has already rendered the text.
    Info(String),
}

pub fn parse<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    match Cli::try_parse_from(args.clone()) {
        Ok(cli) => Invocation::Run(cli.command),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                Invocation::Info(err.render().to_string())
            }
            ErrorKind::InvalidSubcommand => {
                let name = match err.get(ContextKind::InvalidSubcommand) {
                    Some(ContextValue::String(name)) => name.clone(),
                    _ => args
                        .get(1)
                        .map(|a| a.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                };
                Invocation::Unknown(name)
            }
            _ => Invocation::Usage(err.render().to_string()),
        },
    }
}

/// Entry point used by `main`: parse, run, map to an exit code.
pub fn run<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match parse(args) {
        Invocation::Info(text) => {
            print!("{}", text);
            EXIT_OK
        }
        Invocation::Unknown(name) => {
            println!("unknown command {}", name);
            EXIT_UNKNOWN_COMMAND
        }
        Invocation::Usage(text) => {
            let err = ReleaseError::Usage(text.trim_end().to_string());
            eprintln!("{}", err);
            EXIT_FAILURE
        }
        Invocation::Run(command) => {
            let mut prompt = TerminalPrompt;
            match execute(command, &mut prompt) {
                Ok(code) => code,
                Err(err) => {
                    eprintln!("Error: {:#}", err);
                    EXIT_FAILURE
                }
            }
        }
    }
}

/// Run a parsed command against the real portal configuration.
pub fn execute(command: Command, prompt: &mut dyn Prompt) -> Result<i32> {
    match command {
        Command::Release { mod_path } => {
            println!("Release for {}", mod_path.display());
            let config = Config::from_env();
            let client = PortalClient::new(&config).context("Failed to build HTTP client")?;
            let outcome = release::release(&mod_path, prompt, &client)
                .with_context(|| format!("release of {} failed", mod_path.display()))?;
            Ok(release_exit_code(&outcome))
        }
        Command::Test { mod_path } => {
            println!("Testing {}", mod_path.display());
            let passed = release::test(prompt).context("test gate failed")?;
            Ok(if passed { EXIT_OK } else { EXIT_FAILURE })
        }
    }
}

pub fn release_exit_code(outcome: &ReleaseOutcome) -> i32 {
    if outcome.is_uploaded() {
        EXIT_OK
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::ScriptedPrompt;

    #[test]
    fn parses_both_commands() {
        assert_eq!(
            parse(["fmr", "release", "mods/mymod_0.0.0"]),
            Invocation::Run(Command::Release {
                mod_path: PathBuf::from("mods/mymod_0.0.0")
            })
        );
        assert_eq!(
            parse(["fmr", "test", "mymod_0.0.0"]),
            Invocation::Run(Command::Test {
                mod_path: PathBuf::from("mymod_0.0.0")
            })
        );
    }

    #[test]
    fn unknown_command_keeps_its_name() {
        assert_eq!(
            parse(["fmr", "publish", "x"]),
            Invocation::Unknown("publish".to_string())
        );
    }

    #[test]
    fn wrong_argument_count_is_usage() {
        assert!(matches!(
            parse(["fmr", "release", "a", "b"]),
            Invocation::Usage(_)
        ));
        assert!(matches!(parse(["fmr", "release"]), Invocation::Usage(_)));
        assert!(matches!(parse(["fmr", "test"]), Invocation::Usage(_)));
        assert!(matches!(parse(["fmr"]), Invocation::Usage(_)));
    }

    #[test]
    fn unknown_and_usage_exit_codes_differ() {
        assert_eq!(run(["fmr", "bogus"]), EXIT_UNKNOWN_COMMAND);
        assert_eq!(run(["fmr", "release", "a", "b"]), EXIT_FAILURE);
    }

    #[test]
    fn help_is_not_a_command() {
        assert_eq!(parse(["fmr", "help"]), Invocation::Unknown("help".to_string()));
        assert_eq!(run(["fmr", "help"]), EXIT_UNKNOWN_COMMAND);
    }

    #[test]
    fn test_command_maps_gate_to_exit_code() {
        let passed = Command::Test {
            mod_path: PathBuf::from("mymod_0.0.0"),
        };
        let declined = Command::Test {
            mod_path: PathBuf::from("mymod_0.0.0"),
        };
        assert_eq!(
            execute(passed, &mut ScriptedPrompt::new(&["Yes"])).unwrap(),
            EXIT_OK
        );
        assert_eq!(
            execute(declined, &mut ScriptedPrompt::new(&["No"])).unwrap(),
            EXIT_FAILURE
        );
    }

    #[test]
    fn outcome_exit_codes() {
        let archive = PathBuf::from("mymod_1.0.0.zip");
        assert_eq!(
            release_exit_code(&ReleaseOutcome::Uploaded {
                archive: archive.clone(),
                response: String::new()
            }),
            EXIT_OK
        );
        assert_eq!(
            release_exit_code(&ReleaseOutcome::TestsDeclined {
                archive: archive.clone()
            }),
            EXIT_FAILURE
        );
        assert_eq!(
            release_exit_code(&ReleaseOutcome::UploadCanceled { archive }),
            EXIT_FAILURE
        );
    }
}
