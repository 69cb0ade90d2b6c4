// Command-line surface: `gtr-submit <action> <mode> <additional_data>`.
// clap rejects unknown actions and modes on its own (exit code 2); a
// missing mode or data token is reported by `Cli::resolve` so the caller
// can print the usage and exit 1.

use clap::{CommandFactory, Parser, ValueEnum};
use std::io::Write;

use crate::api::Mode;

const DATA_HELP: &str = "additional data to perform the action.\n\
For gtr_sub_api or dry_run, this is the json file.\n\
For gtr_get_action, this is the submission ID.\n\
For multi_subs, this is the text file of json file name list.\n\
For multi_deletes, this is the text file of GTR accession list.";

#[derive(Parser, Debug)]
#[command(name = "gtr-submit")]
#[command(version)]
#[command(about = "Call the GTR submission API endpoints", long_about = None)]
pub struct Cli {
    #[arg(value_enum, help = "action to perform")]
    pub action: Option<Action>,
    #[arg(value_enum, help = "submission mode")]
    pub mode: Option<Mode>,
    #[arg(help = DATA_HELP)]
    pub additional_data: Option<String>,
    #[arg(
        long,
        help = "For multi_subs and multi_deletes: report a failed entry and continue with the next one"
    )]
    pub keep_going: bool,
    #[arg(
        long,
        value_name = "SECS",
        help = "Per-request timeout in seconds, 0 for none (overrides GTR_TIMEOUT_SECS)"
    )]
    pub timeout: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum Action {
    GtrSubApi,
    GtrGetAction,
    MultiSubs,
    MultiDeletes,
    DryRun,
}

/// A fully validated command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub action: Action,
    pub mode: Mode,
    pub data: String,
    pub keep_going: bool,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageError {
    MissingMode,
    MissingData,
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageError::MissingMode => write!(f, "mode and additional data are required."),
            UsageError::MissingData => write!(f, "additional data is required."),
        }
    }
}

impl std::error::Error for UsageError {}

impl Cli {
    /// Check that every positional token is present. A missing action can
    /// only happen when nothing was given, so it reports as a missing mode.
    pub fn resolve(self) -> Result<Invocation, UsageError> {
        let (action, mode) = match (self.action, self.mode) {
            (Some(action), Some(mode)) => (action, mode),
            _ => return Err(UsageError::MissingMode),
        };
        let data = self.additional_data.ok_or(UsageError::MissingData)?;
        Ok(Invocation {
            action,
            mode,
            data,
            keep_going: self.keep_going,
            timeout: self.timeout,
        })
    }
}

/// Print `err` and the full help to stderr, then exit with status 1.
pub fn exit_with_usage(err: UsageError) -> ! {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}\n", err);
    let _ = Cli::command().write_long_help(&mut stderr);
    std::process::exit(1)
}
