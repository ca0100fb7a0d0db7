mod commands;
mod helpers;

use clap::Parser;
use rat_inputs_core::domain::RatError;
use rat_inputs_core::inputs::InputError;
use std::ffi::OsString;

/// Runs the command line of this process and returns its exit code. Every
/// failure is reported on stderr as the diagnostic line followed by the
/// fatal exit line.
pub fn run_from_env() -> i32 {
    helpers::init_tracing();
    match run(std::env::args_os()) {
        Ok(()) => 0,
        Err(error) => {
            let error = RatError::from(error);
            eprintln!("{}", error.diagnostic_line());
            eprintln!("{}", error.fatal_exit_line());
            error.exit_code()
        }
    }
}

/// `args` starts with the program name, as `std::env::args_os` does.
pub fn run<I, T>(args: I) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        // `--help` and `--version` arrive as errors meant for stdout.
        Err(error) if !error.use_stderr() => {
            print!("{error}");
            return Ok(());
        }
        Err(error) => return Err(CliError::Arguments(error.to_string())),
    };

    match cli.command {
        CliCommand::MakeInput(args) => commands::make_input(args),
        CliCommand::Check(args) => commands::check(args),
        CliCommand::AppendBackground(args) => commands::append_background(args),
    }
}

#[derive(Parser)]
#[command(
    name = "rat-inputs",
    version,
    about = "Translate reflectometry projects into solver inputs"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Build problem, limits, priors, checks and controls from a project
    MakeInput(commands::MakeInputArgs),
    /// Check every index of a stored problem definition
    Check(commands::CheckArgs),
    /// Join background data onto contrast data
    AppendBackground(commands::AppendBackgroundArgs),
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Rejected by the argument parser; holds clap's rendered message.
    #[error("{0}")]
    Arguments(String),
    #[error(transparent)]
    Rat(#[from] RatError),
    /// Filesystem or encoding failure outside the JSON helpers.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

impl From<InputError> for CliError {
    fn from(error: InputError) -> Self {
        Self::Rat(error.into())
    }
}

impl From<CliError> for RatError {
    fn from(error: CliError) -> Self {
        match error {
            CliError::Arguments(message) => {
                RatError::input_validation("INPUT.CLI_USAGE", message.trim_end())
            }
            CliError::Rat(error) => error,
            CliError::Io(error) => RatError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
