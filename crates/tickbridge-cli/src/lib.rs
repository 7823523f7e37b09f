//! Runtime for the `tickbridge` client.
//!
//! The client turns its arguments into one request line, sends it to the
//! bridge over a fresh TCP connection and prints the response. Exit status
//! mirrors the response: `0` for acknowledgements and query results, `1`
//! for `ERROR:` replies and `2` when the bridge could not be reached.

mod cli;
mod config;
mod errors;
mod transport;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use tickbridge_config::Config;

use crate::cli::Cli;
use crate::config::{ConfigLoader, OrthoConfigLoader, split_arguments};
pub(crate) use crate::errors::AppError;
use crate::transport::{READ_TIMEOUT_MARGIN, exchange};

const ERROR_PREFIX: &str = "ERROR:";
const EXIT_ERROR_RESPONSE: u8 = 1;
const EXIT_CLIENT_FAILURE: u8 = 2;

/// Runs the client with the process arguments, writing the bridge response
/// to `stdout` and diagnostics to `stderr`.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_arguments(&args);

    let cli = match Cli::try_parse_from(&split.request_arguments) {
        Ok(cli) => cli,
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = write!(stdout, "{error}");
            return ExitCode::SUCCESS;
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error), None),
    };

    let config = match loader.load(&split.config_arguments) {
        Ok(config) => config,
        Err(error) => return report(stderr, &error, None),
    };

    match send(&cli, &config).and_then(|response| {
        writeln!(stdout, "{response}")
            .and_then(|()| stdout.flush())
            .map_err(AppError::ForwardResponse)
            .map(|()| response)
    }) {
        Ok(response) if response.starts_with(ERROR_PREFIX) => {
            ExitCode::from(EXIT_ERROR_RESPONSE)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => report(stderr, &error, Some(&config)),
    }
}

fn send(cli: &Cli, config: &Config) -> Result<String, AppError> {
    exchange(
        config.host(),
        config.port(),
        &cli.request_line(),
        config.query_timeout() + READ_TIMEOUT_MARGIN,
    )
}

fn report<E: Write>(stderr: &mut E, error: &AppError, config: Option<&Config>) -> ExitCode {
    let _ = writeln!(stderr, "tickbridge: {error}");
    if error.is_bridge_down()
        && let Some(config) = config
    {
        let _ = writeln!(
            stderr,
            "Is tickbridged running and listening on {}:{}?",
            config.host(),
            config.port()
        );
    }
    ExitCode::from(EXIT_CLIENT_FAILURE)
}
