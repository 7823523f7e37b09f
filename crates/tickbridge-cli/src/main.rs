//! One-shot client for a running tickbridge listener.
//!
//! The binary delegates to [`tickbridge_cli::run`], which loads the shared
//! configuration, sends the request line built from the remaining arguments
//! and prints the single response the bridge writes back.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    tickbridge_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
