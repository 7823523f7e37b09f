//! `tickbridged`: runs the reference sandbox host behind the bridge.
//!
//! Configuration comes from `tickbridge.toml`, `TICKBRIDGE_*` variables and
//! flags. The process exits on `SIGINT`, `SIGTERM` or an `exitgame` request.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match tickbridge::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(io::stderr(), "tickbridged: {error}");
            ExitCode::FAILURE
        }
    }
}
