//! Configuration loading for the client.
//!
//! Only the leading configuration flags are handed to `ortho_config`; the
//! first token that is not one of them starts the request.

use std::ffi::{OsStr, OsString};

use tickbridge_config::{Config, OrthoConfig};

use crate::AppError;

/// Flags consumed by the configuration layer rather than sent to the bridge.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--host", "--port"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the client.
    ///
    /// Configuration flags must appear before the verb. Anything after the
    /// verb is part of the request, even when it looks like a flag.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments split into the configuration prefix and the request tokens.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ArgumentSplit {
    /// Program name followed by the configuration flags.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name followed by the request tokens.
    pub(crate) request_arguments: Vec<OsString>,
}

pub(crate) fn split_arguments(args: &[OsString]) -> ArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ArgumentSplit::default();
    };

    let mut config_arguments = vec![program.clone()];
    let mut tokens = rest.iter();
    let mut request_arguments = vec![program.clone()];
    while let Some(argument) = tokens.next() {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                if needs_value && let Some(value) = tokens.next() {
                    config_arguments.push(value.clone());
                }
            }
            FlagAction::Stop => {
                request_arguments.push(argument.clone());
                request_arguments.extend(tokens.cloned());
                break;
            }
        }
    }

    ArgumentSplit {
        config_arguments,
        request_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--port=7000", FlagAction::Include { needs_value: false })]
    #[case("--port", FlagAction::Include { needs_value: true })]
    #[case("getwindows", FlagAction::Stop)]
    #[case("--unknown", FlagAction::Stop)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[rstest]
    fn leading_flags_go_to_configuration() {
        let split = split_arguments(&os_args(&[
            "tickbridge",
            "--host",
            "0.0.0.0",
            "--port=7000",
            "setcode",
            "main",
            "--port",
        ]));
        assert_eq!(
            split.config_arguments,
            os_args(&["tickbridge", "--host", "0.0.0.0", "--port=7000"])
        );
        assert_eq!(
            split.request_arguments,
            os_args(&["tickbridge", "setcode", "main", "--port"])
        );
    }

    #[rstest]
    fn empty_arguments_split_to_nothing() {
        assert_eq!(split_arguments(&[]), ArgumentSplit::default());
    }
}
