//! Command-line argument definitions for the bridge client.

use clap::Parser;

/// Sends one request line to a tickbridge listener.
#[derive(Parser, Debug)]
#[command(name = "tickbridge", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The request verb (for example `setcode` or `getwindows`).
    #[arg(value_name = "VERB")]
    pub(crate) verb: String,
    /// Verb arguments, sent verbatim after the verb.
    #[arg(
        value_name = "ARG",
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub(crate) arguments: Vec<String>,
}

impl Cli {
    /// Joins the verb and its arguments into a single request line.
    pub(crate) fn request_line(&self) -> String {
        let mut line = self.verb.clone();
        for argument in &self.arguments {
            line.push(' ');
            line.push_str(argument);
        }
        line
    }
}
