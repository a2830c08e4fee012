mod browse;
mod config;

pub use browse::cmd_browse;
pub use config::{cmd_config_get, cmd_config_set, cmd_config_show};

use serde_json::Value;

use crate::cli::OutputOptions;
use crate::error::Result;

/// Pretty-print a JSON value to stdout
pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Result of a command, printable as JSON or as text
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Print in the requested format. Without text, JSON is printed either way.
    pub fn print(self, output: OutputOptions) -> Result<()> {
        match (output.json, self.text) {
            (false, Some(text)) => {
                println!("{text}");
                Ok(())
            }
            _ => print_json(&self.json),
        }
    }
}
