use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// What a command prints on stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandOutput {
    pub command: &'static str,
    pub data: Value,
    pub warnings: Vec<String>,
    /// Entity failures reported by a job; drives `--strict`.
    #[serde(skip)]
    pub failure_count: usize,
}

impl CommandOutput {
    pub fn ok(command: &'static str, data: Value) -> Self {
        Self {
            command,
            data,
            warnings: Vec::new(),
            failure_count: 0,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_failures(mut self, failure_count: usize) -> Self {
        self.failure_count = failure_count;
        self
    }
}

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(output)?
            } else {
                serde_json::to_string(output)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => {
            for line in table_lines(output)? {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn table_lines(output: &CommandOutput) -> Result<Vec<String>, CliError> {
    let mut lines = vec![format!("command : {}", output.command)];
    if !output.warnings.is_empty() {
        lines.push(String::from("warnings:"));
        lines.extend(output.warnings.iter().map(|warning| format!("  - {warning}")));
    }
    lines.push(String::from("data:"));
    let pretty_data = serde_json::to_string_pretty(&output.data)?;
    lines.extend(pretty_data.lines().map(|line| format!("  {line}")));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_output_omits_failure_count() {
        let output = CommandOutput::ok("check", json!({"version": "v1.2.2"})).with_failures(3);
        let value = serde_json::to_value(&output).expect("json");
        assert_eq!(value["command"], "check");
        assert!(value.get("failure_count").is_none());
    }

    #[test]
    fn table_lists_warnings_before_data() {
        let output = CommandOutput::ok("news", json!({"fetched": 2})).with_warning("Apple: fallback");
        let lines = table_lines(&output).expect("lines");
        assert_eq!(lines[0], "command : news");
        assert_eq!(lines[1], "warnings:");
        assert_eq!(lines[2], "  - Apple: fallback");
        assert_eq!(lines[3], "data:");
    }
}
