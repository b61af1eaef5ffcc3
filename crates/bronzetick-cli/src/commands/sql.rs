use bronzetick_core::{AppConfig, QueryGuardrails};

use crate::cli::SqlArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

use super::open_store;

pub fn run(args: &SqlArgs, config: &AppConfig) -> Result<CommandOutput, CliError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let warehouse = open_store(config)?;
    let guardrails = QueryGuardrails {
        max_rows: args.max_rows,
        query_timeout_ms: args.query_timeout_ms,
    };
    let result = warehouse.execute_query(query, guardrails, args.write)?;

    let truncated = result.truncated;
    let row_count = result.row_count;
    let mut output = CommandOutput::ok("sql", serde_json::to_value(result)?);
    if truncated {
        output = output.with_warning(format!(
            "result truncated at {row_count} rows (use --max-rows to increase limit)"
        ));
    }
    Ok(output)
}
