use std::io::{self, BufRead, Write};

use bronzetick_core::{required_sample_size, SampleSizeInputs};

use crate::cli::SampleSizeArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

/// Prompts go to stderr; the result is the only thing on stdout.
pub fn run(args: &SampleSizeArgs) -> Result<CommandOutput, CliError> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut prompts = io::stderr();

    let inputs = collect_inputs(args, &mut input, &mut prompts)?;
    let result = required_sample_size(&inputs)?;
    Ok(CommandOutput::ok("sample-size", serde_json::to_value(result)?))
}

fn collect_inputs<R: BufRead, W: Write>(
    args: &SampleSizeArgs,
    input: &mut R,
    prompts: &mut W,
) -> Result<SampleSizeInputs, CliError> {
    let mut value = |given: Option<f64>, label: &str| match given {
        Some(value) => Ok(value),
        None => prompt_percent(label, input, prompts),
    };

    let baseline = value(args.baseline, "Baseline conversion rate (%)")?;
    let lift = value(args.lift, "Minimum detectable lift (%)")?;
    let confidence = value(args.confidence, "Confidence level (%)")?;
    let power = value(args.power, "Statistical power (%)")?;
    Ok(SampleSizeInputs::new(baseline, lift, confidence, power)?)
}

/// Ask until the answer parses as a finite number. A trailing `%` is allowed.
fn prompt_percent<R: BufRead, W: Write>(
    label: &str,
    input: &mut R,
    prompts: &mut W,
) -> Result<f64, CliError> {
    loop {
        write!(prompts, "{label}: ")?;
        prompts.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(CliError::Command(format!("no value given for {label}")));
        }
        match parse_percent(&line) {
            Some(value) => return Ok(value),
            None => writeln!(prompts, "error: '{}' is not a number, try again", line.trim())?,
        }
    }
}

fn parse_percent(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
