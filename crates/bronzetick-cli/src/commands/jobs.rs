use std::sync::Arc;

use bronzetick_core::{
    parse_date, today_utc, AppConfig, ChatSentimentClassifier, ClassifierConfig, Company,
    DateWindow, FinnhubInsiderAdapter, InsiderJob, JobOutcome, JobReport, LabelSet, NewsApiAdapter,
    NewsJob, Period, StocksJob, YahooChartAdapter,
};
use time::{Date, Duration};

use crate::cli::{InsiderArgs, NewsArgs, StocksArgs};
use crate::error::CliError;
use crate::output::CommandOutput;

use super::{http_client, job_sink, resolve_tickers};

pub async fn stocks(args: &StocksArgs, config: &AppConfig) -> Result<CommandOutput, CliError> {
    let tickers = resolve_tickers(args.tickers.as_deref(), config)?;
    let period = Period::parse(&args.period)?;

    let source = Arc::new(YahooChartAdapter::with_http_client(http_client()));
    let job =
        StocksJob::new(source, job_sink(config, args.no_store), config.pacing).with_period(period);
    let report = job.run(&tickers).await?;
    report_output("stocks", &report)
}

pub async fn news(args: &NewsArgs, config: &AppConfig) -> Result<CommandOutput, CliError> {
    let companies = match args.companies.as_deref() {
        Some(list) => Company::parse_list(list)?,
        None => config.companies(),
    };
    if companies.is_empty() {
        return Err(CliError::Command(String::from("no companies to process")));
    }

    let classifier_config = classifier_config(args, config)?;
    let fallback_label = classifier_config.fallback_label.clone();
    let lookback_days = args.lookback_days.unwrap_or(config.news.lookback_days);
    let from = days_before(today_utc(), lookback_days)?;

    let client = http_client();
    let source = Arc::new(NewsApiAdapter::new(Arc::clone(&client), config.news.clone())?);
    let classifier = Arc::new(ChatSentimentClassifier::new(client, classifier_config)?);
    let job = NewsJob::new(
        source,
        classifier,
        fallback_label,
        job_sink(config, args.no_store),
        config.pacing,
        from,
    );
    let report = job.run(&companies).await?;
    report_output("news", &report)
}

pub async fn insider(args: &InsiderArgs, config: &AppConfig) -> Result<CommandOutput, CliError> {
    let tickers = resolve_tickers(args.tickers.as_deref(), config)?;
    let window = insider_window(args.from.as_deref(), args.to.as_deref(), today_utc())?;

    let source = Arc::new(FinnhubInsiderAdapter::new(http_client(), config.finnhub.clone())?);
    let job = InsiderJob::new(source, job_sink(config, args.no_store), config.pacing, window);
    let report = job.run(&tickers).await?;
    report_output("insider", &report)
}

/// Label flags override the configured classifier settings.
fn classifier_config(args: &NewsArgs, config: &AppConfig) -> Result<ClassifierConfig, CliError> {
    let mut classifier = config.classifier.clone();
    if let Some(labels) = args.labels.as_deref() {
        classifier.labels = LabelSet::parse(labels)?;
    }
    let fallback = args
        .fallback_label
        .as_deref()
        .unwrap_or(classifier.fallback_label.as_str())
        .to_string();
    classifier.fallback_label = classifier.labels.fallback(&fallback)?;
    Ok(classifier)
}

fn days_before(day: Date, days: u16) -> Result<Date, CliError> {
    day.checked_sub(Duration::days(i64::from(days)))
        .ok_or_else(|| CliError::Command(format!("lookback of {days} days is out of range")))
}

/// Defaults to yesterday; `to` defaults to `from`.
fn insider_window(from: Option<&str>, to: Option<&str>, today: Date) -> Result<DateWindow, CliError> {
    let from = match from {
        Some(raw) => parse_date(raw)?,
        None => days_before(today, 1)?,
    };
    let to = match to {
        Some(raw) => parse_date(raw)?,
        None => from,
    };
    Ok(DateWindow::new(from, to)?)
}

fn report_output(command: &'static str, report: &JobReport) -> Result<CommandOutput, CliError> {
    let mut warnings: Vec<String> = report
        .failures
        .iter()
        .map(|failure| format!("{}: {} ({})", failure.entity, failure.message, failure.code))
        .collect();
    warnings.extend(report.warnings.iter().cloned());
    if let JobOutcome::FellBack {
        path, store_error, ..
    } = &report.outcome
    {
        warnings.push(format!(
            "store write failed ({store_error}); rows written to {}",
            path.display()
        ));
    }

    Ok(CommandOutput::ok(command, serde_json::to_value(report)?)
        .with_warnings(warnings)
        .with_failures(report.failures.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn insider_window_defaults_to_yesterday() {
        let window = insider_window(None, None, date!(2024 - 03 - 01)).expect("window");
        assert_eq!(window.from, date!(2024 - 02 - 29));
        assert_eq!(window.to, date!(2024 - 02 - 29));

        let explicit = insider_window(Some("2024-01-01"), Some("2024-01-31"), date!(2024 - 03 - 01))
            .expect("window");
        assert_eq!(explicit.to, date!(2024 - 01 - 31));

        assert!(
            insider_window(Some("2024-02-01"), Some("2024-01-01"), date!(2024 - 03 - 01)).is_err()
        );
    }

    #[test]
    fn label_flags_override_configuration() {
        let config = AppConfig::from_lookup(|_| None).expect("config");
        let args = NewsArgs {
            companies: None,
            lookback_days: None,
            labels: Some(String::from("good,bad")),
            fallback_label: Some(String::from("unknown")),
            no_store: true,
        };

        let classifier = classifier_config(&args, &config).expect("classifier");
        assert_eq!(classifier.labels, LabelSet::two_way());
        assert_eq!(classifier.fallback_label.as_str(), "unknown");
    }
}
