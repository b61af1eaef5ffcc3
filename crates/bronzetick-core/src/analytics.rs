use serde::Serialize;
use thiserror::Error;

use crate::domain::format_date;
use crate::StockBar;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("close change needs at least two bars, got {found}")]
    NotEnoughBars { found: usize },
}

/// Day-over-day change between the two most recent closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseChange {
    pub ticker: String,
    pub latest_date: String,
    pub latest_close: f64,
    pub previous_date: String,
    pub previous_close: f64,
    pub change: f64,
    /// `None` when the previous close is zero.
    pub change_pct: Option<f64>,
}

/// Bars may arrive in any order; the two latest dates are compared.
pub fn close_change(bars: &[StockBar]) -> Result<CloseChange, AnalyticsError> {
    let mut ordered: Vec<&StockBar> = bars.iter().collect();
    ordered.sort_by_key(|bar| bar.date);

    let [.., previous, latest] = ordered.as_slice() else {
        return Err(AnalyticsError::NotEnoughBars { found: bars.len() });
    };

    let change = latest.close - previous.close;
    let change_pct = (previous.close != 0.0).then(|| change / previous.close * 100.0);
    Ok(CloseChange {
        ticker: latest.ticker.to_string(),
        latest_date: format_date(latest.date),
        latest_close: latest.close,
        previous_date: format_date(previous.date),
        previous_close: previous.close,
        change,
        change_pct,
    })
}
