//! Summary metrics: pure functions over the ordered order-event stream.
//!
//! The first event defines the starting capital and start date, the last one
//! the net asset value and end date. Invalid arithmetic is reported as
//! `UndefinedMetric`, never as a NaN or infinite value.

use serde::{Deserialize, Serialize};

use crate::domain::{Numeric, OrderEvent, Timestamp};
use crate::error::CoreError;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub period_days: i64,
    pub capital: i64,
    pub nav: i64,
    pub cagr_pct: f64,
    pub max_dd_pct: f64,
}

impl BacktestSummary {
    /// One-line header: `CAGR: 50% • MaxDD: 12% • 365 days • 2021-01-01 - 2022-01-01`.
    pub fn headline(&self) -> String {
        format!(
            "CAGR: {}% \u{2022} MaxDD: {}% \u{2022} {} days \u{2022} {} - {}",
            self.cagr_pct,
            self.max_dd_pct,
            self.period_days,
            self.start_date.date_string(),
            self.end_date.date_string(),
        )
    }
}

/// Derive the summary from the full event stream.
pub fn summarize(events: &[OrderEvent]) -> Result<BacktestSummary, CoreError> {
    let (first, last) = match (events.first(), events.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(CoreError::EmptyEventStream),
    };

    let capital = balance_amount(&first.balance, "capital")?;
    let nav = balance_amount(&last.balance, "nav")?;
    let period_days = last.time.days_since(first.time);

    Ok(BacktestSummary {
        start_date: first.time,
        end_date: last.time,
        period_days,
        capital,
        nav,
        cagr_pct: cagr_pct(capital, nav, period_days)?,
        max_dd_pct: max_drawdown_pct(events),
    })
}

/// Balance as a whole currency amount (fraction truncated).
fn balance_amount(balance: &Numeric, metric: &'static str) -> Result<i64, CoreError> {
    match balance {
        Numeric::Value { value, .. } => Ok(value.trunc() as i64),
        Numeric::Malformed(raw) => Err(CoreError::UndefinedMetric {
            metric,
            reason: format!("balance '{raw}' is not numeric"),
        }),
    }
}

/// Annualised growth in whole percent: `round(((nav / capital)^(365 / days) - 1) * 100)`.
///
/// Halves round toward positive infinity.
pub fn cagr_pct(capital: i64, nav: i64, period_days: i64) -> Result<f64, CoreError> {
    if period_days <= 0 {
        return Err(CoreError::UndefinedMetric {
            metric: "cagr",
            reason: format!("holding period is {period_days} days"),
        });
    }
    if capital <= 0 {
        return Err(CoreError::UndefinedMetric {
            metric: "cagr",
            reason: format!("starting capital is {capital}"),
        });
    }

    let growth = (nav as f64 / capital as f64).powf(DAYS_PER_YEAR / period_days as f64);
    let pct = ((growth - 1.0) * 100.0 + 0.5).floor();
    if !pct.is_finite() {
        return Err(CoreError::UndefinedMetric {
            metric: "cagr",
            reason: format!("growth from {capital} to {nav} is not representable"),
        });
    }
    Ok(pct)
}

/// Largest raw `drawdown` across the events, seeded at zero.
///
/// A left-to-right scan of the raw fields, not of the forward-filled series.
pub fn max_drawdown_pct(events: &[OrderEvent]) -> f64 {
    events
        .iter()
        .filter_map(|e| e.drawdown.value())
        .fold(0.0, |max, dd| if dd > max { dd } else { max })
}
