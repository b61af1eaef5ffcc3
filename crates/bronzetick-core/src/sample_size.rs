//! A/B-test sample size for comparing two conversion rates.
//!
//! Effect size is Cohen's h. The per-variant size solves the two-sided power
//! equation for two independent, equally sized samples:
//!
//! ```text
//! power = Φ(|h|·√(n/2) − z) + Φ(−|h|·√(n/2) − z),  z = Φ⁻¹(1 − α/2)
//! ```
//!
//! The closed form `2·((z + Φ⁻¹(power)) / h)²` ignores the second term, so it
//! always overshoots slightly and serves as the upper bracket for bisection.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::ValidationError;

const MAX_BISECTION_STEPS: usize = 200;
const MAX_BRACKET_DOUBLINGS: usize = 64;

#[derive(Debug, Error)]
pub enum SampleSizeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("sample size could not be solved: {0}")]
    Numeric(String),
}

/// Calculator inputs, all in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSizeInputs {
    /// Conversion rate of the control variant.
    pub baseline_pct: f64,
    /// Minimum detectable effect relative to the baseline.
    pub lift_pct: f64,
    pub confidence_pct: f64,
    pub power_pct: f64,
}

impl SampleSizeInputs {
    pub fn new(
        baseline_pct: f64,
        lift_pct: f64,
        confidence_pct: f64,
        power_pct: f64,
    ) -> Result<Self, ValidationError> {
        let inputs = Self {
            baseline_pct,
            lift_pct,
            confidence_pct,
            power_pct,
        };
        inputs.validate()?;
        Ok(inputs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        open_percent("baseline", self.baseline_pct)?;
        finite("lift", self.lift_pct)?;
        if self.lift_pct <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "lift",
                value: self.lift_pct,
                expected: "greater than 0",
            });
        }
        if self.target_rate() >= 1.0 {
            return Err(ValidationError::OutOfRange {
                field: "lift",
                value: self.lift_pct,
                expected: "small enough to keep the target rate below 100%",
            });
        }
        open_percent("confidence", self.confidence_pct)?;
        open_percent("power", self.power_pct)?;
        Ok(())
    }

    pub fn baseline_rate(&self) -> f64 {
        self.baseline_pct / 100.0
    }

    /// Baseline raised by the relative lift.
    pub fn target_rate(&self) -> f64 {
        self.baseline_rate() * (1.0 + self.lift_pct / 100.0)
    }
}

fn finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFiniteValue { field })
    }
}

fn open_percent(field: &'static str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value <= 0.0 || value >= 100.0 {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            expected: "strictly between 0 and 100",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSizeResult {
    pub inputs: SampleSizeInputs,
    pub baseline_rate: f64,
    pub target_rate: f64,
    /// Cohen's h; negative when the target rate is above the baseline.
    pub effect_size: f64,
    pub alpha: f64,
    /// Unrounded solution of the power equation.
    pub exact_per_variant: f64,
    pub per_variant: u64,
    pub total: u64,
}

/// Cohen's h between two proportions.
pub fn cohens_h(p1: f64, p2: f64) -> f64 {
    2.0 * p1.sqrt().asin() - 2.0 * p2.sqrt().asin()
}

pub fn required_sample_size(inputs: &SampleSizeInputs) -> Result<SampleSizeResult, SampleSizeError> {
    inputs.validate()?;

    let standard = Normal::new(0.0, 1.0).map_err(|e| SampleSizeError::Numeric(e.to_string()))?;
    let baseline_rate = inputs.baseline_rate();
    let target_rate = inputs.target_rate();
    let effect_size = cohens_h(baseline_rate, target_rate);
    let alpha = 1.0 - inputs.confidence_pct / 100.0;
    let power = inputs.power_pct / 100.0;
    let z_alpha = standard.inverse_cdf(1.0 - alpha / 2.0);
    let z_power = standard.inverse_cdf(power);

    let magnitude = effect_size.abs();
    if magnitude == 0.0 || !magnitude.is_finite() {
        return Err(SampleSizeError::Numeric(String::from(
            "effect size is zero at this precision",
        )));
    }

    let shortfall = |n: f64| {
        let shift = magnitude * (n / 2.0).sqrt();
        standard.cdf(shift - z_alpha) + standard.cdf(-shift - z_alpha) - power
    };

    let exact = if shortfall(0.0) >= 0.0 {
        // Any sample reaches this power; the test is no stronger than alpha.
        0.0
    } else {
        let mut low = 0.0;
        let mut high = (2.0 * ((z_alpha + z_power) / magnitude).powi(2)).max(1.0);
        let mut doublings = 0;
        while shortfall(high) < 0.0 {
            low = high;
            high *= 2.0;
            doublings += 1;
            if doublings > MAX_BRACKET_DOUBLINGS || !high.is_finite() {
                return Err(SampleSizeError::Numeric(String::from(
                    "power equation has no bracketed solution",
                )));
            }
        }

        for _ in 0..MAX_BISECTION_STEPS {
            let mid = (low + high) / 2.0;
            if shortfall(mid) < 0.0 {
                low = mid;
            } else {
                high = mid;
            }
            if high - low <= f64::EPSILON * high {
                break;
            }
        }
        (low + high) / 2.0
    };

    let per_variant = (exact.ceil() as u64).max(1);
    Ok(SampleSizeResult {
        inputs: *inputs,
        baseline_rate,
        target_rate,
        effect_size,
        alpha,
        exact_per_variant: exact,
        per_variant,
        total: per_variant * 2,
    })
}
