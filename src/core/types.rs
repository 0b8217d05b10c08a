use std::fmt;

use serde::Serialize;

/// Which bracket table a lookup runs against. Wage withholding uses annual
/// cumulative thresholds; the one-off annual bonus uses the monthly-equivalent
/// table from the 2018 transition notice.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Schedule {
    Wage,
    AnnualBonus,
}

/// One row of a progressive schedule. `upper_bound` is inclusive; `None`
/// marks the unbounded top bracket. The quick deduction is the precomputed
/// constant that makes `income * rate - quick_deduction` equal the exact
/// bracket-by-bracket sum, so cumulative tax stays continuous at boundaries.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bracket {
    pub upper_bound: Option<f64>,
    pub rate: f64,
    pub quick_deduction: f64,
}

impl Bracket {
    pub fn covers(&self, amount: f64) -> bool {
        match self.upper_bound {
            Some(bound) => amount <= bound,
            None => true,
        }
    }
}

/// Year-to-date accumulator threaded through the simulator. Replaces the
/// original's caller-managed running variables with an explicit value that is
/// returned and passed forward.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct YearState {
    pub income_to_date: f64,
    pub tax_to_date: f64,
}

impl YearState {
    pub fn zero() -> Self {
        Self {
            income_to_date: 0.0,
            tax_to_date: 0.0,
        }
    }

    pub fn advanced(self, income: f64, tax: f64) -> Self {
        Self {
            income_to_date: self.income_to_date + income,
            tax_to_date: self.tax_to_date + tax,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodOutcome {
    pub period: u32,
    pub income: f64,
    pub rate: f64,
    pub quick_deduction: f64,
    pub tax: f64,
    pub year_income_to_date: f64,
    pub year_tax_to_date: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub periods: Vec<PeriodOutcome>,
    pub total_income: f64,
    pub total_tax: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusOutcome {
    pub bonus: f64,
    pub monthly_equivalent: f64,
    pub rate: f64,
    pub quick_deduction: f64,
    pub tax: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub income: f64,
    pub tax: f64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TaxError {
    InvalidChunkSize,
    NegativeIncome,
    BracketTableExhausted,
}

impl fmt::Display for TaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxError::InvalidChunkSize => write!(f, "chunk size must be > 0"),
            TaxError::NegativeIncome => write!(f, "income amounts must be >= 0"),
            TaxError::BracketTableExhausted => {
                write!(f, "no bracket covers the requested amount")
            }
        }
    }
}

impl std::error::Error for TaxError {}
