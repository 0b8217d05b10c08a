mod engine;
mod types;

pub use engine::{
    BONUS_BRACKETS, WAGE_BRACKETS, annual_bonus_tax, bracket_for, compute_period_tax,
    monthly_tax_curve, simulate, split_income,
};
pub use types::{
    BonusOutcome, Bracket, CurvePoint, PeriodOutcome, Schedule, SimulationResult, TaxError,
    YearState,
};
