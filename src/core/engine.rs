use super::types::{
    BonusOutcome, Bracket, CurvePoint, PeriodOutcome, Schedule, SimulationResult, TaxError,
    YearState,
};

/// Annual cumulative wage-income schedule (whole yuan).
pub const WAGE_BRACKETS: [Bracket; 7] = [
    Bracket {
        upper_bound: Some(36_000.0),
        rate: 0.03,
        quick_deduction: 0.0,
    },
    Bracket {
        upper_bound: Some(144_000.0),
        rate: 0.10,
        quick_deduction: 2_520.0,
    },
    Bracket {
        upper_bound: Some(300_000.0),
        rate: 0.20,
        quick_deduction: 16_920.0,
    },
    Bracket {
        upper_bound: Some(420_000.0),
        rate: 0.25,
        quick_deduction: 31_920.0,
    },
    Bracket {
        upper_bound: Some(660_000.0),
        rate: 0.30,
        quick_deduction: 52_920.0,
    },
    Bracket {
        upper_bound: Some(960_000.0),
        rate: 0.35,
        quick_deduction: 85_920.0,
    },
    Bracket {
        upper_bound: None,
        rate: 0.45,
        quick_deduction: 181_920.0,
    },
];

/// Monthly-equivalent schedule for the separately-taxed annual bonus.
pub const BONUS_BRACKETS: [Bracket; 7] = [
    Bracket {
        upper_bound: Some(3_000.0),
        rate: 0.03,
        quick_deduction: 0.0,
    },
    Bracket {
        upper_bound: Some(12_000.0),
        rate: 0.10,
        quick_deduction: 210.0,
    },
    Bracket {
        upper_bound: Some(25_000.0),
        rate: 0.20,
        quick_deduction: 1_410.0,
    },
    Bracket {
        upper_bound: Some(35_000.0),
        rate: 0.25,
        quick_deduction: 2_660.0,
    },
    Bracket {
        upper_bound: Some(55_000.0),
        rate: 0.30,
        quick_deduction: 4_410.0,
    },
    Bracket {
        upper_bound: Some(80_000.0),
        rate: 0.35,
        quick_deduction: 7_160.0,
    },
    Bracket {
        upper_bound: None,
        rate: 0.45,
        quick_deduction: 15_160.0,
    },
];

impl Schedule {
    pub fn brackets(self) -> &'static [Bracket] {
        match self {
            Schedule::Wage => &WAGE_BRACKETS,
            Schedule::AnnualBonus => &BONUS_BRACKETS,
        }
    }
}

/// First bracket whose upper bound covers `amount`, scanning in ascending
/// order. The unbounded top row always matches, so `BracketTableExhausted`
/// is unreachable for the built-in schedules.
pub fn bracket_for(schedule: Schedule, amount: f64) -> Result<Bracket, TaxError> {
    if !(amount >= 0.0) {
        return Err(TaxError::NegativeIncome);
    }
    schedule
        .brackets()
        .iter()
        .find(|bracket| bracket.covers(amount))
        .copied()
        .ok_or(TaxError::BracketTableExhausted)
}

/// Tax due on one period's income given the year-to-date accumulator.
///
/// The whole year's tax is recomputed from cumulative income via the quick
/// deduction, then the tax already withheld is subtracted; the increment is
/// this period's liability. `period` is 1-indexed and only labels the detail
/// string.
pub fn compute_period_tax(
    income: f64,
    prior: YearState,
    period: u32,
) -> Result<PeriodOutcome, TaxError> {
    if !(income >= 0.0) {
        return Err(TaxError::NegativeIncome);
    }

    let year_income = prior.income_to_date + income;
    let bracket = bracket_for(Schedule::Wage, year_income)?;
    let year_tax = year_income * bracket.rate - bracket.quick_deduction;
    let period_tax = year_tax - prior.tax_to_date;

    let detail = format!(
        "(cumulative income to date: {:.0} + period {} income: {:.0}) * rate: {:.2} \
         - quick deduction: {:.0} - tax already withheld: {:.2} \
         = period tax: {:.2}, cumulative tax: {:.2}",
        prior.income_to_date,
        period,
        income,
        bracket.rate,
        bracket.quick_deduction,
        prior.tax_to_date,
        period_tax,
        prior.tax_to_date + period_tax,
    );

    Ok(PeriodOutcome {
        period,
        income,
        rate: bracket.rate,
        quick_deduction: bracket.quick_deduction,
        tax: period_tax,
        year_income_to_date: year_income,
        year_tax_to_date: prior.tax_to_date + period_tax,
        detail,
    })
}

/// Partition `total` into full chunks of `chunk_size` plus a final remainder
/// chunk when one is left over. The sequence always sums back to `total`.
pub fn split_income(total: f64, chunk_size: f64) -> Result<Vec<f64>, TaxError> {
    if !(chunk_size > 0.0) {
        return Err(TaxError::InvalidChunkSize);
    }
    if !(total >= 0.0) {
        return Err(TaxError::NegativeIncome);
    }

    let full_chunks = (total / chunk_size).floor();
    let mut chunks = vec![chunk_size; full_chunks as usize];
    let remainder = total - full_chunks * chunk_size;
    if remainder > 0.0 {
        chunks.push(remainder);
    }
    Ok(chunks)
}

/// Feed a sequence of period incomes through the cumulative engine, threading
/// the accumulator forward. Strictly sequential: each period's tax depends on
/// every earlier period.
pub fn simulate(incomes: &[f64]) -> Result<SimulationResult, TaxError> {
    let mut state = YearState::zero();
    let mut periods = Vec::with_capacity(incomes.len());

    for (index, &income) in incomes.iter().enumerate() {
        let outcome = compute_period_tax(income, state, index as u32 + 1)?;
        state = state.advanced(income, outcome.tax);
        periods.push(outcome);
    }

    Ok(SimulationResult {
        periods,
        total_income: state.income_to_date,
        total_tax: state.tax_to_date,
    })
}

/// One-off annual bonus taxed on its own: the rate row is picked by the
/// monthly equivalent (bonus / 12), then applied to the full bonus.
pub fn annual_bonus_tax(bonus: f64) -> Result<BonusOutcome, TaxError> {
    if !(bonus >= 0.0) {
        return Err(TaxError::NegativeIncome);
    }

    let monthly_equivalent = bonus / 12.0;
    let bracket = bracket_for(Schedule::AnnualBonus, monthly_equivalent)?;
    let tax = bonus * bracket.rate - bracket.quick_deduction;

    let detail = format!(
        "bonus: {:.0} (monthly equivalent: {:.2}) * rate: {:.2} \
         - quick deduction: {:.0} = bonus tax: {:.2}",
        bonus, monthly_equivalent, bracket.rate, bracket.quick_deduction, tax,
    );

    Ok(BonusOutcome {
        bonus,
        monthly_equivalent,
        rate: bracket.rate,
        quick_deduction: bracket.quick_deduction,
        tax,
        detail,
    })
}

/// Sample the monthly-income/tax curve over `[start, end)` at `step`
/// intervals, taxing each sample with zero prior state.
pub fn monthly_tax_curve(start: f64, end: f64, step: f64) -> Result<Vec<CurvePoint>, TaxError> {
    if !(step > 0.0) {
        return Err(TaxError::InvalidChunkSize);
    }
    if !(start >= 0.0) {
        return Err(TaxError::NegativeIncome);
    }

    let mut points = Vec::new();
    let mut income = start;
    while income < end {
        let outcome = compute_period_tax(income, YearState::zero(), 1)?;
        points.push(CurvePoint {
            income,
            tax: outcome.tax,
        });
        income += step;
    }
    Ok(points)
}
