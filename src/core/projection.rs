use super::error::{Result, ensure_finite};
use super::types::{Milestone, ProjectionInputs, Trajectory, YearPoint};
use super::validate::validate_inputs;

struct Balances {
    cash: f64,
    investments: f64,
    debt: f64,
    cumulative_contributed: f64,
    cumulative_growth: f64,
}

/// Growth accrues on the start-of-year balance; a year's contributions compound from the next.
pub fn project(inputs: &ProjectionInputs) -> Result<Trajectory> {
    validate_inputs(inputs)?;

    let annual_contribution = inputs.annual_contribution();
    let annual_saving = inputs.annual_saving();
    let annual_debt_payment = inputs.annual_debt_payment();

    let mut balances = Balances {
        cash: inputs.current_cash,
        investments: inputs.current_investments,
        debt: inputs.current_debt,
        cumulative_contributed: 0.0,
        cumulative_growth: 0.0,
    };

    let mut points = Vec::with_capacity(inputs.projection_years as usize + 1);
    points.push(year_point(inputs, 0, &balances)?);

    for year in 1..=inputs.projection_years {
        let growth = balances.investments * inputs.expected_annual_return;
        balances.investments += growth + annual_contribution;

        balances.cash += annual_saving;

        let payment = balances.debt.min(annual_debt_payment);
        balances.debt = (balances.debt - payment).max(0.0);

        balances.cumulative_contributed += annual_contribution;
        balances.cumulative_growth += growth;

        points.push(year_point(inputs, year, &balances)?);
    }

    Ok(Trajectory::from_points(points))
}

fn year_point(inputs: &ProjectionInputs, year: u32, balances: &Balances) -> Result<YearPoint> {
    let nominal = balances.cash + inputs.current_physical_assets + balances.investments
        - balances.debt;
    let deflator = (1.0 + inputs.inflation_rate).powi(year as i32);

    Ok(YearPoint {
        year,
        net_worth_nominal: ensure_finite(nominal, year, "nominal net worth")?,
        net_worth_real: ensure_finite(nominal / deflator, year, "real net worth")?,
        investments_balance: ensure_finite(balances.investments, year, "investments")?,
        debt_balance: balances.debt,
        cumulative_contributed: ensure_finite(
            balances.cumulative_contributed,
            year,
            "cumulative contributions",
        )?,
        cumulative_growth: ensure_finite(balances.cumulative_growth, year, "cumulative growth")?,
    })
}

pub fn detect_milestones(trajectory: &Trajectory, targets: &[f64]) -> Vec<Milestone> {
    targets
        .iter()
        .map(|&target| Milestone {
            target_net_worth: target,
            year_reached: trajectory
                .points()
                .iter()
                .find(|point| point.net_worth_nominal >= target)
                .map(|point| point.year),
        })
        .collect()
}
