use super::error::{EngineError, Result};
use super::types::{MAX_NUM_PATHS, MAX_PROJECTION_YEARS, ProjectionInputs, SimulationOptions};

const PLAUSIBLE_MAX_RETURN: f64 = 0.30;
const PLAUSIBLE_MAX_VOLATILITY: f64 = 0.60;
const PLAUSIBLE_MAX_INFLATION: f64 = 0.20;
const PLAUSIBLE_MAX_YEARS: u32 = 150;

pub fn validate_inputs(inputs: &ProjectionInputs) -> Result<()> {
    for (field, value) in [
        ("current_cash", inputs.current_cash),
        ("current_physical_assets", inputs.current_physical_assets),
        ("current_investments", inputs.current_investments),
        ("current_debt", inputs.current_debt),
        ("monthly_expenses", inputs.monthly_expenses),
        ("monthly_debt_payment", inputs.monthly_debt_payment),
        (
            "monthly_investment_contribution",
            inputs.monthly_investment_contribution,
        ),
        ("monthly_net_income", inputs.monthly_net_income),
    ] {
        if !value.is_finite() {
            return Err(EngineError::invalid(field, "must be a finite number"));
        }
        if value < 0.0 {
            return Err(EngineError::invalid(field, format!("must be >= 0, got {value}")));
        }
    }

    if !(1..=MAX_PROJECTION_YEARS).contains(&inputs.projection_years) {
        return Err(EngineError::invalid(
            "projection_years",
            format!(
                "must be between 1 and {MAX_PROJECTION_YEARS}, got {}",
                inputs.projection_years
            ),
        ));
    }

    let rate = inputs.expected_annual_return;
    if !rate.is_finite() || rate <= -1.0 {
        return Err(EngineError::invalid(
            "expected_annual_return",
            format!("must be a finite fraction above -1, got {rate}"),
        ));
    }

    let inflation = inputs.inflation_rate;
    if !inflation.is_finite() || inflation <= -1.0 {
        return Err(EngineError::invalid(
            "inflation_rate",
            format!("must be a finite fraction above -1, got {inflation}"),
        ));
    }

    let volatility = inputs.volatility;
    if !volatility.is_finite() || volatility < 0.0 {
        return Err(EngineError::invalid(
            "volatility",
            format!("must be a finite fraction >= 0, got {volatility}"),
        ));
    }

    let swr = inputs.safe_withdrawal_rate;
    if !(0.0..=1.0).contains(&swr) {
        return Err(EngineError::invalid(
            "safe_withdrawal_rate",
            format!("must be between 0 and 1, got {swr}"),
        ));
    }

    Ok(())
}

pub fn validate_simulation(options: &SimulationOptions) -> Result<()> {
    if !(1..=MAX_NUM_PATHS).contains(&options.num_paths) {
        return Err(EngineError::invalid(
            "num_paths",
            format!("must be between 1 and {MAX_NUM_PATHS}, got {}", options.num_paths),
        ));
    }
    Ok(())
}

pub fn warn_degenerate(inputs: &ProjectionInputs) -> usize {
    let mut warnings = 0;
    if inputs.expected_annual_return > PLAUSIBLE_MAX_RETURN {
        log::warn!(
            "expected annual return {:.4} is far above a plausible long-run mean",
            inputs.expected_annual_return
        );
        warnings += 1;
    }
    if inputs.volatility > PLAUSIBLE_MAX_VOLATILITY {
        log::warn!(
            "volatility {:.4} is far above a plausible annual standard deviation",
            inputs.volatility
        );
        warnings += 1;
    }
    if inputs.inflation_rate > PLAUSIBLE_MAX_INFLATION {
        log::warn!("inflation rate {:.4} is unusually high", inputs.inflation_rate);
        warnings += 1;
    }
    if inputs.projection_years > PLAUSIBLE_MAX_YEARS {
        log::warn!(
            "projection horizon of {} years exceeds a human lifetime",
            inputs.projection_years
        );
        warnings += 1;
    }
    warnings
}
