use chrono::NaiveDate;

const MIN_ANNUALIZE_YEARS: f64 = 0.01;
const DAYS_PER_YEAR: f64 = 365.25;

/// `(value / cost)^(1 / years) - 1`, or `None` when the inputs cannot be annualized.
pub fn annualized_return(value: f64, cost: f64, years: f64) -> Option<f64> {
    if !value.is_finite() || !cost.is_finite() || !years.is_finite() {
        return None;
    }
    if cost <= 0.0 || years < MIN_ANNUALIZE_YEARS {
        return None;
    }

    let ratio = value / cost;
    if ratio <= 0.0 {
        return None;
    }

    let rate = ratio.powf(1.0 / years) - 1.0;
    rate.is_finite().then_some(rate)
}

pub fn years_between(start: NaiveDate, as_of: NaiveDate) -> f64 {
    let days = (as_of - start).num_days();
    if days <= 0 {
        return 0.0;
    }
    days as f64 / DAYS_PER_YEAR
}
