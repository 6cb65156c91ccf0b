use std::time::Instant;

use rayon::prelude::*;

use super::error::{Result, ensure_finite};
use super::rng::{Rng, derive_seed};
use super::types::{PercentileBand, ProjectionInputs, SimulationOptions, SimulationPercentiles};
use super::validate::{validate_inputs, validate_simulation};

const BAND_FRACTIONS: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 0.90];

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPath {
    pub net_worth: Vec<f64>,
    pub investments: Vec<f64>,
}

impl SimulatedPath {
    pub fn depleted(&self) -> bool {
        self.net_worth.iter().skip(1).any(|&value| value <= 0.0)
    }
}

pub fn simulate(
    inputs: &ProjectionInputs,
    options: &SimulationOptions,
) -> Result<SimulationPercentiles> {
    validate_inputs(inputs)?;
    validate_simulation(options)?;

    let started = Instant::now();
    let paths = (0..options.num_paths)
        .into_par_iter()
        .map(|path_id| {
            // one stream per path, so thread count never changes the draws
            let mut rng = Rng::new(derive_seed(options.seed, path_id as u64));
            simulate_path(inputs, &mut rng)
        })
        .collect::<Result<Vec<_>>>()?;

    let bands = percentile_bands(&paths, inputs.projection_years);
    let depleted = paths.iter().filter(|path| path.depleted()).count();

    log::debug!(
        "simulated {} paths over {} years in {:?}",
        options.num_paths,
        inputs.projection_years,
        started.elapsed()
    );

    Ok(SimulationPercentiles {
        num_paths: options.num_paths,
        seed: options.seed,
        depleted_share: depleted as f64 / paths.len() as f64,
        bands,
    })
}

pub fn simulate_path(inputs: &ProjectionInputs, rng: &mut Rng) -> Result<SimulatedPath> {
    let years = inputs.projection_years as usize;
    let retirement_offset = inputs.retirement_year_offset();
    let annual_contribution = inputs.annual_contribution();
    let annual_saving = inputs.annual_saving();
    let annual_debt_payment = inputs.annual_debt_payment();

    let mut cash = inputs.current_cash;
    let mut investments = inputs.current_investments;
    let mut debt = inputs.current_debt;

    let mut path = SimulatedPath {
        net_worth: Vec::with_capacity(years + 1),
        investments: Vec::with_capacity(years + 1),
    };
    path.net_worth.push(floored_net_worth(inputs, cash, investments, debt));
    path.investments.push(investments);

    for year in 1..=inputs.projection_years {
        let z = rng.standard_normal();
        let annual_return = inputs.expected_annual_return + inputs.volatility * z;

        if year <= retirement_offset {
            investments = investments * (1.0 + annual_return) + annual_contribution;
            cash += annual_saving;
        } else {
            investments *= 1.0 + annual_return;
            let withdrawal = (investments + cash) * inputs.safe_withdrawal_rate;
            investments -= withdrawal;
        }
        investments = ensure_finite(investments, year, "simulated investments")?.max(0.0);

        let payment = debt.min(annual_debt_payment);
        debt = (debt - payment).max(0.0);

        let net_worth = floored_net_worth(inputs, cash, investments, debt);
        path.net_worth.push(ensure_finite(net_worth, year, "simulated net worth")?);
        path.investments.push(investments);
    }

    Ok(path)
}

fn floored_net_worth(inputs: &ProjectionInputs, cash: f64, investments: f64, debt: f64) -> f64 {
    (cash + inputs.current_physical_assets + investments - debt).max(0.0)
}

fn percentile_bands(paths: &[SimulatedPath], projection_years: u32) -> Vec<PercentileBand> {
    (0..=projection_years)
        .into_par_iter()
        .map(|year| {
            let mut column = paths
                .iter()
                .map(|path| path.net_worth[year as usize])
                .collect::<Vec<_>>();
            column.sort_by(|a, b| a.total_cmp(b));

            let [p10, p25, p50, p75, p90] = BAND_FRACTIONS.map(|f| percentile(&column, f));
            PercentileBand {
                year,
                p10,
                p25,
                p50,
                p75,
                p90,
            }
        })
        .collect()
}

fn percentile(sorted: &[f64], fraction: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = (sorted.len() as f64 * fraction).floor() as usize;
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineError;
    use proptest::prelude::{any, prop_assert, prop_assert_eq, proptest};

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_inputs() -> ProjectionInputs {
        ProjectionInputs {
            current_cash: 20_000.0,
            current_physical_assets: 30_000.0,
            current_investments: 250_000.0,
            current_debt: 60_000.0,
            monthly_expenses: 3_500.0,
            monthly_debt_payment: 900.0,
            monthly_investment_contribution: 1_500.0,
            monthly_net_income: 7_000.0,
            expected_annual_return: 0.07,
            inflation_rate: 0.025,
            volatility: 0.15,
            projection_years: 40,
            retirement_age: 60,
            current_age: 40,
            safe_withdrawal_rate: 0.04,
        }
    }

    fn options(num_paths: u32, seed: u64) -> SimulationOptions {
        SimulationOptions { num_paths, seed }
    }

    #[test]
    fn zero_volatility_drawdown_year_matches_hand_calculation() {
        let mean = 0.06;
        let mut inputs = sample_inputs();
        inputs.current_investments = 1_000_000.0;
        inputs.current_cash = 5_000.0;
        inputs.current_physical_assets = 0.0;
        inputs.current_debt = 0.0;
        inputs.monthly_net_income = 0.0;
        inputs.monthly_debt_payment = 0.0;
        inputs.expected_annual_return = mean;
        inputs.volatility = 0.0;
        inputs.retirement_age = 40;
        inputs.current_age = 40;
        inputs.projection_years = 1;

        let grown = 1_000_000.0 * (1.0 + mean);
        let expected = grown - (grown + 5_000.0) * 0.04;

        for seed in [1, 7, 99] {
            let mut rng = Rng::new(seed);
            let path = simulate_path(&inputs, &mut rng).expect("valid inputs");
            assert_approx_tol(path.investments[1], expected, 1e-6);
            assert_approx_tol(path.net_worth[1], expected + 5_000.0, 1e-6);
        }

        let sim = simulate(&inputs, &options(50, 3)).expect("valid inputs");
        let band = sim.bands[1];
        for value in [band.p10, band.p25, band.p50, band.p75, band.p90] {
            assert_approx_tol(value, expected + 5_000.0, 1e-6);
        }
    }

    #[test]
    fn zero_volatility_accumulation_matches_deterministic_projection() {
        let mut inputs = sample_inputs();
        inputs.volatility = 0.0;
        inputs.retirement_age = 90;

        let trajectory = crate::core::project(&inputs).expect("valid inputs");
        let mut rng = Rng::new(11);
        let path = simulate_path(&inputs, &mut rng).expect("valid inputs");

        for (point, &simulated) in trajectory.points().iter().zip(&path.net_worth) {
            let expected = point.net_worth_nominal.max(0.0);
            assert_approx_tol(simulated, expected, 1e-9 * expected.max(1.0));
        }
    }

    #[test]
    fn contributions_stop_after_retirement() {
        let mut inputs = sample_inputs();
        inputs.volatility = 0.0;
        inputs.expected_annual_return = 0.0;
        inputs.safe_withdrawal_rate = 0.0;
        inputs.current_age = 40;
        inputs.retirement_age = 42;
        inputs.projection_years = 5;

        let mut rng = Rng::new(5);
        let path = simulate_path(&inputs, &mut rng).expect("valid inputs");
        assert_approx_tol(path.investments[2], 250_000.0 + 2.0 * 18_000.0, 1e-9);
        assert_approx_tol(path.investments[5], path.investments[2], 1e-9);
    }

    #[test]
    fn year_zero_band_is_the_floored_starting_net_worth() {
        let mut inputs = sample_inputs();
        inputs.current_debt = 1_000_000.0;
        let sim = simulate(&inputs, &options(20, 8)).expect("valid inputs");
        let start = sim.bands[0];
        assert_eq!(start.year, 0);
        assert_eq!(start.p10, 0.0);
        assert_eq!(start.p90, 0.0);
    }

    #[test]
    fn bands_are_ordered_and_cover_every_year() {
        let inputs = sample_inputs();
        let sim = simulate(&inputs, &options(500, 42)).expect("valid inputs");

        assert_eq!(sim.bands.len(), inputs.projection_years as usize + 1);
        for (idx, band) in sim.bands.iter().enumerate() {
            assert_eq!(band.year as usize, idx);
            assert!(band.p10 <= band.p25);
            assert!(band.p25 <= band.p50);
            assert!(band.p50 <= band.p75);
            assert!(band.p75 <= band.p90);
        }
        assert!(sim.bands[40].p90 > sim.bands[40].p10);
    }

    #[test]
    fn result_does_not_depend_on_thread_count() {
        let inputs = sample_inputs();
        let opts = options(200, 77);
        let parallel = simulate(&inputs, &opts).expect("valid inputs");
        let single = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .expect("thread pool")
            .install(|| simulate(&inputs, &opts))
            .expect("valid inputs");
        assert_eq!(parallel, single);
    }

    #[test]
    fn heavy_withdrawal_depletes_paths() {
        let mut inputs = sample_inputs();
        inputs.current_cash = 0.0;
        inputs.current_physical_assets = 0.0;
        inputs.current_debt = 0.0;
        inputs.current_investments = 100_000.0;
        inputs.expected_annual_return = -0.5;
        inputs.volatility = 0.0;
        inputs.retirement_age = 40;
        inputs.safe_withdrawal_rate = 1.0;

        let sim = simulate(&inputs, &options(10, 1)).expect("valid inputs");
        assert_eq!(sim.depleted_share, 1.0);
        assert!(sim.bands.iter().skip(1).all(|band| band.p90 == 0.0));
    }

    #[test]
    fn percentile_reads_floor_rank() {
        let sorted = (0..10).map(f64::from).collect::<Vec<_>>();
        assert_eq!(percentile(&sorted, 0.10), 1.0);
        assert_eq!(percentile(&sorted, 0.50), 5.0);
        assert_eq!(percentile(&sorted, 0.90), 9.0);
        assert_eq!(percentile(&[3.5], 0.90), 3.5);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn rejects_zero_paths() {
        let err = simulate(&sample_inputs(), &options(0, 1)).expect_err("must reject");
        assert!(matches!(
            err,
            EngineError::InvalidInput {
                field: "num_paths",
                ..
            }
        ));
    }

    #[test]
    fn surfaces_overflow_in_simulated_paths() {
        let mut inputs = sample_inputs();
        inputs.current_investments = 1e307;
        inputs.expected_annual_return = 1.0;
        inputs.volatility = 0.0;
        inputs.retirement_age = 90;
        inputs.projection_years = 20;

        let err = simulate(&inputs, &options(4, 1)).expect_err("must overflow");
        assert!(matches!(err, EngineError::NumericOverflow { .. }));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_simulated_net_worth_never_negative(
            seed in any::<u64>(),
            investments in 0u32..2_000_000,
            debt in 0u32..1_000_000,
            return_bp in -3_000i32..2_000,
            vol_bp in 0u32..8_000,
            swr_bp in 0u32..10_000,
            current_age in 20u32..70,
            retirement_gap in 0u32..30,
            years in 1u32..60
        ) {
            let mut inputs = sample_inputs();
            inputs.current_investments = investments as f64;
            inputs.current_debt = debt as f64;
            inputs.expected_annual_return = return_bp as f64 / 10_000.0;
            inputs.volatility = vol_bp as f64 / 10_000.0;
            inputs.safe_withdrawal_rate = swr_bp as f64 / 10_000.0;
            inputs.current_age = current_age;
            inputs.retirement_age = current_age + retirement_gap;
            inputs.projection_years = years;

            let mut rng = Rng::new(seed);
            let path = simulate_path(&inputs, &mut rng).expect("valid inputs");
            prop_assert_eq!(path.net_worth.len(), years as usize + 1);
            for &value in &path.net_worth {
                prop_assert!(value >= 0.0);
            }
            for &value in &path.investments {
                prop_assert!(value >= 0.0);
            }
        }

        #[test]
        fn prop_same_seed_is_bit_reproducible(
            seed in any::<u64>(),
            num_paths in 1u32..64,
            vol_bp in 0u32..4_000,
            years in 1u32..40
        ) {
            let mut inputs = sample_inputs();
            inputs.volatility = vol_bp as f64 / 10_000.0;
            inputs.projection_years = years;

            let opts = options(num_paths, seed);
            let first = simulate(&inputs, &opts).expect("valid inputs");
            let second = simulate(&inputs, &opts).expect("valid inputs");
            prop_assert_eq!(first.bands.len(), second.bands.len());
            for (a, b) in first.bands.iter().zip(&second.bands) {
                for (left, right) in [
                    (a.p10, b.p10),
                    (a.p25, b.p25),
                    (a.p50, b.p50),
                    (a.p75, b.p75),
                    (a.p90, b.p90),
                ] {
                    prop_assert_eq!(left.to_bits(), right.to_bits());
                }
            }
        }
    }
}
