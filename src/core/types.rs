use serde::Serialize;

pub const DEFAULT_MILESTONE_TARGETS: [f64; 6] = [
    100_000.0,
    250_000.0,
    500_000.0,
    1_000_000.0,
    2_000_000.0,
    5_000_000.0,
];

pub const DEFAULT_NUM_PATHS: u32 = 500;
pub const DEFAULT_SEED: u64 = 42;

pub const MAX_PROJECTION_YEARS: u32 = 1_000;
pub const MAX_NUM_PATHS: u32 = 100_000;

#[derive(Debug, Clone)]
pub struct ProjectionInputs {
    pub current_cash: f64,
    pub current_physical_assets: f64,
    pub current_investments: f64,
    pub current_debt: f64,
    pub monthly_expenses: f64,
    pub monthly_debt_payment: f64,
    pub monthly_investment_contribution: f64,
    /// Zero means the savings flow is unknown and cash does not accumulate.
    pub monthly_net_income: f64,
    pub expected_annual_return: f64,
    pub inflation_rate: f64,
    pub volatility: f64,
    pub projection_years: u32,
    pub retirement_age: u32,
    pub current_age: u32,
    pub safe_withdrawal_rate: f64,
}

impl ProjectionInputs {
    pub fn retirement_year_offset(&self) -> u32 {
        self.retirement_age.saturating_sub(self.current_age)
    }

    pub fn annual_contribution(&self) -> f64 {
        self.monthly_investment_contribution * 12.0
    }

    pub fn annual_debt_payment(&self) -> f64 {
        self.monthly_debt_payment * 12.0
    }

    pub fn annual_saving(&self) -> f64 {
        if self.monthly_net_income <= 0.0 {
            return 0.0;
        }
        let monthly_surplus = self.monthly_net_income
            - self.monthly_expenses
            - self.monthly_investment_contribution
            - self.monthly_debt_payment;
        (monthly_surplus * 12.0).max(0.0)
    }

    pub fn starting_net_worth(&self) -> f64 {
        self.current_cash + self.current_physical_assets + self.current_investments
            - self.current_debt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPoint {
    pub year: u32,
    pub net_worth_nominal: f64,
    pub net_worth_real: f64,
    pub investments_balance: f64,
    pub debt_balance: f64,
    pub cumulative_contributed: f64,
    pub cumulative_growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trajectory {
    points: Vec<YearPoint>,
}

impl Trajectory {
    pub(crate) fn from_points(points: Vec<YearPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[YearPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, year: u32) -> Option<&YearPoint> {
        self.points.get(year as usize)
    }

    pub fn last(&self) -> Option<&YearPoint> {
        self.points.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub target_net_worth: f64,
    pub year_reached: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileBand {
    pub year: u32,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPercentiles {
    pub num_paths: u32,
    pub seed: u64,
    pub depleted_share: f64,
    pub bands: Vec<PercentileBand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationOptions {
    pub num_paths: u32,
    pub seed: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            num_paths: DEFAULT_NUM_PATHS,
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub milestone_targets: Vec<f64>,
    pub simulation: Option<SimulationOptions>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            milestone_targets: DEFAULT_MILESTONE_TARGETS.to_vec(),
            simulation: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    pub trajectory: Trajectory,
    pub milestones: Vec<Milestone>,
    pub simulation: Option<SimulationPercentiles>,
}
