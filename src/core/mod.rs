mod engine;
mod error;
mod projection;
mod report;
mod returns;
mod rng;
mod types;
mod validate;

pub use engine::{SimulatedPath, simulate, simulate_path};
pub use error::{EngineError, Result};
pub use projection::{detect_milestones, project};
pub use report::build_report;
pub use returns::{annualized_return, years_between};
pub use rng::{Rng, derive_seed};
pub use types::{
    DEFAULT_MILESTONE_TARGETS, DEFAULT_NUM_PATHS, DEFAULT_SEED, MAX_NUM_PATHS, MAX_PROJECTION_YEARS,
    Milestone, PercentileBand, ProjectionInputs, ProjectionReport, ReportOptions,
    SimulationOptions, SimulationPercentiles, Trajectory, YearPoint,
};
pub use validate::{validate_inputs, validate_simulation};
