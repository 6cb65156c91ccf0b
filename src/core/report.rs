use super::engine::simulate;
use super::error::Result;
use super::projection::{detect_milestones, project};
use super::types::{ProjectionInputs, ProjectionReport, ReportOptions};
use super::validate::{validate_inputs, validate_simulation, warn_degenerate};

pub fn build_report(
    inputs: &ProjectionInputs,
    options: &ReportOptions,
) -> Result<ProjectionReport> {
    validate_inputs(inputs)?;
    if let Some(simulation) = &options.simulation {
        validate_simulation(simulation)?;
    }
    warn_degenerate(inputs);

    let trajectory = project(inputs)?;
    let milestones = detect_milestones(&trajectory, &options.milestone_targets);
    let simulation = options
        .simulation
        .as_ref()
        .map(|simulation| simulate(inputs, simulation))
        .transpose()?;

    log::debug!(
        "built report: {} years, {} milestones, stochastic={}",
        inputs.projection_years,
        milestones.len(),
        simulation.is_some()
    );

    Ok(ProjectionReport {
        trajectory,
        milestones,
        simulation,
    })
}
