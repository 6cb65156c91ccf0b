use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, error::ErrorKind};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    DEFAULT_MILESTONE_TARGETS, DEFAULT_NUM_PATHS, DEFAULT_SEED, EngineError, MAX_NUM_PATHS,
    ProjectionInputs, ReportOptions, SimulationOptions, build_report, validate_inputs,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MilestoneList {
    List(Vec<f64>),
    Csv(String),
}

impl MilestoneList {
    fn into_targets(self) -> Result<Vec<f64>, String> {
        match self {
            MilestoneList::List(values) => Ok(values),
            MilestoneList::Csv(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse::<f64>()
                        .map_err(|_| format!("milestones: `{part}` is not a number"))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    current_cash: Option<f64>,
    current_physical_assets: Option<f64>,
    current_investments: Option<f64>,
    current_debt: Option<f64>,

    monthly_expenses: Option<f64>,
    monthly_debt_payment: Option<f64>,
    monthly_investment_contribution: Option<f64>,
    monthly_net_income: Option<f64>,

    expected_return: Option<f64>,
    inflation_rate: Option<f64>,
    volatility: Option<f64>,
    withdrawal_rate: Option<f64>,

    projection_years: Option<u32>,
    current_age: Option<u32>,
    retirement_age: Option<u32>,

    simulate: Option<bool>,
    paths: Option<u32>,
    seed: Option<u64>,
    milestones: Option<MilestoneList>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nestegg project",
    about = "Deterministic net-worth projection with optional Monte Carlo fan chart"
)]
struct Cli {
    #[arg(long, default_value_t = 0.0)]
    current_cash: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Property, vehicles and other assets held at constant value"
    )]
    current_physical_assets: f64,
    #[arg(long)]
    current_investments: f64,
    #[arg(long, default_value_t = 0.0)]
    current_debt: f64,
    #[arg(long, default_value_t = 0.0)]
    monthly_expenses: f64,
    #[arg(long, default_value_t = 0.0)]
    monthly_debt_payment: f64,
    #[arg(long, default_value_t = 0.0)]
    monthly_investment_contribution: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly take-home pay; 0 ignores the savings flow into cash"
    )]
    monthly_net_income: f64,
    #[arg(long, help = "Expected annual investment return in percent, e.g. 7")]
    expected_return: f64,
    #[arg(
        long,
        default_value_t = 2.5,
        help = "Expected annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 15.0,
        help = "Annual return volatility (standard deviation) in percent"
    )]
    volatility: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Share of investments plus cash withdrawn each year after retirement, in percent"
    )]
    withdrawal_rate: f64,
    #[arg(long, default_value_t = 30)]
    projection_years: u32,
    #[arg(long)]
    current_age: u32,
    #[arg(long)]
    retirement_age: u32,
    #[arg(long, help = "Also run the Monte Carlo simulation")]
    simulate: bool,
    #[arg(long, default_value_t = DEFAULT_NUM_PATHS)]
    paths: u32,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    #[arg(
        long = "milestone",
        help = "Net-worth target to track; repeatable, defaults to 100k/250k/500k/1M/2M/5M"
    )]
    milestones: Vec<f64>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: ProjectionInputs,
    options: ReportOptions,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: &Cli) -> Result<ProjectionInputs, String> {
    let inputs = ProjectionInputs {
        current_cash: cli.current_cash,
        current_physical_assets: cli.current_physical_assets,
        current_investments: cli.current_investments,
        current_debt: cli.current_debt,
        monthly_expenses: cli.monthly_expenses,
        monthly_debt_payment: cli.monthly_debt_payment,
        monthly_investment_contribution: cli.monthly_investment_contribution,
        monthly_net_income: cli.monthly_net_income,
        expected_annual_return: cli.expected_return / 100.0,
        inflation_rate: cli.inflation_rate / 100.0,
        volatility: cli.volatility / 100.0,
        projection_years: cli.projection_years,
        retirement_age: cli.retirement_age,
        current_age: cli.current_age,
        safe_withdrawal_rate: cli.withdrawal_rate / 100.0,
    };
    validate_inputs(&inputs).map_err(|e| e.to_string())?;
    Ok(inputs)
}

fn build_options(cli: &Cli) -> Result<ReportOptions, String> {
    if cli.simulate && !(1..=MAX_NUM_PATHS).contains(&cli.paths) {
        return Err(format!(
            "--paths must be between 1 and {MAX_NUM_PATHS}, got {}",
            cli.paths
        ));
    }
    if let Some(bad) = cli.milestones.iter().find(|t| !t.is_finite() || **t <= 0.0) {
        return Err(format!("--milestone must be a positive amount, got {bad}"));
    }

    let milestone_targets = if cli.milestones.is_empty() {
        DEFAULT_MILESTONE_TARGETS.to_vec()
    } else {
        cli.milestones.clone()
    };
    let simulation = cli.simulate.then_some(SimulationOptions {
        num_paths: cli.paths,
        seed: cli.seed,
    });

    Ok(ReportOptions {
        milestone_targets,
        simulation,
    })
}

fn build_request(cli: &Cli) -> Result<ApiRequest, String> {
    Ok(ApiRequest {
        inputs: build_inputs(cli)?,
        options: build_options(cli)?,
    })
}

pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return Ok(e.to_string());
        }
        Err(e) => return Err(e.to_string()),
    };

    let request = build_request(&cli)?;
    let report = build_report(&request.inputs, &request.options).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&report).map_err(|e| format!("failed to encode report: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("projection API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    // rayon fans the paths out; keep that work off the async executor
    let outcome =
        tokio::task::spawn_blocking(move || build_report(&request.inputs, &request.options)).await;

    match outcome {
        Ok(Ok(report)) => json_response(StatusCode::OK, report),
        Ok(Err(err)) => error_response(status_for(&err), &err.to_string()),
        Err(join_err) => {
            log::error!("projection worker failed: {join_err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Projection failed")
        }
    }
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        EngineError::NumericOverflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_cash {
        cli.current_cash = v;
    }
    if let Some(v) = payload.current_physical_assets {
        cli.current_physical_assets = v;
    }
    if let Some(v) = payload.current_investments {
        cli.current_investments = v;
    }
    if let Some(v) = payload.current_debt {
        cli.current_debt = v;
    }

    if let Some(v) = payload.monthly_expenses {
        cli.monthly_expenses = v;
    }
    if let Some(v) = payload.monthly_debt_payment {
        cli.monthly_debt_payment = v;
    }
    if let Some(v) = payload.monthly_investment_contribution {
        cli.monthly_investment_contribution = v;
    }
    if let Some(v) = payload.monthly_net_income {
        cli.monthly_net_income = v;
    }

    if let Some(v) = payload.expected_return {
        cli.expected_return = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.volatility {
        cli.volatility = v;
    }
    if let Some(v) = payload.withdrawal_rate {
        cli.withdrawal_rate = v;
    }

    if let Some(v) = payload.projection_years {
        cli.projection_years = v;
    }
    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }

    if let Some(v) = payload.simulate {
        cli.simulate = v;
    }
    if let Some(v) = payload.paths {
        cli.paths = v;
    }
    if let Some(v) = payload.seed {
        cli.seed = v;
    }
    if let Some(v) = payload.milestones {
        cli.milestones = v.into_targets()?;
    }

    build_request(&cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_cash: 10_000.0,
        current_physical_assets: 0.0,
        current_investments: 100_000.0,
        current_debt: 0.0,
        monthly_expenses: 2_500.0,
        monthly_debt_payment: 0.0,
        monthly_investment_contribution: 1_000.0,
        monthly_net_income: 4_500.0,
        expected_return: 7.0,
        inflation_rate: 2.5,
        volatility: 15.0,
        withdrawal_rate: 4.0,
        projection_years: 30,
        current_age: 35,
        retirement_age: 65,
        simulate: false,
        paths: DEFAULT_NUM_PATHS,
        seed: DEFAULT_SEED,
        milestones: Vec::new(),
    }
}
