// crates/pf_cli/src/main.rs
//
// Exit codes, typed error mapping, logging setup, and the three subcommands:
// predict (load → verify digests → engine → prediction.json → report),
// backtest (seeded samples of a complete dataset), validate (load only).

mod args;

mod exitcodes {
    pub const OK: u8 = 0;
    pub const VALIDATION: u8 = 2;
    pub const IO: u8 = 4;
    pub const PREDICTION: u8 = 5;
}

use std::fmt;
use std::io::IsTerminal;
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use args::{parse_and_validate as parse_cli, BacktestArgs, Command, PredictArgs, Render, ValidateArgs};
use pf_core::Params;
use pf_io::canonical_json::write_canonical_file;
use pf_io::hasher::{sha256_canonical, short_hex, HashError};
use pf_io::{load_inputs, load_verify_manifest, IoError, LoadedInputs, ManifestError, ResolvedManifest};
use pf_pipeline::{backtest, PipelineError, PredictionEngine};
use pf_report::{
    backtest_model, model_from_run, render_backtest_json, render_backtest_text, render_json, render_text, ReportError,
};

const PREDICTION_FILE: &str = "prediction.json";

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum CliError {
    /// Manifest shape, params domain, digests, malformed exports.
    Validation(String),
    /// Read/write/path failures.
    Io(String),
    /// The engine could not produce a result for these inputs.
    Prediction(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Validation(_) => exitcodes::VALIDATION,
            CliError::Io(_) => exitcodes::IO,
            CliError::Prediction(_) => exitcodes::PREDICTION,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Validation(m) => write!(f, "invalid input: {m}"),
            CliError::Io(m) => write!(f, "i/o: {m}"),
            CliError::Prediction(m) => write!(f, "prediction failed: {m}"),
        }
    }
}

impl std::error::Error for CliError {}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("pf: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION);
        }
    };

    if let Err(e) = init_logging(&args.log) {
        eprintln!("pf: error: invalid --log directive {:?}: {e}", args.log);
        return ExitCode::from(exitcodes::VALIDATION);
    }

    let result = match &args.command {
        Command::Predict(a) => run_predict(a),
        Command::Backtest(a) => run_backtest(a),
        Command::Validate(a) => run_validate(a),
    };

    match result {
        Ok(()) => ExitCode::from(exitcodes::OK),
        Err(e) => {
            eprintln!("pf: error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_logging(directive: &str) -> Result<(), tracing_subscriber::filter::ParseError> {
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
    Ok(())
}

// ---------------------------- error mapping ----------------------------

fn map_manifest_err(e: ManifestError) -> CliError {
    match e {
        ManifestError::Io(..) | ManifestError::NotAFile(..) => CliError::Io(e.to_string()),
        other => CliError::Validation(other.to_string()),
    }
}

fn map_io_err(e: IoError) -> CliError {
    match e {
        IoError::Path(_) | IoError::Hash(HashError::Io(_)) => CliError::Io(e.to_string()),
        IoError::Manifest(m) => map_manifest_err(m),
        IoError::Json(_) | IoError::Csv { .. } | IoError::Dataset { .. } | IoError::Hash(_) => {
            CliError::Validation(e.to_string())
        }
    }
}

fn map_pipeline_err(e: PipelineError) -> CliError {
    match e {
        PipelineError::Params(_) => CliError::Validation(e.to_string()),
        other => CliError::Prediction(other.to_string()),
    }
}

fn map_report_err(e: ReportError) -> CliError {
    CliError::Validation(e.to_string())
}

// ---------------------------- shared loading ----------------------------

struct Prepared {
    resolved: ResolvedManifest,
    inputs: LoadedInputs,
    engine: PredictionEngine,
}

impl Prepared {
    fn title(&self) -> String {
        self.resolved.id.clone().unwrap_or_else(|| self.resolved.current.name.clone())
    }

    fn params(&self) -> &Params {
        self.engine.params()
    }
}

fn prepare(manifest: &std::path::Path, no_participation: bool) -> Result<Prepared, CliError> {
    let resolved = load_verify_manifest(manifest).map_err(map_manifest_err)?;

    let mut params = resolved.params.clone();
    if no_participation {
        params.participation_term = false;
    }
    let engine = PredictionEngine::new(params).map_err(map_pipeline_err)?;
    let inputs = load_inputs(&resolved).map_err(map_io_err)?;

    info!(
        manifest = %manifest.display(),
        historical = inputs.historical.len(),
        current = %inputs.current.name(),
        observed_units = inputs.current.len(),
        "inputs loaded"
    );
    Ok(Prepared { resolved, inputs, engine })
}

fn print_json(v: &serde_json::Value) -> Result<(), CliError> {
    let s = serde_json::to_string_pretty(v).map_err(|e| CliError::Io(e.to_string()))?;
    println!("{s}");
    Ok(())
}

// ---------------------------- subcommands ----------------------------

fn run_predict(a: &PredictArgs) -> Result<(), CliError> {
    let p = prepare(&a.manifest, a.no_participation)?;

    let run = p
        .engine
        .predict_detailed(&p.inputs.historical, &p.inputs.current)
        .map_err(map_pipeline_err)?;
    for d in &run.datasets {
        info!(
            dataset = %d.name,
            observed = d.observed_units,
            projected = d.projected_units,
            rules = ?d.rules_used,
            "dataset predicted"
        );
    }

    let model = model_from_run(
        &p.title(),
        p.inputs.current.name(),
        &run,
        &p.resolved.option_names,
        &p.inputs.digests,
        p.params(),
    )
    .map_err(map_report_err)?;
    let json = render_json(&model);

    let out = a.out.join(PREDICTION_FILE);
    write_canonical_file(&out, &json).map_err(map_io_err)?;
    // same canonical bytes as the file
    let digest = sha256_canonical(&json).map_err(|e| map_io_err(e.into()))?;
    let short = short_hex(&digest, 12).map_err(|e| map_io_err(e.into()))?;
    info!(path = %out.display(), sha256 = %short, "prediction written");

    if a.quiet {
        return Ok(());
    }
    for r in &a.render {
        match r {
            Render::Text => print!("{}", render_text(&model)),
            Render::Json => print_json(&json)?,
        }
    }
    Ok(())
}

fn run_backtest(a: &BacktestArgs) -> Result<(), CliError> {
    let p = prepare(&a.manifest, a.no_participation)?;

    let report = backtest(&p.engine, &p.inputs.historical, &p.inputs.current, &a.fractions, a.seed)
        .map_err(map_pipeline_err)?;
    for c in &report.cases {
        info!(fraction = c.fraction, sampled_units = c.sampled_units, error = c.error, "backtest sample scored");
    }

    let model = backtest_model(&p.title(), &report, &p.resolved.option_names).map_err(map_report_err)?;
    match a.render {
        Render::Text => print!("{}", render_backtest_text(&model)),
        Render::Json => print_json(&render_backtest_json(&model))?,
    }
    Ok(())
}

fn run_validate(a: &ValidateArgs) -> Result<(), CliError> {
    let p = prepare(&a.manifest, false)?;
    if !a.quiet {
        let historical_units: usize = p.inputs.historical.iter().map(|d| d.len()).sum();
        println!(
            "inputs OK: {} historical dataset(s), {} historical units, {} observed units",
            p.inputs.historical.len(),
            historical_units,
            p.inputs.current.len()
        );
    }
    Ok(())
}
