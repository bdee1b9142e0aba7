//! Cardiorisk: Heart disease screening
//!
//! Command-line front end. Reads one clinical observation as JSON (from a
//! file argument or stdin) and prints the risk assessment as JSON.

use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardiorisk::adapters::artifact::ArtifactLoader;
use cardiorisk::adapters::sanitize::SanitizingMakeWriter;
use cardiorisk::config::{LogMode, Settings};
use cardiorisk::{AssessmentError, ModelGateway, RiskAssessment, RiskDecisionService};

/// Assessment plus the banner text for its label.
#[derive(Serialize)]
struct Report<'a> {
    headline: &'static str,
    guidance: &'static str,
    #[serde(flatten)]
    assessment: &'a RiskAssessment,
}

fn init_logging(settings: &Settings) -> Result<WorkerGuard> {
    let (writer, guard) = match settings.log_mode {
        LogMode::File => {
            if let Some(parent) = settings.log_file.parent() {
                // Best-effort: don't fail startup just because the directory is missing.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&settings.log_file)
                .with_context(|| format!("opening log file {:?}", settings.log_file))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(
                    SanitizingMakeWriter::new(writer).with_max_bytes(settings.sanitize_max_bytes),
                ),
        )
        .init();

    Ok(guard)
}

fn read_input(path: Option<&str>) -> Result<String> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {p}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading observation from stdin")?;
            buf
        }
    };
    Ok(text)
}

fn exit_code(err: &AssessmentError) -> ExitCode {
    match err {
        AssessmentError::Validation(_) => ExitCode::from(2),
        AssessmentError::Unavailable(_) | AssessmentError::ModelContractViolation { .. } => {
            ExitCode::from(3)
        }
    }
}

fn main() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") || args.len() > 1 {
        eprintln!("Usage: cardiorisk [OBSERVATION.json]  (reads stdin when omitted)");
        return Ok(ExitCode::from(64));
    }

    let settings = Settings::from_env()?;
    let _guard = init_logging(&settings)?;

    tracing::info!("Starting cardiorisk...");
    for warning in &settings.warnings {
        tracing::warn!("{warning}");
    }

    let loader = ArtifactLoader::from_settings(&settings)?;
    tracing::info!("Model directory: {:?}", loader.model_dir());
    let service = RiskDecisionService::new(ModelGateway::new(loader));
    if !service.prediction_enabled() {
        eprintln!("Prediction disabled: the model artifact could not be loaded (see log).");
    }

    let text = read_input(args.first().map(String::as_str))?;
    let input: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("The observation is not valid JSON ({e}).");
            return Ok(ExitCode::from(65));
        }
    };

    let code = match service.assess_json(&input) {
        Ok(assessment) => {
            let report = Report {
                headline: assessment.label.headline(),
                guidance: assessment.label.guidance(),
                assessment: &assessment,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            exit_code(&e)
        }
    };

    tracing::info!("Cardiorisk shutdown complete.");
    Ok(code)
}
