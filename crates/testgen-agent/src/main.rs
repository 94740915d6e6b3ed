use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use testgen_agent::cli::Args;
use testgen_agent::client::OpenAiTransport;
use testgen_agent::config::{check_endpoint, AgentConfig};
use testgen_agent::session::run_session;
use testgen_core::CancellationHandle;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let feedback_config = args.feedback_config()?;
    let agent_config = AgentConfig::default();
    let prompt = args.read_prompt()?;

    info!(
        url = %agent_config.endpoint.url,
        model = %agent_config.endpoint.model,
        threshold = feedback_config.requests_count_threshold,
        result_path = %feedback_config.result_path.display(),
        "Test generation starting"
    );

    if !args.no_preflight
        && !check_endpoint(&agent_config.endpoint.url, agent_config.endpoint.api_key.as_deref()).await
    {
        warn!(url = %agent_config.endpoint.url, "Endpoint did not answer GET /models; trying anyway");
    }

    let indicator = CancellationHandle::new();
    let cancel = indicator.token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping after the current step");
            cancel.cancel();
        }
    });

    let session = tokio::task::spawn_blocking(move || {
        let transport = OpenAiTransport::new(&agent_config).context("Failed to build HTTP client")?;
        run_session(
            &feedback_config,
            &prompt,
            transport,
            agent_config.system_prompt.as_deref(),
            &indicator,
        )
    })
    .await
    .context("Generation task panicked")??;

    match &args.report_out {
        Some(path) => {
            session
                .report
                .write_json(path)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", session.report.to_json().context("Failed to serialize report")?),
    }

    info!(
        result = %session.outcome.execution_result,
        compilable = session.outcome.compilable_test_cases.len(),
        warnings = session.warnings.len(),
        "Done"
    );

    Ok(if session.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
