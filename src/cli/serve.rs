use anyhow::{Context, Result};
use clap::Args;
use rebac_authz_client::{AuthorizationClient, OracleBackend};
use rebac_gateway::auth::IdentityHeader;
use rebac_gateway::{build_router, AppSettings, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to listen on, overriding server.bind
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Oracle backend, overriding oracle.backend
    #[arg(long, value_enum)]
    pub oracle: Option<OracleOpt>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OracleOpt {
    Memory,
    Http,
}

impl From<OracleOpt> for OracleBackend {
    fn from(value: OracleOpt) -> Self {
        match value {
            OracleOpt::Memory => OracleBackend::Memory,
            OracleOpt::Http => OracleBackend::Http,
        }
    }
}

pub async fn cmd_serve(args: ServeArgs, mut settings: AppSettings) -> Result<()> {
    if let Some(bind) = args.bind {
        settings.server.bind = bind;
    }
    if let Some(oracle) = args.oracle {
        settings.oracle.backend = oracle.into();
    }
    settings.validate().context("invalid configuration")?;

    if settings.oracle.backend == OracleBackend::Memory {
        warn!("using the in-memory oracle; relationships are lost on restart");
    }
    let authz = AuthorizationClient::connect(&settings.oracle)
        .context("failed to configure authorization client")?;
    let header = settings
        .identity
        .subject_header
        .parse()
        .context("invalid identity.subject_header")?;
    let state = AppState::in_memory(authz, IdentityHeader(header));
    let mut guarded: Vec<String> = state
        .guard
        .table()
        .operations()
        .map(ToString::to_string)
        .collect();
    guarded.sort();
    info!(routes = ?guarded, "permission table loaded");

    let addr = settings.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind API server on {}", addr))?;
    info!(%addr, subject_header = %settings.identity.subject_header, "API server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server exited unexpectedly")?;
    info!("API server stopped");
    Ok(())
}

pub fn cmd_check_config(settings: &AppSettings) -> Result<()> {
    let rendered =
        serde_yaml::to_string(&settings.redacted()).context("failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
    }
}
