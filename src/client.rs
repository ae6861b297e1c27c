//! StakeFlow factory for the CLI.
//!
//! Loads the flow configuration and wires it to the HTTP wallet provider.

use std::path::Path;
use std::sync::Arc;

use stakeflow::utils::short_address;
use stakeflow::{FlowConfig, FlowError, HttpWalletProvider, StakeFlow};
use tracing::info;

use crate::cli::Cli;
use crate::error::AppError;

pub type Flow = StakeFlow<HttpWalletProvider>;

pub fn load_config(path: Option<&Path>) -> Result<FlowConfig, AppError> {
    let path = path.ok_or_else(|| {
        FlowError::Config("no configuration file: pass --config or set AUTOSTAKE_CONFIG".into())
    })?;
    let config = FlowConfig::from_json_file(path)?;
    info!(
        chain_id = config.network.chain_id,
        sale = %short_address(&config.addresses.sale),
        "configuration loaded"
    );
    Ok(config)
}

/// Build the flow without touching the wallet.
pub fn create_flow(cli: &Cli) -> Result<Flow, AppError> {
    let config = load_config(cli.config.as_deref())?;
    let provider = Arc::new(HttpWalletProvider::new(&cli.wallet_url));
    Ok(StakeFlow::new(config, Some(provider), cli.page_url.as_deref())?)
}

/// Build the flow and connect it: account access, network check, catalog.
pub async fn connect_flow(cli: &Cli) -> Result<Flow, AppError> {
    let mut flow = create_flow(cli)?;
    info!(wallet = %cli.wallet_url, "connecting wallet");

    let snapshot = flow.connect().await?;
    if let Some(account) = snapshot.session.account() {
        info!(
            account = %short_address(&account),
            packages = snapshot.packages.len(),
            "connected"
        );
    }
    Ok(flow)
}
