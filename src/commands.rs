//! Subcommand handlers. Each one connects, acts once, and renders to stdout.

use std::io;

use stakeflow::utils::short_address;
use stakeflow::{SessionChange, WalletEventStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::{Cli, LinkArgs, PackageArgs, WatchArgs};
use crate::client::{connect_flow, Flow};
use crate::error::AppError;
use crate::output;

async fn connect_with_package(cli: &Cli, args: &PackageArgs) -> Result<Flow, AppError> {
    let mut flow = connect_flow(cli).await?;
    flow.catalog().ensure_available()?;
    if let Some(id) = args.package {
        flow.select_package(id)?;
    }
    Ok(flow)
}

pub async fn packages(cli: &Cli) -> Result<(), AppError> {
    let flow = connect_flow(cli).await?;
    flow.catalog().ensure_available()?;
    let snapshot = flow.snapshot();
    output::write_packages(
        &mut io::stdout().lock(),
        &snapshot,
        flow.config().decimals,
        cli.json,
    )?;
    Ok(())
}

pub async fn allowance(cli: &Cli, args: &PackageArgs) -> Result<(), AppError> {
    let flow = connect_with_package(cli, args).await?;
    let view = flow.allowance_view().await?;
    output::write_allowance(&mut io::stdout().lock(), &view, flow.config().decimals, cli.json)?;
    Ok(())
}

pub async fn approve(cli: &Cli) -> Result<(), AppError> {
    let flow = connect_flow(cli).await?;
    if let Ok(view) = flow.allowance_view().await {
        if view.decision == stakeflow::GateDecision::Sufficient {
            info!("allowance already covers the selected package, approving the maximum anyway");
        }
    }
    let outcome = flow.approve().await?;
    output::write_approval(&mut io::stdout().lock(), &outcome, cli.json)?;
    Ok(())
}

pub async fn buy(cli: &Cli, args: &PackageArgs) -> Result<(), AppError> {
    let mut flow = connect_with_package(cli, args).await?;
    match flow.buy(None).await {
        Ok(receipt) => {
            output::write_purchase(
                &mut io::stdout().lock(),
                &receipt,
                flow.last_purchase_stages(),
                cli.json,
            )?;
            Ok(())
        }
        Err(e) => {
            warn!(stages = ?flow.last_purchase_stages(), "purchase did not complete");
            Err(e.into())
        }
    }
}

pub async fn link(cli: &Cli, args: &LinkArgs) -> Result<(), AppError> {
    let flow = connect_flow(cli).await?;
    let link = flow.referral_link(args.base.as_deref())?;
    output::write_link(&mut io::stdout().lock(), &link, cli.json)?;
    Ok(())
}

/// Apply wallet notifications until cancelled.
///
/// A chain change drops the session, as does an empty account list. The flow
/// reconnects and reloads the catalog after a chain change, and again once
/// accounts reappear after a disconnect.
pub async fn watch(cli: &Cli, args: &WatchArgs, cancel: CancellationToken) -> Result<(), AppError> {
    let mut flow = connect_flow(cli).await?;

    let mut stream = WalletEventStream::new(args.ws_url.clone());
    let mut events = stream.subscribe();
    stream.connect();
    info!(url = %args.ws_url, "watching wallet events");

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.next() => match event {
                Some(event) => event,
                None => {
                    warn!("wallet event channel closed");
                    break;
                }
            },
        };

        let change = flow.handle_event(&event);
        output::write_change(
            &mut io::stdout().lock(),
            &change,
            &flow.session().snapshot(),
            cli.json,
        )?;

        match change {
            SessionChange::AccountSwitched(account) => {
                info!(account = %short_address(&account), "account switched");
                if let Ok(link) = flow.referral_link(None) {
                    output::write_link(&mut io::stdout().lock(), &link, cli.json)?;
                }
            }
            SessionChange::ReloadRequired | SessionChange::ReconnectRequired => {
                match flow.connect().await {
                    Ok(snapshot) => info!(
                        packages = snapshot.packages.len(),
                        epoch = snapshot.session.epoch(),
                        "session rebuilt"
                    ),
                    Err(e) => error!(error = %e, ?change, "reconnect failed"),
                }
            }
            SessionChange::Disconnected | SessionChange::Unchanged => {}
        }
    }

    stream.close();
    Ok(())
}
