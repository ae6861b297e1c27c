use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// autostake: buy auto-staking packages through a connected wallet.
#[derive(Parser, Debug)]
#[command(name = "autostake", version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Path to the JSON flow configuration
    #[arg(long, env = "AUTOSTAKE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Wallet JSON-RPC endpoint
    #[arg(
        long,
        env = "WALLET_RPC_URL",
        default_value = "http://127.0.0.1:1248",
        global = true
    )]
    pub wallet_url: String,

    /// Link the user arrived through; its `ref` parameter names the referrer
    #[arg(long, env = "AUTOSTAKE_PAGE_URL", global = true)]
    pub page_url: Option<String>,

    /// Output as JSON lines instead of TSV
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and list the sale packages
    Packages,

    /// Show the allowance against a package's price
    Allowance(PackageArgs),

    /// Approve the sale contract to spend the settlement token
    Approve,

    /// Buy a package
    Buy(PackageArgs),

    /// Print the referral link for the connected account
    Link(LinkArgs),

    /// Follow wallet notifications and report session changes
    Watch(WatchArgs),
}

/// Arguments for commands acting on one package.
#[derive(Parser, Debug)]
pub struct PackageArgs {
    /// Package id; defaults to the first active package
    #[arg(long)]
    pub package: Option<u64>,
}

/// Arguments for the `link` subcommand.
#[derive(Parser, Debug)]
pub struct LinkArgs {
    /// Base URL of the shared link; defaults to `shareBaseUrl`, then `--page-url`
    #[arg(long)]
    pub base: Option<String>,
}

/// Arguments for the `watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Wallet WebSocket endpoint pushing `accountsChanged`/`chainChanged`
    #[arg(long, env = "WALLET_WS_URL")]
    pub ws_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_buy_with_package() {
        let cli = Cli::try_parse_from(["autostake", "buy", "--package", "2", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Buy(args) => assert_eq!(args.package, Some(2)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_watch_requires_ws_url() {
        std::env::remove_var("WALLET_WS_URL");
        assert!(Cli::try_parse_from(["autostake", "watch"]).is_err());
    }
}
