//! Souk daemon: entry point for running a marketplace node.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use souk_api::ApiServer;
use souk_chain::{
    BalanceOracle, FixedBalanceOracle, PaymentVerifier, RpcBalanceOracle, RpcClient,
    RpcPaymentVerifier, TrustingVerifier,
};
use souk_market::{Collaborators, DuplicatePolicy, MarketConfig, Marketplace};
use souk_store_lmdb::LmdbEnvironment;
use souk_types::SystemClock;
use souk_utils::{init_tracing, LogFormat};

#[derive(Parser)]
#[command(name = "souk-daemon", about = "Souk marketplace daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "SOUK_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for LMDB storage.
    #[arg(long, env = "SOUK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Port for the HTTP API.
    #[arg(long, env = "SOUK_API_PORT")]
    api_port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SOUK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SOUK_LOG_FORMAT")]
    log_format: Option<String>,

    /// Mint address of the gating token.
    #[arg(long, env = "SOUK_TOKEN_MINT")]
    token_mint: Option<String>,

    /// Gating-token balance a wallet needs.
    #[arg(long, env = "SOUK_MIN_TOKEN_BALANCE")]
    min_token_balance: Option<f64>,

    /// JSON-RPC endpoint for balance lookups.
    #[arg(long, env = "SOUK_GATING_RPC_URL")]
    gating_rpc_url: Option<String>,

    /// JSON-RPC endpoint for payment verification.
    #[arg(long, env = "SOUK_PAYMENT_RPC_URL")]
    payment_rpc_url: Option<String>,

    /// Answer balance and payment checks locally instead of over RPC.
    #[arg(long, env = "SOUK_MOCK_CHAIN")]
    mock_chain: bool,

    /// Duplicate payment policy: "return_existing" or "reject".
    #[arg(long, env = "SOUK_DUPLICATE_POLICY")]
    duplicate_policy: Option<String>,

    /// Serve the API without the token-gating and terms checks.
    #[arg(long, env = "SOUK_OPEN_ACCESS")]
    open_access: bool,

    /// Disable every admin route.
    #[arg(long, env = "SOUK_DISABLE_ADMIN")]
    disable_admin: bool,

    /// Code exchanged for an admin session.
    #[arg(long, env = "SOUK_ADMIN_CODE", hide_env_values = true)]
    admin_code: Option<String>,

    /// HMAC key for admin session tokens.
    #[arg(long, env = "SOUK_SESSION_SECRET", hide_env_values = true)]
    session_secret: Option<String>,

    /// Secret from which the delivery-payload key is derived.
    #[arg(long, env = "SOUK_DELIVERY_KEY", hide_env_values = true)]
    delivery_key: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Open the store and serve the HTTP API.
    Run,
    /// Print the effective configuration as TOML, secrets redacted.
    Config,
}

impl Cli {
    /// Apply CLI flags and env vars on top of `base`.
    fn overlay(&self, base: MarketConfig) -> anyhow::Result<MarketConfig> {
        let duplicate_policy = match self.duplicate_policy.as_deref() {
            Some("return_existing") => DuplicatePolicy::ReturnExisting,
            Some("reject") => DuplicatePolicy::Reject,
            Some(other) => anyhow::bail!("unknown duplicate policy {other:?}"),
            None => base.duplicate_policy,
        };
        Ok(MarketConfig {
            data_dir: self.data_dir.clone().unwrap_or(base.data_dir),
            api_port: self.api_port.unwrap_or(base.api_port),
            log_level: self.log_level.clone().unwrap_or(base.log_level),
            log_format: self.log_format.clone().unwrap_or(base.log_format),
            token_mint: self.token_mint.clone().unwrap_or(base.token_mint),
            min_token_balance: self.min_token_balance.unwrap_or(base.min_token_balance),
            gating_rpc_url: self.gating_rpc_url.clone().unwrap_or(base.gating_rpc_url),
            payment_rpc_url: self.payment_rpc_url.clone().unwrap_or(base.payment_rpc_url),
            mock_chain: self.mock_chain || base.mock_chain,
            duplicate_policy,
            enforce_access: !self.open_access && base.enforce_access,
            disable_admin: self.disable_admin || base.disable_admin,
            admin_code: self.admin_code.clone().or(base.admin_code),
            session_secret: self.session_secret.clone().or(base.session_secret),
            delivery_key: self.delivery_key.clone().or(base.delivery_key),
            ..base
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let file_config = match cli.config {
        Some(ref path) => MarketConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => MarketConfig::default(),
    };
    let config = cli.overlay(file_config)?;

    match cli.command {
        Command::Config => {
            let redacted = MarketConfig {
                admin_code: config.admin_code.as_ref().map(|_| "<redacted>".into()),
                session_secret: config.session_secret.as_ref().map(|_| "<redacted>".into()),
                delivery_key: config.delivery_key.as_ref().map(|_| "<redacted>".into()),
                ..config
            };
            print!("{}", redacted.to_toml_string());
            Ok(())
        }
        Command::Run => run(config).await,
    }
}

async fn run(config: MarketConfig) -> anyhow::Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    init_tracing(&config.log_level, format)?;
    config.validate()?;

    tracing::info!(
        data_dir = %config.data_dir.display(),
        api_port = config.api_port,
        mock_chain = config.mock_chain,
        "starting Souk marketplace"
    );

    let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)
        .with_context(|| format!("failed to open store at {}", config.data_dir.display()))?;

    let (balance_oracle, payment_verifier): (Arc<dyn BalanceOracle>, Arc<dyn PaymentVerifier>) =
        if config.mock_chain {
            tracing::warn!("mock chain enabled: balances are fixed and every payment verifies");
            let oracle: Arc<dyn BalanceOracle> =
                Arc::new(FixedBalanceOracle::new(config.mock_token_balance));
            let verifier: Arc<dyn PaymentVerifier> = Arc::new(TrustingVerifier);
            (oracle, verifier)
        } else {
            let gating = RpcClient::new(config.gating_rpc_url.clone());
            let payments = RpcClient::new(config.payment_rpc_url.clone());
            for client in [&gating, &payments] {
                match client.version().await {
                    Ok(version) => tracing::info!(url = client.url(), %version, "rpc reachable"),
                    Err(e) => tracing::warn!(url = client.url(), error = %e, "rpc unreachable at startup"),
                }
            }
            let oracle: Arc<dyn BalanceOracle> =
                Arc::new(RpcBalanceOracle::new(gating, config.token_mint.clone()));
            let verifier: Arc<dyn PaymentVerifier> = Arc::new(RpcPaymentVerifier::new(payments));
            (oracle, verifier)
        };

    let market = Marketplace::new(
        &config,
        Collaborators {
            store: Arc::new(env),
            balance_oracle,
            payment_verifier,
            clock: Arc::new(SystemClock),
        },
    )?;

    // Audit-log expiry sweeper.
    let sweeper = market.clone();
    let sweep_every = Duration::from_secs(config.log_sweep_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.purge_expired_logs() {
                tracing::warn!(error = %e, "audit log sweep failed");
            }
        }
    });

    let server = ApiServer::new(config.api_port, market);
    tokio::select! {
        result = server.start() => result.context("HTTP server stopped")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_settings() {
        let base = MarketConfig::from_toml_str(
            "api_port = 9000\nlog_level = \"warn\"\nadmin_code = \"from-file\"\n",
        )
        .unwrap();
        let cli = Cli::try_parse_from([
            "souk-daemon",
            "--api-port",
            "9100",
            "--duplicate-policy",
            "reject",
            "--open-access",
            "run",
        ])
        .unwrap();

        let config = cli.overlay(base).unwrap();
        assert_eq!(config.api_port, 9100);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.admin_code.as_deref(), Some("from-file"));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(!config.enforce_access);
    }

    #[test]
    fn unknown_duplicate_policy_is_rejected() {
        let cli = Cli::try_parse_from(["souk-daemon", "--duplicate-policy", "maybe", "config"])
            .unwrap();
        assert!(cli.overlay(MarketConfig::default()).is_err());
    }
}
