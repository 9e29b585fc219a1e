//! wallet-session - command line front end
//!
//! Drives a `WalletService` built from the config file. The session is kept in
//! a JSON state file, so `connect` in one invocation can be restored by the next.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use wallet_session::wallet::FixtureProvider;
use wallet_session::{
    FileStore, NetworkType, NetworkValidator, SessionConfig, StateMonitor, WalletConnection,
    WalletService, WalletStorage,
};

/// wallet-session: wallet provider registry and session manager
#[derive(Parser)]
#[command(name = "wallet-session")]
#[command(about = "Connect, restore and inspect wallet sessions", long_about = None)]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the session state file
    #[arg(short, long, global = true, default_value = "wallet-state.json")]
    state: PathBuf,

    /// Expected network, overrides config and environment
    #[arg(short, long, global = true)]
    network: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered providers and their availability
    Providers,

    /// Connect to a provider
    Connect {
        /// Provider id (e.g., hashpack)
        #[arg(value_name = "PROVIDER")]
        provider: String,

        /// Maximum connection attempts
        #[arg(short, long, default_value = "1")]
        retries: u32,
    },

    /// Disconnect the stored session
    Disconnect,

    /// Print the stored session without reconnecting
    Status,

    /// Restore the stored session
    Restore,

    /// Print the balance of the stored session
    Balance,

    /// Validate a network against the expected one
    CheckNetwork {
        #[arg(value_name = "NETWORK")]
        network: String,
    },

    /// Restore the session and watch it for a while
    Monitor {
        /// How long to watch
        #[arg(long, default_value = "10")]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let service = build_service(&config, &cli.state).await;

    let result = match cli.command {
        Commands::Providers => {
            list_providers(&service).await;
            Ok(())
        }
        Commands::Connect { provider, retries } => connect(&service, &provider, retries).await,
        Commands::Disconnect => disconnect(&service).await,
        Commands::Status => stored_status(service.storage()),
        Commands::Restore => restore(&service).await,
        Commands::Balance => balance(&service).await,
        Commands::CheckNetwork { network } => check_network(service.validator(), &network),
        Commands::Monitor { seconds } => {
            monitor(&service, config.monitor_interval(), Duration::from_secs(seconds)).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<SessionConfig, String> {
    let mut config =
        SessionConfig::load_or_default(cli.config.as_deref()).map_err(|e| e.to_string())?;
    config.apply_env().map_err(|e| e.to_string())?;
    if let Some(network) = &cli.network {
        config.override_network(network).map_err(|e| e.to_string())?;
    }
    debug!("Effective config: {:?}", config);
    Ok(config)
}

async fn build_service(config: &SessionConfig, state: &Path) -> WalletService {
    let storage = WalletStorage::new(Arc::new(FileStore::new(state)));
    let service = WalletService::new(storage, config.validator(), config.service_settings());
    for spec in &config.providers {
        service
            .register_provider(Arc::new(FixtureProvider::from_spec(spec)))
            .await;
    }
    info!(
        "Registered {} providers, expecting {}",
        config.providers.len(),
        config.expected_network
    );
    service
}

async fn list_providers(service: &WalletService) {
    let status = service.get_provider_availability_status().await;

    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│  WALLET PROVIDERS                                           │");
    println!("├─────────────────────────────────────────────────────────────┤");
    for provider in service.providers().await {
        let available = status.get(&provider.id).copied().unwrap_or(false);
        println!(
            "│  {:<12} │ {:<20} │ {:<12}",
            provider.id,
            provider.name,
            if available { "available" } else { "unavailable" }
        );
    }
    println!("└─────────────────────────────────────────────────────────────┘");
}

async fn connect(service: &WalletService, provider: &str, retries: u32) -> Result<(), String> {
    let connection = service
        .connect_with_retry(provider, retries)
        .await
        .map_err(|e| e.to_string())?;
    info!("Connected {} on {}", connection.account_id, connection.network);
    print_status(service).await
}

async fn disconnect(service: &WalletService) -> Result<(), String> {
    if !service.restore_connection().await {
        println!("No stored session");
        return Ok(());
    }
    service.disconnect().await.map_err(|e| e.to_string())?;
    println!("Disconnected");
    Ok(())
}

async fn restore(service: &WalletService) -> Result<(), String> {
    if service.restore_connection().await {
        print_status(service).await
    } else {
        Err("No session to restore".to_string())
    }
}

async fn balance(service: &WalletService) -> Result<(), String> {
    if !service.restore_connection().await {
        return Err("No wallet connected".to_string());
    }
    let balance = service.get_balance().await.map_err(|e| e.to_string())?;
    println!("{}", balance);
    Ok(())
}

fn check_network(validator: &NetworkValidator, network: &str) -> Result<(), String> {
    let network: NetworkType = network.parse()?;
    let validation = validator.validate(&WalletConnection::new("", network));
    print_json(&validation)?;

    match validator.build_switch_request(network) {
        None => Ok(()),
        Some(request) => {
            if validator.validate_switch_request(&request).is_ok() {
                print_json(&request)?;
            }
            Err(validation
                .message
                .unwrap_or_else(|| format!("{} is not supported", network)))
        }
    }
}

async fn monitor(
    service: &WalletService,
    poll_interval: Duration,
    duration: Duration,
) -> Result<(), String> {
    let monitor = StateMonitor::spawn(service.clone(), poll_interval, 256);
    if !service.restore_connection().await {
        info!("No stored session, watching an idle service");
    }

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    let history = monitor.stop().await;
    info!("Recorded {} state changes", history.len());
    print_json(&history)
}

fn stored_status(storage: &WalletStorage) -> Result<(), String> {
    print_json(&serde_json::json!({
        "preferences": storage.load_preferences(),
        "connection": storage.load_connection(),
        "account": storage.load_account_info(),
    }))
}

async fn print_status(service: &WalletService) -> Result<(), String> {
    print_json(&service.snapshot().await)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}
