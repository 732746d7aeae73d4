use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_truth_dao::{
    cli::{execute_command, FactCheckCommands},
    config::{Config, LogFormat},
    langbase::LangbaseClient,
    search::SearchClient,
    server::{AppState, McpServer},
    storage::SqliteStorage,
};

/// Claim fact-checking MCP server with DAO consensus.
#[derive(Parser, Debug)]
#[command(name = "mcp-truth-dao", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve MCP over stdio (default)
    Serve,

    #[command(flatten)]
    FactCheck(FactCheckCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "MCP Truth DAO Server starting..."
    );

    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    let search = match SearchClient::new(&config.search, &config.request) {
        Ok(c) => {
            info!(
                base_url = %c.base_url(),
                domains = config.search.allowed_domains.len(),
                "Search client initialized"
            );
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize search client");
            return Err(e.into());
        }
    };

    if config.backends.ensure_pipes {
        info!(
            count = config.backends.backends.len(),
            "Ensuring reasoning backend pipes exist..."
        );
        if let Err(e) = langbase
            .ensure_backend_pipes(&config.backends.backends)
            .await
        {
            error!(error = %e, "Failed to ensure backend pipes exist");
            return Err(e.into());
        }
    } else {
        warn!("Skipping pipe creation (LANGBASE_ENSURE_PIPES=false)");
    }

    let state = Arc::new(AppState::new(config, storage, langbase, Arc::new(search)));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = McpServer::new(state);

            info!("Server ready, waiting for requests on stdin...");

            if let Err(e) = server.run().await {
                error!(error = %e, "Server error");
                return Err(e.into());
            }

            info!("Server shutdown complete");
        }
        Command::FactCheck(command) => {
            let result = execute_command(command, &state).await;
            if result.exit_code == 0 {
                println!("{}", result.message);
            } else {
                eprintln!("{}", result.message);
                std::process::exit(result.exit_code);
            }
        }
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // stdout carries the MCP channel, so logs always go to stderr.
    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
