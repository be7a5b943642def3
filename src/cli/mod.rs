use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::routes;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "petjournal-api")]
#[command(about = "Pet Journal API - upload grants and pet/note records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Listen port, overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Load and validate configuration, then print it with secrets omitted")]
    CheckConfig {
        #[arg(long, help = "Output in JSON format")]
        json: bool,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::CheckConfig { json } => {
            print_config(&config, json)?;
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.port);
    tracing::info!("Starting Pet Journal API in {:?} mode", config.environment);

    let state = AppState::from_config(config).context("failed to initialise services")?;
    let app = routes::app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Pet Journal API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn print_config(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("environment:   {:?}", config.environment);
    println!("port:          {}", config.server.port);
    println!(
        "database:      {}@{}:{}/{}",
        config.database.user, config.database.host, config.database.port, config.database.database
    );
    println!("upload host:   {}", config.upload_host());
    println!("sts endpoint:  {}", config.sts.endpoint);
    println!("sts role:      {}", config.sts.role_arn);
    println!("policy ttl:    {}s", config.sts.policy_ttl_secs);
    println!("jwt algorithm: {}", config.security.jwt_algorithm);
    Ok(())
}
