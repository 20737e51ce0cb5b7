use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;
use vibey_core::{run_matching, BackendClient, Config, ImageAttachment, MatchMode};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "vibey")]
#[command(about = "AI shopping assistant: find products by function or by style")]
struct Cli {
    /// Backend endpoint (overrides config and VIBEY_BACKEND_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask once and print the reply (default is the interactive chat)
    Ask {
        /// What you are looking for
        query: String,
        /// Image to match against
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Match by aesthetic instead of product function
        #[arg(short, long)]
        style: bool,
    },
    /// Check that the backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file still honors the environment
    let mut config = Config::load().unwrap_or_else(|_| {
        let mut config = Config::new();
        config.apply_env();
        config
    });
    if let Some(endpoint) = cli.endpoint {
        config.backend_endpoint = endpoint;
    }

    match cli.command {
        None => run_tui(&config).await,
        Some(Commands::Ask { query, image, style }) => {
            init_stderr_logging();
            let mode = if style { MatchMode::Style } else { config.mode() };
            ask(&config, mode, &query, image).await
        }
        Some(Commands::Health) => {
            init_stderr_logging();
            health(&config).await
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// The TUI owns the terminal, so logs go to a file instead.
fn init_file_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let dir = Config::log_dir().ok()?;
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::never(&dir, "vibey.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run_tui(config: &Config) -> Result<()> {
    let _log_guard = init_file_logging();
    tracing::info!("Backend endpoint: {}", config.base_url());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender())?;

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            if let Some(event) = events.next().await {
                handler::handle_event(&mut app, event).await?;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn ask(config: &Config, mode: MatchMode, query: &str, image: Option<PathBuf>) -> Result<()> {
    let backend = BackendClient::from_config(config)?;

    let attachment = match image {
        Some(path) => Some(ImageAttachment::from_path(&path).await?),
        None => None,
    };

    println!("🔍 {}: {}", mode.title().bold().blue(), query.cyan());

    let outcome = match run_matching(&backend, mode, query, attachment.as_ref(), &()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            println!("{}", vibey_core::session::ERROR_MESSAGE.red());
            println!("Make sure the backend is running at {}", config.base_url().bold());
            return Err(e);
        }
    };

    println!("\n{}", outcome.response);

    if !outcome.products.is_empty() {
        println!("\n{}", "Recommended products:".bold().green());
        for product in &outcome.products {
            println!(
                "• {}  {}  {}",
                product.name.bold(),
                format!("${}", product.price).green(),
                product.category.as_deref().unwrap_or_default().dimmed()
            );
            println!("  {}", product.image_url.dimmed());
        }
    }

    Ok(())
}

async fn health(config: &Config) -> Result<()> {
    let backend = BackendClient::from_config(config)?;

    let status = backend
        .health()
        .await
        .with_context(|| format!("Backend unreachable at {}", backend.base_url()))?;

    println!("{} {} ({})", "✓".green().bold(), backend.base_url(), status.status.green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> Config {
        Config {
            backend_endpoint: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_health_fails_when_backend_is_down() {
        let err = health(&unreachable()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("127.0.0.1:1"));
    }

    #[tokio::test]
    async fn test_ask_fails_when_backend_is_down() {
        assert!(ask(&unreachable(), MatchMode::Product, "shirt", None).await.is_err());
    }

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from(["vibey", "ask", "linen shirt", "--style"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Ask { ref query, style: true, image: None }) if query == "linen shirt"
        ));
    }
}
