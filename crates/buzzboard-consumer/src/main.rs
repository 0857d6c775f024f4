//! Live sentiment dashboard entry point for Buzzboard.
//!
//! The consumer subscribes to a NATS subject (or replays a JSON-lines file),
//! scores the sentiment of every `{author, message}` record, and redraws a
//! two-panel dashboard of per-author message counts and mean sentiment after
//! each record.
//!
//! # Architecture
//!
//! ```text
//! NATS / replay file --> JsonDecoder --> LexiconScorer --> AuthorStats --> Dashboard
//! ```
//!
//! A malformed or unscorable record is logged and skipped; the consumer keeps
//! running until Ctrl-C or the end of the stream.

mod config;
mod error;
mod nats;
mod replay;
mod tui;

use std::fs::File;
use std::sync::Mutex;

use buzzboard_core::{
    JsonDecoder, LexiconScorer, LogRenderer, NoOpRenderer, Renderer, RunSummary,
    SentimentConsumer, log_run_end,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ConsumerConfig, RenderMode};
use crate::error::AppError;
use crate::nats::NatsEventSource;
use crate::replay::JsonLinesSource;
use crate::tui::TerminalRenderer;

/// Consumer wired with the production decoder and scorer.
type Consumer<R> = SentimentConsumer<JsonDecoder, LexiconScorer, R>;

/// Application entry point.
///
/// Loads configuration from environment variables, initializes logging,
/// opens the event source, then runs the consumer until interrupted or the
/// stream ends.
///
/// # Errors
///
/// Returns an error if configuration, connection, or terminal setup fails,
/// or if the event source cannot be released on shutdown.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConsumerConfig::from_env()?;
    init_logging(&config)?;

    info!("buzzboard-consumer starting");
    info!(
        nats_url = config.nats_url,
        topic = config.topic,
        group_id = config.group_id,
        render_mode = config.render_mode.as_str(),
        replay_file = ?config.replay_file,
        "configuration loaded"
    );

    let summary = match config.render_mode {
        RenderMode::Terminal => {
            let mut consumer = new_consumer(TerminalRenderer::stdout()?);
            let summary = consume(&config, &mut consumer).await?;
            info!(frames = consumer.renderer().frames(), "terminal dashboard closed");
            summary
        }
        RenderMode::Log => {
            let mut consumer = new_consumer(LogRenderer::new());
            let summary = consume(&config, &mut consumer).await?;
            info!(refreshes = consumer.renderer().refreshes(), "log dashboard closed");
            summary
        }
        RenderMode::None => consume(&config, &mut new_consumer(NoOpRenderer)).await?,
    };

    log_run_end(&summary);
    info!("buzzboard-consumer shut down");
    Ok(())
}

/// Install the tracing subscriber.
///
/// The terminal dashboard owns stdout, so in that mode logs are written to
/// the configured log file instead of the screen.
fn init_logging(config: &ConsumerConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if config.render_mode == RenderMode::Terminal {
        let file = File::create(&config.log_file).map_err(|e| {
            AppError::Terminal(format!(
                "failed to create log file {}: {e}",
                config.log_file.display()
            ))
        })?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn new_consumer<R: Renderer>(renderer: R) -> Consumer<R> {
    SentimentConsumer::new(JsonDecoder::new(), LexiconScorer::new(), renderer)
}

/// Open the configured source and run `consumer` over it.
async fn consume<R: Renderer>(
    config: &ConsumerConfig,
    consumer: &mut Consumer<R>,
) -> Result<RunSummary, AppError> {
    let summary = if let Some(path) = &config.replay_file {
        let source = JsonLinesSource::open(path).await?;
        consumer.run(source, shutdown_signal()).await?
    } else {
        let source =
            NatsEventSource::connect(&config.nats_url, &config.topic, &config.group_id).await?;
        consumer.run(source, shutdown_signal()).await?
    };
    Ok(summary)
}

/// Resolves on Ctrl-C. If the handler cannot be installed the consumer runs
/// until its stream ends.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, running until end of stream");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
