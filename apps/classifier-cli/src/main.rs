mod cli;
mod interactive;
mod logging;
mod terminal;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use classifier_sdk::{
    ClassifierApi, ClassifierClient, ClientConfig, Connectivity, DebouncedSegmenter,
    HealthMonitor, HistoryPaginator, Label, LoadOutcome, PredictionId, PredictionSession,
};
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::logging::LogConfig;
use crate::terminal::{ConnectivityPrinter, HistoryPrinter, PredictionPrinter, TextBuffer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(&LogConfig {
        level: cli.log_level,
        file: cli.log_file.clone(),
    })?;

    let config = load_config(cli.api_url.as_deref())?;
    let api: Arc<dyn ClassifierApi> = Arc::new(
        ClassifierClient::from_config(&config).context("invalid backend address")?,
    );
    info!(
        target: "classifier.cli",
        api = %config.api_base_url,
        max_words = config.max_words,
        "client configured"
    );

    match cli.command {
        Command::Predict { text } => predict(&config, api, text).await,
        Command::Feedback { id, verdict } => {
            let history =
                HistoryPaginator::new(api, Arc::new(HistoryPrinter::default()), config.page_size);
            history
                .feedback(&PredictionId::new(id), verdict.liked())
                .await?;
            Ok(())
        }
        Command::History { page } => show_history(&config, api, page).await,
        Command::Health => {
            let monitor = HealthMonitor::new(api, Arc::new(ConnectivityPrinter));
            let connectivity = monitor.probe().await;
            if connectivity != Connectivity::Online {
                bail!("backend is {connectivity}");
            }
            Ok(())
        }
        Command::Categories => {
            for label in Label::known() {
                println!("{:<8} {label}", label.wire_id());
            }
            Ok(())
        }
        Command::Interactive => interactive::run(&config, api).await,
    }
}

fn load_config(api_url: Option<&str>) -> Result<ClientConfig> {
    let builder = config::Config::builder()
        .set_override_option("api_base_url", api_url)
        .context("failed to apply --api-url")?;
    Ok(ClientConfig::from_builder(builder)?)
}

/// The page count is unknown until the first page answers, so pages past the
/// first are range-checked against it before being fetched.
async fn show_history(config: &ClientConfig, api: Arc<dyn ClassifierApi>, page: u32) -> Result<()> {
    let printer = Arc::new(HistoryPrinter::only(page));
    let history = HistoryPaginator::new(api, printer, config.page_size);
    history.load(1).await?;
    if page == 1 {
        return Ok(());
    }
    if history.go_to(page).await? == LoadOutcome::OutOfRange {
        bail!(
            "page {page} is out of range (1..={})",
            history.page().total_pages
        );
    }
    Ok(())
}

async fn predict(
    config: &ClientConfig,
    api: Arc<dyn ClassifierApi>,
    words: Vec<String>,
) -> Result<()> {
    let text = if words.is_empty() {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("failed to read article from stdin")?;
        input
    } else {
        words.join(" ")
    };

    let buffer = Arc::new(TextBuffer::default());
    buffer.set(&text);
    let segmenter = DebouncedSegmenter::attach(
        api.clone(),
        buffer.clone(),
        config.max_words,
        config.debounce_window(),
    );
    segmenter.on_paste(&text).await;

    let session = PredictionSession::new(api, Arc::new(PredictionPrinter), config.max_input_chars)
        .with_word_counts(Arc::new(segmenter));
    session.submit(&buffer.text()).await?;
    Ok(())
}
