use std::sync::Arc;

use anyhow::Context;

use stock_sent_social::config::{InputSource, ServiceConfig};
use stock_sent_social::logging;
use stock_sent_social::pipeline::SentimentProcessor;
use stock_sent_social::queue::{
    ConsumerConfig, JsonLinesSink, JsonLinesSource, MessageSource, SentimentConsumer,
};
use stock_sent_social::scoring::LexiconScorer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("Failed to load configuration")?;

    // Initialize tracing (stderr; stdout carries results)
    logging::init(&config.log);

    tracing::info!("Starting social sentiment analysis service");

    // ── Scorer + pipeline ───────────────────────────────────────────────
    let scorer = LexiconScorer::new().with_max_chars(config.max_content_chars);
    let processor = Arc::new(SentimentProcessor::new(Arc::new(scorer)));

    // ── Queue ───────────────────────────────────────────────────────────
    let source: Arc<dyn MessageSource> = match &config.input {
        InputSource::Stdin => Arc::new(JsonLinesSource::stdin()),
        InputSource::File(path) => Arc::new(
            JsonLinesSource::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?,
        ),
    };
    let sink = Arc::new(JsonLinesSink::stdout());

    let consumer = SentimentConsumer::new(
        processor,
        source,
        sink,
        ConsumerConfig::from(&config),
    );

    // Ctrl-C stops intake; in-flight records still complete
    let shutdown = consumer.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C");
            shutdown.trigger();
        }
    });

    let stats = consumer.run().await.context("Consumer stopped")?;
    tracing::info!(
        published = stats.published(),
        malformed = stats.malformed,
        "Social sentiment analysis service stopped"
    );

    Ok(())
}
