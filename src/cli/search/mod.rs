//! Search command - loads the cache and answers one question

use clap::Args;
use tracing::info;

use crate::domain::RetrievalOutcome;
use crate::infrastructure::services::SearchOptions;

/// Arguments for the search command
#[derive(Args, Clone, Debug)]
pub struct SearchArgs {
    /// Question to look up
    pub query: String,

    /// Maximum number of chunks to return (overrides config)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Minimum cosine similarity, exclusive (overrides config)
    #[arg(long)]
    pub threshold: Option<f32>,
}

/// Populate the cache synchronously and print the context block
pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let config = super::bootstrap();

    let state = crate::create_app_state_with_config(&config).await?;
    let report = state.cache().populate().await?;

    info!(
        chunks = report.chunks_loaded,
        skipped = report.rows_skipped,
        duration_ms = report.duration_ms,
        "Cache loaded"
    );

    let options = SearchOptions {
        top_k: args.top_k,
        similarity_threshold: args.threshold,
    };
    let outcome = state
        .retrieval_service
        .search(&args.query, options)
        .await?;

    println!("{}", render(&outcome));

    Ok(())
}

fn render(outcome: &RetrievalOutcome) -> String {
    match outcome {
        RetrievalOutcome::NoMatches => "No relevant documents found.".to_string(),
        other => other.prompt_text().to_string(),
    }
}
