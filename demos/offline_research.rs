//! Run the whole pipeline offline and print the rendered essay.
//!
//! ```text
//! RUST_LOG=info cargo run --example offline_research -- "tidal energy" 4 2 html
//! ```
//!
//! Arguments: topic, intensity, variations per role, output format (markdown, latex, html).

use essayforge::event::ProgressBoard;
use essayforge::output::{render, OutputFormat};
use essayforge::{EssayForge, EssayForgeConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    essayforge::init_logger();

    let mut args = std::env::args().skip(1);
    let topic = args
        .next()
        .unwrap_or_else(|| "The Future of Renewable Energy".to_string());
    let intensity: i64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(5);
    let variations: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(2);
    let format: OutputFormat = args
        .next()
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or_default();

    let config = EssayForgeConfig::default()
        .with_offline(true)
        .with_intensity(intensity)
        .with_variations_per_role(variations)
        .with_max_concurrency(4);

    let board = Arc::new(ProgressBoard::new());
    let forge = EssayForge::new(config)?.with_progress_sink(board.clone());
    let report = forge.run(&topic).await?;

    println!("{}", render(&report.document, Some(&report.quality), format));

    let snapshot = board.snapshot();
    eprintln!("--- run {} ---", report.run_id);
    eprintln!(
        "tasks: {} total, {} selected, {} failed, {} skipped",
        snapshot.tasks.len(),
        report.selected.len(),
        report.failed_tasks.len(),
        report.skipped_tasks.len()
    );
    eprintln!(
        "tokens: {}  cost: ${:.4}  overall quality: {:.2}",
        report.budget.total_tokens, report.budget.total_cost, report.quality.overall_score
    );
    Ok(())
}
