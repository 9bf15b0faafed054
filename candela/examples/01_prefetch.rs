mod common;
use candela::Granularity;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();
    let candela = common::engine()?;

    let report = candela
        .prefetch()
        .products(&["BTC-USD", "ETH-USD", "SOL-USD"])?
        .granularities(&[Granularity::D1, Granularity::H6])
        .progress(std::sync::Arc::new(|pct: u8| eprint!("\r{pct:>3}%")))
        .run()
        .await?;
    eprintln!();

    for entry in &report.entries {
        println!(
            "{} {:>3}: {} candles in [{}, {})",
            entry.product_id,
            entry.granularity.label(),
            entry.candles,
            entry.start.date_naive(),
            entry.end.date_naive()
        );
    }

    if !report.warnings.is_empty() {
        eprintln!("warnings:");
        for w in report.warnings {
            eprintln!("- {} {}: {}", w.product_id, w.granularity, w.error);
        }
    }

    Ok(())
}
