mod common;
use candela::{Granularity, Interpolation};
use chrono::{TimeDelta, Utc};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();
    let candela = common::engine()?;

    let first = candela.earliest("ETH-USD").await?;
    println!("ETH-USD first traded on {first}");

    let end = Utc::now();
    let start = end - TimeDelta::days(2);
    for policy in [Interpolation::HiLo, Interpolation::Mean] {
        let series = candela
            .prices("ETH-USD", Granularity::H1, start, end, policy)
            .await?;
        let (Some(a), Some(b)) = (series.first(), series.last()) else {
            println!("{policy:?}: no trades");
            continue;
        };
        println!(
            "{policy:?}: {} points, {:.2} -> {:.2}, midpoint {:?}",
            series.len(),
            a.price,
            b.price,
            series.value_at(start + TimeDelta::days(1))
        );
    }

    Ok(())
}
