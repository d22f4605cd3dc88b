//! End-to-end round trip against a running time-series store.
//!
//! Run with: `cargo run -p minuet --example roundtrip`
//! (expects a server with the time-series module at 127.0.0.1:6379)

use minuet::{Aggregation, AggregationType, Client, CreateOptions, RangeOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let redis = redis::Client::open("redis://127.0.0.1:6379")?;
    let mut client = Client::new(redis.get_connection()?);

    client.create(
        "demo:temperature",
        &CreateOptions::default()
            .with_retention_ms(3_600_000)
            .with_label("room", "lab"),
    )?;

    for (ts, value) in [(1, 21.0), (2, 21.4), (3, 21.1), (4, 22.0)] {
        client.add("demo:temperature", ts, value, &Default::default())?;
    }

    let raw = client.range("demo:temperature", 0, 10, &RangeOptions::default())?;
    println!("raw samples:");
    for sample in &raw {
        println!("  {}: {}", sample.timestamp, sample.value);
    }

    let averaged = client.range(
        "demo:temperature",
        0,
        10,
        &RangeOptions::default().with_aggregation(Aggregation::new(AggregationType::Avg, 2)),
    )?;
    println!("2ms averages:");
    for sample in &averaged {
        println!("  {}: {}", sample.timestamp, sample.value);
    }

    let info = client.info("demo:temperature")?;
    println!(
        "series holds {} samples, retention {} ms",
        info.total_samples, info.retention_ms
    );

    Ok(())
}
