//! CLI for the minuet time-series client.
//!
//! Provides commands for creating series, appending samples, querying
//! ranges, and inspecting metadata on a remote time-series store.

use clap::{Parser, Subcommand, ValueEnum};
use minuet::{
    Aggregation, AggregationType, Client, CreateOptions, DuplicatePolicy, RangeOptions, TimeBound,
    Timestamp,
};

/// minuet — typed client CLI for a Redis-backed time-series store.
#[derive(Parser)]
#[command(name = "minuet", version, about)]
struct Cli {
    /// Server URL.
    #[arg(long, default_value = "redis://127.0.0.1:6379", global = true)]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create a new series.
    Create {
        /// Series key.
        key: String,

        /// Retention window in milliseconds.
        #[arg(long)]
        retention_ms: Option<u64>,

        /// Keep samples uncompressed.
        #[arg(long)]
        uncompressed: bool,

        /// Chunk size in bytes.
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Duplicate policy (block, first, last, min, max).
        #[arg(long)]
        duplicate_policy: Option<String>,

        /// Metadata label as key=value (repeatable).
        #[arg(long = "label")]
        labels: Vec<String>,
    },

    /// Append a sample to a series.
    Add {
        /// Series key.
        key: String,

        /// Sample value.
        value: f64,

        /// Sample timestamp in milliseconds, or "*" for the server clock.
        #[arg(long, default_value = "*")]
        timestamp: String,
    },

    /// Query a sample range from a series.
    Range {
        /// Series key.
        key: String,

        /// Range start: milliseconds, or "-" for the earliest sample.
        #[arg(long, default_value = "-")]
        from: String,

        /// Range end: milliseconds, or "+" for the latest sample.
        #[arg(long, default_value = "+")]
        to: String,

        /// Maximum number of returned samples.
        #[arg(long)]
        count: Option<u64>,

        /// Aggregation type (avg, sum, min, max, range, count, first,
        /// last, std.p, std.s, var.p, var.s).
        #[arg(long, requires = "bucket_ms")]
        aggregation: Option<String>,

        /// Aggregation bucket width in milliseconds.
        #[arg(long, requires = "aggregation")]
        bucket_ms: Option<u64>,

        /// Query in descending timestamp order.
        #[arg(long)]
        rev: bool,

        /// Output format.
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
    },

    /// Display series metadata, labels, and compaction rules.
    Info {
        /// Series key.
        key: String,
    },

    /// List series keys matching filter expressions.
    Keys {
        /// Filter expressions (label=value form).
        #[arg(required = true)]
        filters: Vec<String>,
    },
}

/// Output format for query results.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// JSON array of objects.
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match connect(&cli.url) {
        Ok(client) => run(client, cli.command),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Opens a connection to the store and wraps it in a typed client.
fn connect(url: &str) -> Result<Client<redis::Connection>, Box<dyn std::error::Error>> {
    let redis = redis::Client::open(url)?;
    Ok(Client::new(redis.get_connection()?))
}

fn run(
    mut client: Client<redis::Connection>,
    command: Commands,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Create {
            key,
            retention_ms,
            uncompressed,
            chunk_size,
            duplicate_policy,
            labels,
        } => cmd_create(
            &mut client,
            &key,
            retention_ms,
            uncompressed,
            chunk_size,
            duplicate_policy.as_deref(),
            &labels,
        ),
        Commands::Add {
            key,
            value,
            timestamp,
        } => cmd_add(&mut client, &key, value, &timestamp),
        Commands::Range {
            key,
            from,
            to,
            count,
            aggregation,
            bucket_ms,
            rev,
            format,
        } => cmd_range(
            &mut client,
            &key,
            &from,
            &to,
            count,
            aggregation.as_deref(),
            bucket_ms,
            rev,
            &format,
        ),
        Commands::Info { key } => cmd_info(&mut client, &key),
        Commands::Keys { filters } => cmd_keys(&mut client, &filters),
    }
}

/// Implements `minuet create <key>`.
fn cmd_create(
    client: &mut Client<redis::Connection>,
    key: &str,
    retention_ms: Option<u64>,
    uncompressed: bool,
    chunk_size: Option<u64>,
    duplicate_policy: Option<&str>,
    labels: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = CreateOptions {
        retention_ms,
        uncompressed,
        chunk_size,
        ..Default::default()
    };

    // Unknown policy tags fail here, before anything is sent.
    if let Some(tag) = duplicate_policy {
        options.duplicate_policy = Some(tag.parse::<DuplicatePolicy>()?);
    }

    for label in labels {
        let (k, v) = label
            .split_once('=')
            .ok_or_else(|| format!("Invalid label '{label}' (expected key=value)"))?;
        options.labels.insert(k.to_string(), v.to_string());
    }

    client.create(key, &options)?;
    println!("Created series '{key}'");
    Ok(())
}

/// Implements `minuet add <key> <value>`.
fn cmd_add(
    client: &mut Client<redis::Connection>,
    key: &str,
    value: f64,
    timestamp: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let timestamp = parse_timestamp(timestamp)?;
    let inserted_at = client.add(key, timestamp, value, &Default::default())?;
    println!("{inserted_at}");
    Ok(())
}

/// Implements `minuet range <key>`.
#[allow(clippy::too_many_arguments)]
fn cmd_range(
    client: &mut Client<redis::Connection>,
    key: &str,
    from: &str,
    to: &str,
    count: Option<u64>,
    aggregation: Option<&str>,
    bucket_ms: Option<u64>,
    rev: bool,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = RangeOptions {
        count,
        ..Default::default()
    };

    if let (Some(tag), Some(bucket_ms)) = (aggregation, bucket_ms) {
        options.aggregation = Some(Aggregation::new(tag.parse::<AggregationType>()?, bucket_ms));
    }

    let from = parse_bound(from)?;
    let to = parse_bound(to)?;
    let samples = if rev {
        client.rev_range(key, from, to, &options)?
    } else {
        client.range(key, from, to, &options)?
    };

    match format {
        OutputFormat::Csv => {
            println!("# series={key}, samples={}", samples.len());
            println!("timestamp_ms,value");
            for sample in &samples {
                println!("{},{}", sample.timestamp, sample.value);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "series": key,
                "count": samples.len(),
                "samples": samples,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Implements `minuet info <key>`.
fn cmd_info(
    client: &mut Client<redis::Connection>,
    key: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let info = client.info(key)?;

    println!("Series: {key}");
    println!("  Samples: {}", info.total_samples);
    println!("  Memory: {} bytes", info.memory_usage);
    println!("  Retention: {} ms", info.retention_ms);
    println!("  First timestamp: {}", info.first_timestamp);
    println!("  Last timestamp: {}", info.last_timestamp);
    println!("  Chunks: {}", info.chunk_count);

    if let Some(chunk_size) = info.chunk_size {
        println!("  Chunk size: {chunk_size} bytes");
    }
    if let Some(policy) = info.duplicate_policy {
        println!("  Duplicate policy: {policy}");
    }
    if let Some(source_key) = &info.source_key {
        println!("  Source series: {source_key}");
    }

    if !info.labels.is_empty() {
        println!("  Labels:");
        for (k, v) in &info.labels {
            println!("    {k}={v}");
        }
    }

    if !info.rules.is_empty() {
        println!("  Compaction rules:");
        for rule in &info.rules {
            println!(
                "    -> {} ({} per {} ms)",
                rule.dest_key, rule.aggregation, rule.bucket_ms
            );
        }
    }

    Ok(())
}

/// Implements `minuet keys <filters>...`.
fn cmd_keys(
    client: &mut Client<redis::Connection>,
    filters: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    for key in client.query_index(filters)? {
        println!("{key}");
    }
    Ok(())
}

/// Parses a timestamp argument: milliseconds or the `*` sentinel.
fn parse_timestamp(text: &str) -> Result<Timestamp, Box<dyn std::error::Error>> {
    if text == "*" {
        return Ok(Timestamp::Auto);
    }
    Ok(Timestamp::Millis(text.parse()?))
}

/// Parses a range bound: milliseconds or the `-`/`+` sentinels.
fn parse_bound(text: &str) -> Result<TimeBound, Box<dyn std::error::Error>> {
    match text {
        "-" => Ok(TimeBound::Earliest),
        "+" => Ok(TimeBound::Latest),
        ms => Ok(TimeBound::At(ms.parse()?)),
    }
}
