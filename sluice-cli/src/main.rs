//! CLI for the sluice write path.
//!
//! Generates synthetic line-protocol load and pushes it to a database write
//! endpoint, one streamed request per batch.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sluice::{
    Client, ClientConfig, Consistency, FieldValue, HttpClient, LineMetric, Metric, Precision,
    StreamEncoder,
};

/// sluice — Streaming line-protocol load generator.
#[derive(Parser)]
#[command(name = "sluice", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the target database (or run another administrative command).
    CreateDb {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Command to run instead of `CREATE DATABASE <db>`.
        #[arg(long, default_value = "")]
        command: String,
    },

    /// Generate points and write them in batches.
    Write {
        #[command(flatten)]
        conn: ConnectionArgs,

        /// Total number of points to write.
        #[arg(long, default_value = "100000")]
        points: u64,

        /// Points per write request.
        #[arg(long, default_value = "5000")]
        batch_size: u64,

        /// Number of concurrent writer threads.
        #[arg(long, default_value = "4")]
        workers: u64,

        /// Number of distinct series (host tag values).
        #[arg(long, default_value = "100")]
        series: u64,

        /// Encode each batch fully before sending instead of streaming it.
        #[arg(long)]
        buffered: bool,

        /// Output format for the summary.
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Connection and write-parameter flags shared by every command.
#[derive(Args)]
struct ConnectionArgs {
    /// Base URL of the database.
    #[arg(long, default_value = sluice::config::DEFAULT_BASE_URL)]
    url: String,

    /// Target database.
    #[arg(long, default_value = sluice::config::DEFAULT_DATABASE)]
    db: String,

    /// Retention policy (empty to use the database default).
    #[arg(long, default_value = sluice::config::DEFAULT_RETENTION_POLICY)]
    rp: String,

    /// Timestamp precision: n, u, ms, s, m, h.
    #[arg(long, value_parser = parse_precision)]
    precision: Option<Precision>,

    /// Write consistency: any, one, quorum, all.
    #[arg(long, value_parser = parse_consistency)]
    consistency: Option<Consistency>,

    /// Basic auth username.
    #[arg(long, default_value = "")]
    user: String,

    /// Basic auth password.
    #[arg(long, default_value = "")]
    pass: String,

    /// Request timeout in milliseconds.
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// User-Agent header value.
    #[arg(long, default_value = sluice::config::DEFAULT_USER_AGENT)]
    user_agent: String,
}

impl ConnectionArgs {
    fn to_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.url)
            .with_database(&self.db)
            .with_retention_policy(&self.rp)
            .with_credentials(&self.user, &self.pass)
            .with_user_agent(&self.user_agent)
            .with_timeout(Duration::from_millis(self.timeout_ms));
        config.params.precision = self.precision;
        config.params.consistency = self.consistency;
        config
    }
}

/// Output format for the write summary.
#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// A single JSON object.
    Json,
}

/// Result of a `write` run.
#[derive(Debug, Default, Serialize)]
struct WriteSummary {
    points: u64,
    bytes: u64,
    batches: u64,
    failed_batches: u64,
    elapsed_secs: f64,
    points_per_sec: f64,
}

/// Per-worker counters, folded into the summary at the end.
#[derive(Debug, Default)]
struct WorkerStats {
    points: u64,
    bytes: u64,
    batches: u64,
    failed_batches: u64,
}

fn parse_precision(s: &str) -> Result<Precision, String> {
    Precision::parse(s).ok_or_else(|| format!("unknown precision '{s}' (expected n, u, ms, s, m, h)"))
}

fn parse_consistency(s: &str) -> Result<Consistency, String> {
    Consistency::parse(s)
        .ok_or_else(|| format!("unknown consistency '{s}' (expected any, one, quorum, all)"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::CreateDb { conn, command } => cmd_create_db(&conn, &command),
        Commands::Write {
            conn,
            points,
            batch_size,
            workers,
            series,
            buffered,
            format,
        } => cmd_write(&conn, points, batch_size, workers, series, buffered, &format),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Implements `sluice create-db`.
fn cmd_create_db(conn: &ConnectionArgs, command: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpClient::new(conn.to_config())?;
    client.create_database(command)?;
    client.close()?;

    let shown = if command.is_empty() {
        format!("CREATE DATABASE {}", conn.db)
    } else {
        command.to_string()
    };
    println!("OK: {shown}");
    Ok(())
}

/// Implements `sluice write`.
#[allow(clippy::cast_precision_loss)] // throughput is informational
fn cmd_write(
    conn: &ConnectionArgs,
    points: u64,
    batch_size: u64,
    workers: u64,
    series: u64,
    buffered: bool,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if batch_size == 0 || workers == 0 || series == 0 {
        return Err("--batch-size, --workers and --series must be greater than zero".into());
    }

    let client = HttpClient::new(conn.to_config())?;
    let start_ts = i64::try_from(SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos())?;
    let batches = points.div_ceil(batch_size);

    tracing::info!(
        url = client.write_url(),
        points,
        batches,
        workers,
        buffered,
        "starting write"
    );

    let start = Instant::now();
    let stats = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let client = &client;
                let plan = BatchPlan {
                    points,
                    batch_size,
                    series,
                    start_ts,
                };
                scope.spawn(move || run_worker(client, &plan, worker, workers, buffered))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(_) => Err("writer thread panicked".into()),
            })
            .collect::<Result<Vec<_>, Box<dyn std::error::Error + Send + Sync>>>()
    })
    .map_err(|e| -> Box<dyn std::error::Error> { e })?;
    let elapsed = start.elapsed();
    client.close()?;

    let mut summary = WriteSummary::default();
    for s in &stats {
        summary.points += s.points;
        summary.bytes += s.bytes;
        summary.batches += s.batches;
        summary.failed_batches += s.failed_batches;
    }
    summary.elapsed_secs = elapsed.as_secs_f64();
    if summary.elapsed_secs > 0.0 {
        summary.points_per_sec = summary.points as f64 / summary.elapsed_secs;
    }

    match format {
        OutputFormat::Text => {
            println!("Points written:  {}", summary.points);
            println!("Bytes written:   {}", summary.bytes);
            println!("Batches:         {}", summary.batches);
            println!("Failed batches:  {}", summary.failed_batches);
            println!("Elapsed:         {:.3}s", summary.elapsed_secs);
            println!("Throughput:      {:.0} points/sec", summary.points_per_sec);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    if summary.failed_batches > 0 {
        return Err(format!("{} of {} batches failed", summary.failed_batches, batches).into());
    }
    Ok(())
}

/// Shape of the generated load, shared by every worker.
#[derive(Debug, Clone, Copy)]
struct BatchPlan {
    points: u64,
    batch_size: u64,
    series: u64,
    start_ts: i64,
}

impl BatchPlan {
    /// Builds batch number `index`. Point `p` goes to host `p % series` with
    /// timestamp `start_ts + p`.
    fn build(&self, index: u64) -> sluice::Result<Vec<LineMetric>> {
        let first = index * self.batch_size;
        let last = (first + self.batch_size).min(self.points);

        (first..last)
            .map(|p| {
                let host = format!("server-{}", p % self.series);
                let value = i64::try_from(p).unwrap_or(i64::MAX);
                LineMetric::new(
                    "cpu",
                    &[("host", host.as_str())],
                    &[("value", FieldValue::Int(value))],
                    self.start_ts.saturating_add(value),
                )
            })
            .collect()
    }
}

/// Writes every batch whose index is congruent to `worker` modulo `workers`.
///
/// Write failures are counted, not retried.
fn run_worker<C: Client>(
    client: &C,
    plan: &BatchPlan,
    worker: u64,
    workers: u64,
    buffered: bool,
) -> Result<WorkerStats, Box<dyn std::error::Error + Send + Sync>> {
    let batches = plan.points.div_ceil(plan.batch_size);
    let mut stats = WorkerStats::default();

    for index in (worker..batches).step_by(usize::try_from(workers)?) {
        let batch = plan.build(index)?;
        let count = batch.len() as u64;

        let result = if buffered {
            let payload: Vec<u8> = batch.iter().flat_map(|m| m.serialize()).collect();
            client.write(&payload).map(|n| n as u64)
        } else {
            let encoder = StreamEncoder::new(batch);
            let size = encoder.encoded_len();
            client.write_stream(encoder, size)
        };

        stats.batches += 1;
        match result {
            Ok(bytes) => {
                stats.points += count;
                stats.bytes += bytes;
            }
            Err(e) => {
                stats.failed_batches += 1;
                tracing::warn!(worker, batch = index, error = %e, "batch write failed");
            }
        }
    }

    tracing::debug!(worker, batches = stats.batches, "worker finished");
    Ok(stats)
}
