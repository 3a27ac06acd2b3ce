use std::io::{self, BufWriter};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use log_merge::printer::WriterPrinter;
use log_merge::source::{AsyncJsonLinesSource, JsonLinesSource, RandomLogSource};
use log_merge::{
    AsyncSortedMerger, LogEntry, MergeConfig, MergeSummary, OrderCheck, SortedMerger, TieBreak,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "log-merge",
    about = "Merge time-sorted JSON lines log files into one time-ordered stream on stdout"
)]
struct Cli {
    #[arg(
        num_args = 0..,
        help = "JSON lines files, one {\"date\", \"msg\"} object per line, each sorted by date",
        value_parser(parse_valid_file)
    )]
    files: Vec<String>,

    #[arg(long = "async", help = "Pull sources through the async merger")]
    use_async: bool,

    #[arg(long, default_value_t = 0, help = "Merge N generated sources instead of files")]
    synthetic_sources: usize,

    #[arg(long, default_value_t = 1000, help = "Records per generated source")]
    synthetic_records: usize,

    #[arg(long, default_value_t = 0, help = "Max simulated latency per async pull, in ms")]
    synthetic_latency_ms: u64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, value_enum, default_value_t = TieBreakArg::SourceIndex)]
    tie_break: TieBreakArg,

    #[arg(long, value_enum, default_value_t = OrderCheckArg::Warn)]
    order_check: OrderCheckArg,

    #[arg(long, default_value_t = 100000, help = "Log progress every N records, 0 disables")]
    progress_interval: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum TieBreakArg {
    SourceIndex,
    InsertionOrder,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderCheckArg {
    Off,
    Warn,
    Fail,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::SourceIndex => TieBreak::SourceIndex,
            TieBreakArg::InsertionOrder => TieBreak::InsertionOrder,
        }
    }
}

impl From<OrderCheckArg> for OrderCheck {
    fn from(arg: OrderCheckArg) -> Self {
        match arg {
            OrderCheckArg::Off => OrderCheck::Off,
            OrderCheckArg::Warn => OrderCheck::Warn,
            OrderCheckArg::Fail => OrderCheck::Fail,
        }
    }
}

fn parse_valid_file(file: &str) -> Result<String, String> {
    if Path::new(file).is_file() {
        Ok(file.to_string())
    } else {
        Err(format!("Invalid file '{file}'"))
    }
}

fn init_tracing() {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::rfc_3339();
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_timer(timer)
        .with_writer(io::stderr)
        .try_init()
    {
        eprintln!("Failed to set logger: {e:?}");
    }
}

fn synthetic_sources(cli: &Cli) -> Vec<RandomLogSource> {
    let start = Utc::now() - chrono::Duration::days(1);
    (0..cli.synthetic_sources)
        .map(|idx| {
            RandomLogSource::new(cli.seed.wrapping_add(idx as u64), start, cli.synthetic_records)
                .with_max_step(Duration::from_secs(60))
                .with_max_latency(Duration::from_millis(cli.synthetic_latency_ms))
        })
        .collect()
}

async fn run(cli: Cli) -> anyhow::Result<MergeSummary> {
    let order_check: OrderCheck = cli.order_check.into();
    let config = MergeConfig::builder()
        .with_tie_break(cli.tie_break.into())
        .with_order_check(order_check)
        .with_progress_interval(cli.progress_interval)
        .build();
    let mut printer: WriterPrinter<_, LogEntry> =
        WriterPrinter::new(BufWriter::new(io::stdout())).with_order_check(order_check);

    let summary = if cli.synthetic_sources > 0 {
        let mut sources = synthetic_sources(&cli);
        if cli.use_async {
            AsyncSortedMerger::new(config).merge(&mut sources, &mut printer).await?
        } else {
            SortedMerger::new(config).merge(&mut sources, &mut printer)?
        }
    } else if cli.files.is_empty() {
        bail!("no input, pass JSON lines files or --synthetic-sources");
    } else if cli.use_async {
        let mut sources = Vec::with_capacity(cli.files.len());
        for file in &cli.files {
            let source: AsyncJsonLinesSource<LogEntry, _> = AsyncJsonLinesSource::open(file)
                .await
                .with_context(|| format!("failed to open {file}"))?;
            sources.push(source);
        }
        AsyncSortedMerger::new(config).merge(&mut sources, &mut printer).await?
    } else {
        let mut sources = Vec::with_capacity(cli.files.len());
        for file in &cli.files {
            let source: JsonLinesSource<LogEntry, _> =
                JsonLinesSource::open(file).with_context(|| format!("failed to open {file}"))?;
            sources.push(source);
        }
        SortedMerger::new(config).merge(&mut sources, &mut printer)?
    };
    Ok(summary)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(summary) => {
            info!(
                sources = summary.sources,
                emitted = summary.emitted,
                records_per_sec = summary.records_per_sec(),
                "log-merge finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("log-merge: {e:#}");
            ExitCode::FAILURE
        }
    }
}
