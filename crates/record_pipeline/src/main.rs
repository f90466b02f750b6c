use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::time::Duration;

use record_pipeline::logging::{self, LogFormat};
use record_pipeline::{ActivityGenerator, Pipeline, PipelineConfig, SimulatedPersistence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Generate N user records with one worker pool, then persist each record
/// with a second pool, and report every outcome.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of records to generate and process
    #[arg(short = 'n', long, default_value_t = 100)]
    records: usize,

    /// Generation pool size (defaults to the record count)
    #[arg(long)]
    generation_workers: Option<usize>,

    /// Processing pool size (defaults to the record count)
    #[arg(long)]
    processing_workers: Option<usize>,

    /// Simulated cost of generating one record
    #[arg(long, default_value_t = 100)]
    generation_delay_ms: u64,

    /// Simulated cost of persisting one record
    #[arg(long, default_value_t = 1000)]
    processing_delay_ms: u64,

    /// Upper bound (exclusive) on activity log length
    #[arg(long, default_value_t = 1000)]
    max_log_entries: usize,

    /// Seed for reproducible payloads
    #[arg(long)]
    seed: Option<u64>,

    /// Cancel the run if a stage produces nothing for this long
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Make the handler fail every record with an odd id
    #[arg(long)]
    fail_odd: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    #[arg(long, value_enum, default_value_t = LogFormat::Terminal)]
    log_format: LogFormat,
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        let mut builder = PipelineConfig::builder()
            .num_records(self.records)
            .generation_delay(Duration::from_millis(self.generation_delay_ms))
            .processing_delay(Duration::from_millis(self.processing_delay_ms))
            .max_log_entries(self.max_log_entries);

        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(workers) = self.generation_workers {
            builder = builder.generation_workers(workers);
        }
        if let Some(workers) = self.processing_workers {
            builder = builder.processing_workers(workers);
        }
        if let Some(seed) = self.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    let config = cli.config();
    let generator = ActivityGenerator::new(config.generation_delay, config.max_log_entries);
    let mut handler = SimulatedPersistence::new(config.processing_delay);
    if cli.fail_odd {
        handler = handler.fail_when(|record| record.id() % 2 == 1);
    }

    let report = Pipeline::with_collaborators(config, generator, handler)?.run()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        ReportFormat::Text => report.write_text(&mut out)?,
        ReportFormat::Json => writeln!(out, "{}", report.to_json()?)?,
    }

    Ok(())
}
