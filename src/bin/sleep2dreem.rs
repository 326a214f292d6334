//! sleep2dreem CLI - Convert sleep exports in a folder into Dreem CSV files
//!
//! Reads every matching export in the input folder, groups the intervals into
//! nights, writes the summaries as CSV and marks the inputs as processed.

use clap::{Parser, ValueEnum};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sleep2dreem::adapters::ExportFormat;
use sleep2dreem::config::{parse_bound, parse_timezone};
use sleep2dreem::files::{
    batch_file_name, discover_inputs, mark_processed, night_file_name, unique_path,
    DEFAULT_FILE_FILTER,
};
use sleep2dreem::grouper::{OvernightWindow, DEFAULT_WINDOW_END_HOUR, DEFAULT_WINDOW_START_HOUR};
use sleep2dreem::resampler::DEFAULT_SEGMENT_SECONDS;
use sleep2dreem::{
    convert_files, ConvertConfig, ConvertError, CsvEncoder, DurationFormat, SummaryRecord,
    PRODUCER_NAME, VERSION,
};

/// sleep2dreem - Apple Health sleep exports to Dreem CSV
#[derive(Parser)]
#[command(name = PRODUCER_NAME)]
#[command(version = VERSION)]
#[command(about = "Convert sleep-stage exports into Dreem CSV summaries", long_about = None)]
struct Cli {
    /// Input folder
    #[arg(short, long, default_value = ".")]
    input: PathBuf,

    /// Output folder (default: same as input folder)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Range start (yyyy-MM-dd or yyyy-MM-dd-HH:mm)
    #[arg(short, long = "from")]
    from: Option<String>,

    /// Range end (yyyy-MM-dd or yyyy-MM-dd-HH:mm)
    #[arg(short, long = "to")]
    to: Option<String>,

    /// Input file filter
    #[arg(short = 'l', long, default_value = DEFAULT_FILE_FILTER)]
    filter: String,

    /// Time shift in seconds (positive or negative)
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    shift: i64,

    /// Time zone for nights and naive timestamps (IANA name or "auto")
    #[arg(long, default_value = "auto")]
    timezone: String,

    /// Hour the overnight window opens
    #[arg(long, default_value_t = DEFAULT_WINDOW_START_HOUR)]
    window_start: u32,

    /// Hour the overnight window closes on the next day
    #[arg(long, default_value_t = DEFAULT_WINDOW_END_HOUR)]
    window_end: u32,

    /// Segment length in seconds (must divide 1800)
    #[arg(long, default_value_t = DEFAULT_SEGMENT_SECONDS)]
    segment_seconds: i64,

    /// Input document layout
    #[arg(long, default_value = "auto")]
    input_format: InputFormat,

    /// Duration rendering in the CSV
    #[arg(long, default_value = "seconds")]
    duration_format: DurationStyle,

    /// Write one CSV per night instead of one per run
    #[arg(long)]
    split_nights: bool,

    /// Leave input files in place instead of renaming them
    #[arg(long)]
    keep_inputs: bool,

    /// Log level or filter directive
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Detect per document
    Auto,
    /// Health Auto Export metrics envelope
    HealthAutoExport,
    /// Bare JSON array of records
    RecordList,
}

impl From<InputFormat> for ExportFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Auto => ExportFormat::Auto,
            InputFormat::HealthAutoExport => ExportFormat::HealthAutoExport,
            InputFormat::RecordList => ExportFormat::RecordList,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum DurationStyle {
    /// Whole seconds
    Seconds,
    /// H:MM:SS
    Clock,
}

impl From<DurationStyle> for DurationFormat {
    fn from(style: DurationStyle) -> Self {
        match style {
            DurationStyle::Seconds => DurationFormat::Seconds,
            DurationStyle::Clock => DurationFormat::Clock,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Install the global subscriber; logs go to stderr
fn setup_logging(log_level: &str) {
    let normalised = match log_level.to_uppercase().as_str() {
        "WARNING" => "warn".to_string(),
        "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    };
    let filter = EnvFilter::try_new(normalised).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), DreemCliError> {
    let timezone = parse_timezone(&cli.timezone)?;
    let window = OvernightWindow::new(cli.window_start, cli.window_end)?;
    let from = cli
        .from
        .as_deref()
        .map(|v| parse_bound(v, timezone, window.start_hour()))
        .transpose()?;
    let to = cli
        .to
        .as_deref()
        .map(|v| parse_bound(v, timezone, window.end_hour()))
        .transpose()?;

    let config = ConvertConfig {
        timezone,
        window,
        segment_seconds: cli.segment_seconds,
        shift_seconds: cli.shift,
        from,
        to,
        input_format: cli.input_format.into(),
        duration_format: cli.duration_format.into(),
    };
    let encoder = CsvEncoder::new(config.duration_format);

    let now = Utc::now().with_timezone(&timezone);
    let (range_from, range_to) = config.date_range(now)?;

    let output_dir = cli.output.unwrap_or_else(|| cli.input.clone());
    info!("input folder: {}", cli.input.display());
    info!("output folder: {}", output_dir.display());
    info!("date range: {} to {}", range_from, range_to);

    let inputs = discover_inputs(&cli.input, &cli.filter)?;
    if inputs.is_empty() {
        info!("no files matching {} found", cli.filter);
    }
    fs::create_dir_all(&output_dir)?;

    let mut report = convert_files(&inputs, config, now)?;

    let written = if cli.split_nights && !report.records.is_empty() {
        report
            .records
            .iter()
            .map(|record| {
                let path = unique_path(&output_dir.join(night_file_name(record)));
                write_csv(&encoder, &path, std::slice::from_ref(record))?;
                Ok(path)
            })
            .collect::<Result<Vec<_>, DreemCliError>>()?
    } else {
        let path = unique_path(&output_dir.join(batch_file_name(&range_from, &range_to)));
        write_csv(&encoder, &path, &report.records)?;
        vec![path]
    };

    if !cli.keep_inputs {
        for path in &report.processed_files {
            mark_processed(path, &mut report.diagnostics);
        }
    }

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    for path in &written {
        writeln!(stdout, "{}", path.display())?;
    }

    info!(
        "{} nights written to {} files, {} inputs failed, {} warnings",
        report.records.len(),
        written.len(),
        report.failed_files.len(),
        report.diagnostics.len()
    );
    Ok(())
}

fn write_csv(encoder: &CsvEncoder, path: &Path, records: &[SummaryRecord]) -> Result<(), DreemCliError> {
    let file = fs::File::create(path)?;
    encoder.write(BufWriter::new(file), records)?;
    info!("output saved to {}", path.display());
    Ok(())
}

// Error types

#[derive(Debug)]
enum DreemCliError {
    Io(io::Error),
    Convert(ConvertError),
}

impl From<io::Error> for DreemCliError {
    fn from(e: io::Error) -> Self {
        DreemCliError::Io(e)
    }
}

impl From<ConvertError> for DreemCliError {
    fn from(e: ConvertError) -> Self {
        DreemCliError::Convert(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<DreemCliError> for CliError {
    fn from(e: DreemCliError) -> Self {
        match e {
            DreemCliError::Io(e) | DreemCliError::Convert(ConvertError::Io(e)) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check folder paths and permissions".to_string()),
            },
            DreemCliError::Convert(e @ ConvertError::InvalidTimezone(_)) => CliError {
                code: "INVALID_TIMEZONE".to_string(),
                message: e.to_string(),
                hint: Some("Use an IANA zone name such as Europe/Paris, or auto".to_string()),
            },
            DreemCliError::Convert(e @ ConvertError::DateParseError(_)) => CliError {
                code: "DATE_PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Use yyyy-MM-dd or yyyy-MM-dd-HH:mm".to_string()),
            },
            DreemCliError::Convert(e @ ConvertError::InvalidConfig(_)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: e.to_string(),
                hint: Some("Check window hours, segment length and date range".to_string()),
            },
            DreemCliError::Convert(e @ ConvertError::Csv(_)) => CliError {
                code: "CSV_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check that the output folder is writable".to_string()),
            },
            DreemCliError::Convert(e) => CliError {
                code: "CONVERT_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
        }
    }
}
