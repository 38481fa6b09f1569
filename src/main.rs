//! CLI entrypoint for `dmarc-csv`.
//!
//! Resolves the input reports and output destination, converts every report
//! into one CSV file, and prints a short summary. Exit status is 2 for
//! configuration errors, 3 when a report lacks its metadata blocks (also when
//! such files were skipped), and 4 for any other failure.
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dmarc_csv::{
    config::{ConvertConfig, ConvertOptions, FailurePolicy, Output},
    convert::{is_extraction_failure, run},
    io::DEFAULT_MMAP_THRESHOLD_BYTES,
    metadata::DateZone,
    report::render_summary,
};
use log::{LevelFilter, error};

const EXIT_CONFIG: i32 = 2;
const EXIT_EXTRACTION: i32 = 3;
const EXIT_FAILURE: i32 = 4;

#[derive(Parser, Debug)]
#[command(
    name = "dmarc-csv",
    version,
    about = "Convert DMARC aggregate reports (XML) to CSV",
    after_help = "Example: dmarc-csv report.xml 1> outfile.log"
)]
struct Args {
    /// DMARC report file(s) in XML format, or directories of them
    #[arg(value_name = "DMARCFILE", required = true)]
    dmarcfile: Vec<PathBuf>,

    /// Name of output CSV file ("-" for stdout)
    #[arg(short = 'o', long = "outfile")]
    outfile: Option<PathBuf>,

    /// Skip reports without report_metadata/policy_published instead of aborting
    #[arg(long = "skip-invalid")]
    skip_invalid: bool,

    /// Render the report date range in UTC instead of local time
    #[arg(long = "utc")]
    utc: bool,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress summary output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn options(args: &Args) -> ConvertOptions {
    ConvertOptions {
        failure_policy: if args.skip_invalid {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        },
        date_zone: if args.utc {
            DateZone::Utc
        } else {
            DateZone::Local
        },
        mmap_threshold: if args.mmap_threshold == 0 {
            u64::MAX
        } else {
            args.mmap_threshold
        },
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }

    let config = match ConvertConfig::resolve(&args.dmarcfile, args.outfile.as_deref()) {
        Ok(config) => config.with_options(options(&args)),
        Err(e) => {
            error!("{}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let summary = match run(&config) {
        Ok(summary) => summary,
        Err(e) => {
            error!("{:#}", e);
            let code = if is_extraction_failure(&e) {
                EXIT_EXTRACTION
            } else {
                EXIT_FAILURE
            };
            std::process::exit(code);
        }
    };

    if !args.quiet && config.output != Output::Stdout {
        print!(
            "{}",
            render_summary(&summary, &config.output.display_name())
        );
    }
    if !summary.skipped.is_empty() {
        std::process::exit(EXIT_EXTRACTION);
    }
}
