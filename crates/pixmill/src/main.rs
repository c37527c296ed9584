//! pixmill: apply queued, time-sliced pixel filters to an image file.
//!
//! Loads the input into an image target, queues every `--filter` on it in
//! order, drives the workbench until idle while reporting progress, and
//! writes the result. `sample` filters print their color histogram.
//!
//! # Usage
//!
//! ```text
//! pixmill photo.jpg -o out.png -f blur:'{"radius":4}' -f sepia -f sample
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pixmill_engine::{FilterEvent, FilterOptions, FilterOutput, FilterRequest, Workbench};
use pixmill_io::{ImageSurface, codec};
use serde_json::{Map, Value};

/// Apply pixel filters to an image.
///
/// Filters run in the order given, each as a cooperative job sliced by
/// `--interval-ms`.
#[derive(Parser)]
#[command(name = "pixmill", version)]
struct Cli {
    /// Input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output image; the extension picks PNG or JPEG.
    #[arg(short, long)]
    output: PathBuf,

    /// Filter to queue, as `command` or `command:{json options}`.
    #[arg(short, long = "filter", value_name = "COMMAND[:JSON]", required = true)]
    filters: Vec<String>,

    /// Time budget per slice, in milliseconds.
    #[arg(long, default_value_t = duration_ms(FilterOptions::DEFAULT_INTERVAL))]
    interval_ms: u64,

    /// Run every filter in a single slice.
    #[arg(long)]
    sync: bool,

    /// Seed for `noise` filters that do not set one.
    #[arg(long)]
    seed: Option<u64>,

    /// JPEG output quality in [0, 1].
    #[arg(long, default_value_t = 0.92)]
    quality: f64,

    /// Print events and histograms as JSON lines.
    #[arg(long)]
    json: bool,
}

fn duration_ms(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Options every filter inherits unless its own JSON overrides them.
fn shared_options(cli: &Cli) -> Map<String, Value> {
    let mut shared = Map::new();
    shared.insert("interval".to_owned(), Value::from(cli.interval_ms));
    shared.insert("sync".to_owned(), Value::from(cli.sync));
    if let Some(seed) = cli.seed {
        shared.insert("seed".to_owned(), Value::from(seed));
    }
    shared
}

/// Parse `command[:json]` into a request, layering its options over
/// `shared`.
fn parse_filter(spec: &str, shared: &Map<String, Value>) -> Result<FilterRequest, String> {
    let (command, json) = match spec.split_once(':') {
        Some((command, json)) => (command, Some(json)),
        None => (spec, None),
    };
    let mut options = shared.clone();
    if let Some(json) = json {
        match serde_json::from_str(json) {
            Ok(Value::Object(own)) => options.extend(own),
            Ok(other) => return Err(format!("options for `{command}` must be an object, got {other}")),
            Err(e) => return Err(format!("invalid options for `{command}`: {e}")),
        }
    }
    FilterRequest::parse(command.trim(), Some(&Value::Object(options))).map_err(|e| e.to_string())
}

fn print_histogram(json: bool, colors: &[(String, u64)]) {
    if json {
        let value = serde_json::json!({ "histogram": colors });
        println!("{value}");
        return;
    }
    let total: u64 = colors.iter().map(|(_, n)| n).sum();
    println!("{:<10} {:>10} {:>8}", "Color", "Pixels", "Share");
    for (key, count) in colors {
        #[allow(clippy::cast_precision_loss)]
        let share = *count as f64 * 100.0 / total.max(1) as f64;
        println!("{key:<10} {count:>10} {share:>7.2}%");
    }
}

/// Print one event; returns `false` for a failure.
fn report(json: bool, event: &FilterEvent) -> bool {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Error serializing event: {e}"),
        }
    } else {
        match event {
            FilterEvent::Start { filter, .. } => eprintln!("{filter}: started"),
            FilterEvent::Progress { filter, f, .. } => eprintln!("{filter}: {:>5.1}%", f * 100.0),
            FilterEvent::Complete {
                filter,
                time,
                pending,
                ..
            } => eprintln!("{filter}: done in {time:?} ({pending} queued)"),
            FilterEvent::Failed { filter, error, .. } => eprintln!("{filter}: failed: {error}"),
        }
    }
    !matches!(event, FilterEvent::Failed { .. })
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let shared = shared_options(&cli);
    let mut requests = Vec::with_capacity(cli.filters.len());
    for spec in &cli.filters {
        match parse_filter(spec, &shared) {
            Ok(request) => requests.push(request),
            Err(msg) => {
                eprintln!("Error in filter `{spec}`: {msg}");
                return ExitCode::FAILURE;
            }
        }
    }

    let bytes = match codec::read_file(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };
    if !cli.json {
        eprintln!("Image: {} ({} bytes)", cli.input.display(), bytes.len());
    }

    let mut bench = Workbench::new();
    let target = bench.attach(ImageSurface::from_bytes(bytes));
    let json = cli.json;
    for request in requests {
        let request = request.with_reducer(move |_, output| {
            if let FilterOutput::Histogram { colors } = output {
                print_histogram(json, colors);
            }
        });
        if let Err(e) = bench.submit(target, request) {
            eprintln!("Error queueing filter: {e}");
            return ExitCode::FAILURE;
        }
    }

    let mut ok = true;
    loop {
        let busy = bench.tick();
        for event in bench.take_events() {
            ok &= report(json, &event);
        }
        if !busy {
            break;
        }
    }

    let Some(surface) = bench.surface(target) else {
        eprintln!("Error: target vanished");
        return ExitCode::FAILURE;
    };
    let pixels = match surface.read_pixels() {
        Ok(pixels) => pixels,
        Err(e) => {
            eprintln!("Error reading result: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = codec::write_file(&cli.output, &pixels, cli.quality) {
        eprintln!("Error writing {}: {e}", cli.output.display());
        return ExitCode::FAILURE;
    }
    if !cli.json {
        eprintln!(
            "Written {} ({}x{})",
            cli.output.display(),
            pixels.width(),
            pixels.height()
        );
    }

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
