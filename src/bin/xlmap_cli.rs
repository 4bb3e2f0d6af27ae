//! CLI tool for xlmap - maps a layout description and writes XLSX or JSON
//!
//! Usage:
//!   xlmap_cli <layout.xml>                    # Write layout.xlsx next to the input
//!   xlmap_cli <layout.xml> -o out.xlsx        # Write XLSX to a chosen file
//!   xlmap_cli <layout.json> --json            # Mapping report as JSON on stdout
//!   xlmap_cli <layout.xml> --options opts.json
//!
//! Set `RUST_LOG=xlmap=debug` to trace the mapping pass on stderr.

#![allow(clippy::exit)]

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use xlmap::{map_layout, parse_layout, render_xlsx, MapOptions};

const USAGE: &str =
    "Usage: xlmap_cli <layout.xml|layout.json> [-o out.xlsx] [--json] [--options opts.json]";

struct Args {
    input: PathBuf,
    output: Option<PathBuf>,
    json: bool,
    options: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Option<Args> {
    let mut input = None;
    let mut output = None;
    let mut json = false;
    let mut options = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--output" => output = Some(PathBuf::from(iter.next()?)),
            "--json" => json = true,
            "--options" => options = Some(PathBuf::from(iter.next()?)),
            flag if flag.starts_with('-') => return None,
            path if input.is_none() => input = Some(PathBuf::from(path)),
            _ => return None,
        }
    }

    Some(Args {
        input: input?,
        output,
        json,
        options,
    })
}

fn fail(context: &str, e: impl std::fmt::Display) -> ! {
    eprintln!("Error {context}: {e}");
    std::process::exit(1);
}

fn read_text(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(&format!("reading {}", path.display()), e))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(args) = parse_args(&args) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    let options = match &args.options {
        Some(path) => MapOptions::from_json(&read_text(path))
            .unwrap_or_else(|e| fail("parsing options", e)),
        None => MapOptions::default(),
    };

    let layout = parse_layout(&read_text(&args.input))
        .unwrap_or_else(|e| fail("parsing layout", e));
    let mapping = map_layout(&layout, &options).unwrap_or_else(|e| fail("mapping layout", e));

    if args.json {
        let report = mapping
            .report(&options)
            .unwrap_or_else(|e| fail("building report", e));
        let json = serde_json::to_string_pretty(&report)
            .unwrap_or_else(|e| fail("serializing JSON", e));
        match &args.output {
            Some(path) => {
                fs::write(path, &json)
                    .unwrap_or_else(|e| fail(&format!("writing {}", path.display()), e));
                eprintln!("Written: {}", path.display());
            }
            None => {
                let mut stdout = io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{json}") {
                    fail("writing stdout", e);
                }
            }
        }
        return;
    }

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("xlsx"));
    let bytes = render_xlsx(&mapping, &options).unwrap_or_else(|e| fail("writing XLSX", e));
    fs::write(&output, bytes)
        .unwrap_or_else(|e| fail(&format!("writing {}", output.display()), e));
    info!(
        rows = mapping.row_count(),
        columns = mapping.column_count(),
        "rendered layout"
    );
    eprintln!("Written: {}", output.display());
}
