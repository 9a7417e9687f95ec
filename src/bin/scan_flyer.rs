//! CLI: scan a flyer PDF and print the result as JSON.
//!
//! ```text
//! scan_flyer <flyer.pdf> [--pages FROM-TO] [--learning]
//! ```
//!
//! Logging goes to stderr via `RUST_LOG` (e.g. `RUST_LOG=debug`).

use std::process::ExitCode;

use flyer_scan::{ScanConfig, Scanner, Services};

fn usage() -> ExitCode {
    eprintln!("usage: scan_flyer <flyer.pdf> [--pages FROM-TO] [--learning]");
    ExitCode::from(2)
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        return usage();
    };

    let mut config = ScanConfig::default();
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--pages" => {
                let Some(range) = args.next() else {
                    return usage();
                };
                let Some((from, to)) = range.split_once('-') else {
                    return usage();
                };
                match (from.parse(), to.parse()) {
                    (Ok(from), Ok(to)) => config = config.with_page_range(from, to),
                    _ => return usage(),
                }
            }
            "--learning" => config = config.with_learning_mode(true),
            _ => return usage(),
        }
    }

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("error: cannot read {path}: {err}");
            return ExitCode::FAILURE;
        }
    };

    let file_name = std::path::Path::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    let scanner = Scanner::new(Services::with_defaults(), config);
    match scanner.scan(&bytes, file_name.as_deref()) {
        Ok(result) => {
            log::info!(
                "{}: {} offers from {} pages",
                path,
                result.offers.len(),
                result.scan_stats.total_pages
            );
            match serde_json::to_string_pretty(&result) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: serialization failed: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => {
            eprintln!("error: scan failed: {err}");
            ExitCode::FAILURE
        }
    }
}
