//! One-shot sort of an S3 notification read from a file (or stdin when no path
//! is given). Prints one JSON line per record and exits non-zero if any record
//! failed.
//!
//! Usage: `sort_event [--dry-run] [--environment NAME] [event.json]`

use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;
use file_sorter::{FileSorter, SortOptions, SorterConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(%error, "sort_event failed");
            ExitCode::from(2)
        }
    }
}

async fn run() -> anyhow::Result<bool> {
    let mut options = SortOptions::default();
    let mut path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dry-run" => options.dry_run = Some(true),
            "--environment" => {
                options.environment = Some(args.next().context("--environment needs a value")?)
            }
            _ => path = Some(arg),
        }
    }

    let body = match &path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("reading {p}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading event from stdin")?;
            buf
        }
    };

    let config = SorterConfig::from_env();
    let sorter = FileSorter::from_config(&config).await?;
    let outcomes = sorter.sort_event(&body, &options).await?;

    let mut all_ok = true;
    for (source, outcome) in outcomes {
        let line = match outcome {
            Ok(result) => serde_json::to_string(&result)?,
            Err(err) => {
                all_ok = false;
                serde_json::json!({
                    "source": source,
                    "success": false,
                    "error": file_sorter::error::ErrorInfo::from(&err),
                })
                .to_string()
            }
        };
        println!("{line}");
    }
    Ok(all_ok)
}
