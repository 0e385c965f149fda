//! plinko-forge offline tooling
//!
//! Generates, scrubs and exports animation libraries. This is a build-time
//! tool: it runs against a file-backed library directory, never against a
//! live game session.

use std::error::Error;
use std::path::Path;
use std::process;

use plinko_forge::library::{AnimationLibrary, GenerationProgress};
use plinko_forge::sim::{QualityThreshold, SimulationConfig};
use plinko_forge::storage::FileStorage;

const USAGE: &str = "\
usage: plinko-forge <command> [options]

commands:
  generate   build the approved animation set for a row count
  export     write one row count as a versioned JSON asset
  scrub      reassign stored animations whose endpoints drifted

options:
  --rows <n>        board row count (default 12)
  --per-bucket <n>  approved animations per bucket (default 5)
  --seed <n>        master seed for reproducible generation (default 1)
  --fps <n>         keyframe sampling rate (default 30)
  --data-dir <dir>  library directory (default ./plinko-data)
  --out <file>      export destination (generate/export)
";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("generate") => generate(&args[1..]),
        Some("export") => export(&args[1..]),
        Some("scrub") => scrub(&args[1..]),
        _ => {
            eprint!("{USAGE}");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        log::error!("{e}");
        process::exit(2);
    }
}

/// Value of `--name` in the argument list
fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parsed<T: std::str::FromStr>(args: &[String], name: &str, default: T) -> Result<T, String> {
    match flag(args, name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("invalid value for {name}: {raw}")),
    }
}

fn open_library(args: &[String]) -> AnimationLibrary {
    let dir = flag(args, "--data-dir").unwrap_or("./plinko-data");
    AnimationLibrary::new(Box::new(FileStorage::new(dir)))
}

fn generate(args: &[String]) -> Result<(), Box<dyn Error>> {
    let config = SimulationConfig {
        row_count: parsed(args, "--rows", 12u32)?,
        frame_rate: parsed(args, "--fps", 30u32)?,
        max_duration_ms: 5000.0,
        animations_per_bucket: parsed(args, "--per-bucket", 5u32)?,
        quality: QualityThreshold::default(),
    };
    let master_seed: u64 = parsed(args, "--seed", 1u64)?;

    log::info!(
        "generating {} rows, {} per bucket, seed {master_seed}",
        config.row_count,
        config.animations_per_bucket
    );

    let mut library = open_library(args);
    let mut on_progress = |p: GenerationProgress| {
        log::info!(
            "bucket {}: {}/{} approved ({} attempts)",
            p.bucket,
            p.approved,
            p.quota,
            p.attempts
        );
    };
    let report = library.generate_animations(&config, master_seed, Some(&mut on_progress));

    for outcome in &report.buckets {
        if outcome.shortfall > 0 {
            log::warn!(
                "bucket {} under-populated: short {} animations",
                outcome.bucket,
                outcome.shortfall
            );
        }
    }
    log::info!(
        "done: {} animations approved, fully populated: {}",
        report.total_approved(),
        report.fully_populated()
    );

    if let Some(out) = flag(args, "--out") {
        library.write_export(config.row_count, Path::new(out))?;
        log::info!("exported to {out}");
    }
    Ok(())
}

fn export(args: &[String]) -> Result<(), Box<dyn Error>> {
    let rows: u32 = parsed(args, "--rows", 12u32)?;
    let out = flag(args, "--out").ok_or("export requires --out <file>")?;
    let library = open_library(args);
    library.write_export(rows, Path::new(out))?;
    log::info!(
        "exported {} animations for {rows} rows to {out}",
        library.animation_count(rows)
    );
    Ok(())
}

fn scrub(args: &[String]) -> Result<(), Box<dyn Error>> {
    let mut library = open_library(args);
    let report = library.scrub_and_reassign();
    log::info!(
        "scrub: {} checked, {} moved, {} unchanged",
        report.checked,
        report.moved,
        report.unchanged
    );
    for detail in &report.details {
        log::info!(
            "  {} ({} rows): bucket {} -> {}",
            detail.id,
            detail.row_count,
            detail.from_bucket,
            detail.to_bucket
        );
    }
    Ok(())
}
