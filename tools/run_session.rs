// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Streaming Session Runner

Runs one real-time classification session over a directory an external
producer writes volume files into.

Usage:
  cargo run --bin run_session -- <data_dir> <train_count> <batch|incremental> <incremental_batch>

Example:
  cargo run --bin run_session -- ./run_data 20 incremental 5

Configuration defaults come from rtdecode_configuration.toml (or built-in
defaults when no file is found); the four positional arguments override it.
Set RUST_LOG to control log verbosity.
*/

use rtdecode::config::{self, RtDecodeConfig};
use rtdecode::session::run_session_from_config;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 5 {
        eprintln!(
            "Usage: {} <data_dir> <train_count> <batch|incremental> <incremental_batch>",
            args[0]
        );
        eprintln!("\nExample:");
        eprintln!("  {} ./run_data 20 incremental 5", args[0]);
        std::process::exit(1);
    }

    // File/env configuration first, positional arguments on top
    let mut run_config: RtDecodeConfig = match config::find_config_file() {
        Ok(path) => {
            println!("📖 Using configuration file {}", path.display());
            config::load_config(Some(&path))?
        }
        Err(_) => RtDecodeConfig::default(),
    };
    run_config.session.data_dir = PathBuf::from(&args[1]);
    run_config.session.train_count = args[2].parse()?;
    run_config.model.kind = args[3].clone();
    run_config.session.incremental_batch = args[4].parse()?;
    config::validate_config(&run_config)?;

    println!("🧠 rtdecode Streaming Session");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Data dir:     {}", run_config.session.data_dir.display());
    println!("   Volumes:      {}", run_config.session.total_count);
    println!("   Train count:  {}", run_config.session.train_count);
    println!("   Label shift:  {}", run_config.session.label_shift);
    println!("   Model:        {}", run_config.model.kind);
    println!("   Incr. batch:  {}", run_config.session.incremental_batch);
    println!();

    let summary = run_session_from_config(&run_config)?;

    println!();
    println!("✅ Session finished");
    println!(
        "   Accuracy:       {:.3} ({}/{} correct)",
        summary.accuracy, summary.correct, summary.classified
    );
    println!("   Training time:  {:?}", summary.training_elapsed);
    println!(
        "   Model updates:  {} applied, {} rejected",
        summary.updates_applied, summary.updates_failed
    );
    Ok(())
}
