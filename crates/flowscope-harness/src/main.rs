#![forbid(unsafe_code)]

//! flowscope harness binary entry point.

use std::fs;
use std::io;
use std::process;

use flowscope::FlowConfig;
use flowscope_harness::{cli, run};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_env("FLOWSCOPE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() {
    let opts = cli::Opts::parse();
    init_logging();

    let parsed = FlowConfig::from_env_with_diagnostics();
    if !parsed.errors.is_empty() {
        for err in &parsed.errors {
            eprintln!("Invalid environment value: {err}");
        }
        process::exit(1);
    }

    let json = match fs::read_to_string(&opts.file) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", opts.file.display());
            process::exit(1);
        }
    };

    let output = match run(&json, parsed.config, &opts) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    for rejected in &output.rejected {
        eprintln!("Rejected {rejected}");
    }
    match output.snapshot.to_json() {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Failed to serialize snapshot: {e}");
            process::exit(1);
        }
    }
}
