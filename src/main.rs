//! Binary entry point for the filecycle sample driver.
//!
//! The driver takes no arguments: it loads the storage configuration, builds
//! an in-memory store, runs the basic and advanced sample groups in fixed
//! order, reports each failure and continues, and finishes with a janitor
//! sweep over leftover sample shares.

use std::env;
use std::io::{self, Write};
use std::process;

use thiserror::Error;

use filecycle::{
    AdvancedSamples, BasicSamples, Janitor, JanitorConfig, MemoryStore, StorageConfig,
};

const USAGE_EXIT_CODE: i32 = 2;

#[derive(Debug, Error)]
enum DriverError {
    #[error("filecycle takes no arguments; unexpected: {0}")]
    UnexpectedArguments(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cleanup error: {0}")]
    Cleanup(String),
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let exit_code = run(&args, &mut io::stdout(), &mut io::stderr()).await;
    process::exit(exit_code);
}

async fn run(args: &[String], out: &mut dyn Write, errors: &mut dyn Write) -> i32 {
    if !args.is_empty() {
        write_error(errors, &DriverError::UnexpectedArguments(args.join(" ")));
        return USAGE_EXIT_CODE;
    }

    let config = match StorageConfig::load_without_cli_args() {
        Ok(config) => config,
        Err(err) => {
            write_error(errors, &DriverError::Config(err.to_string()));
            return 1;
        }
    };
    let store = match MemoryStore::new(&config) {
        Ok(store) => store,
        Err(err) => {
            write_error(errors, &DriverError::Config(err.to_string()));
            return 1;
        }
    };

    writeln!(out, "file storage samples - starting").ok();
    let mut failed = false;

    let basic = BasicSamples::new(store.clone(), &config.sample_prefix);
    if let Err(err) = basic.run(out).await {
        write_error(errors, &err);
        failed = true;
    }

    let advanced = AdvancedSamples::new(store.clone(), &config.sample_prefix);
    if let Err(err) = advanced.run(out).await {
        write_error(errors, &err);
        failed = true;
    }

    if let Err(err) = sweep(store, &config, out).await {
        write_error(errors, &err);
        failed = true;
    }

    writeln!(out, "file storage samples - completed").ok();
    if failed { 1 } else { 0 }
}

async fn sweep(
    store: MemoryStore,
    config: &StorageConfig,
    out: &mut dyn Write,
) -> Result<(), DriverError> {
    let janitor_config = JanitorConfig::new(&config.sample_prefix)
        .map_err(|err| DriverError::Cleanup(err.to_string()))?;
    let summary = Janitor::new(store, janitor_config)
        .sweep()
        .await
        .map_err(|err| DriverError::Cleanup(err.to_string()))?;
    writeln!(
        out,
        "janitor sweep removed {} leftover share(s)",
        summary.deleted_shares.len()
    )
    .ok();
    Ok(())
}

fn write_error(target: &mut dyn Write, err: &impl std::error::Error) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).expect("output should be utf8")
    }

    #[tokio::test]
    async fn run_without_arguments_reports_every_group_and_exits_zero() {
        let mut out = Vec::new();
        let mut errors = Vec::new();

        let code = run(&[], &mut out, &mut errors).await;

        assert_eq!(code, 0, "stderr: {}", rendered(errors));
        let report = rendered(out);
        assert!(report.contains("basic file operations"), "report: {report}");
        assert!(report.contains("share enumeration"), "report: {report}");
        assert!(report.contains("cors rules"), "report: {report}");
        assert!(report.contains("metrics and retention"), "report: {report}");
        assert!(report.contains("metadata and properties"), "report: {report}");
        assert!(report.contains("janitor sweep removed 0"), "report: {report}");
    }

    #[tokio::test]
    async fn stray_arguments_are_rejected_with_a_usage_error() {
        let mut out = Vec::new();
        let mut errors = Vec::new();

        let code = run(&[String::from("--verbose")], &mut out, &mut errors).await;

        assert_eq!(code, USAGE_EXIT_CODE);
        assert!(rendered(out).is_empty());
        let message = rendered(errors);
        assert!(message.contains("takes no arguments"), "stderr: {message}");
        assert!(message.contains("--verbose"), "stderr: {message}");
    }

    #[test]
    fn write_error_renders_the_error_line() {
        let mut buffer = Vec::new();
        write_error(
            &mut buffer,
            &DriverError::Config(String::from("missing account")),
        );
        assert_eq!(rendered(buffer), "configuration error: missing account\n");
    }

    #[test]
    fn write_error_appends_across_repeated_calls_to_one_sink() {
        let mut buffer = Vec::new();
        let sink: &mut dyn Write = &mut buffer;
        write_error(sink, &DriverError::Config(String::from("first")));
        write_error(sink, &DriverError::Cleanup(String::from("second")));
        assert_eq!(
            rendered(buffer),
            "configuration error: first\ncleanup error: second\n"
        );
    }
}
