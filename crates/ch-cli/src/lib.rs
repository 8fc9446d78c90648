use std::ffi::OsString;
use std::path::PathBuf;

use ch_core::{HostError, CALL_INS, CATALOG_VERSION};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod check;
mod cli_args;
mod error_map;
mod replay;

pub(crate) use cli_args::{CheckArgs, Cli, Mode, RunArgs};
pub(crate) use error_map::{
    emit_error, map_cli_data_path, map_cli_events_read, map_cli_output, map_cli_scan,
};

/// Env var consulted before `RUST_LOG` for the log filter.
pub const LOG_ENV: &str = "CALLIN_LOG";

/// Installs the stderr subscriber; stdout carries the result protocol.
/// Later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    init_tracing();
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, HostError> {
    match cli.command {
        Mode::Check(args) => check::run_check(args),
        Mode::Run(args) => replay::run_replay(args),
        Mode::Callins => run_callins(),
    }
}

fn run_callins() -> Result<i32, HostError> {
    println!("RESULT:OK");
    println!("CATALOG:{}", CATALOG_VERSION);
    for def in CALL_INS {
        println!("CALLIN_JSON:{}", to_json(def)?);
    }
    Ok(0)
}

pub(crate) fn to_json(value: &impl Serialize) -> Result<String, HostError> {
    serde_json::to_string(value).map_err(map_cli_output)
}

pub(crate) fn resolve_data_dir(data_dir: &str) -> Result<PathBuf, HostError> {
    let path = PathBuf::from(data_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_data_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(HostError::new(
            "CLI_DATA_NOT_FOUND",
            format!("data-dir does not exist: {}", absolute.display()),
        ));
    }
    if !absolute.is_dir() {
        return Err(HostError::new(
            "CLI_DATA_NOT_DIR",
            format!("data-dir is not a directory: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

#[cfg(test)]
mod tests;
