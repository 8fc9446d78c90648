use std::path::Path;
use std::rc::Rc;

use ch_api::{read_context_sources, DRAW_FILE, MAIN_FILE};
use ch_core::{CapabilityProfile, HandleOrder, HostError};
use ch_runtime::{ContextRegistry, HandleBuilder, Namespace};
use ch_sandbox::SandboxedFs;
use tracing::info;
use walkdir::WalkDir;

use crate::{map_cli_scan, resolve_data_dir, to_json, CheckArgs};

pub(crate) fn run_check(args: CheckArgs) -> Result<i32, HostError> {
    let data_dir = resolve_data_dir(&args.data_dir)?;
    let contexts = find_context_dirs(&data_dir)?;
    if contexts.is_empty() {
        return Err(HostError::new(
            "CLI_DATA_EMPTY",
            format!("No {} found under {}", MAIN_FILE, data_dir.display()),
        ));
    }

    let mut lines = Vec::new();
    let mut failures = 0;
    for name in &contexts {
        match check_context(&data_dir, name) {
            Ok(()) => lines.push(format!("CHECK:OK|{}", name)),
            Err(error) => {
                failures += 1;
                lines.push(format!(
                    "CHECK:FAIL|{}|{}|{}",
                    name,
                    error.code,
                    to_json(&error.message)?
                ));
            }
        }
    }

    println!("RESULT:{}", if failures == 0 { "OK" } else { "CHECK_FAILED" });
    for line in lines {
        println!("{}", line);
    }
    Ok(if failures == 0 { 0 } else { 1 })
}

/// Directories below `data_dir` holding a main file, as forward-slash
/// relative names, sorted.
pub(crate) fn find_context_dirs(data_dir: &Path) -> Result<Vec<String>, HostError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(data_dir).min_depth(2).follow_links(false) {
        let entry = entry.map_err(map_cli_scan)?;
        if !entry.file_type().is_file() || entry.file_name() != MAIN_FILE {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let relative = dir
            .strip_prefix(data_dir)
            .map_err(|error| HostError::new("CLI_DATA_SCAN", error.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
        names.push(relative);
    }
    names.sort();
    Ok(names)
}

/// Loads both namespaces of one context with full access, which runs its
/// top-level code once.
fn check_context(data_dir: &Path, name: &str) -> Result<(), HostError> {
    let sources = read_context_sources(data_dir, name)?;
    let registry = Rc::new(ContextRegistry::new());
    let handle = HandleBuilder::new(name, HandleOrder::Rules, registry)
        .profile(CapabilityProfile::full_access())
        .sandbox(Rc::new(SandboxedFs::new(data_dir)))
        .build();
    if let Some(main) = sources.main.as_deref() {
        handle.load_code(Namespace::Global, main, MAIN_FILE)?;
    }
    if let Some(draw) = sources.draw.as_deref() {
        handle.load_code(Namespace::Registry, draw, DRAW_FILE)?;
    }
    info!(context = name, "check passed");
    Ok(())
}
