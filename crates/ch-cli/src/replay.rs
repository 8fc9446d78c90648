use std::fs;
use std::path::Path;

use ch_api::{create_handle_set, parse_events, CreateHandleSetOptions, HostConfig};
use ch_core::HostError;
use tracing::debug;

use crate::{map_cli_events_read, resolve_data_dir, to_json, RunArgs};

pub(crate) fn load_config(args: &RunArgs) -> Result<HostConfig, HostError> {
    let mut config = match &args.config {
        Some(path) => HostConfig::from_file(Path::new(path))?,
        None => HostConfig::default(),
    };
    if args.dev_mode {
        config.dev_mode = true;
    }
    if args.mod_ui_ctrl {
        config.mod_ui_ctrl = true;
    }
    Ok(config)
}

pub(crate) fn run_replay(args: RunArgs) -> Result<i32, HostError> {
    let data_dir = resolve_data_dir(&args.data_dir)?;
    let config = load_config(&args)?;
    let text = fs::read_to_string(&args.events).map_err(map_cli_events_read)?;
    let events = parse_events(&text)?;

    let mut set = create_handle_set(CreateHandleSetOptions { data_dir, config })?;
    let mut lines = Vec::new();
    for (index, event) in events.iter().enumerate() {
        debug!(index, ?event, "dispatching");
        if let Some(answer) = event.dispatch(&set) {
            lines.push(format!("ANSWER:{}|{}", index, to_json(&answer)?));
        }
        for killed in set.reap_killed() {
            lines.push(format!("KILLED:{}|{}", killed.name, to_json(&killed.message)?));
        }
    }

    println!("RESULT:OK");
    println!("EVENTS:{}", events.len());
    for line in lines {
        println!("{}", line);
    }
    for handle in set.handles() {
        println!("CONTEXT:{}|errors={}", handle.name(), handle.error_count());
        for diagnostic in handle.drain_diagnostics() {
            println!("DIAG_JSON:{}|{}", handle.name(), to_json(&diagnostic)?);
        }
    }
    Ok(0)
}
