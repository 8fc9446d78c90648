use super::*;

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("callin-host-{}-{}", name, nanos))
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn run_args(args: &[&str]) -> i32 {
    run_cli_from_args(std::iter::once("callin-host").chain(args.iter().copied()))
}

#[test]
fn resolve_data_dir_validates_existence_and_directory() {
    let missing = temp_path("missing-dir");
    let error = resolve_data_dir(missing.to_string_lossy().as_ref())
        .expect_err("missing path should fail");
    assert_eq!(error.code, "CLI_DATA_NOT_FOUND");

    let file_path = temp_path("plain-file");
    write_file(&file_path, "x");
    let error = resolve_data_dir(file_path.to_string_lossy().as_ref())
        .expect_err("file path should fail");
    assert_eq!(error.code, "CLI_DATA_NOT_DIR");
    let _ = fs::remove_file(file_path);
}

#[test]
fn context_dirs_are_found_by_main_file() {
    let root = temp_path("scan");
    write_file(&root.join("LuaRules").join("main.rhai"), "");
    write_file(&root.join("LuaRules").join("draw.rhai"), "");
    write_file(&root.join("mods").join("extra").join("main.rhai"), "");
    write_file(&root.join("LuaUI").join("notes.txt"), "ignored");
    write_file(&root.join("main.rhai"), "top level files are not contexts");

    let names = check::find_context_dirs(&root).expect("scan should pass");
    assert_eq!(names, vec!["LuaRules".to_string(), "mods/extra".to_string()]);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn check_reports_failing_contexts_with_non_zero_exit() {
    let root = temp_path("check");
    write_file(&root.join("LuaRules").join("main.rhai"), "fn GameStart() {}");
    let root_arg = root.to_string_lossy().to_string();
    assert_eq!(run_args(&["check", "--data-dir", &root_arg]), 0);

    write_file(&root.join("LuaGaia").join("main.rhai"), "fn GameStart( {");
    assert_eq!(run_args(&["check", "--data-dir", &root_arg]), 1);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn check_without_contexts_is_an_error() {
    let root = temp_path("empty");
    fs::create_dir_all(&root).expect("root should be created");
    let root_arg = root.to_string_lossy().to_string();
    assert_eq!(run_args(&["check", "--data-dir", &root_arg]), 1);
    let _ = fs::remove_dir_all(root);
}

#[test]
fn config_flags_override_the_config_file() {
    let root = temp_path("config");
    let config_path = root.join("host.json");
    write_file(&config_path, r#"{"devMode": false, "rulesConfig": "0"}"#);

    let args = RunArgs {
        data_dir: root.to_string_lossy().to_string(),
        config: Some(config_path.to_string_lossy().to_string()),
        events: String::new(),
        dev_mode: true,
        mod_ui_ctrl: false,
    };
    let config = replay::load_config(&args).expect("config should load");
    assert!(config.dev_mode);
    assert!(!config.mod_ui_ctrl);
    assert!(!config.rules_enabled());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn run_replays_events_and_rejects_bad_event_files() {
    let root = temp_path("run");
    write_file(
        &root.join("LuaRules").join("main.rhai"),
        "fn GameStart() { Script::Echo(\"started\"); }",
    );
    let events = root.join("events.json");
    write_file(&events, r#"[{"event": "GameStart"}, {"event": "GameOver"}]"#);
    let root_arg = root.to_string_lossy().to_string();
    let events_arg = events.to_string_lossy().to_string();
    assert_eq!(
        run_args(&["run", "--data-dir", &root_arg, "--events", &events_arg]),
        0
    );

    write_file(&events, r#"[{"event": "NoSuchEvent"}]"#);
    assert_eq!(
        run_args(&["run", "--data-dir", &root_arg, "--events", &events_arg]),
        1
    );

    let _ = fs::remove_dir_all(root);
}

#[test]
fn callins_and_bad_arguments() {
    assert_eq!(run_args(&["callins"]), 0);
    assert_ne!(run_args(&["no-such-command"]), 0);
}
