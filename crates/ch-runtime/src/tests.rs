use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use ch_core::{
    CapabilityProfile, CiValue, DiagnosticLevel, Float3, HandleOrder, KeyModifiers, PointerTarget,
    UnitInfo,
};
use ch_sandbox::SandboxedFs;
use rhai::{EvalAltResult, ImmutableString, Module};

use super::*;

fn temp_dir(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("ch-runtime-{}-{}", name, nanos))
}

fn builder(
    registry: &Rc<ContextRegistry>,
    name: &str,
    order: HandleOrder,
    profile: CapabilityProfile,
) -> HandleBuilder {
    HandleBuilder::new(name, order, Rc::clone(registry))
        .profile(profile)
        .max_call_levels(8)
}

fn rules(registry: &Rc<ContextRegistry>, source: &str) -> Handle {
    let handle = builder(
        registry,
        "LuaRules",
        HandleOrder::Rules,
        CapabilityProfile::full_access(),
    )
    .build();
    handle
        .load_code(Namespace::Global, source, "main.rhai")
        .expect("code should load");
    handle
}

fn field(handle: &Handle, key: &str) -> Option<CiValue> {
    match handle.globals_snapshot().expect("globals should convert") {
        CiValue::Map(map) => map.get(key).cloned(),
        other => panic!("globals should be a map, got {:?}", other),
    }
}

fn text(value: &str) -> Option<CiValue> {
    Some(CiValue::String(value.to_string()))
}

#[test]
fn absent_handler_skips_marshaling() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(&registry, "fn GameStart() { this.started = true; }");

    handle.unit_created(&UnitInfo::new(1, 2, 0, 0), None);
    handle.update();
    assert_eq!(handle.marshal_count(), 0);
    assert!(!handle.has_handler(&ch_core::UNIT_CREATED));

    handle.game_start();
    assert_eq!(handle.marshal_count(), 1);
    assert_eq!(field(&handle, "started"), Some(CiValue::Bool(true)));
    assert!(registry.is_idle());
}

#[test]
fn reload_refreshes_dispatch_cache() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(&registry, "let ready = 1;");
    handle.game_over();
    assert!(!handle.has_handler(&ch_core::GAME_OVER));

    handle
        .load_code(Namespace::Global, "fn GameOver() { this.over = true; }", "main.rhai")
        .expect("reload should pass");
    handle.game_over();
    assert_eq!(field(&handle, "over"), Some(CiValue::Bool(true)));
}

#[test]
fn handler_arity_decides_how_many_arguments_arrive() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        r#"
        fn UnitCreated(unit) { this.unit = unit; }
        fn UnitFinished(unit, def, team, extra) { this.extra = type_of(extra); }
        "#,
    );
    let unit = UnitInfo::new(10, 3, 1, 0);
    handle.unit_created(&unit, None);
    handle.unit_finished(&unit);
    assert_eq!(field(&handle, "unit"), Some(CiValue::Int(10)));
    assert_eq!(field(&handle, "extra"), text("()"));
}

#[test]
fn wrong_return_type_falls_back_to_default_and_is_logged() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        r#"
        fn RecvLuaMsg(msg, player) { if msg == "ping" { true } else { "yes" } }
        "#,
    );

    assert!(handle.recv_lua_msg("ping", 1));
    assert!(!handle.recv_lua_msg("other", 1));

    let warnings = handle
        .drain_diagnostics()
        .into_iter()
        .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Warn)
        .collect::<Vec<_>>();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].event.as_deref(), Some("RecvLuaMsg"));
    assert!(warnings[0].message.contains("expected boolean"));
    assert_eq!(handle.error_count(), 0);
}

#[test]
fn thrown_errors_are_logged_but_not_counted() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(&registry, r#"fn GameStart() { throw "boom"; }"#);
    handle.game_start();

    assert_eq!(handle.error_count(), 0);
    let errors = handle.drain_diagnostics();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].level, DiagnosticLevel::Error);
    assert!(errors[0].message.contains("boom"));
    assert!(registry.is_idle());
    assert!(registry.current().is_none());
}

#[test]
fn runaway_recursion_counts_as_unrecoverable() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        r#"
        fn Recurse(n) { Recurse(n + 1) }
        fn GameOver() { Recurse(0) }
        "#,
    );
    handle.game_over();
    handle.game_over();
    assert_eq!(handle.error_count(), 2);
    assert!(registry.is_idle());
}

#[test]
fn nested_call_in_on_another_context_restores_registry() {
    let registry = Rc::new(ContextRegistry::new());
    let gaia = Rc::new(
        builder(
            &registry,
            "LuaGaia",
            HandleOrder::Gaia,
            CapabilityProfile::locked_to(3, 2),
        )
        .build(),
    );
    gaia.load_code(
        Namespace::Global,
        "fn GameStart() { this.seen = Script::GetName(); this.read_ally = Script::GetReadAllyTeam(); }",
        "main.rhai",
    )
    .expect("gaia code should load");

    let mut test_module = Module::new();
    let (inner, reg) = (Rc::clone(&gaia), Rc::clone(&registry));
    test_module.set_native_fn("Fire", move || -> Result<ImmutableString, Box<EvalAltResult>> {
        inner.game_start();
        Ok(reg.active_name().unwrap_or_default().into())
    });

    let rules = builder(
        &registry,
        "LuaRules",
        HandleOrder::Rules,
        CapabilityProfile::full_access(),
    )
    .host_module("Test", test_module)
    .build();
    rules
        .load_code(
            Namespace::Global,
            "fn GameStart() { this.after = Test::Fire(); this.full_read = Script::GetFullRead(); }",
            "main.rhai",
        )
        .expect("rules code should load");

    rules.game_start();

    assert_eq!(field(&gaia, "seen"), text("LuaGaia"));
    assert_eq!(field(&gaia, "read_ally"), Some(CiValue::Int(2)));
    assert_eq!(field(&rules, "after"), text("LuaRules"));
    assert_eq!(field(&rules, "full_read"), Some(CiValue::Bool(true)));
    assert!(registry.current().is_none());
    assert!(registry.is_idle());
}

#[test]
fn kill_is_recorded_and_execution_continues() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        r#"fn GameStart() { Script::Kill("done"); this.after_kill = true; }"#,
    );
    handle.game_start();
    assert!(handle.kill_requested());
    assert_eq!(handle.kill_message(), "done");
    assert_eq!(field(&handle, "after_kill"), Some(CiValue::Bool(true)));
}

#[test]
fn unreadable_attacker_fields_are_withheld() {
    let registry = Rc::new(ContextRegistry::new());
    let source = r#"
        fn UnitDamaged(unit, def, team, damage, paralyzer, weapon, attacker, adef, ateam) {
            this.weapon = type_of(weapon);
            this.attacker = type_of(attacker);
            this.damage = damage;
        }
    "#;
    let gaia = builder(
        &registry,
        "LuaGaia",
        HandleOrder::Gaia,
        CapabilityProfile::locked_to(3, 2),
    )
    .build();
    gaia.load_code(Namespace::Global, source, "main.rhai")
        .expect("gaia code should load");
    let rules = rules(&registry, source);

    let own = UnitInfo::new(1, 7, 3, 2);
    let enemy = UnitInfo::new(9, 8, 0, 0);
    for handle in [&gaia, &rules] {
        handle.unit_damaged(&own, Some(&enemy), 12.5, 4, false);
    }

    assert_eq!(field(&gaia, "weapon"), text("()"));
    assert_eq!(field(&gaia, "attacker"), text("()"));
    assert_eq!(field(&gaia, "damage"), Some(CiValue::Number(12.5)));
    assert_eq!(field(&rules, "weapon"), text("i64"));
    assert_eq!(field(&rules, "attacker"), text("i64"));

    // events about units the context cannot read never reach it
    let before = gaia.marshal_count();
    gaia.unit_damaged(&enemy, Some(&own), 1.0, 4, false);
    assert_eq!(gaia.marshal_count(), before);
}

#[test]
fn unsynced_call_ins_run_unsynced_from_the_private_namespace() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        r#"
        fn GameStart() { this.start_synced = Script::GetSynced(); }
        fn Update() { this.wrong_namespace = true; }
        "#,
    );
    handle
        .load_code(
            Namespace::Registry,
            "fn Update() { this.update_synced = Script::GetSynced(); }",
            "draw.rhai",
        )
        .expect("draw code should load");

    handle.game_start();
    handle.update();

    assert_eq!(field(&handle, "start_synced"), Some(CiValue::Bool(true)));
    assert_eq!(field(&handle, "update_synced"), Some(CiValue::Bool(false)));
    assert_eq!(field(&handle, "wrong_namespace"), None);
    assert!(handle.synced());
}

#[test]
fn user_mode_contexts_rest_unsynced() {
    let registry = Rc::new(ContextRegistry::new());
    let ui = builder(
        &registry,
        "LuaUI",
        HandleOrder::Ui,
        CapabilityProfile::user(0, 0),
    )
    .build();
    ui.load_code(
        Namespace::Global,
        r#"
        fn Update() { this.synced = Script::GetSynced(); }
        fn MouseRelease(x, y, button) { 5 }
        fn GameSetup(state, ready, players) { [true, ready] }
        "#,
        "main.rhai",
    )
    .expect("ui code should load");

    ui.update();
    assert_eq!(field(&ui, "synced"), Some(CiValue::Bool(false)));
    assert!(!ui.synced());
    assert_eq!(ui.mouse_release(1, 2, 1), 4);
    assert_eq!(ui.game_setup("lobby", true, &BTreeMap::new()), (true, true));
}

#[test]
fn ui_events_need_mod_ui_control_for_game_contexts() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(&registry, "let loaded = true;");
    handle
        .load_code(
            Namespace::Registry,
            "fn KeyPress(key, mods, repeat, label, unicode) { mods.shift && key == 32 }",
            "draw.rhai",
        )
        .expect("draw code should load");
    let mods = KeyModifiers {
        shift: true,
        ..KeyModifiers::default()
    };

    assert!(!handle.key_press(32, mods, false, "space", 32));
    assert_eq!(handle.marshal_count(), 0);

    registry.set_mod_ui_ctrl(true);
    assert!(handle.key_press(32, mods, false, "space", 32));
    assert_eq!(handle.mouse_release(0, 0, 1), -1);
}

#[test]
fn explosions_only_reach_watched_weapons() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        r#"
        fn GamePreload() { Script::SetWatchWeapon(5, true); }
        fn Explosion(weapon, x, y, z, owner) { weapon == 5 }
        "#,
    );
    handle
        .load_code(
            Namespace::Registry,
            "fn Update() { Script::SetWatchWeapon(6, true); }",
            "draw.rhai",
        )
        .expect("draw code should load");

    handle.game_preload();
    handle.update();
    assert_eq!(handle.state().watched_weapons(), vec![5]);
    assert_eq!(handle.error_count(), 0);

    let pos = Float3::new(1.0, 2.0, 3.0);
    let before = handle.marshal_count();
    assert!(!handle.explosion(7, pos, None));
    assert_eq!(handle.marshal_count(), before);
    assert!(handle.explosion(5, pos, None));
}

#[test]
fn watching_an_out_of_range_weapon_is_a_script_error() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        "fn GameOver() { Script::SetWatchWeapon(4294967301, true); }",
    );

    handle.game_over();
    assert!(handle.state().watched_weapons().is_empty());
    assert_eq!(handle.error_count(), 0);
    let errors = handle.drain_diagnostics();
    assert!(
        errors
            .iter()
            .any(|diag| diag.level == DiagnosticLevel::Error && diag.message.contains("out of range")),
        "expected a range error, got {:?}",
        errors
    );
}

#[test]
fn numeric_answers_beyond_host_ranges_saturate() {
    let registry = Rc::new(ContextRegistry::new());
    let ui = builder(
        &registry,
        "LuaUI",
        HandleOrder::Ui,
        CapabilityProfile::user(0, 0),
    )
    .build();
    ui.load_code(
        Namespace::Global,
        r#"
        fn MouseRelease(x, y, b) { if x == 0 { -1e12 } else { 1e12 } }
        fn DefaultCommand(kind) { 1e12 }
        "#,
        "main.rhai",
    )
    .expect("ui code should load");

    assert_eq!(ui.mouse_release(0, 2, 3), i32::MIN);
    assert_eq!(ui.mouse_release(1, 2, 3), i32::MAX - 1);
    assert_eq!(ui.default_command(&PointerTarget::Selection), Some(i32::MAX));
    assert_eq!(ui.error_count(), 0);
}

#[test]
fn game_setup_keeps_incoming_ready_unless_answered() {
    let registry = Rc::new(ContextRegistry::new());
    let ui = builder(
        &registry,
        "LuaUI",
        HandleOrder::Ui,
        CapabilityProfile::user(0, 0),
    )
    .build();
    ui.load_code(
        Namespace::Global,
        r#"
        fn GameSetup(state, ready, players) {
            if state == "lone" { true }
            else if state == "decline" { [false, false] }
            else if state == "odd" { [true, 5] }
            else { [true, false] }
        }
        "#,
        "main.rhai",
    )
    .expect("ui code should load");
    let players = BTreeMap::new();

    assert_eq!(ui.game_setup("lone", true, &players), (true, true));
    assert_eq!(ui.game_setup("lone", false, &players), (true, false));
    assert_eq!(ui.game_setup("decline", true, &players), (false, true));
    assert_eq!(ui.game_setup("odd", true, &players), (true, true));
    assert_eq!(ui.game_setup("ready", true, &players), (true, false));
}

#[test]
fn load_failures_report_codes_and_keep_previous_code() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(&registry, "fn GameStart() { this.v = 1; }");

    let compile = handle
        .load_code(Namespace::Global, "fn (", "broken.rhai")
        .expect_err("syntax error should fail");
    assert_eq!(compile.code, "LOAD_COMPILE");

    let execute = handle
        .load_code(Namespace::Global, r#"throw "init failed";"#, "throws.rhai")
        .expect_err("top-level throw should fail");
    assert_eq!(execute.code, "LOAD_EXECUTE");
    assert!(execute.message.contains("throws.rhai"));

    handle.game_start();
    assert_eq!(field(&handle, "v"), Some(CiValue::Int(1)));
}

#[test]
fn developer_mode_gates_global_access() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        r#"
        fn GameStart() { let g = Script::GetGlobal(); this.global_type = type_of(g); }
        fn GameOver() { this.registry_type = type_of(Script::GetRegistry()); }
        "#,
    );
    handle.game_start();
    handle.game_over();
    assert_eq!(field(&handle, "global_type"), text("()"));
    assert_eq!(field(&handle, "registry_type"), text("()"));

    registry.set_dev_mode(true);
    handle.game_start();
    handle.game_over();
    assert_eq!(field(&handle, "global_type"), text("map"));
    assert_eq!(field(&handle, "registry_type"), text("map"));
}

#[test]
fn call_in_list_reports_unsynced_flags() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(
        &registry,
        r#"
        fn GameStart() {
            let list = Script::GetCallInList();
            this.update = list["Update"].unsynced;
            this.start = list["GameStart"].unsynced;
            this.count = list.len();
        }
        "#,
    );
    handle.game_start();
    assert_eq!(field(&handle, "update"), Some(CiValue::Bool(true)));
    assert_eq!(field(&handle, "start"), Some(CiValue::Bool(false)));
    assert_eq!(
        field(&handle, "count"),
        Some(CiValue::Int(ch_core::CALL_INS.len() as i64))
    );
}

#[test]
fn scripts_write_only_inside_their_own_subtree() {
    let root = temp_dir("sandbox");
    let registry = Rc::new(ContextRegistry::new());
    let sandbox = Rc::new(SandboxedFs::new(&root));

    let ctx_a = builder(&registry, "ctxA", HandleOrder::Gaia, CapabilityProfile::default())
        .sandbox(Rc::clone(&sandbox))
        .build();
    ctx_a
        .load_code(
            Namespace::Global,
            r#"
            fn GameStart() {
                let opened = io::open("ctxA/write/y", "w");
                this.open_ok = opened.ok;
                opened.file.write("data");
                opened.file.close();
                this.read_back = io::open("ctxA/write/y", "r").file.read().text;
                this.traversal = io::open("../x", "r").errno;
                this.bad_mode = io::open("ctxA/write/y", "rq").errno;
                this.popen = io::popen("ls", "r").errno;
                this.system = io::system("ls").errno;
            }
            fn GameOver() { this.removed = io::remove("ctxA/write/y").ok; }
            "#,
            "main.rhai",
        )
        .expect("ctxA code should load");

    let ctx_b = builder(&registry, "ctxB", HandleOrder::Rules, CapabilityProfile::default())
        .sandbox(Rc::clone(&sandbox))
        .build();
    ctx_b
        .load_code(
            Namespace::Global,
            r#"fn GameStart() { this.errno = io::remove("ctxA/write/y").errno; }"#,
            "main.rhai",
        )
        .expect("ctxB code should load");

    ctx_a.game_start();
    assert_eq!(field(&ctx_a, "open_ok"), Some(CiValue::Bool(true)));
    assert_eq!(field(&ctx_a, "read_back"), text("data"));
    assert_eq!(field(&ctx_a, "traversal"), Some(CiValue::Int(1)));
    assert_eq!(field(&ctx_a, "bad_mode"), Some(CiValue::Int(22)));
    assert_eq!(field(&ctx_a, "popen"), Some(CiValue::Int(22)));
    assert_eq!(field(&ctx_a, "system"), Some(CiValue::Int(1)));

    ctx_b.game_start();
    assert_eq!(field(&ctx_b, "errno"), Some(CiValue::Int(1)));
    assert!(root.join("ctxA/write/y").exists());

    ctx_a.game_over();
    assert_eq!(field(&ctx_a, "removed"), Some(CiValue::Bool(true)));
    assert!(!root.join("ctxA/write/y").exists());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn shutdown_is_delivered_once_and_drop_clears_registry() {
    let registry = Rc::new(ContextRegistry::new());
    let handle = rules(&registry, r#"fn Shutdown() { print("bye"); }"#);
    handle.shutdown();
    handle.shutdown();
    let lines = handle
        .drain_diagnostics()
        .into_iter()
        .filter(|diagnostic| diagnostic.message == "bye")
        .count();
    assert_eq!(lines, 1);

    let previous = registry.activate(handle.state());
    drop(handle);
    assert!(registry.current().is_none());
    registry.restore(previous);
}
