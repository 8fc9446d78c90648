//! Functions scripts can call back into: the `Script` module with
//! introspection and self-termination, and the sandboxed `io` module.
//!
//! Every function resolves its caller through the [`ContextRegistry`], so
//! the same module instance is safe to share between nested calls.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Write};
use std::rc::Rc;

use ch_core::{DiagnosticLevel, ALL_ACCESS_TEAM, CALL_INS, NO_ACCESS_TEAM};
use ch_sandbox::{Errno, SandboxedFs};
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Map, Module, INT};
use tracing::{debug, info};

use crate::registry::{ContextRegistry, ContextState};

pub const SCRIPT_MODULE: &str = "Script";
pub const IO_MODULE: &str = "io";

fn active(registry: &ContextRegistry) -> Result<Rc<ContextState>, Box<EvalAltResult>> {
    registry
        .current()
        .ok_or_else(|| "host function called with no active script context".into())
}

fn ok_map() -> Map {
    let mut map = Map::new();
    map.insert("ok".into(), Dynamic::TRUE);
    map
}

fn errno_map(errno: Errno) -> Map {
    let mut map = Map::new();
    map.insert("ok".into(), Dynamic::FALSE);
    map.insert("errno".into(), Dynamic::from_int(errno.code() as INT));
    map.insert("message".into(), Dynamic::from(errno.to_string()));
    map
}

fn io_result(result: Result<Map, Errno>) -> Dynamic {
    Dynamic::from_map(result.unwrap_or_else(errno_map))
}

pub(crate) fn script_module(
    registry: &Rc<ContextRegistry>,
    config_string: Option<String>,
) -> Module {
    let mut module = Module::new();
    module.set_var("NO_ACCESS_TEAM", NO_ACCESS_TEAM as INT);
    module.set_var("ALL_ACCESS_TEAM", ALL_ACCESS_TEAM as INT);

    let reg = Rc::clone(registry);
    module.set_native_fn("Kill", move || -> Result<(), Box<EvalAltResult>> {
        active(&reg)?.request_kill(None);
        Ok(())
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("Kill", move |message: ImmutableString| -> Result<(), Box<EvalAltResult>> {
        active(&reg)?.request_kill(Some(message.as_str()));
        Ok(())
    });

    let reg = Rc::clone(registry);
    module.set_native_fn("GetName", move || -> Result<ImmutableString, Box<EvalAltResult>> {
        Ok(active(&reg)?.name().into())
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("GetSynced", move || -> Result<bool, Box<EvalAltResult>> {
        Ok(active(&reg)?.synced())
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("GetFullCtrl", move || -> Result<bool, Box<EvalAltResult>> {
        Ok(active(&reg)?.profile().full_ctrl)
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("GetFullRead", move || -> Result<bool, Box<EvalAltResult>> {
        active(&reg)?;
        Ok(reg.active_full_read())
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("GetCtrlTeam", move || -> Result<INT, Box<EvalAltResult>> {
        Ok(active(&reg)?.profile().ctrl_team as INT)
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("GetReadTeam", move || -> Result<INT, Box<EvalAltResult>> {
        Ok(active(&reg)?.profile().read_team as INT)
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("GetReadAllyTeam", move || -> Result<INT, Box<EvalAltResult>> {
        active(&reg)?;
        Ok(reg.active_read_ally_team() as INT)
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("GetSelectTeam", move || -> Result<INT, Box<EvalAltResult>> {
        Ok(active(&reg)?.profile().select_team as INT)
    });

    let reg = Rc::clone(registry);
    module.set_native_fn("GetGlobal", move || -> Result<Dynamic, Box<EvalAltResult>> {
        let state = active(&reg)?;
        if !reg.dev_mode() {
            return Ok(Dynamic::UNIT);
        }
        Ok(state.globals())
    });
    let reg = Rc::clone(registry);
    module.set_native_fn("GetRegistry", move || -> Result<Dynamic, Box<EvalAltResult>> {
        let state = active(&reg)?;
        if !reg.dev_mode() {
            return Ok(Dynamic::UNIT);
        }
        Ok(Dynamic::from_map(registry_info(&reg, &state)))
    });

    module.set_native_fn("GetCallInList", || -> Result<Map, Box<EvalAltResult>> {
        let mut list = Map::new();
        for def in CALL_INS {
            let mut entry = Map::new();
            entry.insert("unsynced".into(), Dynamic::from_bool(def.is_unsynced()));
            list.insert(def.name.into(), Dynamic::from_map(entry));
        }
        Ok(list)
    });

    let reg = Rc::clone(registry);
    module.set_native_fn("Echo", move |message: ImmutableString| -> Result<(), Box<EvalAltResult>> {
        let state = active(&reg)?;
        info!(context = state.name(), "{}", message);
        state.push_diagnostic(DiagnosticLevel::Info, None, message.to_string());
        Ok(())
    });

    let reg = Rc::clone(registry);
    module.set_native_fn(
        "SetWatchWeapon",
        move |weapon_id: INT, watch: bool| -> Result<(), Box<EvalAltResult>> {
            let state = active(&reg)?;
            if !state.synced() {
                return Err("SetWatchWeapon() can only be called from synced code".into());
            }
            let weapon_id = i32::try_from(weapon_id).map_err(|_| {
                format!("SetWatchWeapon(): weapon id {} is out of range", weapon_id)
            })?;
            state.watch_weapon(weapon_id, watch);
            Ok(())
        },
    );

    if let Some(config) = config_string {
        let config: ImmutableString = config.into();
        module.set_native_fn(
            "GetConfigString",
            move || -> Result<ImmutableString, Box<EvalAltResult>> { Ok(config.clone()) },
        );
    }

    module
}

fn registry_info(registry: &ContextRegistry, state: &ContextState) -> Map {
    let mut info = Map::new();
    info.insert("name".into(), Dynamic::from(state.name().to_string()));
    info.insert("order".into(), Dynamic::from_int(state.order() as INT));
    info.insert("synced".into(), Dynamic::from_bool(state.synced()));
    info.insert(
        "errorCount".into(),
        Dynamic::from_int(state.error_count() as INT),
    );
    info.insert("killRequested".into(), Dynamic::from_bool(state.kill_requested()));
    info.insert("depth".into(), Dynamic::from_int(registry.depth() as INT));
    info.insert(
        "watchWeapons".into(),
        Dynamic::from_array(
            state
                .watched_weapons()
                .into_iter()
                .map(|weapon| Dynamic::from_int(weapon as INT))
                .collect::<Array>(),
        ),
    );
    info
}

/// An open sandboxed file handed to a script.
#[derive(Debug, Clone)]
pub struct ScriptFile {
    path: String,
    inner: Rc<RefCell<Option<File>>>,
}

impl ScriptFile {
    fn new(path: &str, file: File) -> Self {
        Self {
            path: path.to_string(),
            inner: Rc::new(RefCell::new(Some(file))),
        }
    }

    fn read(&mut self) -> Map {
        let mut inner = self.inner.borrow_mut();
        let Some(file) = inner.as_mut() else {
            return errno_map(Errno::Inval);
        };
        let mut text = String::new();
        match file.read_to_string(&mut text) {
            Ok(_) => {
                let mut map = ok_map();
                map.insert("text".into(), Dynamic::from(text));
                map
            }
            Err(error) => errno_map(Errno::from(&error)),
        }
    }

    fn write(&mut self, text: ImmutableString) -> Map {
        let mut inner = self.inner.borrow_mut();
        let Some(file) = inner.as_mut() else {
            return errno_map(Errno::Inval);
        };
        match file.write_all(text.as_bytes()) {
            Ok(()) => ok_map(),
            Err(error) => errno_map(Errno::from(&error)),
        }
    }

    fn close(&mut self) {
        if self.inner.borrow_mut().take().is_some() {
            debug!(path = self.path.as_str(), "script closed file");
        }
    }

    fn path(&mut self) -> ImmutableString {
        self.path.as_str().into()
    }
}

pub(crate) fn register_file_type(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptFile>("File")
        .register_fn("read", ScriptFile::read)
        .register_fn("write", ScriptFile::write)
        .register_fn("close", ScriptFile::close)
        .register_get("path", ScriptFile::path);
}

pub(crate) fn io_module(registry: &Rc<ContextRegistry>, sandbox: &Rc<SandboxedFs>) -> Module {
    let mut module = Module::new();

    let (reg, fs) = (Rc::clone(registry), Rc::clone(sandbox));
    module.set_native_fn(
        "open",
        move |path: ImmutableString, mode: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let active = reg.active_name();
            Ok(io_result(
                fs.open(active.as_deref(), path.as_str(), mode.as_str()).map(|file| {
                    let mut map = ok_map();
                    map.insert("file".into(), Dynamic::from(ScriptFile::new(path.as_str(), file)));
                    map
                }),
            ))
        },
    );

    let (reg, fs) = (Rc::clone(registry), Rc::clone(sandbox));
    module.set_native_fn(
        "remove",
        move |path: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let active = reg.active_name();
            Ok(io_result(fs.remove(active.as_deref(), path.as_str()).map(|()| ok_map())))
        },
    );

    let (reg, fs) = (Rc::clone(registry), Rc::clone(sandbox));
    module.set_native_fn(
        "rename",
        move |from: ImmutableString, to: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            let active = reg.active_name();
            Ok(io_result(
                fs.rename(active.as_deref(), from.as_str(), to.as_str()).map(|()| ok_map()),
            ))
        },
    );

    let fs = Rc::clone(sandbox);
    module.set_native_fn(
        "popen",
        move |command: ImmutableString,
              mode: ImmutableString|
              -> Result<Dynamic, Box<EvalAltResult>> {
            Ok(io_result(fs.popen(command.as_str(), mode.as_str()).map(|_| ok_map())))
        },
    );

    let fs = Rc::clone(sandbox);
    module.set_native_fn("pclose", move || -> Result<Dynamic, Box<EvalAltResult>> {
        Ok(io_result(fs.pclose().map(|_| ok_map())))
    });

    let fs = Rc::clone(sandbox);
    module.set_native_fn(
        "system",
        move |command: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            Ok(io_result(fs.system(command.as_str()).map(|_| ok_map())))
        },
    );

    module
}
