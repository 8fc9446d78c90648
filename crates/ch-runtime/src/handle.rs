use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use ch_core::{
    CallArgs, CallInDef, CapabilityProfile, CiValue, Diagnostic, DiagnosticLevel, HandleOrder,
    HostError, ReturnContract, ReturnValue,
};
use ch_sandbox::SandboxedFs;
use rhai::{CallFnOptions, Dynamic, Engine, Module, Scope, AST};
use tracing::{debug, error, info, warn};

use crate::bridge::{civalue_to_dynamic, dynamic_to_civalue, dynamic_to_return};
use crate::failure::{CallFailure, FailureClass};
use crate::host_api::{io_module, register_file_type, script_module, IO_MODULE, SCRIPT_MODULE};
use crate::registry::{ContextRegistry, ContextState};

pub const DEFAULT_MAX_CALL_LEVELS: usize = 64;

/// Where loaded code and call-in handlers live inside a context's runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Synced game logic, and everything for user-mode contexts.
    Global,
    /// Unsynced presentation code of game-logic contexts.
    Registry,
}

/// Host-side acceptance test for routed messages: `(player_id, mode)`.
pub type MessageFilter = Box<dyn Fn(i32, i32) -> bool>;

pub struct HandleBuilder {
    name: String,
    order: HandleOrder,
    profile: CapabilityProfile,
    registry: Rc<ContextRegistry>,
    sandbox: Rc<SandboxedFs>,
    max_call_levels: usize,
    config_string: Option<String>,
    message_filter: Option<MessageFilter>,
    host_modules: Vec<(String, Module)>,
}

impl HandleBuilder {
    pub fn new(name: impl Into<String>, order: HandleOrder, registry: Rc<ContextRegistry>) -> Self {
        Self {
            name: name.into(),
            order,
            profile: CapabilityProfile::default(),
            registry,
            sandbox: Rc::new(SandboxedFs::new(".")),
            max_call_levels: DEFAULT_MAX_CALL_LEVELS,
            config_string: None,
            message_filter: None,
            host_modules: Vec::new(),
        }
    }

    pub fn profile(mut self, profile: CapabilityProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn sandbox(mut self, sandbox: Rc<SandboxedFs>) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn max_call_levels(mut self, levels: usize) -> Self {
        self.max_call_levels = levels;
        self
    }

    /// Exposes `Script::GetConfigString()` to the context's code.
    pub fn config_string(mut self, config: impl Into<String>) -> Self {
        self.config_string = Some(config.into());
        self
    }

    pub fn message_filter(mut self, filter: MessageFilter) -> Self {
        self.message_filter = Some(filter);
        self
    }

    /// Registers an extra host module, reachable from scripts as `name::fn`.
    pub fn host_module(mut self, name: impl Into<String>, module: Module) -> Self {
        self.host_modules.push((name.into(), module));
        self
    }

    pub fn build(self) -> Handle {
        let state = Rc::new(ContextState::new(
            self.name,
            self.order.tag(),
            self.profile,
        ));

        let mut engine = Engine::new();
        engine.set_max_call_levels(self.max_call_levels);

        let reg = Rc::clone(&self.registry);
        engine.on_print(move |text| match reg.current() {
            Some(state) => {
                info!(context = state.name(), "{}", text);
                state.push_diagnostic(DiagnosticLevel::Info, None, text.to_string());
            }
            None => info!("{}", text),
        });
        let reg = Rc::clone(&self.registry);
        engine.on_debug(move |text, source, pos| {
            let context = reg.active_name().unwrap_or_default();
            debug!(context = context.as_str(), source = source.unwrap_or(""), %pos, "{}", text);
        });

        register_file_type(&mut engine);
        engine.register_static_module(
            SCRIPT_MODULE,
            script_module(&self.registry, self.config_string).into(),
        );
        engine.register_static_module(IO_MODULE, io_module(&self.registry, &self.sandbox).into());
        for (name, module) in self.host_modules {
            engine.register_static_module(name, module.into());
        }

        Handle {
            order: self.order,
            state,
            registry: self.registry,
            engine,
            global: RefCell::new(None),
            private: RefCell::new(None),
            dispatch: RefCell::new(HashMap::new()),
            marshal_count: Cell::new(0),
            message_filter: self.message_filter,
            shut_down: Cell::new(false),
        }
    }
}

/// One script context: a Rhai runtime, the code loaded into it, and the
/// capability profile every call-in is filtered through.
pub struct Handle {
    order: HandleOrder,
    state: Rc<ContextState>,
    registry: Rc<ContextRegistry>,
    engine: Engine,
    global: RefCell<Option<AST>>,
    private: RefCell<Option<AST>>,
    dispatch: RefCell<HashMap<&'static str, Option<usize>>>,
    marshal_count: Cell<u64>,
    message_filter: Option<MessageFilter>,
    shut_down: Cell<bool>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("name", &self.state.name())
            .field("order", &self.order)
            .field("synced", &self.state.synced())
            .field("error_count", &self.state.error_count())
            .finish_non_exhaustive()
    }
}

impl Handle {
    pub fn name(&self) -> &str {
        self.state.name()
    }

    pub fn order(&self) -> HandleOrder {
        self.order
    }

    pub fn profile(&self) -> CapabilityProfile {
        self.state.profile()
    }

    pub fn synced(&self) -> bool {
        self.state.synced()
    }

    pub fn error_count(&self) -> u32 {
        self.state.error_count()
    }

    pub fn kill_requested(&self) -> bool {
        self.state.kill_requested()
    }

    pub fn kill_message(&self) -> String {
        self.state.kill_message()
    }

    pub fn state(&self) -> &Rc<ContextState> {
        &self.state
    }

    pub fn registry(&self) -> &Rc<ContextRegistry> {
        &self.registry
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.state.diagnostics()
    }

    pub fn drain_diagnostics(&self) -> Vec<Diagnostic> {
        self.state.drain_diagnostics()
    }

    /// How many argument lists this context has built so far.
    pub fn marshal_count(&self) -> u64 {
        self.marshal_count.get()
    }

    /// Copy of the script's persistent `this` state.
    pub fn globals_snapshot(&self) -> Result<CiValue, HostError> {
        dynamic_to_civalue(self.state.globals())
    }

    pub fn accepts_message(&self, player_id: i32, mode: i32) -> bool {
        self.message_filter
            .as_ref()
            .map_or(true, |filter| filter(player_id, mode))
    }

    fn slot(&self, namespace: Namespace) -> &RefCell<Option<AST>> {
        match namespace {
            Namespace::Global => &self.global,
            Namespace::Registry => &self.private,
        }
    }

    fn log_load_error(&self, code: &str, chunk: &str, message: String) -> HostError {
        error!(context = self.name(), chunk, "failed to load code: {}", message);
        self.state.push_diagnostic(
            DiagnosticLevel::Error,
            None,
            format!("{}: {}", chunk, message),
        );
        HostError::new(code, format!("{}: {}", chunk, message))
    }

    /// Compiles `source`, runs its top level with this context active and
    /// installs it in `namespace`, replacing whatever was there.
    pub fn load_code(&self, namespace: Namespace, source: &str, chunk: &str) -> Result<(), HostError> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|err| self.log_load_error("LOAD_COMPILE", chunk, err.to_string()))?;

        let previous_synced = self.state.synced();
        self.state.set_synced(match namespace {
            Namespace::Global => self.profile().resting_synced(),
            Namespace::Registry => false,
        });
        let outcome = {
            let _active = self.registry.enter(&self.state);
            self.engine.run_ast_with_scope(&mut Scope::new(), &ast)
        };
        self.state.set_synced(previous_synced);

        if let Err(err) = outcome {
            if CallFailure::from_eval(chunk, &err).is_unrecoverable() {
                self.state.bump_error_count();
            }
            return Err(self.log_load_error("LOAD_EXECUTE", chunk, err.to_string()));
        }

        let mut slot = self.slot(namespace).try_borrow_mut().map_err(|_| {
            HostError::new(
                "LOAD_BUSY",
                format!("{}: cannot replace code while it is executing", chunk),
            )
        })?;
        *slot = Some(ast);
        drop(slot);
        self.dispatch.borrow_mut().clear();
        info!(context = self.name(), chunk, ?namespace, "loaded code");
        Ok(())
    }

    pub fn has_code(&self, namespace: Namespace) -> bool {
        self.slot(namespace).borrow().is_some()
    }

    pub(crate) fn namespace_for(&self, def: &CallInDef) -> Namespace {
        if def.is_unsynced() && !self.profile().user_mode {
            Namespace::Registry
        } else {
            Namespace::Global
        }
    }

    fn handler_arity(&self, def: &CallInDef, namespace: Namespace) -> Option<usize> {
        let cached = self.dispatch.borrow().get(def.name).copied();
        if let Some(arity) = cached {
            return arity;
        }
        let arity = self.slot(namespace).borrow().as_ref().and_then(|ast| {
            ast.iter_functions()
                .filter(|func| func.name == def.name)
                .map(|func| func.params.len())
                .max()
        });
        self.dispatch.borrow_mut().insert(def.name, arity);
        arity
    }

    pub fn has_handler(&self, def: &CallInDef) -> bool {
        self.handler_arity(def, self.namespace_for(def)).is_some()
    }

    fn ui_allowed(&self) -> bool {
        self.registry.mod_ui_ctrl() || self.profile().user_mode
    }

    /// Runs one call-in. `build` only runs when the context has a handler
    /// for the event and is allowed to receive it. Returns the handler's
    /// raw result, or `None` when nothing ran or the call failed.
    pub(crate) fn run_call_in<F>(&self, def: &CallInDef, build: F) -> Option<Dynamic>
    where
        F: FnOnce(&CapabilityProfile, &mut CallArgs),
    {
        if def.ui_gated && !self.ui_allowed() {
            return None;
        }
        let namespace = self.namespace_for(def);
        let arity = self.handler_arity(def, namespace)?;

        let profile = self.profile();
        let mut args = CallArgs::with_capacity(def.max_args);
        self.marshal_count.set(self.marshal_count.get() + 1);
        build(&profile, &mut args);

        let previous_synced = self.state.synced();
        if def.is_unsynced() {
            self.state.set_synced(false);
        }
        let outcome = self.protected_call(def, namespace, arity, args);
        self.state.set_synced(previous_synced);

        match outcome {
            Ok(value) => Some(value),
            Err(failure) => {
                self.record_failure(&failure);
                None
            }
        }
    }

    fn protected_call(
        &self,
        def: &CallInDef,
        namespace: Namespace,
        arity: usize,
        args: CallArgs,
    ) -> Result<Dynamic, CallFailure> {
        // extra arguments are dropped and missing ones arrive as ()
        let mut values = args
            .values()
            .iter()
            .take(arity)
            .map(civalue_to_dynamic)
            .collect::<Vec<_>>();
        values.resize(arity, Dynamic::UNIT);

        let slot = self.slot(namespace).borrow();
        let Some(ast) = slot.as_ref() else {
            return Err(CallFailure {
                event: def.name.to_string(),
                class: FailureClass::Recoverable,
                message: "no code loaded".to_string(),
            });
        };

        let mut this = self.state.globals();
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut this);
        let _active = self.registry.enter(&self.state);
        self.engine
            .call_fn_with_options::<Dynamic>(options, &mut Scope::new(), ast, def.name, values)
            .map_err(|err| CallFailure::from_eval(def.name, &err))
    }

    fn record_failure(&self, failure: &CallFailure) {
        if failure.is_unrecoverable() {
            self.state.bump_error_count();
        }
        error!(
            context = self.name(),
            event = failure.event.as_str(),
            unrecoverable = failure.is_unrecoverable(),
            "call-in failed: {}",
            failure.message
        );
        self.state.push_diagnostic(
            DiagnosticLevel::Error,
            Some(&failure.event),
            failure.message.clone(),
        );
    }

    fn report_mismatch(&self, def: &CallInDef, expected: ReturnContract, got: &str) {
        warn!(
            context = self.name(),
            event = def.name,
            expected = expected.expected_name(),
            got,
            "call-in returned the wrong type"
        );
        self.state.push_diagnostic(
            DiagnosticLevel::Warn,
            Some(def.name),
            format!("expected {} return, got {}", expected.expected_name(), got),
        );
    }

    /// Runs a call-in and checks its result against the event's contract.
    pub(crate) fn call_checked<F>(&self, def: &CallInDef, build: F) -> Option<ReturnValue>
    where
        F: FnOnce(&CapabilityProfile, &mut CallArgs),
    {
        let value = self.run_call_in(def, build)?;
        let answer = dynamic_to_return(&value);
        if answer.satisfies(def.returns) {
            Some(answer)
        } else {
            self.report_mismatch(def, def.returns, value.type_name());
            None
        }
    }

    pub(crate) fn call_bool<F>(&self, def: &CallInDef, default: bool, build: F) -> bool
    where
        F: FnOnce(&CapabilityProfile, &mut CallArgs),
    {
        self.call_checked(def, build)
            .and_then(|answer| answer.as_bool())
            .unwrap_or(default)
    }

    pub(crate) fn call_number<F>(&self, def: &CallInDef, build: F) -> Option<f64>
    where
        F: FnOnce(&CapabilityProfile, &mut CallArgs),
    {
        self.call_checked(def, build)
            .and_then(|answer| answer.as_number())
    }

    pub(crate) fn call_string<F>(&self, def: &CallInDef, build: F) -> Option<String>
    where
        F: FnOnce(&CapabilityProfile, &mut CallArgs),
    {
        self.call_checked(def, build)
            .and_then(|answer| answer.as_string().map(str::to_string))
    }

    /// Two-boolean contract: the handler returns `[first, second]` or a lone
    /// boolean. The second value is `None` when it is absent or not a boolean.
    pub(crate) fn call_bool_pair<F>(
        &self,
        def: &CallInDef,
        build: F,
    ) -> Option<(bool, Option<bool>)>
    where
        F: FnOnce(&CapabilityProfile, &mut CallArgs),
    {
        let value = self.run_call_in(def, build)?;
        if let Ok(first) = value.as_bool() {
            return Some((first, None));
        }
        if value.is_array() {
            let array = value.clone().into_array().unwrap_or_default();
            if let Some(Ok(first)) = array.first().map(Dynamic::as_bool) {
                let second = array.get(1).and_then(|second| second.as_bool().ok());
                return Some((first, second));
            }
        }
        self.report_mismatch(def, def.returns, value.type_name());
        None
    }

    /// Delivers `Shutdown` once; later calls do nothing.
    pub fn shutdown(&self) {
        if self.shut_down.replace(true) {
            return;
        }
        self.call_void(&ch_core::SHUTDOWN, |_, _| {});
    }

    pub(crate) fn call_void<F>(&self, def: &CallInDef, build: F)
    where
        F: FnOnce(&CapabilityProfile, &mut CallArgs),
    {
        self.run_call_in(def, build);
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.registry.forget(&self.state);
        debug!(context = self.state.name(), "script context torn down");
    }
}
