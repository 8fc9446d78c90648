//! Thread-confined record of which script context is executing right now.
//!
//! Every entry into a runtime goes through [`ContextRegistry::enter`], which
//! installs the context and hands back a guard that reinstalls the previous
//! one when dropped. Host functions called from inside a runtime look the
//! caller up here instead of carrying a context reference around.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;

use ch_core::{CapabilityProfile, Diagnostic, DiagnosticLevel, NO_ACCESS_TEAM};
use rhai::{Dynamic, Map};

pub const DIAGNOSTICS_CAPACITY: usize = 256;

/// The part of a script context that host functions need to reach while the
/// context's runtime is on the stack.
#[derive(Debug)]
pub struct ContextState {
    name: String,
    order: i32,
    profile: Cell<CapabilityProfile>,
    synced: Cell<bool>,
    kill_requested: Cell<bool>,
    kill_message: RefCell<String>,
    error_count: Cell<u32>,
    diagnostics: RefCell<VecDeque<Diagnostic>>,
    watch_weapons: RefCell<BTreeSet<i32>>,
    globals: Dynamic,
}

impl ContextState {
    pub fn new(name: impl Into<String>, order: i32, profile: CapabilityProfile) -> Self {
        Self {
            name: name.into(),
            order,
            profile: Cell::new(profile),
            synced: Cell::new(profile.resting_synced()),
            kill_requested: Cell::new(false),
            kill_message: RefCell::new(String::new()),
            error_count: Cell::new(0),
            diagnostics: RefCell::new(VecDeque::new()),
            watch_weapons: RefCell::new(BTreeSet::new()),
            globals: Dynamic::from_map(Map::new()).into_shared(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn profile(&self) -> CapabilityProfile {
        self.profile.get()
    }

    pub fn synced(&self) -> bool {
        self.synced.get()
    }

    pub(crate) fn set_synced(&self, synced: bool) {
        self.synced.set(synced);
    }

    pub fn request_kill(&self, message: Option<&str>) {
        self.kill_requested.set(true);
        *self.kill_message.borrow_mut() = message.unwrap_or_default().to_string();
    }

    pub fn kill_requested(&self) -> bool {
        self.kill_requested.get()
    }

    pub fn kill_message(&self) -> String {
        self.kill_message.borrow().clone()
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.get()
    }

    pub(crate) fn bump_error_count(&self) {
        self.error_count.set(self.error_count.get().saturating_add(1));
    }

    /// Persistent script state, bound as `this` inside every call-in.
    pub fn globals(&self) -> Dynamic {
        self.globals.clone()
    }

    pub fn push_diagnostic(&self, level: DiagnosticLevel, event: Option<&str>, message: String) {
        let mut diagnostics = self.diagnostics.borrow_mut();
        if diagnostics.len() == DIAGNOSTICS_CAPACITY {
            diagnostics.pop_front();
        }
        diagnostics.push_back(Diagnostic {
            level,
            event: event.map(str::to_string),
            message,
        });
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().iter().cloned().collect()
    }

    pub fn drain_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow_mut().drain(..).collect()
    }

    pub fn watch_weapon(&self, weapon_id: i32, watch: bool) {
        let mut weapons = self.watch_weapons.borrow_mut();
        if watch {
            weapons.insert(weapon_id);
        } else {
            weapons.remove(&weapon_id);
        }
    }

    pub fn watches_weapon(&self, weapon_id: i32) -> bool {
        self.watch_weapons.borrow().contains(&weapon_id)
    }

    pub fn watched_weapons(&self) -> Vec<i32> {
        self.watch_weapons.borrow().iter().copied().collect()
    }
}

#[derive(Debug, Default)]
pub struct HostSettings {
    dev_mode: Cell<bool>,
    mod_ui_ctrl: Cell<bool>,
}

#[derive(Debug)]
pub struct ContextRegistry {
    current: RefCell<Option<Rc<ContextState>>>,
    active_full_read: Cell<bool>,
    active_read_ally_team: Cell<i32>,
    depth: Cell<usize>,
    settings: HostSettings,
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self {
            current: RefCell::new(None),
            active_full_read: Cell::new(false),
            active_read_ally_team: Cell::new(NO_ACCESS_TEAM),
            depth: Cell::new(0),
            settings: HostSettings::default(),
        }
    }

    /// Installs `context` and returns whatever was active before.
    pub fn activate(&self, context: &Rc<ContextState>) -> Option<Rc<ContextState>> {
        self.depth.set(self.depth.get() + 1);
        let previous = self.current.replace(Some(Rc::clone(context)));
        self.mirror(Some(context));
        previous
    }

    /// Reinstalls a context saved by [`activate`](Self::activate).
    pub fn restore(&self, previous: Option<Rc<ContextState>>) {
        self.depth.set(self.depth.get().saturating_sub(1));
        self.mirror(previous.as_ref());
        self.current.replace(previous);
    }

    pub fn enter(&self, context: &Rc<ContextState>) -> ActivationGuard<'_> {
        let previous = self.activate(context);
        ActivationGuard {
            registry: self,
            previous: Some(previous),
        }
    }

    fn mirror(&self, context: Option<&Rc<ContextState>>) {
        match context {
            Some(context) => {
                let profile = context.profile();
                self.active_full_read.set(profile.full_read);
                self.active_read_ally_team.set(profile.read_ally_team);
            }
            None => {
                self.active_full_read.set(false);
                self.active_read_ally_team.set(NO_ACCESS_TEAM);
            }
        }
    }

    pub fn current(&self) -> Option<Rc<ContextState>> {
        self.current.borrow().clone()
    }

    pub fn active_name(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .map(|context| context.name().to_string())
    }

    pub fn is_active(&self, context: &ContextState) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|current| std::ptr::eq(current.as_ref(), context))
    }

    pub fn active_full_read(&self) -> bool {
        self.active_full_read.get()
    }

    pub fn active_read_ally_team(&self) -> i32 {
        self.active_read_ally_team.get()
    }

    /// Number of protected calls currently on the stack.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn is_idle(&self) -> bool {
        self.depth.get() == 0
    }

    /// Drops the registry's reference to a context being torn down.
    pub fn forget(&self, context: &ContextState) {
        if self.is_active(context) {
            self.current.replace(None);
            self.mirror(None);
        }
    }

    pub fn dev_mode(&self) -> bool {
        self.settings.dev_mode.get()
    }

    pub fn set_dev_mode(&self, enabled: bool) {
        self.settings.dev_mode.set(enabled);
    }

    pub fn mod_ui_ctrl(&self) -> bool {
        self.settings.mod_ui_ctrl.get()
    }

    pub fn set_mod_ui_ctrl(&self, enabled: bool) {
        self.settings.mod_ui_ctrl.set(enabled);
    }
}

/// Restores the previously active context when dropped, including on the
/// error path of a protected call.
#[must_use = "dropping the guard immediately deactivates the context"]
pub struct ActivationGuard<'a> {
    registry: &'a ContextRegistry,
    previous: Option<Option<Rc<ContextState>>>,
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.registry.restore(previous);
        }
    }
}

#[cfg(test)]
mod registry_tests {
    use ch_core::{ALL_ACCESS_TEAM, CapabilityProfile};

    use super::*;

    fn context(name: &str, profile: CapabilityProfile) -> Rc<ContextState> {
        Rc::new(ContextState::new(name, 0, profile))
    }

    #[test]
    fn activate_and_restore_nest_to_any_depth() {
        let registry = ContextRegistry::new();
        let contexts = (0..8)
            .map(|index| context(&format!("ctx{}", index), CapabilityProfile::default()))
            .collect::<Vec<_>>();

        let mut saved = Vec::new();
        for ctx in &contexts {
            saved.push(registry.activate(ctx));
            assert_eq!(registry.active_name().as_deref(), Some(ctx.name()));
        }
        assert_eq!(registry.depth(), contexts.len());

        for (index, previous) in saved.into_iter().enumerate().rev() {
            registry.restore(previous);
            let expected = index.checked_sub(1).map(|prev| contexts[prev].name());
            assert_eq!(registry.active_name().as_deref(), expected);
        }
        assert!(registry.is_idle());
        assert!(registry.current().is_none());
    }

    #[test]
    fn guard_restores_outer_context_and_shadow_fields() {
        let registry = ContextRegistry::new();
        let rules = context("LuaRules", CapabilityProfile::full_access());
        let gaia = context("LuaGaia", CapabilityProfile::locked_to(3, 2));

        let _outer = registry.enter(&rules);
        assert!(registry.active_full_read());
        assert_eq!(registry.active_read_ally_team(), ALL_ACCESS_TEAM);
        {
            let _inner = registry.enter(&gaia);
            assert!(!registry.active_full_read());
            assert_eq!(registry.active_read_ally_team(), 2);
            assert_eq!(registry.depth(), 2);
        }
        assert_eq!(registry.active_name().as_deref(), Some("LuaRules"));
        assert!(registry.active_full_read());
        assert_eq!(registry.depth(), 1);
    }

    #[test]
    fn forget_clears_only_matching_context() {
        let registry = ContextRegistry::new();
        let a = context("A", CapabilityProfile::default());
        let b = context("B", CapabilityProfile::default());
        let previous = registry.activate(&a);
        registry.forget(&b);
        assert!(registry.is_active(&a));
        registry.forget(&a);
        assert!(registry.current().is_none());
        registry.restore(previous);
        assert!(registry.is_idle());
    }

    #[test]
    fn diagnostics_buffer_is_bounded() {
        let state = ContextState::new("A", 0, CapabilityProfile::default());
        for index in 0..(DIAGNOSTICS_CAPACITY + 10) {
            state.push_diagnostic(DiagnosticLevel::Info, None, index.to_string());
        }
        let diagnostics = state.drain_diagnostics();
        assert_eq!(diagnostics.len(), DIAGNOSTICS_CAPACITY);
        assert_eq!(diagnostics[0].message, "10");
        assert!(state.diagnostics().is_empty());
    }

    #[test]
    fn kill_request_keeps_message() {
        let state = ContextState::new("A", 0, CapabilityProfile::default());
        assert!(!state.kill_requested());
        state.request_kill(Some("bye"));
        assert!(state.kill_requested());
        assert_eq!(state.kill_message(), "bye");
    }
}
