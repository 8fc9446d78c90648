use std::rc::Rc;

use ch_core::{HandleOrder, HostError};
use ch_runtime::{ContextRegistry, Handle};
use tracing::{debug, warn};

/// A context removed after it asked to be killed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KilledContext {
    pub name: String,
    pub message: String,
}

/// The live script contexts, kept in dispatch order.
#[derive(Debug)]
pub struct HandleSet {
    registry: Rc<ContextRegistry>,
    handles: Vec<Rc<Handle>>,
}

impl HandleSet {
    pub fn new(registry: Rc<ContextRegistry>) -> Self {
        Self {
            registry,
            handles: Vec::new(),
        }
    }

    pub fn registry(&self) -> &Rc<ContextRegistry> {
        &self.registry
    }

    pub fn insert(&mut self, handle: Handle) -> Result<(), HostError> {
        if self.get(handle.order()).is_some() {
            return Err(HostError::new(
                "HOST_DUPLICATE_ORDER",
                format!("A context already occupies the {:?} slot.", handle.order()),
            ));
        }
        self.handles.push(Rc::new(handle));
        self.handles.sort_by_key(|handle| handle.order());
        Ok(())
    }

    pub fn get(&self, order: HandleOrder) -> Option<&Rc<Handle>> {
        self.handles.iter().find(|handle| handle.order() == order)
    }

    pub fn handles(&self) -> &[Rc<Handle>] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Calls `f` on every context in order. Iterates over a snapshot so
    /// handlers cannot disturb the walk.
    pub fn broadcast(&self, mut f: impl FnMut(&Handle)) {
        let snapshot = self.handles.clone();
        for handle in &snapshot {
            f(handle.as_ref());
        }
    }

    /// Calls every context and reports whether any of them answered `true`.
    pub fn broadcast_any(&self, mut f: impl FnMut(&Handle) -> bool) -> bool {
        let mut any = false;
        self.broadcast(|handle| any |= f(handle));
        any
    }

    /// Calls every context; the earliest context with an answer wins.
    pub fn broadcast_first<T>(&self, mut f: impl FnMut(&Handle) -> Option<T>) -> Option<T> {
        let mut first = None;
        self.broadcast(|handle| {
            let answer = f(handle);
            if first.is_none() {
                first = answer;
            }
        });
        first
    }

    /// Delivers a player message to the context selected by `tag`. Unknown
    /// tags, absent contexts and messages the context's audience filter
    /// rejects are dropped without reaching any script.
    pub fn route_message(&self, tag: i32, player_id: i32, mode: i32, message: &str) -> bool {
        let Some(order) = HandleOrder::from_tag(tag) else {
            debug!(tag, "dropped message with unknown routing tag");
            return false;
        };
        let Some(handle) = self.get(order).cloned() else {
            debug!(tag, "dropped message for absent context");
            return false;
        };
        if !handle.accepts_message(player_id, mode) {
            debug!(context = handle.name(), player_id, mode, "message filtered out");
            return false;
        }
        handle.recv_lua_msg(message, player_id)
    }

    /// Tears down contexts that requested their own death. Does nothing
    /// while any protected call is still on the stack.
    pub fn reap_killed(&mut self) -> Vec<KilledContext> {
        if !self.registry.is_idle() {
            return Vec::new();
        }
        let (killed, alive): (Vec<_>, Vec<_>) = self
            .handles
            .drain(..)
            .partition(|handle| handle.kill_requested());
        self.handles = alive;

        killed
            .into_iter()
            .map(|handle| {
                let message = handle.kill_message();
                warn!(context = handle.name(), reason = message.as_str(), "context killed itself");
                handle.shutdown();
                KilledContext {
                    name: handle.name().to_string(),
                    message,
                }
            })
            .collect()
    }

    pub fn remove(&mut self, order: HandleOrder) -> Option<Rc<Handle>> {
        let index = self.handles.iter().position(|handle| handle.order() == order)?;
        let handle = self.handles.remove(index);
        handle.shutdown();
        Some(handle)
    }

    pub fn shutdown_all(&mut self) {
        for handle in self.handles.drain(..).rev() {
            handle.shutdown();
        }
    }
}

impl Drop for HandleSet {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}
