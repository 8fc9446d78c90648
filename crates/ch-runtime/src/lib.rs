mod bridge;
mod callins;
mod failure;
mod handle;
mod host_api;
mod registry;

pub use failure::{classify, CallFailure, FailureClass};
pub use handle::{Handle, HandleBuilder, MessageFilter, Namespace, DEFAULT_MAX_CALL_LEVELS};
pub use host_api::{ScriptFile, IO_MODULE, SCRIPT_MODULE};
pub use registry::{
    ActivationGuard, ContextRegistry, ContextState, HostSettings, DIAGNOSTICS_CAPACITY,
};

#[cfg(test)]
mod tests;
