pub mod config;
pub mod events;
pub mod handle_set;
pub mod loader;
pub mod specialized;

use std::path::PathBuf;
use std::rc::Rc;

use ch_core::HostError;
use ch_runtime::ContextRegistry;
use ch_sandbox::SandboxedFs;
use tracing::info;

pub use config::{config_enables, HostConfig, TeamLayout};
pub use events::{parse_events, HostEvent};
pub use handle_set::{HandleSet, KilledContext};
pub use loader::{read_context_sources, ContextSources, DRAW_FILE, MAIN_FILE};
pub use specialized::{
    create_gaia, create_rules, create_ui, ui_message_filter, ui_profile, ContextEnv, GAIA_NAME,
    MSG_MODE_ALL, MSG_MODE_ALLIES, MSG_MODE_SPECTATORS, RULES_NAME, UI_NAME,
};

#[derive(Debug, Clone)]
pub struct CreateHandleSetOptions {
    /// Root holding one directory per context; also the sandbox root.
    pub data_dir: PathBuf,
    pub config: HostConfig,
}

/// Validates the configuration and brings up the specialized contexts in
/// dispatch order. Contexts without code or with failing synced code are
/// simply absent from the returned set.
pub fn create_handle_set(options: CreateHandleSetOptions) -> Result<HandleSet, HostError> {
    options.config.validate()?;

    let registry = Rc::new(ContextRegistry::new());
    registry.set_dev_mode(options.config.dev_mode);
    registry.set_mod_ui_ctrl(options.config.mod_ui_ctrl);
    let sandbox = Rc::new(SandboxedFs::new(options.data_dir.clone()));

    let env = ContextEnv {
        registry: &registry,
        sandbox: &sandbox,
        config: &options.config,
        data_dir: &options.data_dir,
    };

    let mut set = HandleSet::new(Rc::clone(&registry));
    for create in [create_gaia, create_rules, create_ui] {
        if let Some(handle) = create(&env)? {
            set.insert(handle)?;
        }
    }
    info!(contexts = set.len(), "handle set ready");
    Ok(set)
}
