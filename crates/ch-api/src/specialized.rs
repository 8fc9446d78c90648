use std::path::Path;
use std::rc::Rc;

use ch_core::{CapabilityProfile, HandleOrder, HostError, ALL_ACCESS_TEAM};
use ch_runtime::{ContextRegistry, Handle, HandleBuilder, MessageFilter, Namespace};
use ch_sandbox::SandboxedFs;
use tracing::{error, info, warn};

use crate::config::{HostConfig, TeamLayout};
use crate::loader::{read_context_sources, ContextSources, DRAW_FILE, MAIN_FILE};

pub const GAIA_NAME: &str = "LuaGaia";
pub const RULES_NAME: &str = "LuaRules";
pub const UI_NAME: &str = "LuaUI";

pub const MSG_MODE_ALL: i32 = 0;
pub const MSG_MODE_SPECTATORS: i32 = b's' as i32;
pub const MSG_MODE_ALLIES: i32 = b'a' as i32;

/// Everything a specialized context needs from the host at construction.
pub struct ContextEnv<'a> {
    pub registry: &'a Rc<ContextRegistry>,
    pub sandbox: &'a Rc<SandboxedFs>,
    pub config: &'a HostConfig,
    pub data_dir: &'a Path,
}

impl ContextEnv<'_> {
    fn builder(&self, name: &str, order: HandleOrder) -> HandleBuilder {
        HandleBuilder::new(name, order, Rc::clone(self.registry))
            .sandbox(Rc::clone(self.sandbox))
            .max_call_levels(self.config.max_call_levels)
    }
}

/// Builds the context and loads its code. A failing synced load discards
/// the context; a failing unsynced load only costs the presentation half.
fn load_specialized(builder: HandleBuilder, sources: &ContextSources) -> Option<Handle> {
    let handle = builder.build();
    let Some(main) = sources.main.as_deref() else {
        info!(context = handle.name(), dir = %sources.dir.display(), "no code found, context not created");
        return None;
    };
    if let Err(err) = handle.load_code(Namespace::Global, main, MAIN_FILE) {
        error!(context = handle.name(), %err, "synced code failed to load, context discarded");
        return None;
    }
    if let Some(draw) = sources.draw.as_deref() {
        if handle.profile().user_mode {
            warn!(context = handle.name(), "{} ignored for user-mode contexts", DRAW_FILE);
        } else if let Err(err) = handle.load_code(Namespace::Registry, draw, DRAW_FILE) {
            warn!(context = handle.name(), %err, "unsynced code failed to load, continuing without it");
        }
    }
    info!(context = handle.name(), "context created");
    Some(handle)
}

/// The environment context: locked to the engine-owned gaia team.
pub fn create_gaia(env: &ContextEnv<'_>) -> Result<Option<Handle>, HostError> {
    if !env.config.gaia_enabled() {
        info!(context = GAIA_NAME, "disabled by configuration");
        return Ok(None);
    }
    let sources = read_context_sources(env.data_dir, GAIA_NAME)?;
    let teams = &env.config.teams;
    let builder = env
        .builder(GAIA_NAME, HandleOrder::Gaia)
        .profile(CapabilityProfile::locked_to(
            teams.gaia_team,
            teams.gaia_ally_team,
        ))
        .config_string(env.config.gaia_config.clone());
    Ok(load_specialized(builder, &sources))
}

pub fn create_rules(env: &ContextEnv<'_>) -> Result<Option<Handle>, HostError> {
    if !env.config.rules_enabled() {
        info!(context = RULES_NAME, "disabled by configuration");
        return Ok(None);
    }
    let sources = read_context_sources(env.data_dir, RULES_NAME)?;
    let builder = env
        .builder(RULES_NAME, HandleOrder::Rules)
        .profile(CapabilityProfile::full_access())
        .config_string(env.config.rules_config.clone());
    Ok(load_specialized(builder, &sources))
}

pub fn ui_profile(teams: &TeamLayout) -> CapabilityProfile {
    let mut profile = CapabilityProfile::user(teams.local_team, teams.local_ally_team);
    if teams.spectating_full_view {
        profile.full_read = true;
        profile.read_team = ALL_ACCESS_TEAM;
        profile.read_ally_team = ALL_ACCESS_TEAM;
    }
    profile
}

/// Audience check for messages addressed to the local player's interface.
pub fn ui_message_filter(config: &HostConfig) -> MessageFilter {
    let teams = config.teams.clone();
    let players = config.players.clone();
    Box::new(move |player_id, mode| match mode {
        MSG_MODE_ALL => true,
        MSG_MODE_SPECTATORS => teams.spectating,
        MSG_MODE_ALLIES => {
            let Some(player) = players.iter().find(|player| player.id == player_id) else {
                return false;
            };
            if teams.spectating_full_view {
                true
            } else if player.spectator {
                teams.spectating
            } else {
                teams.ally_team_of(player.team) == Some(teams.local_ally_team)
            }
        }
        _ => false,
    })
}

pub fn create_ui(env: &ContextEnv<'_>) -> Result<Option<Handle>, HostError> {
    if !env.config.ui_enabled {
        info!(context = UI_NAME, "disabled by configuration");
        return Ok(None);
    }
    let sources = read_context_sources(env.data_dir, UI_NAME)?;
    let builder = env
        .builder(UI_NAME, HandleOrder::Ui)
        .profile(ui_profile(&env.config.teams))
        .message_filter(ui_message_filter(env.config));
    Ok(load_specialized(builder, &sources))
}
