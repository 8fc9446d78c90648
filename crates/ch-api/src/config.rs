use std::collections::BTreeMap;
use std::path::Path;

use ch_core::{HostError, PlayerInfo};
use ch_runtime::DEFAULT_MAX_CALL_LEVELS;
use serde::{Deserialize, Serialize};

/// Whether a specialized context's configuration string lets it load.
/// Only the exact tokens `"0"` and `"disabled"` turn a context off.
pub fn config_enables(value: &str) -> bool {
    !matches!(value, "0" | "disabled")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamLayout {
    pub gaia_team: i32,
    pub gaia_ally_team: i32,
    pub local_team: i32,
    pub local_ally_team: i32,
    pub spectating: bool,
    pub spectating_full_view: bool,
    /// Team id to ally-team id.
    pub ally_teams: BTreeMap<i32, i32>,
}

impl Default for TeamLayout {
    fn default() -> Self {
        Self {
            gaia_team: 1,
            gaia_ally_team: 1,
            local_team: 0,
            local_ally_team: 0,
            spectating: false,
            spectating_full_view: false,
            ally_teams: BTreeMap::new(),
        }
    }
}

impl TeamLayout {
    pub fn ally_team_of(&self, team: i32) -> Option<i32> {
        if team == self.gaia_team {
            return Some(self.gaia_ally_team);
        }
        if team == self.local_team {
            return Some(self.local_ally_team);
        }
        self.ally_teams.get(&team).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    pub dev_mode: bool,
    pub mod_ui_ctrl: bool,
    pub gaia_config: String,
    pub rules_config: String,
    pub ui_enabled: bool,
    pub max_call_levels: usize,
    pub teams: TeamLayout,
    pub players: Vec<PlayerInfo>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            mod_ui_ctrl: false,
            gaia_config: String::new(),
            rules_config: String::new(),
            ui_enabled: true,
            max_call_levels: DEFAULT_MAX_CALL_LEVELS,
            teams: TeamLayout::default(),
            players: Vec::new(),
        }
    }
}

impl HostConfig {
    pub fn from_json(text: &str) -> Result<Self, HostError> {
        serde_json::from_str(text)
            .map_err(|error| HostError::new("CONFIG_PARSE", error.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path).map_err(|error| {
            HostError::new(
                "CONFIG_READ",
                format!("Failed to read {}: {}", path.display(), error),
            )
        })?;
        Self::from_json(&text)
    }

    pub fn gaia_enabled(&self) -> bool {
        config_enables(&self.gaia_config)
    }

    pub fn rules_enabled(&self) -> bool {
        config_enables(&self.rules_config)
    }

    pub fn validate(&self) -> Result<(), HostError> {
        if self.max_call_levels == 0 {
            return Err(HostError::new(
                "CONFIG_CALL_LEVELS",
                "maxCallLevels must be at least 1.",
            ));
        }
        if !self.gaia_enabled() {
            return Ok(());
        }
        let teams = &self.teams;
        if teams.gaia_team < 0 || teams.gaia_ally_team < 0 {
            return Err(HostError::new(
                "CONFIG_GAIA_TEAM",
                format!(
                    "Gaia needs a real team identity, got team {} ally team {}.",
                    teams.gaia_team, teams.gaia_ally_team
                ),
            ));
        }
        if self.ui_enabled && !teams.spectating && teams.local_team == teams.gaia_team {
            return Err(HostError::new(
                "CONFIG_TEAM_CONFLICT",
                format!(
                    "Team {} is claimed by both the gaia and the local player.",
                    teams.gaia_team
                ),
            ));
        }
        Ok(())
    }

    pub fn player(&self, player_id: i32) -> Option<&PlayerInfo> {
        self.players.iter().find(|player| player.id == player_id)
    }
}
