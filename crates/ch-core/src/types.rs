use serde::{Deserialize, Serialize};

/// Team id meaning "no team may be read or controlled".
pub const NO_ACCESS_TEAM: i32 = -1;
/// Team id meaning "every team may be read or controlled".
pub const ALL_ACCESS_TEAM: i32 = -2;

/// Visibility and control scope of one script context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProfile {
    pub full_ctrl: bool,
    pub full_read: bool,
    pub ctrl_team: i32,
    pub read_team: i32,
    pub read_ally_team: i32,
    pub select_team: i32,
    pub user_mode: bool,
}

impl Default for CapabilityProfile {
    fn default() -> Self {
        Self {
            full_ctrl: false,
            full_read: false,
            ctrl_team: NO_ACCESS_TEAM,
            read_team: NO_ACCESS_TEAM,
            read_ally_team: NO_ACCESS_TEAM,
            select_team: NO_ACCESS_TEAM,
            user_mode: false,
        }
    }
}

impl CapabilityProfile {
    /// Game-logic profile that may read and control everything.
    pub fn full_access() -> Self {
        Self {
            full_ctrl: true,
            full_read: true,
            ctrl_team: ALL_ACCESS_TEAM,
            read_team: ALL_ACCESS_TEAM,
            read_ally_team: ALL_ACCESS_TEAM,
            select_team: ALL_ACCESS_TEAM,
            user_mode: false,
        }
    }

    /// Game-logic profile pinned to a single team for control, read and selection.
    pub fn locked_to(team: i32, ally_team: i32) -> Self {
        Self {
            full_ctrl: false,
            full_read: false,
            ctrl_team: team,
            read_team: team,
            read_ally_team: ally_team,
            select_team: team,
            user_mode: false,
        }
    }

    /// Presentation profile for the local player.
    pub fn user(team: i32, ally_team: i32) -> Self {
        Self {
            full_ctrl: false,
            full_read: false,
            ctrl_team: team,
            read_team: team,
            read_ally_team: ally_team,
            select_team: team,
            user_mode: true,
        }
    }

    pub fn can_read_ally_team(&self, ally_team: i32) -> bool {
        if self.full_read || self.read_ally_team == ALL_ACCESS_TEAM {
            return true;
        }
        self.read_ally_team >= 0 && self.read_ally_team == ally_team
    }

    pub fn can_ctrl_team(&self, team: i32) -> bool {
        if self.full_ctrl || self.ctrl_team == ALL_ACCESS_TEAM {
            return true;
        }
        self.ctrl_team >= 0 && self.ctrl_team == team
    }

    /// The mode a context rests in between call-ins.
    pub fn resting_synced(&self) -> bool {
        !self.user_mode
    }
}

/// Fixed dispatch slots; the numeric value doubles as the message routing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandleOrder {
    Gaia,
    Rules,
    Ui,
}

impl HandleOrder {
    pub const ALL: [HandleOrder; 3] = [HandleOrder::Gaia, HandleOrder::Rules, HandleOrder::Ui];

    pub fn tag(self) -> i32 {
        match self {
            Self::Gaia => 100,
            Self::Rules => 200,
            Self::Ui => 300,
        }
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|order| order.tag() == tag)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Float3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Float3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Host view of a unit, as far as call-ins need it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitInfo {
    pub id: i32,
    pub def_id: i32,
    pub team: i32,
    pub ally_team: i32,
    #[serde(default)]
    pub experience: f32,
    /// Ally teams that currently have this unit in line of sight.
    #[serde(default)]
    pub in_los_of: Vec<i32>,
}

impl UnitInfo {
    pub fn new(id: i32, def_id: i32, team: i32, ally_team: i32) -> Self {
        Self {
            id,
            def_id,
            team,
            ally_team,
            experience: 0.0,
            in_los_of: Vec::new(),
        }
    }

    pub fn in_los_of(&self, ally_team: i32) -> bool {
        self.in_los_of.contains(&ally_team)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInfo {
    pub id: i32,
    pub ally_team: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileInfo {
    pub id: i32,
    #[serde(default)]
    pub owner: Option<UnitInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponInfo {
    pub weapon_num: i32,
    pub num_stockpiled: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: i32,
    #[serde(default)]
    pub options: i32,
    #[serde(default)]
    pub params: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyModifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PointerTarget {
    Unit { id: i32 },
    Feature { id: i32 },
    Ground { pos: Float3 },
    Selection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MapDrawAction {
    Point { pos: Float3, label: String },
    Line { from: Float3, to: Float3 },
    Erase { pos: Float3 },
}

/// Roster entry for message routing decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: i32,
    pub team: i32,
    #[serde(default)]
    pub spectator: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

/// One logged line kept in a context's diagnostics buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub event: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn locked_profile_reads_only_its_ally_team() {
        let profile = CapabilityProfile::locked_to(7, 3);
        assert!(profile.can_read_ally_team(3));
        assert!(!profile.can_read_ally_team(0));
        assert!(profile.can_ctrl_team(7));
        assert!(!profile.can_ctrl_team(1));
        assert!(profile.resting_synced());
    }

    #[test]
    fn no_access_profile_reads_nothing() {
        let profile = CapabilityProfile::default();
        assert!(!profile.can_read_ally_team(NO_ACCESS_TEAM));
        assert!(!profile.can_read_ally_team(0));
        assert!(!profile.can_ctrl_team(0));
    }

    #[test]
    fn full_access_profile_reads_everything() {
        let profile = CapabilityProfile::full_access();
        assert!(profile.can_read_ally_team(5));
        assert!(profile.can_ctrl_team(9));
    }

    #[test]
    fn handle_order_tags_round_trip_and_sort() {
        for order in HandleOrder::ALL {
            assert_eq!(HandleOrder::from_tag(order.tag()), Some(order));
        }
        assert_eq!(HandleOrder::from_tag(42), None);
        assert!(HandleOrder::Gaia < HandleOrder::Rules);
        assert!(HandleOrder::Rules < HandleOrder::Ui);
    }

    #[test]
    fn user_profile_rests_unsynced() {
        assert!(!CapabilityProfile::user(0, 0).resting_synced());
    }
}
