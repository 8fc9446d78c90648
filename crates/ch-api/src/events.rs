//! Serializable simulation events, replayed through a [`HandleSet`] by the
//! host driver. Each variant broadcasts the matching call-in to every
//! context in dispatch order.

use std::collections::BTreeMap;

use ch_core::{
    CiValue, Command, FeatureInfo, Float3, HostError, KeyModifiers, MapDrawAction,
    PointerTarget, ProjectileInfo, UnitInfo, WeaponInfo,
};
use serde::{Deserialize, Serialize};

use crate::handle_set::HandleSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum HostEvent {
    GamePreload,
    GameStart,
    GameOver,
    TeamDied {
        team: i32,
    },
    TeamChanged {
        team: i32,
    },
    PlayerChanged {
        player_id: i32,
    },
    UnitCreated {
        unit: UnitInfo,
        #[serde(default)]
        builder: Option<UnitInfo>,
    },
    UnitFinished {
        unit: UnitInfo,
    },
    UnitFromFactory {
        unit: UnitInfo,
        factory: UnitInfo,
        #[serde(default)]
        user_orders: bool,
    },
    UnitDestroyed {
        unit: UnitInfo,
        #[serde(default)]
        attacker: Option<UnitInfo>,
    },
    UnitTaken {
        unit: UnitInfo,
        new_team: i32,
    },
    UnitGiven {
        unit: UnitInfo,
        old_team: i32,
    },
    UnitIdle {
        unit: UnitInfo,
    },
    UnitCommand {
        unit: UnitInfo,
        command: Command,
    },
    UnitCmdDone {
        unit: UnitInfo,
        command_id: i32,
        #[serde(default)]
        command_tag: i32,
    },
    UnitDamaged {
        unit: UnitInfo,
        #[serde(default)]
        attacker: Option<UnitInfo>,
        damage: f32,
        #[serde(default)]
        weapon_id: i32,
        #[serde(default)]
        paralyzer: bool,
    },
    UnitExperience {
        unit: UnitInfo,
        old_experience: f32,
    },
    UnitSeismicPing {
        unit: UnitInfo,
        ally_team: i32,
        pos: Float3,
        strength: f32,
    },
    UnitEnteredRadar {
        unit: UnitInfo,
        ally_team: i32,
    },
    UnitEnteredLos {
        unit: UnitInfo,
        ally_team: i32,
    },
    UnitLeftRadar {
        unit: UnitInfo,
        ally_team: i32,
    },
    UnitLeftLos {
        unit: UnitInfo,
        ally_team: i32,
    },
    UnitLoaded {
        unit: UnitInfo,
        transport: UnitInfo,
    },
    UnitUnloaded {
        unit: UnitInfo,
        transport: UnitInfo,
    },
    UnitEnteredWater {
        unit: UnitInfo,
    },
    UnitEnteredAir {
        unit: UnitInfo,
    },
    UnitLeftWater {
        unit: UnitInfo,
    },
    UnitLeftAir {
        unit: UnitInfo,
    },
    UnitCloaked {
        unit: UnitInfo,
    },
    UnitDecloaked {
        unit: UnitInfo,
    },
    FeatureCreated {
        feature: FeatureInfo,
    },
    FeatureDestroyed {
        feature: FeatureInfo,
    },
    ProjectileCreated {
        projectile: ProjectileInfo,
    },
    ProjectileDestroyed {
        projectile_id: i32,
    },
    Explosion {
        weapon_id: i32,
        pos: Float3,
        #[serde(default)]
        owner: Option<UnitInfo>,
    },
    StockpileChanged {
        unit: UnitInfo,
        weapon: WeaponInfo,
        old_count: i32,
    },
    /// A player message routed by tag to a single context.
    LuaMsg {
        tag: i32,
        player_id: i32,
        #[serde(default)]
        mode: i32,
        message: String,
    },
    Update,
    ViewResize {
        width: i32,
        height: i32,
    },
    DefaultCommand {
        target: PointerTarget,
    },
    DrawGenesis,
    DrawWorld,
    DrawWorldPreUnit,
    DrawWorldShadow,
    DrawWorldReflection,
    DrawWorldRefraction,
    DrawScreen {
        width: i32,
        height: i32,
    },
    DrawScreenEffects {
        width: i32,
        height: i32,
    },
    DrawInMiniMap {
        width: i32,
        height: i32,
    },
    AddConsoleLine {
        line: String,
        #[serde(default)]
        priority: i32,
    },
    GroupChanged {
        group_id: i32,
    },
    KeyPress {
        key: i32,
        #[serde(default)]
        mods: KeyModifiers,
        #[serde(default)]
        is_repeat: bool,
        #[serde(default)]
        label: String,
        #[serde(default)]
        unicode: i32,
    },
    KeyRelease {
        key: i32,
        #[serde(default)]
        mods: KeyModifiers,
        #[serde(default)]
        label: String,
        #[serde(default)]
        unicode: i32,
    },
    MousePress {
        x: i32,
        y: i32,
        button: i32,
    },
    MouseRelease {
        x: i32,
        y: i32,
        button: i32,
    },
    MouseMove {
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
        #[serde(default)]
        button: i32,
    },
    MouseWheel {
        up: bool,
        value: f32,
    },
    IsAbove {
        x: i32,
        y: i32,
    },
    GetTooltip {
        x: i32,
        y: i32,
    },
    ConfigureLayout {
        command: String,
    },
    CommandNotify {
        command: Command,
    },
    WorldTooltip {
        target: PointerTarget,
    },
    MapDrawCmd {
        player_id: i32,
        action: MapDrawAction,
    },
    GameSetup {
        state: String,
        #[serde(default)]
        ready: bool,
        #[serde(default)]
        player_states: BTreeMap<String, String>,
    },
}

pub fn parse_events(text: &str) -> Result<Vec<HostEvent>, HostError> {
    serde_json::from_str(text)
        .map_err(|error| HostError::new("HOST_EVENTS_PARSE", error.to_string()))
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

impl HostEvent {
    /// Broadcasts the event and returns the combined answer, if the event
    /// has a return contract and some context gave one.
    pub fn dispatch(&self, set: &HandleSet) -> Option<CiValue> {
        match self {
            Self::GamePreload => set.broadcast(|h| h.game_preload()),
            Self::GameStart => set.broadcast(|h| h.game_start()),
            Self::GameOver => set.broadcast(|h| h.game_over()),
            Self::TeamDied { team } => set.broadcast(|h| h.team_died(*team)),
            Self::TeamChanged { team } => set.broadcast(|h| h.team_changed(*team)),
            Self::PlayerChanged { player_id } => set.broadcast(|h| h.player_changed(*player_id)),
            Self::UnitCreated { unit, builder } => {
                set.broadcast(|h| h.unit_created(unit, builder.as_ref()))
            }
            Self::UnitFinished { unit } => set.broadcast(|h| h.unit_finished(unit)),
            Self::UnitFromFactory {
                unit,
                factory,
                user_orders,
            } => set.broadcast(|h| h.unit_from_factory(unit, factory, *user_orders)),
            Self::UnitDestroyed { unit, attacker } => {
                set.broadcast(|h| h.unit_destroyed(unit, attacker.as_ref()))
            }
            Self::UnitTaken { unit, new_team } => set.broadcast(|h| h.unit_taken(unit, *new_team)),
            Self::UnitGiven { unit, old_team } => set.broadcast(|h| h.unit_given(unit, *old_team)),
            Self::UnitIdle { unit } => set.broadcast(|h| h.unit_idle(unit)),
            Self::UnitCommand { unit, command } => set.broadcast(|h| h.unit_command(unit, command)),
            Self::UnitCmdDone {
                unit,
                command_id,
                command_tag,
            } => set.broadcast(|h| h.unit_cmd_done(unit, *command_id, *command_tag)),
            Self::UnitDamaged {
                unit,
                attacker,
                damage,
                weapon_id,
                paralyzer,
            } => set.broadcast(|h| {
                h.unit_damaged(unit, attacker.as_ref(), *damage, *weapon_id, *paralyzer)
            }),
            Self::UnitExperience {
                unit,
                old_experience,
            } => set.broadcast(|h| h.unit_experience(unit, *old_experience)),
            Self::UnitSeismicPing {
                unit,
                ally_team,
                pos,
                strength,
            } => set.broadcast(|h| h.unit_seismic_ping(unit, *ally_team, *pos, *strength)),
            Self::UnitEnteredRadar { unit, ally_team } => {
                set.broadcast(|h| h.unit_entered_radar(unit, *ally_team))
            }
            Self::UnitEnteredLos { unit, ally_team } => {
                set.broadcast(|h| h.unit_entered_los(unit, *ally_team))
            }
            Self::UnitLeftRadar { unit, ally_team } => {
                set.broadcast(|h| h.unit_left_radar(unit, *ally_team))
            }
            Self::UnitLeftLos { unit, ally_team } => {
                set.broadcast(|h| h.unit_left_los(unit, *ally_team))
            }
            Self::UnitLoaded { unit, transport } => {
                set.broadcast(|h| h.unit_loaded(unit, transport))
            }
            Self::UnitUnloaded { unit, transport } => {
                set.broadcast(|h| h.unit_unloaded(unit, transport))
            }
            Self::UnitEnteredWater { unit } => set.broadcast(|h| h.unit_entered_water(unit)),
            Self::UnitEnteredAir { unit } => set.broadcast(|h| h.unit_entered_air(unit)),
            Self::UnitLeftWater { unit } => set.broadcast(|h| h.unit_left_water(unit)),
            Self::UnitLeftAir { unit } => set.broadcast(|h| h.unit_left_air(unit)),
            Self::UnitCloaked { unit } => set.broadcast(|h| h.unit_cloaked(unit)),
            Self::UnitDecloaked { unit } => set.broadcast(|h| h.unit_decloaked(unit)),
            Self::FeatureCreated { feature } => set.broadcast(|h| h.feature_created(feature)),
            Self::FeatureDestroyed { feature } => set.broadcast(|h| h.feature_destroyed(feature)),
            Self::ProjectileCreated { projectile } => {
                set.broadcast(|h| h.projectile_created(projectile))
            }
            Self::ProjectileDestroyed { projectile_id } => {
                set.broadcast(|h| h.projectile_destroyed(*projectile_id))
            }
            Self::Explosion {
                weapon_id,
                pos,
                owner,
            } => {
                let claimed = set.broadcast_any(|h| h.explosion(*weapon_id, *pos, owner.as_ref()));
                return Some(CiValue::Bool(claimed));
            }
            Self::StockpileChanged {
                unit,
                weapon,
                old_count,
            } => set.broadcast(|h| h.stockpile_changed(unit, weapon, *old_count)),
            Self::LuaMsg {
                tag,
                player_id,
                mode,
                message,
            } => {
                let accepted = set.route_message(*tag, *player_id, *mode, message);
                return Some(CiValue::Bool(accepted));
            }
            Self::Update => set.broadcast(|h| h.update()),
            Self::ViewResize { width, height } => {
                set.broadcast(|h| h.view_resize(*width, *height))
            }
            Self::DefaultCommand { target } => {
                return set
                    .broadcast_first(|h| h.default_command(target))
                    .map(CiValue::from);
            }
            Self::DrawGenesis => set.broadcast(|h| h.draw_genesis()),
            Self::DrawWorld => set.broadcast(|h| h.draw_world()),
            Self::DrawWorldPreUnit => set.broadcast(|h| h.draw_world_pre_unit()),
            Self::DrawWorldShadow => set.broadcast(|h| h.draw_world_shadow()),
            Self::DrawWorldReflection => set.broadcast(|h| h.draw_world_reflection()),
            Self::DrawWorldRefraction => set.broadcast(|h| h.draw_world_refraction()),
            Self::DrawScreen { width, height } => {
                set.broadcast(|h| h.draw_screen(*width, *height))
            }
            Self::DrawScreenEffects { width, height } => {
                set.broadcast(|h| h.draw_screen_effects(*width, *height))
            }
            Self::DrawInMiniMap { width, height } => {
                set.broadcast(|h| h.draw_in_mini_map(*width, *height))
            }
            Self::AddConsoleLine { line, priority } => {
                set.broadcast(|h| h.add_console_line(line, *priority))
            }
            Self::GroupChanged { group_id } => set.broadcast(|h| h.group_changed(*group_id)),
            Self::KeyPress {
                key,
                mods,
                is_repeat,
                label,
                unicode,
            } => {
                let handled =
                    set.broadcast_any(|h| h.key_press(*key, *mods, *is_repeat, label, *unicode));
                return Some(CiValue::Bool(handled));
            }
            Self::KeyRelease {
                key,
                mods,
                label,
                unicode,
            } => {
                let handled = set.broadcast_any(|h| h.key_release(*key, *mods, label, *unicode));
                return Some(CiValue::Bool(handled));
            }
            Self::MousePress { x, y, button } => {
                let handled = set.broadcast_any(|h| h.mouse_press(*x, *y, *button));
                return Some(CiValue::Bool(handled));
            }
            Self::MouseRelease { x, y, button } => {
                let answer = set
                    .broadcast_first(|h| Some(h.mouse_release(*x, *y, *button)).filter(|v| *v != -1))
                    .unwrap_or(-1);
                return Some(CiValue::from(answer));
            }
            Self::MouseMove {
                x,
                y,
                dx,
                dy,
                button,
            } => {
                let handled = set.broadcast_any(|h| h.mouse_move(*x, *y, *dx, *dy, *button));
                return Some(CiValue::Bool(handled));
            }
            Self::MouseWheel { up, value } => {
                let handled = set.broadcast_any(|h| h.mouse_wheel(*up, *value));
                return Some(CiValue::Bool(handled));
            }
            Self::IsAbove { x, y } => {
                let above = set.broadcast_any(|h| h.is_above(*x, *y));
                return Some(CiValue::Bool(above));
            }
            Self::GetTooltip { x, y } => {
                return set
                    .broadcast_first(|h| non_empty(h.get_tooltip(*x, *y)))
                    .map(CiValue::from);
            }
            Self::ConfigureLayout { command } => set.broadcast(|h| h.configure_layout(command)),
            Self::CommandNotify { command } => {
                let handled = set.broadcast_any(|h| h.command_notify(command));
                return Some(CiValue::Bool(handled));
            }
            Self::WorldTooltip { target } => {
                return set
                    .broadcast_first(|h| non_empty(h.world_tooltip(target)))
                    .map(CiValue::from);
            }
            Self::MapDrawCmd { player_id, action } => {
                let handled = set.broadcast_any(|h| h.map_draw_cmd(*player_id, action));
                return Some(CiValue::Bool(handled));
            }
            Self::GameSetup {
                state,
                ready,
                player_states,
            } => {
                let answer = set.broadcast_first(|h| {
                    let (handled, is_ready) = h.game_setup(state, *ready, player_states);
                    handled.then_some((handled, is_ready))
                });
                let (handled, ready) = answer.unwrap_or((false, *ready));
                return Some(CiValue::Array(vec![
                    CiValue::Bool(handled),
                    CiValue::Bool(ready),
                ]));
            }
        }
        None
    }
}
