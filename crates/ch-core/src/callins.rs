//! The call-in catalog: every event a script context can be notified of,
//! with its execution mode, argument ceiling and return contract.
//!
//! Producers rely on the argument order documented on each payload; changing
//! an entry's shape means versioning the whole catalog.

use serde::Serialize;

use crate::value::ReturnContract;

pub const CATALOG_VERSION: &str = "callins.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallInKind {
    Synced,
    Unsynced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInDef {
    pub name: &'static str,
    pub kind: CallInKind,
    /// Largest argument list the event ever pushes.
    pub max_args: usize,
    pub returns: ReturnContract,
    /// Input-style events subject to the mod UI control check.
    pub ui_gated: bool,
}

impl CallInDef {
    pub fn is_unsynced(&self) -> bool {
        self.kind == CallInKind::Unsynced
    }
}

const fn synced(name: &'static str, max_args: usize, returns: ReturnContract) -> CallInDef {
    CallInDef {
        name,
        kind: CallInKind::Synced,
        max_args,
        returns,
        ui_gated: false,
    }
}

const fn unsynced(name: &'static str, max_args: usize, returns: ReturnContract) -> CallInDef {
    CallInDef {
        name,
        kind: CallInKind::Unsynced,
        max_args,
        returns,
        ui_gated: false,
    }
}

const fn ui(name: &'static str, max_args: usize, returns: ReturnContract) -> CallInDef {
    CallInDef {
        name,
        kind: CallInKind::Unsynced,
        max_args,
        returns,
        ui_gated: true,
    }
}

use ReturnContract::{Bool, BoolPair, Nothing, Number, String as Text};

pub const SHUTDOWN: CallInDef = synced("Shutdown", 0, Nothing);
pub const GAME_PRELOAD: CallInDef = synced("GamePreload", 0, Nothing);
pub const GAME_START: CallInDef = synced("GameStart", 0, Nothing);
pub const GAME_OVER: CallInDef = synced("GameOver", 0, Nothing);
pub const TEAM_DIED: CallInDef = synced("TeamDied", 1, Nothing);
pub const TEAM_CHANGED: CallInDef = synced("TeamChanged", 1, Nothing);
pub const PLAYER_CHANGED: CallInDef = synced("PlayerChanged", 1, Nothing);

pub const UNIT_CREATED: CallInDef = synced("UnitCreated", 4, Nothing);
pub const UNIT_FINISHED: CallInDef = synced("UnitFinished", 3, Nothing);
pub const UNIT_FROM_FACTORY: CallInDef = synced("UnitFromFactory", 6, Nothing);
pub const UNIT_DESTROYED: CallInDef = synced("UnitDestroyed", 6, Nothing);
pub const UNIT_TAKEN: CallInDef = synced("UnitTaken", 4, Nothing);
pub const UNIT_GIVEN: CallInDef = synced("UnitGiven", 4, Nothing);
pub const UNIT_IDLE: CallInDef = synced("UnitIdle", 3, Nothing);
pub const UNIT_COMMAND: CallInDef = synced("UnitCommand", 6, Nothing);
pub const UNIT_CMD_DONE: CallInDef = synced("UnitCmdDone", 5, Nothing);
pub const UNIT_DAMAGED: CallInDef = synced("UnitDamaged", 9, Nothing);
pub const UNIT_EXPERIENCE: CallInDef = synced("UnitExperience", 5, Nothing);
pub const UNIT_SEISMIC_PING: CallInDef = synced("UnitSeismicPing", 7, Nothing);
pub const UNIT_ENTERED_RADAR: CallInDef = synced("UnitEnteredRadar", 4, Nothing);
pub const UNIT_ENTERED_LOS: CallInDef = synced("UnitEnteredLos", 4, Nothing);
pub const UNIT_LEFT_RADAR: CallInDef = synced("UnitLeftRadar", 4, Nothing);
pub const UNIT_LEFT_LOS: CallInDef = synced("UnitLeftLos", 4, Nothing);
pub const UNIT_LOADED: CallInDef = synced("UnitLoaded", 5, Nothing);
pub const UNIT_UNLOADED: CallInDef = synced("UnitUnloaded", 5, Nothing);
pub const UNIT_ENTERED_WATER: CallInDef = synced("UnitEnteredWater", 3, Nothing);
pub const UNIT_ENTERED_AIR: CallInDef = synced("UnitEnteredAir", 3, Nothing);
pub const UNIT_LEFT_WATER: CallInDef = synced("UnitLeftWater", 3, Nothing);
pub const UNIT_LEFT_AIR: CallInDef = synced("UnitLeftAir", 3, Nothing);
pub const UNIT_CLOAKED: CallInDef = synced("UnitCloaked", 3, Nothing);
pub const UNIT_DECLOAKED: CallInDef = synced("UnitDecloaked", 3, Nothing);
pub const FEATURE_CREATED: CallInDef = synced("FeatureCreated", 2, Nothing);
pub const FEATURE_DESTROYED: CallInDef = synced("FeatureDestroyed", 2, Nothing);
pub const PROJECTILE_CREATED: CallInDef = synced("ProjectileCreated", 2, Nothing);
pub const PROJECTILE_DESTROYED: CallInDef = synced("ProjectileDestroyed", 1, Nothing);
pub const EXPLOSION: CallInDef = synced("Explosion", 5, Bool);
pub const STOCKPILE_CHANGED: CallInDef = synced("StockpileChanged", 6, Nothing);
pub const RECV_LUA_MSG: CallInDef = synced("RecvLuaMsg", 2, Bool);

pub const UPDATE: CallInDef = unsynced("Update", 0, Nothing);
pub const VIEW_RESIZE: CallInDef = unsynced("ViewResize", 2, Nothing);
pub const DEFAULT_COMMAND: CallInDef = unsynced("DefaultCommand", 4, Number);
pub const DRAW_GENESIS: CallInDef = unsynced("DrawGenesis", 0, Nothing);
pub const DRAW_WORLD: CallInDef = unsynced("DrawWorld", 0, Nothing);
pub const DRAW_WORLD_PRE_UNIT: CallInDef = unsynced("DrawWorldPreUnit", 0, Nothing);
pub const DRAW_WORLD_SHADOW: CallInDef = unsynced("DrawWorldShadow", 0, Nothing);
pub const DRAW_WORLD_REFLECTION: CallInDef = unsynced("DrawWorldReflection", 0, Nothing);
pub const DRAW_WORLD_REFRACTION: CallInDef = unsynced("DrawWorldRefraction", 0, Nothing);
pub const DRAW_SCREEN: CallInDef = unsynced("DrawScreen", 2, Nothing);
pub const DRAW_SCREEN_EFFECTS: CallInDef = unsynced("DrawScreenEffects", 2, Nothing);
pub const DRAW_IN_MINI_MAP: CallInDef = unsynced("DrawInMiniMap", 2, Nothing);
pub const ADD_CONSOLE_LINE: CallInDef = unsynced("AddConsoleLine", 2, Nothing);
pub const GROUP_CHANGED: CallInDef = unsynced("GroupChanged", 1, Nothing);

pub const KEY_PRESS: CallInDef = ui("KeyPress", 5, Bool);
pub const KEY_RELEASE: CallInDef = ui("KeyRelease", 4, Bool);
pub const MOUSE_PRESS: CallInDef = ui("MousePress", 3, Bool);
pub const MOUSE_RELEASE: CallInDef = ui("MouseRelease", 3, Number);
pub const MOUSE_MOVE: CallInDef = ui("MouseMove", 5, Bool);
pub const MOUSE_WHEEL: CallInDef = ui("MouseWheel", 2, Bool);
pub const IS_ABOVE: CallInDef = ui("IsAbove", 2, Bool);
pub const GET_TOOLTIP: CallInDef = ui("GetTooltip", 2, Text);
pub const CONFIGURE_LAYOUT: CallInDef = ui("ConfigureLayout", 1, Nothing);
pub const COMMAND_NOTIFY: CallInDef = ui("CommandNotify", 3, Bool);
pub const WORLD_TOOLTIP: CallInDef = ui("WorldTooltip", 4, Text);
pub const MAP_DRAW_CMD: CallInDef = ui("MapDrawCmd", 8, Bool);
pub const GAME_SETUP: CallInDef = ui("GameSetup", 3, BoolPair);

pub const CALL_INS: &[CallInDef] = &[
    SHUTDOWN,
    GAME_PRELOAD,
    GAME_START,
    GAME_OVER,
    TEAM_DIED,
    TEAM_CHANGED,
    PLAYER_CHANGED,
    UNIT_CREATED,
    UNIT_FINISHED,
    UNIT_FROM_FACTORY,
    UNIT_DESTROYED,
    UNIT_TAKEN,
    UNIT_GIVEN,
    UNIT_IDLE,
    UNIT_COMMAND,
    UNIT_CMD_DONE,
    UNIT_DAMAGED,
    UNIT_EXPERIENCE,
    UNIT_SEISMIC_PING,
    UNIT_ENTERED_RADAR,
    UNIT_ENTERED_LOS,
    UNIT_LEFT_RADAR,
    UNIT_LEFT_LOS,
    UNIT_LOADED,
    UNIT_UNLOADED,
    UNIT_ENTERED_WATER,
    UNIT_ENTERED_AIR,
    UNIT_LEFT_WATER,
    UNIT_LEFT_AIR,
    UNIT_CLOAKED,
    UNIT_DECLOAKED,
    FEATURE_CREATED,
    FEATURE_DESTROYED,
    PROJECTILE_CREATED,
    PROJECTILE_DESTROYED,
    EXPLOSION,
    STOCKPILE_CHANGED,
    RECV_LUA_MSG,
    UPDATE,
    VIEW_RESIZE,
    DEFAULT_COMMAND,
    DRAW_GENESIS,
    DRAW_WORLD,
    DRAW_WORLD_PRE_UNIT,
    DRAW_WORLD_SHADOW,
    DRAW_WORLD_REFLECTION,
    DRAW_WORLD_REFRACTION,
    DRAW_SCREEN,
    DRAW_SCREEN_EFFECTS,
    DRAW_IN_MINI_MAP,
    ADD_CONSOLE_LINE,
    GROUP_CHANGED,
    KEY_PRESS,
    KEY_RELEASE,
    MOUSE_PRESS,
    MOUSE_RELEASE,
    MOUSE_MOVE,
    MOUSE_WHEEL,
    IS_ABOVE,
    GET_TOOLTIP,
    CONFIGURE_LAYOUT,
    COMMAND_NOTIFY,
    WORLD_TOOLTIP,
    MAP_DRAW_CMD,
    GAME_SETUP,
];

pub fn find_call_in(name: &str) -> Option<&'static CallInDef> {
    CALL_INS.iter().find(|def| def.name == name)
}
