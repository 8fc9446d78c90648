//! Typed entry points, one per catalog event. Each method decides whether
//! the context may see the event, lets [`Handle::run_call_in`] skip absent
//! handlers, and marshals through the filtered payload records.

use std::collections::BTreeMap;

use ch_core::callins as ci;
use ch_core::{
    CallArgs, CiValue, Command, ExplosionArgs, FeatureArgs, FeatureInfo, Float3, KeyModifiers,
    LosArgs, MapDrawAction, Marshal, PointerTarget, ProjectileCreatedArgs, ProjectileInfo,
    TransportArgs, UnitCreatedArgs, UnitDamagedArgs, UnitDestroyedArgs, UnitFields,
    UnitFromFactoryArgs, UnitInfo, UnitSeismicPingArgs, WeaponInfo,
};

use crate::handle::Handle;

fn push_command(args: &mut CallArgs, command: &Command) {
    args.push(command.id);
    args.push(CiValue::Array(
        command.params.iter().map(|param| CiValue::from(*param)).collect(),
    ));
    args.push(command.options);
}

fn push_modifiers(args: &mut CallArgs, mods: KeyModifiers) {
    let mut map = BTreeMap::new();
    map.insert("alt".to_string(), CiValue::Bool(mods.alt));
    map.insert("ctrl".to_string(), CiValue::Bool(mods.ctrl));
    map.insert("meta".to_string(), CiValue::Bool(mods.meta));
    map.insert("shift".to_string(), CiValue::Bool(mods.shift));
    args.push(CiValue::Map(map));
}

fn push_target(args: &mut CallArgs, target: &PointerTarget) {
    match target {
        PointerTarget::Unit { id } => {
            args.push("unit");
            args.push(*id);
        }
        PointerTarget::Feature { id } => {
            args.push("feature");
            args.push(*id);
        }
        PointerTarget::Ground { pos } => {
            args.push("ground");
            args.push_float3(*pos);
        }
        PointerTarget::Selection => args.push("selection"),
    }
}

fn push_draw_action(args: &mut CallArgs, action: &MapDrawAction) {
    match action {
        MapDrawAction::Point { pos, label } => {
            args.push("point");
            args.push_float3(*pos);
            args.push(label.as_str());
        }
        MapDrawAction::Line { from, to } => {
            args.push("line");
            args.push_float3(*from);
            args.push_float3(*to);
        }
        MapDrawAction::Erase { pos } => {
            args.push("erase");
            args.push_float3(*pos);
        }
    }
}

/// Narrows a script number to a host id. Out-of-range values saturate;
/// NaN and infinities count as no answer.
fn script_i32(value: f64) -> Option<i32> {
    value.is_finite().then_some(value as i32)
}

impl Handle {
    fn can_see_ally_team(&self, ally_team: i32) -> bool {
        self.profile().can_read_ally_team(ally_team)
    }

    fn unit_event(&self, def: &ci::CallInDef, unit: &UnitInfo) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(def, |_, args| UnitFields::from(unit).marshal(args));
    }

    fn no_arg_event(&self, def: &ci::CallInDef) {
        self.call_void(def, |_, _| {});
    }

    fn screen_event(&self, def: &ci::CallInDef, width: i32, height: i32) {
        self.call_void(def, |_, args| {
            args.push(width);
            args.push(height);
        });
    }

    // synced game events

    pub fn game_preload(&self) {
        self.no_arg_event(&ci::GAME_PRELOAD);
    }

    pub fn game_start(&self) {
        self.no_arg_event(&ci::GAME_START);
    }

    pub fn game_over(&self) {
        self.no_arg_event(&ci::GAME_OVER);
    }

    pub fn team_died(&self, team: i32) {
        self.call_void(&ci::TEAM_DIED, |_, args| args.push(team));
    }

    pub fn team_changed(&self, team: i32) {
        self.call_void(&ci::TEAM_CHANGED, |_, args| args.push(team));
    }

    pub fn player_changed(&self, player_id: i32) {
        self.call_void(&ci::PLAYER_CHANGED, |_, args| args.push(player_id));
    }

    pub fn unit_created(&self, unit: &UnitInfo, builder: Option<&UnitInfo>) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_CREATED, |profile, args| {
            UnitCreatedArgs::filtered(profile, unit, builder).marshal(args);
        });
    }

    pub fn unit_finished(&self, unit: &UnitInfo) {
        self.unit_event(&ci::UNIT_FINISHED, unit);
    }

    pub fn unit_from_factory(&self, unit: &UnitInfo, factory: &UnitInfo, user_orders: bool) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_FROM_FACTORY, |profile, args| {
            UnitFromFactoryArgs::filtered(profile, unit, factory, user_orders).marshal(args);
        });
    }

    pub fn unit_destroyed(&self, unit: &UnitInfo, attacker: Option<&UnitInfo>) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_DESTROYED, |profile, args| {
            UnitDestroyedArgs::filtered(profile, unit, attacker).marshal(args);
        });
    }

    pub fn unit_taken(&self, unit: &UnitInfo, new_team: i32) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_TAKEN, |_, args| {
            UnitFields::from(unit).marshal(args);
            args.push(new_team);
        });
    }

    pub fn unit_given(&self, unit: &UnitInfo, old_team: i32) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_GIVEN, |_, args| {
            UnitFields::from(unit).marshal(args);
            args.push(old_team);
        });
    }

    pub fn unit_idle(&self, unit: &UnitInfo) {
        self.unit_event(&ci::UNIT_IDLE, unit);
    }

    pub fn unit_command(&self, unit: &UnitInfo, command: &Command) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_COMMAND, |_, args| {
            UnitFields::from(unit).marshal(args);
            push_command(args, command);
        });
    }

    pub fn unit_cmd_done(&self, unit: &UnitInfo, command_id: i32, command_tag: i32) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_CMD_DONE, |_, args| {
            UnitFields::from(unit).marshal(args);
            args.push(command_id);
            args.push(command_tag);
        });
    }

    pub fn unit_damaged(
        &self,
        unit: &UnitInfo,
        attacker: Option<&UnitInfo>,
        damage: f32,
        weapon_id: i32,
        paralyzer: bool,
    ) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_DAMAGED, |profile, args| {
            UnitDamagedArgs::filtered(profile, unit, attacker, damage, weapon_id, paralyzer)
                .marshal(args);
        });
    }

    pub fn unit_experience(&self, unit: &UnitInfo, old_experience: f32) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_EXPERIENCE, |_, args| {
            UnitFields::from(unit).marshal(args);
            args.push(unit.experience);
            args.push(old_experience);
        });
    }

    /// Sent to the ally team that picked up the ping; skipped when that ally
    /// team already sees the unit.
    pub fn unit_seismic_ping(&self, unit: &UnitInfo, ally_team: i32, pos: Float3, strength: f32) {
        if !self.can_see_ally_team(ally_team) || unit.in_los_of(ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_SEISMIC_PING, |profile, args| {
            UnitSeismicPingArgs::filtered(profile, unit, ally_team, pos, strength).marshal(args);
        });
    }

    fn los_event(&self, def: &ci::CallInDef, unit: &UnitInfo, ally_team: i32) {
        // addressed to the observing ally team, not the unit's owner
        if !self.can_see_ally_team(ally_team) {
            return;
        }
        self.call_void(def, |profile, args| {
            LosArgs::filtered(profile, unit, ally_team).marshal(args);
        });
    }

    pub fn unit_entered_radar(&self, unit: &UnitInfo, ally_team: i32) {
        self.los_event(&ci::UNIT_ENTERED_RADAR, unit, ally_team);
    }

    pub fn unit_entered_los(&self, unit: &UnitInfo, ally_team: i32) {
        self.los_event(&ci::UNIT_ENTERED_LOS, unit, ally_team);
    }

    pub fn unit_left_radar(&self, unit: &UnitInfo, ally_team: i32) {
        self.los_event(&ci::UNIT_LEFT_RADAR, unit, ally_team);
    }

    pub fn unit_left_los(&self, unit: &UnitInfo, ally_team: i32) {
        self.los_event(&ci::UNIT_LEFT_LOS, unit, ally_team);
    }

    pub fn unit_loaded(&self, unit: &UnitInfo, transport: &UnitInfo) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_LOADED, |profile, args| {
            TransportArgs::filtered(profile, unit, transport).marshal(args);
        });
    }

    pub fn unit_unloaded(&self, unit: &UnitInfo, transport: &UnitInfo) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::UNIT_UNLOADED, |profile, args| {
            TransportArgs::filtered(profile, unit, transport).marshal(args);
        });
    }

    pub fn unit_entered_water(&self, unit: &UnitInfo) {
        self.unit_event(&ci::UNIT_ENTERED_WATER, unit);
    }

    pub fn unit_entered_air(&self, unit: &UnitInfo) {
        self.unit_event(&ci::UNIT_ENTERED_AIR, unit);
    }

    pub fn unit_left_water(&self, unit: &UnitInfo) {
        self.unit_event(&ci::UNIT_LEFT_WATER, unit);
    }

    pub fn unit_left_air(&self, unit: &UnitInfo) {
        self.unit_event(&ci::UNIT_LEFT_AIR, unit);
    }

    pub fn unit_cloaked(&self, unit: &UnitInfo) {
        self.unit_event(&ci::UNIT_CLOAKED, unit);
    }

    pub fn unit_decloaked(&self, unit: &UnitInfo) {
        self.unit_event(&ci::UNIT_DECLOAKED, unit);
    }

    pub fn feature_created(&self, feature: &FeatureInfo) {
        self.call_void(&ci::FEATURE_CREATED, |profile, args| {
            FeatureArgs::filtered(profile, feature).marshal(args);
        });
    }

    pub fn feature_destroyed(&self, feature: &FeatureInfo) {
        self.call_void(&ci::FEATURE_DESTROYED, |profile, args| {
            FeatureArgs::filtered(profile, feature).marshal(args);
        });
    }

    pub fn projectile_created(&self, projectile: &ProjectileInfo) {
        self.call_void(&ci::PROJECTILE_CREATED, |profile, args| {
            ProjectileCreatedArgs::filtered(profile, projectile).marshal(args);
        });
    }

    pub fn projectile_destroyed(&self, projectile_id: i32) {
        self.call_void(&ci::PROJECTILE_DESTROYED, |_, args| args.push(projectile_id));
    }

    /// Only weapons registered through `Script::SetWatchWeapon` reach the
    /// script. Returns whether the script claimed the explosion.
    pub fn explosion(&self, weapon_id: i32, pos: Float3, owner: Option<&UnitInfo>) -> bool {
        if !self.state().watches_weapon(weapon_id) {
            return false;
        }
        self.call_bool(&ci::EXPLOSION, false, |profile, args| {
            ExplosionArgs::filtered(profile, weapon_id, pos, owner).marshal(args);
        })
    }

    pub fn stockpile_changed(&self, unit: &UnitInfo, weapon: &WeaponInfo, old_count: i32) {
        if !self.can_see_ally_team(unit.ally_team) {
            return;
        }
        self.call_void(&ci::STOCKPILE_CHANGED, |_, args| {
            UnitFields::from(unit).marshal(args);
            args.push(weapon.weapon_num);
            args.push(old_count);
            args.push(weapon.num_stockpiled);
        });
    }

    pub fn recv_lua_msg(&self, message: &str, player_id: i32) -> bool {
        self.call_bool(&ci::RECV_LUA_MSG, false, |_, args| {
            args.push(message);
            args.push(player_id);
        })
    }

    // unsynced presentation events

    pub fn update(&self) {
        self.no_arg_event(&ci::UPDATE);
    }

    pub fn view_resize(&self, width: i32, height: i32) {
        self.screen_event(&ci::VIEW_RESIZE, width, height);
    }

    /// Command id the pointer target would default to, if the script picks one.
    pub fn default_command(&self, target: &PointerTarget) -> Option<i32> {
        self.call_number(&ci::DEFAULT_COMMAND, |_, args| push_target(args, target))
            .and_then(script_i32)
    }

    pub fn draw_genesis(&self) {
        self.no_arg_event(&ci::DRAW_GENESIS);
    }

    pub fn draw_world(&self) {
        self.no_arg_event(&ci::DRAW_WORLD);
    }

    pub fn draw_world_pre_unit(&self) {
        self.no_arg_event(&ci::DRAW_WORLD_PRE_UNIT);
    }

    pub fn draw_world_shadow(&self) {
        self.no_arg_event(&ci::DRAW_WORLD_SHADOW);
    }

    pub fn draw_world_reflection(&self) {
        self.no_arg_event(&ci::DRAW_WORLD_REFLECTION);
    }

    pub fn draw_world_refraction(&self) {
        self.no_arg_event(&ci::DRAW_WORLD_REFRACTION);
    }

    pub fn draw_screen(&self, width: i32, height: i32) {
        self.screen_event(&ci::DRAW_SCREEN, width, height);
    }

    pub fn draw_screen_effects(&self, width: i32, height: i32) {
        self.screen_event(&ci::DRAW_SCREEN_EFFECTS, width, height);
    }

    pub fn draw_in_mini_map(&self, width: i32, height: i32) {
        self.screen_event(&ci::DRAW_IN_MINI_MAP, width, height);
    }

    pub fn add_console_line(&self, line: &str, priority: i32) {
        self.call_void(&ci::ADD_CONSOLE_LINE, |_, args| {
            args.push(line);
            args.push(priority);
        });
    }

    pub fn group_changed(&self, group_id: i32) {
        self.call_void(&ci::GROUP_CHANGED, |_, args| args.push(group_id));
    }

    // input and interface events, subject to the UI control check

    pub fn key_press(
        &self,
        key: i32,
        mods: KeyModifiers,
        is_repeat: bool,
        label: &str,
        unicode: i32,
    ) -> bool {
        self.call_bool(&ci::KEY_PRESS, false, |_, args| {
            args.push(key);
            push_modifiers(args, mods);
            args.push(is_repeat);
            args.push(label);
            args.push(unicode);
        })
    }

    pub fn key_release(&self, key: i32, mods: KeyModifiers, label: &str, unicode: i32) -> bool {
        self.call_bool(&ci::KEY_RELEASE, false, |_, args| {
            args.push(key);
            push_modifiers(args, mods);
            args.push(label);
            args.push(unicode);
        })
    }

    pub fn mouse_press(&self, x: i32, y: i32, button: i32) -> bool {
        self.call_bool(&ci::MOUSE_PRESS, false, |_, args| {
            args.push(x);
            args.push(y);
            args.push(button);
        })
    }

    /// The script's answer minus one; `-1` when it gives none.
    pub fn mouse_release(&self, x: i32, y: i32, button: i32) -> i32 {
        self.call_number(&ci::MOUSE_RELEASE, |_, args| {
            args.push(x);
            args.push(y);
            args.push(button);
        })
        .and_then(script_i32)
        .map_or(-1, |value| value.saturating_sub(1))
    }

    pub fn mouse_move(&self, x: i32, y: i32, dx: i32, dy: i32, button: i32) -> bool {
        self.call_bool(&ci::MOUSE_MOVE, false, |_, args| {
            args.push(x);
            args.push(y);
            args.push(dx);
            args.push(dy);
            args.push(button);
        })
    }

    pub fn mouse_wheel(&self, up: bool, value: f32) -> bool {
        self.call_bool(&ci::MOUSE_WHEEL, false, |_, args| {
            args.push(up);
            args.push(value);
        })
    }

    pub fn is_above(&self, x: i32, y: i32) -> bool {
        self.call_bool(&ci::IS_ABOVE, false, |_, args| {
            args.push(x);
            args.push(y);
        })
    }

    pub fn get_tooltip(&self, x: i32, y: i32) -> String {
        self.call_string(&ci::GET_TOOLTIP, |_, args| {
            args.push(x);
            args.push(y);
        })
        .unwrap_or_default()
    }

    pub fn configure_layout(&self, command: &str) {
        self.call_void(&ci::CONFIGURE_LAYOUT, |_, args| args.push(command));
    }

    pub fn command_notify(&self, command: &Command) -> bool {
        self.call_bool(&ci::COMMAND_NOTIFY, false, |_, args| push_command(args, command))
    }

    pub fn world_tooltip(&self, target: &PointerTarget) -> String {
        self.call_string(&ci::WORLD_TOOLTIP, |_, args| push_target(args, target))
            .unwrap_or_default()
    }

    pub fn map_draw_cmd(&self, player_id: i32, action: &MapDrawAction) -> bool {
        self.call_bool(&ci::MAP_DRAW_CMD, false, |_, args| {
            args.push(player_id);
            push_draw_action(args, action);
        })
    }

    /// Returns `(handled, ready)`. Only a first answer of `true` counts as
    /// handled; `ready` keeps the caller's value unless the script gives a
    /// second boolean.
    pub fn game_setup(
        &self,
        state: &str,
        ready: bool,
        player_states: &BTreeMap<String, String>,
    ) -> (bool, bool) {
        let answer = self.call_bool_pair(&ci::GAME_SETUP, |_, args| {
            args.push(state);
            args.push(ready);
            args.push(CiValue::Map(
                player_states
                    .iter()
                    .map(|(player, state)| (player.clone(), CiValue::from(state.as_str())))
                    .collect(),
            ));
        });
        match answer {
            Some((true, second)) => (true, second.unwrap_or(ready)),
            _ => (false, ready),
        }
    }
}
