//! Argument records for call-ins that carry information about entities the
//! receiving context may not be allowed to see.
//!
//! Every record is built through `filtered`, which consults the receiver's
//! [`CapabilityProfile`]: public fields are always present, gated fields are
//! `Some` only when the profile may read the owning ally-team. `marshal`
//! pushes public fields first and gated fields last, so hiding a field never
//! shifts the position of another one.

use crate::types::{CapabilityProfile, FeatureInfo, Float3, ProjectileInfo, UnitInfo};
use crate::value::CiValue;

/// Positional argument list for one protected call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    values: Vec<CiValue>,
}

impl CallArgs {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: impl Into<CiValue>) {
        self.values.push(value.into());
    }

    pub fn push_float3(&mut self, pos: Float3) {
        self.push(pos.x);
        self.push(pos.y);
        self.push(pos.z);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[CiValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<CiValue> {
        self.values
    }
}

pub trait Marshal {
    fn marshal(&self, args: &mut CallArgs);
}

/// The id/def/team triple every unit call-in starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFields {
    pub id: i32,
    pub def_id: i32,
    pub team: i32,
}

impl From<&UnitInfo> for UnitFields {
    fn from(unit: &UnitInfo) -> Self {
        Self {
            id: unit.id,
            def_id: unit.def_id,
            team: unit.team,
        }
    }
}

impl Marshal for UnitFields {
    fn marshal(&self, args: &mut CallArgs) {
        args.push(self.id);
        args.push(self.def_id);
        args.push(self.team);
    }
}

fn readable(profile: &CapabilityProfile, unit: &UnitInfo) -> bool {
    profile.can_read_ally_team(unit.ally_team)
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitCreatedArgs {
    pub unit: UnitFields,
    pub builder_id: Option<i32>,
}

impl UnitCreatedArgs {
    pub fn filtered(
        profile: &CapabilityProfile,
        unit: &UnitInfo,
        builder: Option<&UnitInfo>,
    ) -> Self {
        Self {
            unit: unit.into(),
            builder_id: builder
                .filter(|builder| readable(profile, builder))
                .map(|builder| builder.id),
        }
    }
}

impl Marshal for UnitCreatedArgs {
    fn marshal(&self, args: &mut CallArgs) {
        self.unit.marshal(args);
        if let Some(builder_id) = self.builder_id {
            args.push(builder_id);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitFromFactoryArgs {
    pub unit: UnitFields,
    pub user_orders: bool,
    /// Factory id and def id.
    pub factory: Option<(i32, i32)>,
}

impl UnitFromFactoryArgs {
    pub fn filtered(
        profile: &CapabilityProfile,
        unit: &UnitInfo,
        factory: &UnitInfo,
        user_orders: bool,
    ) -> Self {
        Self {
            unit: unit.into(),
            user_orders,
            factory: readable(profile, factory).then_some((factory.id, factory.def_id)),
        }
    }
}

impl Marshal for UnitFromFactoryArgs {
    fn marshal(&self, args: &mut CallArgs) {
        self.unit.marshal(args);
        args.push(self.user_orders);
        if let Some((id, def_id)) = self.factory {
            args.push(id);
            args.push(def_id);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitDestroyedArgs {
    pub unit: UnitFields,
    pub attacker: Option<UnitFields>,
}

impl UnitDestroyedArgs {
    pub fn filtered(
        profile: &CapabilityProfile,
        unit: &UnitInfo,
        attacker: Option<&UnitInfo>,
    ) -> Self {
        Self {
            unit: unit.into(),
            attacker: attacker
                .filter(|attacker| readable(profile, attacker))
                .map(UnitFields::from),
        }
    }
}

impl Marshal for UnitDestroyedArgs {
    fn marshal(&self, args: &mut CallArgs) {
        self.unit.marshal(args);
        if let Some(attacker) = &self.attacker {
            attacker.marshal(args);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitDamagedArgs {
    pub unit: UnitFields,
    pub damage: f32,
    pub paralyzer: bool,
    pub weapon_id: Option<i32>,
    pub attacker: Option<UnitFields>,
}

impl UnitDamagedArgs {
    pub fn filtered(
        profile: &CapabilityProfile,
        unit: &UnitInfo,
        attacker: Option<&UnitInfo>,
        damage: f32,
        weapon_id: i32,
        paralyzer: bool,
    ) -> Self {
        // the weapon identifies the attacker as much as the attacker id does
        let reveal = match attacker {
            Some(attacker) => readable(profile, attacker),
            None => profile.full_read,
        };
        Self {
            unit: unit.into(),
            damage,
            paralyzer,
            weapon_id: reveal.then_some(weapon_id),
            attacker: attacker.filter(|_| reveal).map(UnitFields::from),
        }
    }
}

impl Marshal for UnitDamagedArgs {
    fn marshal(&self, args: &mut CallArgs) {
        self.unit.marshal(args);
        args.push(self.damage);
        args.push(self.paralyzer);
        if let Some(weapon_id) = self.weapon_id {
            args.push(weapon_id);
            if let Some(attacker) = &self.attacker {
                attacker.marshal(args);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitSeismicPingArgs {
    pub pos: Float3,
    pub strength: f32,
    /// Ally team, unit id and def id of the ping source.
    pub source: Option<(i32, i32, i32)>,
}

impl UnitSeismicPingArgs {
    pub fn filtered(
        profile: &CapabilityProfile,
        unit: &UnitInfo,
        ally_team: i32,
        pos: Float3,
        strength: f32,
    ) -> Self {
        Self {
            pos,
            strength,
            source: readable(profile, unit).then_some((ally_team, unit.id, unit.def_id)),
        }
    }
}

impl Marshal for UnitSeismicPingArgs {
    fn marshal(&self, args: &mut CallArgs) {
        args.push_float3(self.pos);
        args.push(self.strength);
        if let Some((ally_team, id, def_id)) = self.source {
            args.push(ally_team);
            args.push(id);
            args.push(def_id);
        }
    }
}

/// Radar and line-of-sight transitions; only the unit id is public.
#[derive(Debug, Clone, PartialEq)]
pub struct LosArgs {
    pub unit_id: i32,
    /// Team, ally team of the observer and def id.
    pub details: Option<(i32, i32, i32)>,
}

impl LosArgs {
    pub fn filtered(profile: &CapabilityProfile, unit: &UnitInfo, ally_team: i32) -> Self {
        Self {
            unit_id: unit.id,
            details: readable(profile, unit).then_some((unit.team, ally_team, unit.def_id)),
        }
    }
}

impl Marshal for LosArgs {
    fn marshal(&self, args: &mut CallArgs) {
        args.push(self.unit_id);
        if let Some((team, ally_team, def_id)) = self.details {
            args.push(team);
            args.push(ally_team);
            args.push(def_id);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportArgs {
    pub unit: UnitFields,
    /// Transport id and team.
    pub transport: Option<(i32, i32)>,
}

impl TransportArgs {
    pub fn filtered(profile: &CapabilityProfile, unit: &UnitInfo, transport: &UnitInfo) -> Self {
        Self {
            unit: unit.into(),
            transport: readable(profile, transport).then_some((transport.id, transport.team)),
        }
    }
}

impl Marshal for TransportArgs {
    fn marshal(&self, args: &mut CallArgs) {
        self.unit.marshal(args);
        if let Some((id, team)) = self.transport {
            args.push(id);
            args.push(team);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureArgs {
    pub feature_id: i32,
    pub ally_team: Option<i32>,
}

impl FeatureArgs {
    pub fn filtered(profile: &CapabilityProfile, feature: &FeatureInfo) -> Self {
        // features without an owner (negative ally team) are public
        let public = feature.ally_team < 0;
        Self {
            feature_id: feature.id,
            ally_team: (public || profile.can_read_ally_team(feature.ally_team))
                .then_some(feature.ally_team),
        }
    }
}

impl Marshal for FeatureArgs {
    fn marshal(&self, args: &mut CallArgs) {
        args.push(self.feature_id);
        if let Some(ally_team) = self.ally_team {
            args.push(ally_team);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileCreatedArgs {
    pub projectile_id: i32,
    pub owner_id: Option<i32>,
}

impl ProjectileCreatedArgs {
    pub fn filtered(profile: &CapabilityProfile, projectile: &ProjectileInfo) -> Self {
        Self {
            projectile_id: projectile.id,
            owner_id: projectile
                .owner
                .as_ref()
                .filter(|owner| readable(profile, owner))
                .map(|owner| owner.id),
        }
    }
}

impl Marshal for ProjectileCreatedArgs {
    fn marshal(&self, args: &mut CallArgs) {
        args.push(self.projectile_id);
        // -1 keeps the arity stable for "no owner" and "owner hidden"
        args.push(self.owner_id.unwrap_or(-1));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplosionArgs {
    pub weapon_id: i32,
    pub pos: Float3,
    pub owner_id: Option<i32>,
}

impl ExplosionArgs {
    pub fn filtered(
        profile: &CapabilityProfile,
        weapon_id: i32,
        pos: Float3,
        owner: Option<&UnitInfo>,
    ) -> Self {
        Self {
            weapon_id,
            pos,
            owner_id: owner
                .filter(|owner| readable(profile, owner))
                .map(|owner| owner.id),
        }
    }
}

impl Marshal for ExplosionArgs {
    fn marshal(&self, args: &mut CallArgs) {
        args.push(self.weapon_id);
        args.push_float3(self.pos);
        if let Some(owner_id) = self.owner_id {
            args.push(owner_id);
        }
    }
}
