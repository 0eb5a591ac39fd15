//! Ships assembled from parts.

use std::sync::Arc;

use nalgebra::Vector2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    armor::ArmorTier,
    bodies::BodyId,
    integrator::{MovingObject, ObjectState, Stepper},
    math::{from_polar, rotate, wrap_angle},
    part::{Part, PartKind, PartType},
    projectile::Projectile,
    weapon::{firing_solution, WeaponPreset},
};

/// Standard gravity, for converting specific impulse to mass flow.
pub const G0: f64 = 9.80665;

/// Moment of inertia of every ship (`kg·m²`)
pub const SHIP_INERTIA: f64 = 5000.0;

/// A point the ship wants to shoot at.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub pos: Vector2<f64>,
    pub vel: Vector2<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub name: Arc<str>,
    pub team: Arc<str>,
    pub state: ObjectState,
    /// Starting offset from the parent body, used by `World::init`.
    pub local_pos: Vector2<f64>,
    pub local_vel: Vector2<f64>,
    /// Heading (`rad`), the direction of the ship's `+x` axis.
    pub rot: f64,
    pub last_rot: f64,
    pub ang_vel: f64,
    /// Attitude control torque (`N·m`)
    pub torque: f64,
    pub parts: Vec<Part>,
    pub power: f64,
    pub heat: f64,

    // Commands, written by the input or AI layer
    pub throttle: f64,
    pub turning: f64,
    pub sas: bool,
    pub targets: Vec<Target>,
}

impl Ship {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: Arc<str>,
        team: Arc<str>,
        parent: BodyId,
        local_pos: Vector2<f64>,
        local_vel: Vector2<f64>,
        rot: f64,
        torque: f64,
        parts: Vec<Part>,
    ) -> Self {
        let mut ship = Self {
            name,
            team,
            state: ObjectState::new(local_pos, local_vel, 0.0, parent),
            local_pos,
            local_vel,
            rot,
            last_rot: rot,
            ang_vel: 0.0,
            torque,
            parts,
            power: 0.0,
            heat: 0.0,
            throttle: 0.0,
            turning: 0.0,
            sas: false,
            targets: Vec::new(),
        };
        ship.power = ship.max_power();
        ship
    }

    pub fn pos(&self) -> Vector2<f64> {
        self.state.pos
    }

    pub fn vel(&self) -> Vector2<f64> {
        self.state.vel
    }

    pub fn heading(&self) -> Vector2<f64> {
        from_polar(1.0, self.rot)
    }

    pub fn mass(&self) -> f64 {
        self.parts.iter().map(Part::mass).sum()
    }

    pub fn inertia(&self) -> f64 {
        SHIP_INERTIA
    }

    pub fn max_health(&self) -> f64 {
        self.parts.iter().map(|p| p.max_health).sum()
    }

    pub fn health(&self) -> f64 {
        self.parts.iter().map(|p| p.health).sum()
    }

    pub fn max_armor(&self, tier: ArmorTier) -> f64 {
        let i = usize::from(tier);
        self.parts.iter().map(|p| p.max_armor[i]).sum()
    }

    pub fn armor(&self, tier: ArmorTier) -> f64 {
        let i = usize::from(tier);
        self.parts.iter().map(|p| p.armor[i]).sum()
    }

    pub fn max_power(&self) -> f64 {
        self.parts
            .iter()
            .map(|p| match p.kind {
                PartKind::Reactor { power_storage, .. } => power_storage,
                _ => 0.0,
            })
            .sum()
    }

    pub fn max_heat(&self) -> f64 {
        self.parts
            .iter()
            .map(|p| match p.kind {
                PartKind::Reactor { heat_capacity, .. } => heat_capacity,
                _ => 0.0,
            })
            .sum()
    }

    pub fn propellant(&self) -> f64 {
        self.parts.iter().map(Part::propellant).sum()
    }

    /// Functioning parts of one type.
    pub fn functional(&self, part_type: PartType) -> impl Iterator<Item = &Part> {
        self.parts
            .iter()
            .filter(move |p| p.part_type() == part_type && p.is_functional())
    }

    pub fn engines(&self) -> impl Iterator<Item = &Part> {
        self.functional(PartType::Engine)
    }

    pub fn reactors(&self) -> impl Iterator<Item = &Part> {
        self.functional(PartType::Reactor)
    }

    pub fn radiators(&self) -> impl Iterator<Item = &Part> {
        self.functional(PartType::Radiator)
    }

    pub fn weapons(&self) -> impl Iterator<Item = &Part> {
        self.functional(PartType::Weapon)
    }

    /// Total thrust of the working engines (`N`)
    pub fn thrust(&self) -> f64 {
        self.engines()
            .map(|p| match p.kind {
                PartKind::Engine { thrust, .. } => thrust,
                _ => 0.0,
            })
            .sum()
    }

    /// Propellant mass flow at full throttle (`kg/s`)
    pub fn mass_flow(&self) -> f64 {
        self.engines()
            .map(|p| match p.kind {
                PartKind::Engine { thrust, isp } if isp > 0.0 => thrust / (isp * G0),
                _ => 0.0,
            })
            .sum()
    }

    pub fn is_destroyed(&self) -> bool {
        self.parts.iter().all(|p| !p.is_functional())
    }

    pub fn set_weapons_enabled(&mut self, preset: WeaponPreset, enabled: bool) {
        for weapon in self.parts.iter_mut().filter_map(Part::as_weapon_mut) {
            if weapon.preset == preset {
                weapon.enabled = enabled;
            }
        }
    }

    /// Reactors add power and heat, radiators take heat away.
    pub fn update_resources(&mut self, dt: f64) {
        let mut power = self.power;
        let mut heat = self.heat;
        for part in self.reactors() {
            if let PartKind::Reactor {
                power_generation,
                heat_generation,
                ..
            } = part.kind
            {
                power += power_generation * dt;
                heat += heat_generation * dt;
            }
        }
        for part in self.radiators() {
            heat -= part.dissipation_rate() * dt;
        }
        self.power = power.clamp(0.0, self.max_power());
        // Overheating is allowed
        self.heat = heat.max(0.0);
    }

    /// Apply the commanded turn and throttle over `dt`.
    ///
    /// With no explicit turn command and SAS on, the ship tries to cancel
    /// its rotation within one frame. Turning needs a working control
    /// part and draws its power; thrust needs propellant.
    pub fn apply_controls(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        let inertia = self.inertia();

        let mut turning = if self.turning != 0.0 {
            self.turning
        } else if self.sas && self.torque > 0.0 {
            -self.ang_vel * inertia / self.torque / dt
        } else {
            0.0
        };
        turning = turning.clamp(-1.0, 1.0);

        let control_power: f64 = self
            .functional(PartType::Control)
            .map(|p| match p.kind {
                PartKind::Control { power_usage } => power_usage,
                _ => 0.0,
            })
            .sum();
        let has_control = self.functional(PartType::Control).next().is_some();
        let cost = control_power * turning.abs() * dt;
        if !has_control || cost > self.power {
            turning = 0.0;
        } else {
            self.power -= cost;
        }
        self.ang_vel += turning * self.torque / inertia * dt;

        let throttle = self.throttle.clamp(0.0, 1.0);
        let demand = throttle * self.mass_flow() * dt;
        if demand <= 0.0 {
            return;
        }
        let available = self.propellant();
        let fraction = (available / demand).min(1.0);
        if fraction <= 0.0 {
            return;
        }
        let accel = throttle * fraction * self.thrust() / self.mass();
        self.state.vel += self.heading() * (accel * dt);

        // Draw from every tank in proportion to what it holds
        let burned = demand * fraction;
        for part in &mut self.parts {
            if let PartKind::Tank { propellant, .. } = &mut part.kind {
                *propellant = (*propellant - burned * *propellant / available).max(0.0);
            }
        }
    }

    /// Fire every ready weapon that can bear on `target`.
    ///
    /// Each round leaves from its mount with the ship's velocity plus the
    /// muzzle velocity, randomly dispersed by the weapon's spread, and
    /// pushes the ship back by its momentum.
    pub fn fire_at(&mut self, target: &Target, time: f64, rng: &mut impl Rng) -> Vec<Projectile> {
        let mut fired = Vec::new();
        let ship_mass = self.mass();
        let ship_pos = self.state.pos;
        let ship_vel = self.state.vel;
        let rot = self.rot;

        for part in &mut self.parts {
            if !part.is_functional() {
                continue;
            }
            let mount = ship_pos + rotate(part.pos, rot);
            let PartKind::Weapon(weapon) = &mut part.kind else {
                continue;
            };
            if !weapon.is_ready(time) {
                continue;
            }
            let Some(dir) = firing_solution(
                mount,
                ship_vel,
                target.pos,
                target.vel,
                weapon.projectile_speed,
            ) else {
                continue;
            };
            if !weapon.covers(rot, &dir) || weapon.power_per_shot() > self.power {
                continue;
            }

            weapon.cooldown = time + 1.0 / weapon.fire_rate;
            self.power -= weapon.power_per_shot();
            self.heat += weapon.heat_per_shot();

            let jitter = if weapon.spread > 0.0 {
                rng.gen_range(-weapon.spread / 2.0..weapon.spread / 2.0)
            } else {
                0.0
            };
            let dir = rotate(dir, jitter);
            let muzzle = dir * weapon.projectile_speed;

            fired.push(Projectile::from_template(
                &weapon.projectile,
                self.team.clone(),
                mount,
                ship_vel + muzzle,
                self.state.parent,
                time,
            ));
            if ship_mass > 0.0 {
                self.state.vel -= muzzle * (weapon.projectile.mass / ship_mass);
            }
            debug!(
                ship = %self.name,
                weapon = weapon.preset.name(),
                heading = wrap_angle(libm::atan2(dir[1], dir[0])),
                "fired"
            );
        }
        fired
    }
}

impl MovingObject for Ship {
    fn state(&self) -> &ObjectState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ObjectState {
        &mut self.state
    }

    fn stepper(&self) -> Stepper {
        Stepper::Symplectic4
    }

    fn before_propagate(&mut self, end_time: f64) {
        self.last_rot = self.rot;
        self.rot = wrap_angle(self.rot + self.ang_vel * (end_time - self.state.time));
    }
}
