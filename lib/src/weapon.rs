//! Projectile weapons and their presets.

use std::{f64::consts, sync::Arc};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::math::wrap_signed;

const DEG: f64 = consts::PI / 180.0;

/// Kinetic energy coefficient, converting `kg·m²/s²` into damage units.
pub const ENERGY_SCALE: f64 = 0.5e-3;

/// Share of a shot's muzzle energy drawn from the ship's power store.
pub const POWER_PER_MUZZLE_ENERGY: f64 = 0.05;

/// Share of a shot's power cost dumped into the ship as heat.
pub const HEAT_PER_POWER: f64 = 0.25;

/// Kinetic energy of `mass` moving at `speed`, in damage units.
pub fn kinetic_energy(mass: f64, speed_squared: f64) -> f64 {
    ENERGY_SCALE * mass * speed_squared
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileTemplate {
    pub mass: f64,
    pub penetration: f64,
    pub color: Arc<str>,
    /// Seconds before the round is removed.
    pub lifetime: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponPreset {
    MachineGun,
    Cannon,
    Sniper,
    Railgun,
}

impl WeaponPreset {
    pub fn name(self) -> &'static str {
        match self {
            Self::MachineGun => "Machine Gun",
            Self::Cannon => "Cannon",
            Self::Sniper => "Sniper",
            Self::Railgun => "Railgun",
        }
    }

    /// Footprint `[front width, rear width, length]` for a mount turned
    /// `direction` quarter turns from the ship's nose.
    pub fn size(self, direction: i8) -> [f64; 3] {
        match self {
            Self::MachineGun => [2.0, 2.0, 2.0],
            Self::Cannon => [3.0, 3.0, 6.0],
            Self::Sniper => [2.0, 2.0, 8.0],
            Self::Railgun => {
                if direction % 2 == 0 {
                    [2.0, 2.0, 4.0]
                } else {
                    [4.0, 4.0, 2.0]
                }
            }
        }
    }

    pub fn weapon(self, direction: i8) -> Weapon {
        let (mass, penetration, color, fire_rate, projectile_speed, arc, spread) = match self {
            Self::MachineGun => (0.05, 10.0, "#ff00ff", 15.0, 900.0, 180.0, 2.5),
            Self::Cannon => (0.5, 40.0, "#ffaa00", 2.0, 1200.0, 60.0, 1.0),
            Self::Sniper => (0.2, 30.0, "#ffffff", 0.5, 3000.0, 30.0, 0.1),
            Self::Railgun => (0.1, 20.0, "#00ffff", 5.0, 2000.0, 90.0, 0.6),
        };
        Weapon {
            preset: self,
            facing: f64::from(direction) * consts::FRAC_PI_2,
            firing_arc: arc * DEG,
            fire_rate,
            projectile_speed,
            spread: spread * DEG,
            projectile: ProjectileTemplate {
                mass,
                penetration,
                color: color.into(),
                lifetime: 3600.0,
            },
            cooldown: 0.0,
            enabled: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub preset: WeaponPreset,
    /// Mount direction relative to the ship's nose (`rad`)
    pub facing: f64,
    /// Full width of the cone the weapon can fire into (`rad`)
    pub firing_arc: f64,
    /// Shots per second.
    pub fire_rate: f64,
    pub projectile_speed: f64,
    /// Full width of the random dispersion (`rad`)
    pub spread: f64,
    pub projectile: ProjectileTemplate,
    /// Earliest time the next shot may leave.
    pub cooldown: f64,
    pub enabled: bool,
}

impl Weapon {
    pub fn muzzle_energy(&self) -> f64 {
        kinetic_energy(
            self.projectile.mass,
            self.projectile_speed * self.projectile_speed,
        )
    }

    pub fn power_per_shot(&self) -> f64 {
        self.muzzle_energy() * POWER_PER_MUZZLE_ENERGY
    }

    pub fn heat_per_shot(&self) -> f64 {
        self.power_per_shot() * HEAT_PER_POWER
    }

    pub fn is_ready(&self, time: f64) -> bool {
        self.enabled && time >= self.cooldown
    }

    /// Whether `dir` lies within the firing arc of a mount on a ship
    /// rotated by `ship_rot`.
    pub fn covers(&self, ship_rot: f64, dir: &Vector2<f64>) -> bool {
        let mount_angle = self.facing + ship_rot;
        let rel = wrap_signed(libm::atan2(dir[1], dir[0]) - mount_angle);
        rel.abs() <= self.firing_arc / 2.0
    }
}

/// Unit direction to fire a round at `speed` from a platform at
/// `start_pos` moving with `start_vel` so that it meets a target moving
/// in a straight line. `None` when the round can never catch it.
pub fn firing_solution(
    start_pos: Vector2<f64>,
    start_vel: Vector2<f64>,
    target_pos: Vector2<f64>,
    target_vel: Vector2<f64>,
    speed: f64,
) -> Option<Vector2<f64>> {
    let dp = target_pos - start_pos;
    let dv = target_vel - start_vel;

    // |dp / t + dv| = speed, solved for u = 1 / t
    let a = dp.norm_squared();
    let b = dp.dot(&dv);
    let c = dv.norm_squared() - speed * speed;
    if a == 0.0 || speed <= 0.0 {
        return None;
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let inverse_t = (-b + disc.sqrt()) / a;
    if inverse_t <= 0.0 {
        return None;
    }
    Some((dp * inverse_t + dv) / speed)
}
