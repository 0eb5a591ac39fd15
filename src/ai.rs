//! A simple combat autopilot: pick the closest enemy, point at it, and
//! enable weapons by range.

use orbcom::{
    math::{cross, wrap_signed},
    ship::{Ship, Target},
    weapon::WeaponPreset,
    world::World,
};

const KP: f64 = 2.0;
const KD: f64 = 2.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Autopilot {
    /// Targets beyond this range are ignored (`m`)
    pub engage_distance: f64,
    /// Cannons open up inside this range (`m`)
    pub far_distance: f64,
    /// Machine guns open up inside this range (`m`)
    pub near_distance: f64,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            engage_distance: 1_000_000.0,
            far_distance: 100_000.0,
            near_distance: 10_000.0,
        }
    }
}

impl Autopilot {
    pub fn update(&self, world: &mut World) {
        for i in 0..world.ships.len() {
            let target = self.closest_enemy(&world.ships, i);
            let ship = &mut world.ships[i];
            self.update_combat(ship, target);
            Self::update_attitude(ship);
        }
    }

    /// The closest ship of another team within engagement range, with its
    /// distance.
    pub fn closest_enemy(&self, ships: &[Ship], me: usize) -> Option<(Target, f64)> {
        let ship = &ships[me];
        ships
            .iter()
            .enumerate()
            .filter(|&(i, other)| i != me && other.team != ship.team)
            .map(|(_, other)| {
                let target = Target {
                    pos: other.pos(),
                    vel: other.vel(),
                };
                (target, (other.pos() - ship.pos()).norm())
            })
            .filter(|&(_, dist)| dist < self.engage_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn update_combat(&self, ship: &mut Ship, target: Option<(Target, f64)>) {
        let dist = target.map_or(f64::INFINITY, |(_, d)| d);
        ship.set_weapons_enabled(WeaponPreset::Sniper, dist < self.engage_distance);
        ship.set_weapons_enabled(WeaponPreset::Cannon, dist < self.far_distance);
        ship.set_weapons_enabled(WeaponPreset::MachineGun, dist < self.near_distance);

        match target {
            Some((target, _)) => ship.targets = vec![target],
            None => {
                ship.targets.clear();
                ship.turning = 0.0;
            }
        }
    }

    /// PD control of the heading towards the first target.
    pub fn update_attitude(ship: &mut Ship) {
        let Some(target) = ship.targets.first() else {
            return;
        };
        let rel_pos = target.pos - ship.pos();
        let rel_vel = target.vel - ship.vel();
        let dist_sq = rel_pos.norm_squared();
        if dist_sq == 0.0 || ship.torque <= 0.0 {
            return;
        }

        let p = wrap_signed(rel_pos[1].atan2(rel_pos[0]) - ship.rot);
        let d = cross(&rel_pos, &rel_vel) / dist_sq - ship.ang_vel;
        let turning = (KP * p + KD * d) * ship.inertia() / ship.torque;
        ship.turning = turning.clamp(-1.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts;

    use nalgebra::Vector2;
    use orbcom::{part::Part, scenario::default_scenario};

    use super::*;

    fn world() -> World {
        let mut scenario = default_scenario();
        let mut wingman = scenario.ships[1].clone();
        wingman.name = "Enemies 2".into();
        wingman.local_pos = [4_850_000.0, 0.0];
        scenario.ships.push(wingman);
        World::from_scenario(&scenario, 0).unwrap()
    }

    #[test]
    fn targets_closest_enemy() {
        let world = world();
        let autopilot = Autopilot::default();

        let (target, dist) = autopilot.closest_enemy(&world.ships, 0).unwrap();
        assert_eq!(target.pos, world.ships[2].pos());
        assert!((dist - 50_000.0).abs() < 1e-3);

        // Teammates are never targets, and the far enemy is out of range
        let (target, _) = autopilot.closest_enemy(&world.ships, 2).unwrap();
        assert_eq!(target.pos, world.ships[0].pos());
        assert!(autopilot.closest_enemy(&world.ships, 1).is_none());
    }

    #[test]
    fn weapons_follow_range() {
        let mut world = world();
        let autopilot = Autopilot::default();
        autopilot.update(&mut world);

        let enabled = |ship: &Ship, preset: WeaponPreset| {
            ship.weapons()
                .filter_map(Part::as_weapon)
                .filter(|w| w.preset == preset)
                .all(|w| w.enabled)
        };
        let ally = &world.ships[0];
        assert_eq!(ally.targets.len(), 1);
        assert!(enabled(ally, WeaponPreset::Sniper));
        assert!(enabled(ally, WeaponPreset::Cannon));
        assert!(!enabled(ally, WeaponPreset::MachineGun));

        let lonely = &world.ships[1];
        assert!(lonely.targets.is_empty());
        assert_eq!(lonely.turning, 0.0);
        assert!(!enabled(lonely, WeaponPreset::Sniper));
    }

    #[test]
    fn turns_towards_target() {
        let mut ship = world().ships.remove(0);
        let pos = ship.pos();
        let vel = ship.vel();

        ship.targets = vec![Target {
            pos: pos + Vector2::new(0.0, 1000.0),
            vel,
        }];
        Autopilot::update_attitude(&mut ship);
        assert_eq!(ship.turning, 1.0);

        ship.rot = consts::PI;
        Autopilot::update_attitude(&mut ship);
        assert_eq!(ship.turning, -1.0);

        // On target and not rotating
        ship.rot = consts::FRAC_PI_2;
        Autopilot::update_attitude(&mut ship);
        assert!(ship.turning.abs() < 1e-9);
    }
}
