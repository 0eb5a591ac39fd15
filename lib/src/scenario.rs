//! Scenario descriptions: the body tree and the starting ships.
//!
//! These are the types scenario files deserialize into. Angles are in
//! degrees here and converted on build.

use std::sync::Arc;

use color_eyre::eyre;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{
    bodies::BodyId,
    kepler::orbits::Orbit,
    part::{Footprint, Part, PartParams, PartType},
    ship::Ship,
    weapon::WeaponPreset,
};

const DEG: f64 = std::f64::consts::PI / 180.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitConfig {
    pub sma: f64,
    pub e: f64,
    pub arg_deg: f64,
    pub mna_deg: f64,
    #[serde(default)]
    pub epoch: f64,
}

impl OrbitConfig {
    pub fn to_orbit(&self) -> Orbit {
        Orbit::new(
            self.sma,
            self.e,
            self.arg_deg * DEG,
            self.mna_deg * DEG,
            self.epoch,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    pub name: String,
    pub mass: f64,
    pub radius: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub orbit: Option<OrbitConfig>,
}

impl BodyConfig {
    pub fn root(name: &str, mass: f64, radius: f64) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
            color: String::new(),
            parent: None,
            orbit: None,
        }
    }

    pub fn satellite(name: &str, mass: f64, radius: f64, parent: &str, orbit: OrbitConfig) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
            color: String::new(),
            parent: Some(parent.into()),
            orbit: Some(orbit),
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.into();
        self
    }
}

fn default_power_usage() -> f64 {
    1.0
}

fn default_prop_density() -> f64 {
    500.0
}

fn default_start_fill() -> f64 {
    1.0
}

fn default_thrust() -> f64 {
    100_000.0
}

fn default_isp() -> f64 {
    1000.0
}

fn default_power_generation() -> f64 {
    10.0
}

fn default_heat_generation() -> f64 {
    15.0
}

fn default_power_storage() -> f64 {
    1000.0
}

fn default_heat_capacity() -> f64 {
    2000.0
}

fn default_dissipation_per_area() -> f64 {
    0.2
}

fn default_torque() -> f64 {
    1000.0
}

/// One part of a ship. `size` is `[front width, rear width, length]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PartConfig {
    Hull {
        pos: [f64; 2],
        size: [f64; 3],
        #[serde(default)]
        armor: [u8; 3],
    },
    Control {
        pos: [f64; 2],
        size: [f64; 3],
        #[serde(default)]
        armor: [u8; 3],
        #[serde(default = "default_power_usage")]
        power_usage: f64,
    },
    Tank {
        pos: [f64; 2],
        size: [f64; 3],
        #[serde(default)]
        armor: [u8; 3],
        #[serde(default = "default_prop_density")]
        prop_density: f64,
        #[serde(default = "default_start_fill")]
        start_fill: f64,
    },
    Engine {
        pos: [f64; 2],
        size: [f64; 3],
        #[serde(default)]
        armor: [u8; 3],
        #[serde(default = "default_thrust")]
        thrust: f64,
        #[serde(default = "default_isp")]
        isp: f64,
    },
    Reactor {
        pos: [f64; 2],
        size: [f64; 3],
        #[serde(default)]
        armor: [u8; 3],
        #[serde(default = "default_power_generation")]
        power_generation: f64,
        #[serde(default = "default_heat_generation")]
        heat_generation: f64,
        #[serde(default = "default_power_storage")]
        power_storage: f64,
        #[serde(default = "default_heat_capacity")]
        heat_capacity: f64,
    },
    Radiator {
        pos: [f64; 2],
        size: [f64; 3],
        #[serde(default)]
        armor: [u8; 3],
        #[serde(default = "default_dissipation_per_area")]
        dissipation_per_area: f64,
    },
    /// A preset weapon turned `direction` quarter turns from the nose.
    /// `spread_deg` replaces the preset's spread; `Some(0.0)` fires every
    /// round exactly down the firing solution.
    Weapon {
        preset: WeaponPreset,
        pos: [f64; 2],
        #[serde(default)]
        direction: i8,
        #[serde(default)]
        armor: [u8; 3],
        #[serde(default)]
        spread_deg: Option<f64>,
    },
}

impl PartConfig {
    pub fn build(&self) -> eyre::Result<Part> {
        let params = |part_type, pos: &[f64; 2], size: [f64; 3], armor: &[u8; 3]| {
            Ok::<_, eyre::Report>(PartParams::new(
                part_type,
                Vector2::from(*pos),
                Footprint::new(size)?,
                *armor,
            ))
        };
        let part = match self {
            Self::Hull { pos, size, armor } => Part::hull(params(PartType::Hull, pos, *size, armor)?),
            Self::Control {
                pos,
                size,
                armor,
                power_usage,
            } => Part::control(params(PartType::Control, pos, *size, armor)?, *power_usage),
            Self::Tank {
                pos,
                size,
                armor,
                prop_density,
                start_fill,
            } => Part::tank(
                params(PartType::Tank, pos, *size, armor)?,
                *prop_density,
                *start_fill,
            ),
            Self::Engine {
                pos,
                size,
                armor,
                thrust,
                isp,
            } => Part::engine(params(PartType::Engine, pos, *size, armor)?, *thrust, *isp),
            Self::Reactor {
                pos,
                size,
                armor,
                power_generation,
                heat_generation,
                power_storage,
                heat_capacity,
            } => Part::reactor(
                params(PartType::Reactor, pos, *size, armor)?,
                *power_generation,
                *heat_generation,
                *power_storage,
                *heat_capacity,
            ),
            Self::Radiator {
                pos,
                size,
                armor,
                dissipation_per_area,
            } => Part::radiator(
                params(PartType::Radiator, pos, *size, armor)?,
                *dissipation_per_area,
            ),
            Self::Weapon {
                preset,
                pos,
                direction,
                armor,
                spread_deg,
            } => {
                let mut weapon = preset.weapon(*direction);
                if let Some(spread) = spread_deg {
                    weapon.spread = spread.max(0.0) * DEG;
                }
                Part::weapon(
                    params(PartType::Weapon, pos, preset.size(*direction), armor)?,
                    weapon,
                )
            }
        };
        Ok(part)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipConfig {
    pub name: String,
    pub team: String,
    /// Name of the body the ship starts around.
    pub parent: String,
    /// Starting position relative to the parent (`m`)
    pub local_pos: [f64; 2],
    /// Starting velocity relative to the parent (`m/s`)
    pub local_vel: [f64; 2],
    #[serde(default)]
    pub rot: f64,
    #[serde(default = "default_torque")]
    pub torque: f64,
    pub parts: Vec<PartConfig>,
}

impl ShipConfig {
    pub fn build(&self, parent: BodyId) -> eyre::Result<Ship> {
        let parts = self
            .parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                part.build()
                    .map_err(|e| e.wrap_err(format!("part {i} of ship {:?}", self.name)))
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(Ship::new(
            Arc::from(self.name.as_str()),
            Arc::from(self.team.as_str()),
            parent,
            Vector2::from(self.local_pos),
            Vector2::from(self.local_vel),
            self.rot,
            self.torque,
            parts,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub start_time: f64,
    pub bodies: Vec<BodyConfig>,
    #[serde(default)]
    pub ships: Vec<ShipConfig>,
}

/// The Sun with the Earth, the Moon and Mars.
pub fn default_bodies() -> Vec<BodyConfig> {
    vec![
        BodyConfig::root("Sun", 1.989e30, 696_265_000.0).with_color("#fffdc0ff"),
        BodyConfig::satellite(
            "Earth",
            5.972e24,
            6_378_137.0,
            "Sun",
            OrbitConfig {
                sma: 149.6e9,
                e: 0.0167,
                arg_deg: 102.947_19,
                mna_deg: 358.617,
                epoch: 0.0,
            },
        )
        .with_color("#2f6a69ff"),
        BodyConfig::satellite(
            "Moon",
            7.342e22,
            1_737_400.0,
            "Earth",
            OrbitConfig {
                sma: 384.4e6,
                e: 0.0549,
                arg_deg: 318.15,
                mna_deg: 134.962_92,
                epoch: 0.0,
            },
        )
        .with_color("#a8a8a8ff"),
        BodyConfig::satellite(
            "Mars",
            6.4171e23,
            3_389_500.0,
            "Sun",
            OrbitConfig {
                sma: 227.9e9,
                e: 0.0935,
                arg_deg: 336.040_84,
                mna_deg: 19.412,
                epoch: 0.0,
            },
        )
        .with_color("#c1440eff"),
    ]
}

/// Standard combat loadout; the two sides differ only in their engine.
fn combat_ship(
    name: &str,
    team: &str,
    local_pos: [f64; 2],
    local_vel: [f64; 2],
    thrust: f64,
    isp: f64,
) -> ShipConfig {
    use PartConfig::{Control, Engine, Hull, Radiator, Reactor, Tank, Weapon};
    use WeaponPreset::{Cannon, MachineGun, Sniper};

    let weapon = |preset, pos, direction| Weapon {
        preset,
        pos,
        direction,
        armor: [2, 0, 0],
        spread_deg: None,
    };
    ShipConfig {
        name: name.into(),
        team: team.into(),
        parent: "Moon".into(),
        local_pos,
        local_vel,
        rot: 0.0,
        torque: 1000.0,
        parts: vec![
            Hull {
                pos: [40.0, 0.0],
                size: [8.0, 16.0, 20.0],
                armor: [2, 1, 0],
            },
            Control {
                pos: [25.0, 0.0],
                size: [16.0, 16.0, 10.0],
                armor: [2, 1, 0],
                power_usage: default_power_usage(),
            },
            Tank {
                pos: [0.0, 0.0],
                size: [16.0, 16.0, 40.0],
                armor: [2, 1, 0],
                prop_density: default_prop_density(),
                start_fill: 1.0,
            },
            Radiator {
                pos: [-20.0, 18.0],
                size: [20.0, 20.0, 8.0],
                armor: [1, 0, 0],
                dissipation_per_area: default_dissipation_per_area(),
            },
            Radiator {
                pos: [-20.0, -18.0],
                size: [20.0, 20.0, 8.0],
                armor: [1, 0, 0],
                dissipation_per_area: default_dissipation_per_area(),
            },
            Reactor {
                pos: [-25.0, 0.0],
                size: [16.0, 16.0, 10.0],
                armor: [0, 0, 0],
                power_generation: default_power_generation(),
                heat_generation: default_heat_generation(),
                power_storage: default_power_storage(),
                heat_capacity: default_heat_capacity(),
            },
            Engine {
                pos: [-34.0, 0.0],
                size: [4.0, 6.0, 8.0],
                armor: [0, 0, 0],
                thrust,
                isp,
            },
            weapon(MachineGun, [15.0, 9.0], 1),
            weapon(MachineGun, [15.0, -9.0], -1),
            weapon(Cannon, [52.0, 2.0], 0),
            weapon(Cannon, [52.0, -2.0], 0),
            weapon(Sniper, [0.0, 9.0], 0),
            weapon(Sniper, [0.0, -9.0], 0),
        ],
    }
}

/// Two ships facing off in lunar orbit.
pub fn default_scenario() -> ScenarioConfig {
    ScenarioConfig {
        start_time: 0.0,
        bodies: default_bodies(),
        ships: vec![
            combat_ship(
                "Allies 1",
                "Allies",
                [4_800_000.0, 0.0],
                [0.0, 1020.0],
                1_500_000.0,
                450.0,
            ),
            combat_ship(
                "Enemies 1",
                "Enemies",
                [-5_000_000.0, 6_400_000.0],
                [-680.0, -440.0],
                225_000.0,
                750.0,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ships_build() {
        let scenario = default_scenario();
        for config in &scenario.ships {
            let ship = config.build(BodyId::default()).unwrap();
            assert_eq!(ship.parts.len(), 13);
            assert_eq!(ship.parts[0].part_type(), PartType::Hull);
        }
    }

    #[test]
    fn orbit_angles_are_degrees() {
        let orbit = OrbitConfig {
            sma: 1e9,
            e: 0.1,
            arg_deg: 90.0,
            mna_deg: 180.0,
            epoch: 5.0,
        }
        .to_orbit();
        assert!((orbit.arg - std::f64::consts::FRAC_PI_2).abs() < 1e-15);
        assert!((orbit.mna - std::f64::consts::PI).abs() < 1e-15);
        assert_eq!(orbit.epoch, 5.0);
    }

    #[test]
    fn weapon_spread_can_be_overridden() {
        let parts: Vec<PartConfig> = ron::from_str(
            "[
                Weapon(preset: Cannon, pos: (0.0, 0.0)),
                Weapon(preset: Cannon, pos: (0.0, 0.0), spread_deg: Some(0.0)),
            ]",
        )
        .unwrap();
        let spreads: Vec<f64> = parts
            .iter()
            .map(|p| p.build().unwrap().as_weapon().unwrap().spread)
            .collect();
        assert_eq!(spreads[0], WeaponPreset::Cannon.weapon(0).spread);
        assert!(spreads[0] > 0.0);
        assert_eq!(spreads[1], 0.0);
    }

    #[test]
    fn bad_part_is_reported() {
        let mut config = default_scenario().ships.remove(0);
        config.parts.push(PartConfig::Hull {
            pos: [0.0, 0.0],
            size: [0.0, 0.0, 1.0],
            armor: [0; 3],
        });
        let err = config.build(BodyId::default()).unwrap_err();
        assert!(format!("{err:?}").contains("part 13"));
    }
}
