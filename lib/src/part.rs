//! Ship parts: footprint geometry, per-kind payloads and the damage model.

use color_eyre::eyre::{self, bail};
use nalgebra::Vector2;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::{
    armor::{ArmorConfig, ArmorTier},
    weapon::Weapon,
};

/// Trapezoidal outline of a part, centered on the part's position.
///
/// The part's length runs along the ship's x axis, the front edge faces
/// `+x` and the rear edge faces `-x`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub front_width: f64,
    pub rear_width: f64,
    pub length: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FootprintShape {
    Rectangle,
    Trapezoid,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeSide {
    Front,
    Left,
    Rear,
    Right,
}

/// One side of a footprint, in ship-local coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    pub side: EdgeSide,
    pub a: Vector2<f64>,
    pub b: Vector2<f64>,
    /// Unit normal pointing out of the part.
    pub normal: Vector2<f64>,
}

impl Footprint {
    /// Build a footprint from `[front width, rear width, length]`.
    pub fn new(size: [f64; 3]) -> eyre::Result<Self> {
        let [front_width, rear_width, length] = size;
        if !(length > 0.0 && length.is_finite()) {
            bail!("part length must be positive, got {length}");
        }
        if !(front_width >= 0.0 && rear_width >= 0.0)
            || !(front_width + rear_width > 0.0)
            || !(front_width + rear_width).is_finite()
        {
            bail!("part widths must be non-negative and not both zero, got {front_width} and {rear_width}");
        }
        Ok(Self {
            front_width,
            rear_width,
            length,
        })
    }

    pub fn area(&self) -> f64 {
        (self.front_width + self.rear_width) * self.length * 0.5
    }

    pub fn shape(&self) -> FootprintShape {
        if self.front_width == self.rear_width {
            FootprintShape::Rectangle
        } else {
            FootprintShape::Trapezoid
        }
    }

    /// Corners in counterclockwise order: front right, front left, rear
    /// left, rear right.
    pub fn corners(&self, center: Vector2<f64>) -> [Vector2<f64>; 4] {
        let hl = self.length * 0.5;
        let hf = self.front_width * 0.5;
        let hr = self.rear_width * 0.5;
        [
            center + Vector2::new(hl, -hf),
            center + Vector2::new(hl, hf),
            center + Vector2::new(-hl, hr),
            center + Vector2::new(-hl, -hr),
        ]
    }

    /// The four sides with their outward normals. Sides of zero length
    /// (the point of a triangular footprint) are left out.
    pub fn edges(&self, center: Vector2<f64>) -> impl Iterator<Item = Edge> {
        let [fr, fl, rl, rr] = self.corners(center);
        let shape = self.shape();
        [
            (EdgeSide::Front, fr, fl),
            (EdgeSide::Left, fl, rl),
            (EdgeSide::Rear, rl, rr),
            (EdgeSide::Right, rr, fr),
        ]
        .into_iter()
        .filter_map(move |(side, a, b)| {
            let d = b - a;
            let len = d.norm();
            if len == 0.0 {
                return None;
            }
            let normal = match (shape, side) {
                (FootprintShape::Rectangle, EdgeSide::Front) => Vector2::new(1.0, 0.0),
                (FootprintShape::Rectangle, EdgeSide::Left) => Vector2::new(0.0, 1.0),
                (FootprintShape::Rectangle, EdgeSide::Rear) => Vector2::new(-1.0, 0.0),
                (FootprintShape::Rectangle, EdgeSide::Right) => Vector2::new(0.0, -1.0),
                (FootprintShape::Trapezoid, _) => Vector2::new(d[1], -d[0]) / len,
            };
            Some(Edge { side, a, b, normal })
        })
    }
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u8)]
pub enum PartType {
    Hull,
    Control,
    Tank,
    Engine,
    Reactor,
    Radiator,
    Weapon,
}

/// Per-kind payload of a part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PartKind {
    Hull,
    Control {
        /// Power drawn per second at full attitude authority.
        power_usage: f64,
    },
    Tank {
        prop_density: f64,
        capacity: f64,
        propellant: f64,
    },
    Engine {
        /// Thrust (`N`)
        thrust: f64,
        /// Specific impulse (`s`)
        isp: f64,
    },
    Reactor {
        power_generation: f64,
        heat_generation: f64,
        power_storage: f64,
        heat_capacity: f64,
    },
    Radiator {
        max_dissipation: f64,
    },
    Weapon(Weapon),
}

impl PartKind {
    pub fn part_type(&self) -> PartType {
        match self {
            Self::Hull => PartType::Hull,
            Self::Control { .. } => PartType::Control,
            Self::Tank { .. } => PartType::Tank,
            Self::Engine { .. } => PartType::Engine,
            Self::Reactor { .. } => PartType::Reactor,
            Self::Radiator { .. } => PartType::Radiator,
            Self::Weapon(_) => PartType::Weapon,
        }
    }
}

/// Construction parameters shared by every kind of part.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PartParams {
    pub pos: Vector2<f64>,
    pub footprint: Footprint,
    /// Structural mass per unit area, before armor.
    pub density: f64,
    pub health_per_area: f64,
    pub armor_tiers: [u8; 3],
    pub armor_effectivity: f64,
    /// Chance that a projectile crossing the part actually strikes it.
    pub hit_chance: f64,
    pub damage_multiplier: f64,
}

impl PartParams {
    /// Defaults for a part of the given type.
    pub fn new(
        part_type: PartType,
        pos: Vector2<f64>,
        footprint: Footprint,
        armor_tiers: [u8; 3],
    ) -> Self {
        let mut params = Self {
            pos,
            footprint,
            density: 100.0,
            health_per_area: 100.0,
            armor_tiers,
            armor_effectivity: 1.0,
            hit_chance: 1.0,
            damage_multiplier: 1.0,
        };
        match part_type {
            PartType::Hull | PartType::Control | PartType::Tank => {}
            PartType::Engine => {
                params.density = 50.0;
                params.armor_effectivity = 0.5;
            }
            PartType::Reactor => params.density = 200.0,
            PartType::Radiator => {
                params.density = 10.0;
                params.health_per_area = 10.0;
                params.armor_effectivity = 0.1;
                params.hit_chance = 0.2;
            }
            PartType::Weapon => {
                params.health_per_area = 20.0;
                params.hit_chance = 0.2;
                params.damage_multiplier = 0.5;
            }
        }
        params
    }
}

/// What a single application of damage did to a part.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageReport {
    /// Damage soaked up by armor.
    pub absorbed: f64,
    /// Damage that reached the structure.
    pub health_damage: f64,
    /// Whether this application took the part from functional to broken.
    pub destroyed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub kind: PartKind,
    /// Center of the part in the ship's frame.
    pub pos: Vector2<f64>,
    pub footprint: Footprint,
    pub area: f64,
    pub density: f64,
    pub health: f64,
    pub max_health: f64,
    pub armor: [f64; 3],
    pub max_armor: [f64; 3],
    pub reduction: [f64; 3],
    /// Structure plus armor; tanks add their propellant on top.
    pub dry_mass: f64,
    pub hit_chance: f64,
    pub damage_multiplier: f64,
}

impl Part {
    pub fn new(kind: PartKind, params: PartParams) -> Self {
        let area = params.footprint.area();
        let armor = ArmorConfig::new(params.armor_tiers, params.armor_effectivity);
        let max_health = params.health_per_area * area;
        let max_armor = armor.armor_per_area.map(|a| a * area);
        Self {
            kind,
            pos: params.pos,
            footprint: params.footprint,
            area,
            density: params.density,
            health: max_health,
            max_health,
            armor: max_armor,
            max_armor,
            reduction: armor.reduction,
            dry_mass: (params.density + armor.total_mass_per_area()) * area,
            hit_chance: params.hit_chance,
            damage_multiplier: params.damage_multiplier,
        }
    }

    pub fn hull(params: PartParams) -> Self {
        Self::new(PartKind::Hull, params)
    }

    pub fn control(params: PartParams, power_usage: f64) -> Self {
        Self::new(PartKind::Control { power_usage }, params)
    }

    /// A tank holding `start_fill` (0 to 1) of its capacity.
    pub fn tank(params: PartParams, prop_density: f64, start_fill: f64) -> Self {
        let capacity = params.footprint.area() * prop_density;
        Self::new(
            PartKind::Tank {
                prop_density,
                capacity,
                propellant: capacity * start_fill.clamp(0.0, 1.0),
            },
            params,
        )
    }

    pub fn engine(params: PartParams, thrust: f64, isp: f64) -> Self {
        Self::new(PartKind::Engine { thrust, isp }, params)
    }

    pub fn reactor(
        params: PartParams,
        power_generation: f64,
        heat_generation: f64,
        power_storage: f64,
        heat_capacity: f64,
    ) -> Self {
        Self::new(
            PartKind::Reactor {
                power_generation,
                heat_generation,
                power_storage,
                heat_capacity,
            },
            params,
        )
    }

    pub fn radiator(params: PartParams, dissipation_per_area: f64) -> Self {
        let max_dissipation = params.footprint.area() * dissipation_per_area;
        Self::new(PartKind::Radiator { max_dissipation }, params)
    }

    pub fn weapon(params: PartParams, weapon: Weapon) -> Self {
        Self::new(PartKind::Weapon(weapon), params)
    }

    pub fn part_type(&self) -> PartType {
        self.kind.part_type()
    }

    pub fn is_functional(&self) -> bool {
        self.health > 0.0
    }

    pub fn health_fraction(&self) -> f64 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            0.0
        }
    }

    pub fn armor_fraction(&self, tier: ArmorTier) -> f64 {
        let i = usize::from(tier);
        if self.max_armor[i] > 0.0 {
            self.armor[i] / self.max_armor[i]
        } else {
            0.0
        }
    }

    pub fn propellant(&self) -> f64 {
        match self.kind {
            PartKind::Tank { propellant, .. } => propellant,
            _ => 0.0,
        }
    }

    pub fn mass(&self) -> f64 {
        self.dry_mass + self.propellant()
    }

    /// Current heat removal rate; scales with the radiator's remaining
    /// health. Zero for anything that is not a radiator.
    pub fn dissipation_rate(&self) -> f64 {
        match self.kind {
            PartKind::Radiator { max_dissipation } => max_dissipation * self.health_fraction(),
            _ => 0.0,
        }
    }

    pub fn as_weapon(&self) -> Option<&Weapon> {
        match &self.kind {
            PartKind::Weapon(weapon) => Some(weapon),
            _ => None,
        }
    }

    pub fn as_weapon_mut(&mut self) -> Option<&mut Weapon> {
        match &mut self.kind {
            PartKind::Weapon(weapon) => Some(weapon),
            _ => None,
        }
    }

    /// The part's sides in the ship's frame.
    pub fn edges(&self) -> impl Iterator<Item = Edge> {
        self.footprint.edges(self.pos)
    }

    /// Apply `damage` against one armor tier.
    ///
    /// The tier's reduction coefficient decides how much of the damage
    /// the armor tries to soak; armor can only soak what it has left and
    /// everything else reaches the structure. Neither armor nor health
    /// goes below zero.
    pub fn apply_damage(&mut self, damage: f64, tier: ArmorTier) -> DamageReport {
        let damage = damage.max(0.0);
        let i = usize::from(tier);
        let was_functional = self.is_functional();

        // The split is fixed by the reduction; spent armor passes nothing on
        let to_armor = damage * self.reduction[i];
        let absorbed = to_armor.min(self.armor[i]).max(0.0);
        self.armor[i] = (self.armor[i] - to_armor).max(0.0);

        let to_health = damage - to_armor;
        let health_damage = to_health.min(self.health).max(0.0);
        self.health = (self.health - to_health).max(0.0);

        DamageReport {
            absorbed,
            health_damage,
            destroyed: was_functional && !self.is_functional(),
        }
    }
}
