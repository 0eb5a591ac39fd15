//! Armor tiers and their per-area properties.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(usize)]
pub enum ArmorTier {
    /// Stops projectiles.
    Kinetic = 0,
    /// Stops beams.
    Energy = 1,
    /// Stops nuclear and other exotic damage.
    Special = 2,
}

impl ArmorTier {
    pub const ALL: [ArmorTier; 3] = [ArmorTier::Kinetic, ArmorTier::Energy, ArmorTier::Special];
}

const MASS_PER_AREA: [f64; 3] = [50.0, 10.0, 25.0];
const ARMOR_PER_AREA: [f64; 3] = [10.0, 5.0, 2.0];
const REDUCTION_PER_TIER: f64 = 0.2;

/// Armor layout of a part, expressed per unit of footprint area.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmorConfig {
    /// Thickness tier for each of kinetic, energy and special armor.
    pub tiers: [u8; 3],
    /// Scales every derived value; thin or awkward parts carry less.
    pub effectivity: f64,
    pub mass_per_area: [f64; 3],
    pub armor_per_area: [f64; 3],
    /// Fraction of incoming damage each tier soaks up.
    pub reduction: [f64; 3],
}

impl ArmorConfig {
    pub fn new(tiers: [u8; 3], effectivity: f64) -> Self {
        let mut mass_per_area = [0.0; 3];
        let mut armor_per_area = [0.0; 3];
        let mut reduction = [0.0; 3];
        for tier in ArmorTier::ALL {
            let i = usize::from(tier);
            let t = f64::from(tiers[i]);
            mass_per_area[i] = effectivity * t * (t + 1.0) * 0.5 * MASS_PER_AREA[i];
            armor_per_area[i] = effectivity * t * ARMOR_PER_AREA[i];
            reduction[i] = effectivity * t * REDUCTION_PER_TIER;
        }
        Self {
            tiers,
            effectivity,
            mass_per_area,
            armor_per_area,
            reduction,
        }
    }

    pub fn total_mass_per_area(&self) -> f64 {
        self.mass_per_area.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_values_scale_with_tier() {
        let armor = ArmorConfig::new([2, 1, 0], 1.0);
        assert_eq!(armor.mass_per_area, [150.0, 10.0, 0.0]);
        assert_eq!(armor.armor_per_area, [20.0, 5.0, 0.0]);
        assert!((armor.reduction[0] - 0.4).abs() < 1e-12);
        assert!((armor.reduction[1] - 0.2).abs() < 1e-12);
        assert_eq!(armor.reduction[2], 0.0);
        assert_eq!(armor.total_mass_per_area(), 160.0);
    }

    #[test]
    fn effectivity_scales_everything() {
        let full = ArmorConfig::new([1, 0, 0], 1.0);
        let thin = ArmorConfig::new([1, 0, 0], 0.1);
        assert!((thin.armor_per_area[0] - 0.1 * full.armor_per_area[0]).abs() < 1e-12);
        assert!((thin.reduction[0] - 0.02).abs() < 1e-12);
        assert_eq!(ArmorTier::try_from(1usize).ok(), Some(ArmorTier::Energy));
    }
}
