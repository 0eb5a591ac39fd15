use std::sync::Arc;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{
    bodies::BodyId,
    integrator::{MovingObject, ObjectState, Stepper},
    weapon::ProjectileTemplate,
};

/// A kinetic round in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub state: ObjectState,
    /// Team of the ship that fired it; never hits its own side.
    pub team: Arc<str>,
    pub mass: f64,
    /// Damage budget left before the round is used up.
    pub penetration: f64,
    pub color: Arc<str>,
    pub start_time: f64,
    pub lifetime: f64,
}

impl Projectile {
    pub fn from_template(
        template: &ProjectileTemplate,
        team: Arc<str>,
        pos: Vector2<f64>,
        vel: Vector2<f64>,
        parent: BodyId,
        time: f64,
    ) -> Self {
        Self {
            state: ObjectState::new(pos, vel, time, parent),
            team,
            mass: template.mass,
            penetration: template.penetration,
            color: template.color.clone(),
            start_time: time,
            lifetime: template.lifetime,
        }
    }

    /// Whether the round has outlived its lifetime by `time`.
    pub fn is_expired_at(&self, time: f64) -> bool {
        time >= self.start_time + self.lifetime
    }

    pub fn is_spent(&self) -> bool {
        self.penetration <= 0.0
    }
}

impl MovingObject for Projectile {
    fn state(&self) -> &ObjectState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ObjectState {
        &mut self.state
    }

    fn stepper(&self) -> Stepper {
        Stepper::SemiImplicitEuler
    }

    fn expire_time(&self) -> f64 {
        self.start_time + self.lifetime
    }
}
