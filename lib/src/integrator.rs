//! Gravity evaluation and numerical propagation of free-flying objects.
//!
//! Objects never feel the whole system: gravity is summed over the
//! sources picked by [`SolarSystem::gravity_sources`] for the body the
//! object currently belongs to. Hitting a source's surface is an ordinary
//! outcome and is reported as a value.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::bodies::{BodyId, SolarSystem};

/// Yoshida's fourth order coefficients.
pub const YOSHIDA_W0: f64 = -1.702_414_383_919_315_3;
pub const YOSHIDA_W1: f64 = 1.351_207_191_959_657_8;

const DRIFT: [f64; 4] = [
    YOSHIDA_W1 / 2.0,
    (YOSHIDA_W0 + YOSHIDA_W1) / 2.0,
    (YOSHIDA_W0 + YOSHIDA_W1) / 2.0,
    YOSHIDA_W1 / 2.0,
];
const KICK: [f64; 3] = [YOSHIDA_W1, YOSHIDA_W0, YOSHIDA_W1];

/// An object went below the surface of `body`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Impact {
    pub body: BodyId,
}

/// Kinematic state shared by everything that moves under gravity.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    /// Absolute position (`m`)
    pub pos: Vector2<f64>,
    /// Absolute velocity (`m/s`)
    pub vel: Vector2<f64>,
    /// Position at the start of the last propagation.
    pub last_pos: Vector2<f64>,
    /// The object's own clock.
    pub time: f64,
    /// The body whose frame the object is in.
    pub parent: BodyId,
}

impl ObjectState {
    pub fn new(pos: Vector2<f64>, vel: Vector2<f64>, time: f64, parent: BodyId) -> Self {
        Self {
            pos,
            vel,
            last_pos: pos,
            time,
            parent,
        }
    }
}

pub trait MovingObject {
    fn state(&self) -> &ObjectState;
    fn state_mut(&mut self) -> &mut ObjectState;
    fn stepper(&self) -> Stepper;

    /// Time after which the object stops existing.
    fn expire_time(&self) -> f64 {
        f64::INFINITY
    }

    /// Hook run at the start of [`propagate`], before any sub-step.
    fn before_propagate(&mut self, _end_time: f64) {}
}

/// Gravitational acceleration at `pos`, summed over `sources`.
pub fn acceleration(
    system: &SolarSystem,
    sources: &[BodyId],
    pos: &Vector2<f64>,
    time: f64,
) -> Result<Vector2<f64>, Impact> {
    let mut acc = Vector2::zeros();
    for &id in sources {
        let body = &system[id];
        let delta = system.position_at(id, time) - pos;
        let d2 = delta.norm_squared();
        if d2 < body.radius * body.radius {
            return Err(Impact { body: id });
        }
        acc += delta * (body.mu / (d2 * d2.sqrt()));
    }
    Ok(acc)
}

/// One fourth order symplectic step: four drifts interleaved with three
/// kicks, each kick evaluated at the position and time reached by the
/// preceding drift.
pub fn step_symplectic4(
    system: &SolarSystem,
    sources: &[BodyId],
    pos: Vector2<f64>,
    vel: Vector2<f64>,
    time: f64,
    dt: f64,
) -> Result<(Vector2<f64>, Vector2<f64>), Impact> {
    let mut pos = pos;
    let mut vel = vel;
    let mut t = time;
    for (s, c) in DRIFT.iter().enumerate() {
        pos += vel * (c * dt);
        t += c * dt;
        if let Some(d) = KICK.get(s) {
            vel += acceleration(system, sources, &pos, t)? * (d * dt);
        }
    }
    Ok((pos, vel))
}

/// One semi-implicit Euler step: kick with the acceleration at the start,
/// then drift with the updated velocity.
pub fn step_semi_implicit_euler(
    system: &SolarSystem,
    sources: &[BodyId],
    pos: Vector2<f64>,
    vel: Vector2<f64>,
    time: f64,
    dt: f64,
) -> Result<(Vector2<f64>, Vector2<f64>), Impact> {
    let vel = vel + acceleration(system, sources, &pos, time)? * dt;
    Ok((pos + vel * dt, vel))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stepper {
    /// Long-lived objects that coast for a long time.
    Symplectic4,
    /// Short-lived objects where long-run drift does not matter.
    SemiImplicitEuler,
}

impl Stepper {
    pub fn step(
        self,
        system: &SolarSystem,
        sources: &[BodyId],
        pos: Vector2<f64>,
        vel: Vector2<f64>,
        time: f64,
        dt: f64,
    ) -> Result<(Vector2<f64>, Vector2<f64>), Impact> {
        match self {
            Self::Symplectic4 => step_symplectic4(system, sources, pos, vel, time, dt),
            Self::SemiImplicitEuler => step_semi_implicit_euler(system, sources, pos, vel, time, dt),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Propagation {
    Reached,
    Destroyed(Impact),
    Expired,
}

/// Advance `object` to `end_time` in sub-steps of at most `step_dt`.
///
/// Gravity sources are chosen once from the parent at the start of the
/// call. Stops early on a surface impact or once the object's clock is
/// past its expiry time. A non-positive `step_dt` covers the whole
/// interval in one step.
pub fn propagate<O: MovingObject + ?Sized>(
    object: &mut O,
    system: &SolarSystem,
    end_time: f64,
    step_dt: f64,
) -> Propagation {
    object.before_propagate(end_time);
    let stepper = object.stepper();
    let expire_time = object.expire_time();

    let state = object.state_mut();
    state.last_pos = state.pos;
    let sources = system.gravity_sources(state.parent);

    while state.time < end_time {
        if state.time > expire_time {
            return Propagation::Expired;
        }

        let remaining = end_time - state.time;
        let (dt, last) = if step_dt > 0.0 && step_dt < remaining {
            (step_dt, false)
        } else {
            (remaining, true)
        };

        match stepper.step(system, &sources, state.pos, state.vel, state.time, dt) {
            Ok((pos, vel)) => {
                state.pos = pos;
                state.vel = vel;
                state.time = if last { end_time } else { state.time + dt };
            }
            Err(impact) => {
                trace!(body = ?impact.body, time = state.time, "surface impact");
                return Propagation::Destroyed(impact);
            }
        }
    }
    Propagation::Reached
}
