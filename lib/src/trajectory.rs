//! Patched-conic trajectory prediction.
//!
//! Each patch is the osculating conic around one body, sampled by true
//! anomaly until the path either leaves the body's sphere of influence
//! or meets its surface. An escape is handed on to the body's parent as
//! the next patch. Entering a satellite's sphere of influence is not
//! predicted.

use std::f64::consts;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    bodies::{BodyId, SolarSystem},
    kepler::orbits::{Conic, Orbit},
    math::{bisect, TAU},
};

/// Margin kept from the asymptote of an open orbit (`rad`)
const ASYMPTOTE_MARGIN: f64 = 1e-6;
const BISECT_TOLERANCE: f64 = 1e-9;
const BISECT_ITERATIONS: u64 = 100;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PatchEnd {
    /// The whole sampled arc stays inside the sphere of influence.
    Stays,
    /// The path meets the body's surface.
    Impact { time: f64, true_anomaly: f64 },
    /// The path leaves the sphere of influence for the parent's.
    Escape {
        time: f64,
        true_anomaly: f64,
        to: BodyId,
        /// The continuing orbit around `to`.
        orbit: Orbit,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub body: BodyId,
    pub orbit: Orbit,
    pub start_time: f64,
    /// Absolute sample points, with the body held where it is at
    /// `start_time`. The last point is the end of the patch.
    pub points: Vec<Vector2<f64>>,
    pub end: PatchEnd,
}

/// Predict the conic an object at absolute `pos` and `vel` follows
/// around `body`, sampled at `samples` steps.
pub fn predict_patch(
    system: &SolarSystem,
    body: BodyId,
    pos: Vector2<f64>,
    vel: Vector2<f64>,
    time: f64,
    samples: usize,
) -> Patch {
    let central = &system[body];
    let mu = central.mu;
    let (body_pos, body_vel) = system.state_at(body, time);
    let orbit = Orbit::from_state_vectors(pos - body_pos, vel - body_vel, mu, time);

    let sign = orbit.direction.sign();
    let f0 = orbit.true_anomaly_at(mu, time);
    let f_end = match orbit.conic() {
        Conic::Elliptic => f0 + sign * TAU,
        Conic::Parabolic => sign * (consts::PI - ASYMPTOTE_MARGIN),
        Conic::Hyperbolic => sign * (libm::acos(-1.0 / orbit.e) - ASYMPTOTE_MARGIN),
    };
    let samples = samples.max(1);

    let mut points = Vec::with_capacity(samples + 1);
    let mut end = PatchEnd::Stays;
    let mut prev = f0;
    for i in 0..=samples {
        let f = f0 + (f_end - f0) * i as f64 / samples as f64;
        let r = orbit.radius_at_true_anomaly(f);

        let crossing = if r < central.radius {
            Some(central.radius)
        } else if r > central.soi {
            Some(central.soi)
        } else {
            None
        };
        if let Some(target) = crossing {
            let f_cross = if i == 0 {
                f
            } else {
                bisect(
                    |m| orbit.radius_at_true_anomaly(m),
                    prev,
                    f,
                    target,
                    BISECT_TOLERANCE,
                    BISECT_ITERATIONS,
                )
            };
            let t = if i == 0 {
                time
            } else {
                orbit.time_at_true_anomaly(mu, f_cross, time)
            };
            points.push(body_pos + orbit.position_at_true_anomaly(f_cross));
            end = if target == central.radius {
                PatchEnd::Impact {
                    time: t,
                    true_anomaly: f_cross,
                }
            } else {
                match central.parent {
                    Some(parent) => {
                        let (p, v) = orbit.state_vectors(mu, t);
                        let (bp, bv) = system.local_state_at(body, t);
                        PatchEnd::Escape {
                            time: t,
                            true_anomaly: f_cross,
                            to: parent,
                            orbit: Orbit::from_state_vectors(p + bp, v + bv, system[parent].mu, t),
                        }
                    }
                    None => PatchEnd::Stays,
                }
            };
            break;
        }

        points.push(body_pos + orbit.position_at_true_anomaly(f));
        prev = f;
    }
    trace!(body = %central.name, ?end, "predicted patch");

    Patch {
        body,
        orbit,
        start_time: time,
        points,
        end,
    }
}

/// Predict up to `max_patches` patches, following escapes outward.
pub fn predict(
    system: &SolarSystem,
    body: BodyId,
    pos: Vector2<f64>,
    vel: Vector2<f64>,
    time: f64,
    samples: usize,
    max_patches: usize,
) -> Vec<Patch> {
    let mut patches = Vec::new();
    let (mut body, mut pos, mut vel, mut time) = (body, pos, vel, time);
    while patches.len() < max_patches {
        let patch = predict_patch(system, body, pos, vel, time, samples);
        let next = match patch.end {
            PatchEnd::Escape { time: t, to, .. } => {
                let mu = system[patch.body].mu;
                let (p, v) = patch.orbit.state_vectors(mu, t);
                let (bp, bv) = system.state_at(patch.body, t);
                Some((to, p + bp, v + bv, t))
            }
            PatchEnd::Stays | PatchEnd::Impact { .. } => None,
        };
        patches.push(patch);
        match next {
            Some(state) => (body, pos, vel, time) = state,
            None => break,
        }
    }
    patches
}
