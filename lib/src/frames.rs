//! Sphere-of-influence bookkeeping for objects in flight.

use serde::{Deserialize, Serialize};

use crate::{bodies::BodyId, bodies::SolarSystem, integrator::ObjectState};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameTransition {
    None,
    /// Left the parent's sphere of influence for the grandparent's.
    Escaped { from: BodyId, to: BodyId },
    /// Entered the sphere of influence of one of the parent's satellites.
    Captured { from: BodyId, to: BodyId },
}

/// Move an object to the frame it belongs to at `time`.
///
/// The escape check runs first, then every satellite of the starting
/// parent is checked against the same position. The first satellite
/// containing the object wins and overrides an escape. At most one level
/// of the tree is crossed per call.
pub fn resolve_frame(state: &mut ObjectState, system: &SolarSystem, time: f64) -> FrameTransition {
    let parent = state.parent;
    let body = &system[parent];
    let rel = state.pos - system.position_at(parent, time);

    let mut transition = FrameTransition::None;
    if rel.norm_squared() > body.soi * body.soi {
        if let Some(grandparent) = body.parent {
            state.parent = grandparent;
            transition = FrameTransition::Escaped {
                from: parent,
                to: grandparent,
            };
        }
    }

    for &satellite in &body.satellites {
        let soi = system[satellite].soi;
        let d = rel - system.local_position_at(satellite, time);
        if d.norm_squared() <= soi * soi {
            state.parent = satellite;
            transition = FrameTransition::Captured {
                from: parent,
                to: satellite,
            };
            break;
        }
    }
    transition
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector2;

    use super::*;
    use crate::scenario::{default_bodies, BodyConfig, OrbitConfig};

    fn system() -> SolarSystem {
        SolarSystem::from_configs(&default_bodies()).unwrap()
    }

    fn at(system: &SolarSystem, parent: BodyId, offset: Vector2<f64>, time: f64) -> ObjectState {
        let pos = system.position_at(parent, time) + offset;
        ObjectState::new(pos, Vector2::zeros(), time, parent)
    }

    #[test]
    fn soi_boundary_is_inclusive() {
        let system = system();
        let moon = system.by_name("Moon").unwrap();
        let earth = system.by_name("Earth").unwrap();
        let soi = system[moon].soi;
        let t = 1_000.0;
        let eps = 1.0;

        // Radially outward from the Moon, away from the Earth
        let out = system.local_position_at(moon, t).normalize();

        let mut inside = at(&system, moon, out * (soi - eps), t);
        assert_eq!(resolve_frame(&mut inside, &system, t), FrameTransition::None);
        assert_eq!(inside.parent, moon);

        let mut outside = at(&system, moon, out * (soi + eps), t);
        assert_eq!(
            resolve_frame(&mut outside, &system, t),
            FrameTransition::Escaped {
                from: moon,
                to: earth
            }
        );
        assert_eq!(outside.parent, earth);
    }

    #[test]
    fn capture_by_satellite() {
        let system = system();
        let moon = system.by_name("Moon").unwrap();
        let earth = system.by_name("Earth").unwrap();
        let t = 5_000.0;

        let offset = system.local_position_at(moon, t) + Vector2::new(1e6, 0.0);
        let mut state = at(&system, earth, offset, t);
        assert_eq!(
            resolve_frame(&mut state, &system, t),
            FrameTransition::Captured {
                from: earth,
                to: moon
            }
        );
        assert_eq!(state.parent, moon);

        // Right back out to the Earth is a no-op
        let mut state = at(&system, earth, Vector2::new(1e7, 0.0), t);
        assert_eq!(resolve_frame(&mut state, &system, t), FrameTransition::None);
    }

    #[test]
    fn capture_wins_over_escape() {
        // A binary pair: the moon is as heavy as its planet, so its sphere
        // of influence reaches well past the planet's
        let orbit = |sma| OrbitConfig {
            sma,
            e: 0.0,
            arg_deg: 0.0,
            mna_deg: 0.0,
            epoch: 0.0,
        };
        let system = SolarSystem::from_configs(&[
            BodyConfig::root("Star", 1e30, 7e8),
            BodyConfig::satellite("Planet", 1e24, 6e6, "Star", orbit(1e11)),
            BodyConfig::satellite("Twin", 1e24, 6e6, "Planet", orbit(3.5e8)),
        ])
        .unwrap();
        let planet = system.by_name("Planet").unwrap();
        let twin = system.by_name("Twin").unwrap();
        let t = 100.0;

        let out = system.local_position_at(twin, t).normalize();
        let offset = out * (3.5e8 + 1e8);
        assert!(offset.norm() > system[planet].soi);
        assert!(1e8 < system[twin].soi);

        let mut state = at(&system, planet, offset, t);
        assert_eq!(
            resolve_frame(&mut state, &system, t),
            FrameTransition::Captured {
                from: planet,
                to: twin
            }
        );
        assert_eq!(state.parent, twin);
    }

    #[test]
    fn root_never_escapes() {
        let system = system();
        let sun = system.root();
        let mut state = at(&system, sun, Vector2::new(1e15, 0.0), 0.0);
        assert_eq!(resolve_frame(&mut state, &system, 0.0), FrameTransition::None);
        assert_eq!(state.parent, sun);
    }

    #[test]
    fn only_one_level_per_call() {
        let system = system();
        let moon = system.by_name("Moon").unwrap();
        let earth = system.by_name("Earth").unwrap();
        let sun = system.root();

        // Beyond the Earth's sphere of influence while parented to the Moon
        let far = Vector2::new(2e9, 0.0);
        let mut state = at(&system, earth, far, 0.0);
        state.parent = moon;
        resolve_frame(&mut state, &system, 0.0);
        assert_eq!(state.parent, earth);
        resolve_frame(&mut state, &system, 0.0);
        assert_eq!(state.parent, sun);
    }
}
