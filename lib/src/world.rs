//! The simulation context: the body tree, every ship and projectile,
//! and the random source for combat rolls.

use std::sync::Arc;

use color_eyre::eyre::{self, OptionExt};
use nalgebra::Vector2;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{
    bodies::{BodyId, SolarSystem},
    frames::{resolve_frame, FrameTransition},
    integrator::{propagate, Propagation},
    projectile::Projectile,
    raycast::{raycast, HitReport, RaycastOutcome},
    scenario::ScenarioConfig,
    ship::Ship,
    trajectory::{predict, Patch},
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectRef {
    Ship(Arc<str>),
    /// A projectile, by the team that fired it.
    Projectile(Arc<str>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipLoss {
    /// Flew into a body.
    Impact(BodyId),
    /// Every part is broken.
    Wrecked,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    Reparented {
        object: ObjectRef,
        transition: FrameTransition,
    },
    ShipDestroyed {
        ship: Arc<str>,
        cause: ShipLoss,
    },
    ProjectileImpact {
        team: Arc<str>,
        body: BodyId,
    },
    ProjectileExpired {
        team: Arc<str>,
    },
    Hit {
        ship: Arc<str>,
        hit: HitReport,
    },
    Ricochet {
        ship: Arc<str>,
        point: Vector2<f64>,
    },
    Consumed {
        ship: Arc<str>,
        point: Vector2<f64>,
    },
}

pub struct World {
    pub system: SolarSystem,
    pub ships: Vec<Ship>,
    pub projectiles: Vec<Projectile>,
    pub rng: StdRng,
    pub time: f64,
}

impl World {
    pub fn new(system: SolarSystem, ships: Vec<Ship>, seed: u64) -> Self {
        Self {
            system,
            ships,
            projectiles: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            time: 0.0,
        }
    }

    /// Build the world a scenario describes and place it at the
    /// scenario's start time.
    pub fn from_scenario(config: &ScenarioConfig, seed: u64) -> eyre::Result<Self> {
        let system = SolarSystem::from_configs(&config.bodies)?;
        let ships = config
            .ships
            .iter()
            .map(|ship| {
                let parent = system.by_name(&ship.parent).ok_or_eyre(format!(
                    "ship {:?} starts around unknown body {:?}",
                    ship.name, ship.parent
                ))?;
                ship.build(parent)
            })
            .collect::<eyre::Result<Vec<_>>>()?;

        let mut world = Self::new(system, ships, seed);
        world.init(config.start_time);
        Ok(world)
    }

    /// Place every ship at its starting offset from its parent body.
    pub fn init(&mut self, start_time: f64) {
        for ship in &mut self.ships {
            let (pos, vel) = self.system.state_at(ship.state.parent, start_time);
            ship.state.pos = pos + ship.local_pos;
            ship.state.vel = vel + ship.local_vel;
            ship.state.last_pos = ship.state.pos;
            ship.state.time = start_time;
            ship.last_rot = ship.rot;
        }
        self.time = start_time;
    }

    pub fn ship(&self, name: &str) -> Option<&Ship> {
        self.ships.iter().find(|s| &*s.name == name)
    }

    pub fn ship_mut(&mut self, name: &str) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| &*s.name == name)
    }

    /// Let every ship with a target shoot at its first one. Returns the
    /// number of rounds fired.
    pub fn fire(&mut self, time: f64) -> usize {
        let before = self.projectiles.len();
        for ship in &mut self.ships {
            if let Some(target) = ship.targets.first().copied() {
                let shots = ship.fire_at(&target, time, &mut self.rng);
                self.projectiles.extend(shots);
            }
        }
        self.projectiles.len() - before
    }

    /// Predicted path of a ship over the next few patches.
    pub fn predict(&self, ship: usize, samples: usize, max_patches: usize) -> Vec<Patch> {
        let Some(ship) = self.ships.get(ship) else {
            return Vec::new();
        };
        predict(
            &self.system,
            ship.state.parent,
            ship.state.pos,
            ship.state.vel,
            ship.state.time,
            samples,
            max_patches,
        )
    }

    /// Advance the world to `end_time` with sub-steps of `step_dt`.
    ///
    /// Commands are applied first, then every object is propagated and
    /// moved to its new frame, projectiles are raycast against the ships
    /// of other teams, and finally destroyed or expired objects are
    /// removed.
    pub fn update(&mut self, end_time: f64, step_dt: f64) -> Vec<WorldEvent> {
        let frame_dt = end_time - self.time;
        let mut events = Vec::new();
        trace!(time = self.time, end_time, step_dt, "update");

        for ship in &mut self.ships {
            ship.apply_controls(frame_dt);
            ship.update_resources(frame_dt);
        }

        let mut ships_alive = vec![true; self.ships.len()];
        for (ship, alive) in self.ships.iter_mut().zip(&mut ships_alive) {
            match propagate(ship, &self.system, end_time, step_dt) {
                Propagation::Reached => {
                    let transition = resolve_frame(&mut ship.state, &self.system, end_time);
                    if transition != FrameTransition::None {
                        debug!(ship = %ship.name, ?transition, "reparented");
                        events.push(WorldEvent::Reparented {
                            object: ObjectRef::Ship(ship.name.clone()),
                            transition,
                        });
                    }
                }
                Propagation::Destroyed(impact) => {
                    info!(ship = %ship.name, body = %self.system[impact.body].name, "ship crashed");
                    *alive = false;
                    events.push(WorldEvent::ShipDestroyed {
                        ship: ship.name.clone(),
                        cause: ShipLoss::Impact(impact.body),
                    });
                }
                Propagation::Expired => *alive = false,
            }
        }

        let mut projectiles_alive = vec![true; self.projectiles.len()];
        for (projectile, alive) in self.projectiles.iter_mut().zip(&mut projectiles_alive) {
            match propagate(projectile, &self.system, end_time, step_dt) {
                Propagation::Reached => {
                    let transition = resolve_frame(&mut projectile.state, &self.system, end_time);
                    if transition != FrameTransition::None {
                        events.push(WorldEvent::Reparented {
                            object: ObjectRef::Projectile(projectile.team.clone()),
                            transition,
                        });
                    }
                }
                Propagation::Destroyed(impact) => {
                    *alive = false;
                    events.push(WorldEvent::ProjectileImpact {
                        team: projectile.team.clone(),
                        body: impact.body,
                    });
                }
                Propagation::Expired => {
                    *alive = false;
                    events.push(WorldEvent::ProjectileExpired {
                        team: projectile.team.clone(),
                    });
                }
            }
        }

        for (projectile, alive) in self.projectiles.iter_mut().zip(&mut projectiles_alive) {
            if !*alive {
                continue;
            }
            let team = projectile.team.clone();
            for (ship, _) in self
                .ships
                .iter_mut()
                .zip(&ships_alive)
                .filter(|(ship, alive)| **alive && ship.team != team)
            {
                let outcome = raycast(projectile, ship, &mut self.rng);
                events.extend(outcome.hits().iter().map(|&hit| WorldEvent::Hit {
                    ship: ship.name.clone(),
                    hit,
                }));
                match outcome {
                    RaycastOutcome::Consumed { point, .. } => {
                        *alive = false;
                        events.push(WorldEvent::Consumed {
                            ship: ship.name.clone(),
                            point,
                        });
                        break;
                    }
                    RaycastOutcome::Ricocheted { point, .. } => {
                        events.push(WorldEvent::Ricochet {
                            ship: ship.name.clone(),
                            point,
                        });
                    }
                    RaycastOutcome::Missed | RaycastOutcome::Passed { .. } => {}
                }
            }
        }

        for (ship, alive) in self.ships.iter().zip(&mut ships_alive) {
            if *alive && ship.is_destroyed() {
                info!(ship = %ship.name, "ship wrecked");
                *alive = false;
                events.push(WorldEvent::ShipDestroyed {
                    ship: ship.name.clone(),
                    cause: ShipLoss::Wrecked,
                });
            }
        }

        for (projectile, alive) in self.projectiles.iter().zip(&mut projectiles_alive) {
            if *alive && projectile.is_expired_at(end_time) {
                *alive = false;
                events.push(WorldEvent::ProjectileExpired {
                    team: projectile.team.clone(),
                });
            }
        }

        let mut ships_alive = ships_alive.into_iter();
        self.ships.retain(|_| ships_alive.next().unwrap_or(false));
        let mut projectiles_alive = projectiles_alive.into_iter();
        self.projectiles
            .retain(|_| projectiles_alive.next().unwrap_or(false));

        self.time = end_time;
        events
    }
}
