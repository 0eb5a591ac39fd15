//! Definitions of celestial bodies.

use std::{collections::HashMap, ops::Index, sync::Arc};

use color_eyre::eyre::{self, bail, OptionExt};
use itertools::Itertools;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{
    arena::{Arena, IdLike},
    kepler::orbits::{Conic, Orbit, G},
    scenario::BodyConfig,
};

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct BodyId(u32);

impl IdLike for BodyId {
    fn from_raw(index: usize) -> Self {
        Self(index as u32)
    }

    fn into_raw(self) -> usize {
        self.0 as usize
    }
}

/// A celestial body.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub name: Arc<str>,
    /// Mass (`kg`)
    pub mass: f64,
    /// Standard gravitational parameter (`m^3/s^2`)
    pub mu: f64,
    /// Mean radius of the body's sphere (`m`)
    pub radius: f64,
    /// Display color, unused by the simulation.
    pub color: Arc<str>,
    /// The body this one orbits, `None` for the root.
    pub parent: Option<BodyId>,
    /// Bodies orbiting this body, in declaration order.
    pub satellites: Vec<BodyId>,
    /// Orbit around the parent, `None` for the root.
    pub orbit: Option<Orbit>,
    /// Radius of this body's sphere of influence (`m`)
    pub soi: f64,
}

/// The body tree. Built once and never reshaped.
#[derive(Clone, Debug)]
pub struct SolarSystem {
    bodies: Arena<BodyId, Body>,
    names: HashMap<Arc<str>, BodyId>,
    root: BodyId,
}

impl SolarSystem {
    /// Build the tree from body declarations. Satellites are derived
    /// from the parent links, and each sphere of influence is computed
    /// once from the declared orbit.
    pub fn from_configs(configs: &[BodyConfig]) -> eyre::Result<Self> {
        let mut names = HashMap::new();
        for (i, config) in configs.iter().enumerate() {
            let name: Arc<str> = config.name.as_str().into();
            if names.insert(name, BodyId::from_raw(i)).is_some() {
                bail!("duplicate body name {:?}", config.name);
            }
        }

        let mut bodies: Arena<BodyId, Body> = Arena::with_capacity(configs.len());
        let mut root = None;
        for config in configs {
            let parent = match &config.parent {
                Some(parent) => Some(
                    *names
                        .get(parent.as_str())
                        .ok_or_eyre(format!("{:?} orbits unknown body {parent:?}", config.name))?,
                ),
                None => None,
            };
            let orbit = match (&config.orbit, parent) {
                (Some(orbit), Some(_)) => {
                    let orbit = orbit.to_orbit();
                    if orbit.conic() != Conic::Elliptic || orbit.sma <= 0.0 {
                        bail!("{:?} must be on a closed orbit", config.name);
                    }
                    Some(orbit)
                }
                (None, Some(_)) => bail!("{:?} has a parent but no orbit", config.name),
                (_, None) => None,
            };
            let id = bodies.push(Body {
                name: config.name.as_str().into(),
                mass: config.mass,
                mu: G * config.mass,
                radius: config.radius,
                color: config.color.as_str().into(),
                parent,
                satellites: Vec::new(),
                orbit,
                soi: f64::INFINITY,
            });
            if parent.is_none() {
                if let Some(other) = root {
                    bail!(
                        "more than one root body: {:?} and {:?}",
                        bodies[other].name,
                        config.name
                    );
                }
                root = Some(id);
            }
        }
        let root = root.ok_or_eyre("no root body")?;

        for id in bodies.ids().collect_vec() {
            let mut hops = 0;
            let mut cursor = bodies[id].parent;
            while let Some(parent) = cursor {
                hops += 1;
                if hops > bodies.len() {
                    bail!("{:?} is part of a parent cycle", bodies[id].name);
                }
                cursor = bodies[parent].parent;
            }
            if let Some(parent) = bodies[id].parent {
                bodies[parent].satellites.push(id);
            }
        }

        for id in bodies.ids().collect_vec() {
            let body = &bodies[id];
            if let (Some(parent), Some(orbit)) = (body.parent, body.orbit) {
                let soi = orbit.sma * libm::pow(body.mass / bodies[parent].mass, 0.4);
                bodies[id].soi = soi;
            }
        }

        Ok(Self {
            bodies,
            names,
            root,
        })
    }

    pub fn root(&self) -> BodyId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id)
    }

    pub fn by_name(&self, name: &str) -> Option<BodyId> {
        self.names.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter()
    }

    /// Position and velocity of a body relative to its parent.
    pub fn local_state_at(&self, id: BodyId, time: f64) -> (Vector2<f64>, Vector2<f64>) {
        let body = &self.bodies[id];
        match (body.parent, &body.orbit) {
            (Some(parent), Some(orbit)) => orbit.state_vectors(self.bodies[parent].mu, time),
            _ => (Vector2::zeros(), Vector2::zeros()),
        }
    }

    pub fn local_position_at(&self, id: BodyId, time: f64) -> Vector2<f64> {
        let body = &self.bodies[id];
        match (body.parent, &body.orbit) {
            (Some(parent), Some(orbit)) => orbit.position_at(self.bodies[parent].mu, time),
            _ => Vector2::zeros(),
        }
    }

    /// Absolute position of a body, resolved through its ancestors.
    pub fn position_at(&self, id: BodyId, time: f64) -> Vector2<f64> {
        let mut pos = Vector2::zeros();
        let mut cursor = Some(id);
        while let Some(body) = cursor {
            pos += self.local_position_at(body, time);
            cursor = self.bodies[body].parent;
        }
        pos
    }

    /// Absolute velocity of a body, resolved through its ancestors.
    pub fn velocity_at(&self, id: BodyId, time: f64) -> Vector2<f64> {
        self.state_at(id, time).1
    }

    pub fn state_at(&self, id: BodyId, time: f64) -> (Vector2<f64>, Vector2<f64>) {
        let mut pos = Vector2::zeros();
        let mut vel = Vector2::zeros();
        let mut cursor = Some(id);
        while let Some(body) = cursor {
            let (p, v) = self.local_state_at(body, time);
            pos += p;
            vel += v;
            cursor = self.bodies[body].parent;
        }
        (pos, vel)
    }

    /// The bodies whose gravity acts on an object orbiting `parent`:
    /// every ancestor up to the root, the siblings at each of those
    /// levels, the children of `parent`, and `parent` itself.
    pub fn gravity_sources(&self, parent: BodyId) -> Vec<BodyId> {
        let mut sources = Vec::new();
        self.collect_sources(parent, &mut sources);
        sources.push(parent);
        sources.into_iter().unique().collect()
    }

    fn collect_sources(&self, body: BodyId, sources: &mut Vec<BodyId>) {
        if let Some(parent) = self.bodies[body].parent {
            sources.push(parent);
            self.collect_sources(parent, sources);
            sources.extend(
                self.bodies[parent]
                    .satellites
                    .iter()
                    .filter(|&&sibling| sibling != body),
            );
        }
        sources.extend(&self.bodies[body].satellites);
    }
}

impl Index<BodyId> for SolarSystem {
    type Output = Body;

    fn index(&self, index: BodyId) -> &Self::Output {
        &self.bodies[index]
    }
}
