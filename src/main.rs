#![warn(clippy::unwrap_used, clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::doc_markdown
)]
use std::{fs, io, path::PathBuf};

use ai::Autopilot;
use color_eyre::eyre::{self, WrapErr};
use itertools::Itertools;
use orbcom::{
    scenario::{default_scenario, ScenarioConfig},
    time::SimTime,
    world::{ObjectRef, World, WorldEvent},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod ai;

const DEFAULT_CONFIG: &str = "driver.toml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct DriverConfig {
    /// RON scenario file; the built-in scenario when absent.
    scenario: Option<PathBuf>,
    /// Simulated seconds to run for
    duration: f64,
    /// Real seconds per frame
    frame_dt: f64,
    time_warp: f64,
    /// Seed for combat rolls; random when absent.
    seed: Option<u64>,
    /// Simulated seconds between status lines
    log_every: f64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            scenario: None,
            duration: 600.0,
            frame_dt: 1.0 / 60.0,
            time_warp: 1.0,
            seed: None,
            log_every: 60.0,
        }
    }
}

/// Integration sub-step for a time warp. Faster warps trade accuracy
/// for speed.
fn step_dt(time_warp: f64) -> f64 {
    if time_warp >= 10_000.0 {
        10.0
    } else if time_warp >= 1_000.0 {
        1.0
    } else if time_warp >= 10.0 {
        0.1
    } else {
        1.0 / 60.0
    }
}

fn load_config(path: &str) -> eyre::Result<DriverConfig> {
    match fs::read_to_string(path) {
        Ok(s) => toml::from_str(&s).wrap_err_with(|| format!("invalid driver config {path}")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("no {path}, using default settings");
            Ok(DriverConfig::default())
        }
        Err(e) => Err(e).wrap_err_with(|| format!("reading {path}")),
    }
}

fn load_scenario(config: &DriverConfig) -> eyre::Result<ScenarioConfig> {
    let Some(path) = &config.scenario else {
        return Ok(default_scenario());
    };
    let s = fs::read_to_string(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    ron::from_str(&s).wrap_err_with(|| format!("invalid scenario {}", path.display()))
}

fn log_event(world: &World, event: &WorldEvent) {
    let time = SimTime::new_seconds(world.time);
    match event {
        WorldEvent::Reparented { object, transition } => match object {
            ObjectRef::Ship(name) => info!(%time, ship = %name, ?transition, "changed frame"),
            ObjectRef::Projectile(team) => debug!(%time, %team, ?transition, "projectile changed frame"),
        },
        WorldEvent::ShipDestroyed { ship, cause } => {
            warn!(%time, %ship, ?cause, "ship destroyed");
        }
        WorldEvent::Hit { ship, hit } => {
            debug!(%time, %ship, part = hit.part, damage = hit.damage, "hit");
        }
        WorldEvent::Ricochet { ship, .. } => debug!(%time, %ship, "ricochet"),
        WorldEvent::Consumed { ship, .. } => debug!(%time, %ship, "round stopped"),
        WorldEvent::ProjectileImpact { team, body } => {
            debug!(%time, %team, body = %world.system[*body].name, "round hit the ground");
        }
        WorldEvent::ProjectileExpired { .. } => {}
    }
}

fn log_status(world: &World) {
    let time = SimTime::new_seconds(world.time);
    info!(
        %time,
        ships = world.ships.len(),
        projectiles = world.projectiles.len(),
        teams = %world.ships.iter().map(|s| &*s.team).unique().join(", "),
        "status"
    );
    for ship in &world.ships {
        let parent = &world.system[ship.state.parent];
        let altitude = (ship.pos() - world.system.position_at(ship.state.parent, world.time)).norm()
            - parent.radius;
        info!(
            ship = %ship.name,
            around = %parent.name,
            altitude,
            health = ship.health() / ship.max_health(),
            power = ship.power,
            heat = ship.heat,
            propellant = ship.propellant(),
            "ship"
        );
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config_path = std::env::args().nth(1);
    let config = load_config(config_path.as_deref().unwrap_or(DEFAULT_CONFIG))?;
    let scenario = load_scenario(&config)?;
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, warp = config.time_warp, "starting");

    let mut world = World::from_scenario(&scenario, seed)?;
    let autopilot = Autopilot::default();
    let step = step_dt(config.time_warp);
    let frame = config.frame_dt * config.time_warp;
    if frame <= 0.0 {
        eyre::bail!("frame_dt and time_warp must be positive");
    }

    let end_time = world.time + config.duration;
    let mut next_status = world.time;
    while world.time < end_time && !world.ships.is_empty() {
        if world.time >= next_status {
            log_status(&world);
            next_status += config.log_every.max(frame);
        }

        autopilot.update(&mut world);
        let now = world.time;
        world.fire(now);

        let next = (now + frame).min(end_time);
        for event in world.update(next, step) {
            log_event(&world, &event);
        }
    }

    log_status(&world);
    info!(
        time = %SimTime::new_seconds(world.time),
        survivors = %world.ships.iter().map(|s| &*s.name).join(", "),
        "finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_follows_warp() {
        assert_eq!(step_dt(1.0), 1.0 / 60.0);
        assert_eq!(step_dt(10.0), 0.1);
        assert_eq!(step_dt(999.0), 0.1);
        assert_eq!(step_dt(1_000.0), 1.0);
        assert_eq!(step_dt(100_000.0), 10.0);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let config: DriverConfig = toml::from_str("time_warp = 100.0\nseed = 3").unwrap();
        assert_eq!(config.time_warp, 100.0);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.duration, DriverConfig::default().duration);
        assert!(config.scenario.is_none());
    }

    #[test]
    fn shipped_config_parses() {
        let config: DriverConfig = toml::from_str(include_str!("../driver.toml")).unwrap();
        assert_eq!(config.scenario, Some(PathBuf::from("scenarios/level0.ron")));
        assert_eq!(config.seed, Some(7));
    }
}
