//! Projectile against ship collision and hit resolution.
//!
//! The projectile's motion over the last tick is turned into a segment
//! in the target ship's body frame, using the ship's pose at both ends
//! of the tick, and intersected with every edge of every part. Hits are
//! then resolved nearest first until the projectile is used up or
//! bounces off.

use nalgebra::Vector2;
use ordered_float::OrderedFloat;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    armor::ArmorTier,
    math::{cross, rotate},
    part::{DamageReport, EdgeSide, Part, PartType},
    projectile::Projectile,
    ship::Ship,
    weapon::kinetic_energy,
};

/// Weight of mass, speed and penetration in the ricochet exponent.
pub const RICOCHET_SCALE: f64 = 1e-5;

/// An edge crossed by a projectile's path.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Index into the ship's parts.
    pub part: usize,
    pub edge: EdgeSide,
    /// Where the path crosses the edge, in the ship's frame.
    pub point: Vector2<f64>,
    /// Outward normal of the edge, in the ship's frame.
    pub normal: Vector2<f64>,
    /// How squarely the path meets the edge, `1` head on and `<= 0` from
    /// behind.
    pub damage_factor: f64,
    /// Distance from the start of the path.
    pub distance: f64,
}

/// Damage dealt by one hit.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitReport {
    pub part: usize,
    pub damage: f64,
    pub report: DamageReport,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RaycastOutcome {
    /// Nothing was struck.
    Missed,
    /// Parts were struck and the projectile carries on.
    Passed { hits: Vec<HitReport> },
    /// The projectile ran out of penetration at `point`.
    Consumed {
        point: Vector2<f64>,
        hits: Vec<HitReport>,
    },
    /// The projectile bounced off at `point`.
    Ricocheted {
        point: Vector2<f64>,
        hits: Vec<HitReport>,
    },
}

impl RaycastOutcome {
    pub fn hits(&self) -> &[HitReport] {
        match self {
            Self::Missed => &[],
            Self::Passed { hits } | Self::Consumed { hits, .. } | Self::Ricocheted { hits, .. } => {
                hits
            }
        }
    }
}

fn orientation(a: &Vector2<f64>, b: &Vector2<f64>, c: &Vector2<f64>) -> f64 {
    cross(&(b - a), &(c - a))
}

/// Whether `p`, known to be collinear with `a` and `b`, lies between them.
fn on_segment(a: &Vector2<f64>, b: &Vector2<f64>, p: &Vector2<f64>) -> bool {
    p[0] >= a[0].min(b[0]) && p[0] <= a[0].max(b[0]) && p[1] >= a[1].min(b[1]) && p[1] <= a[1].max(b[1])
}

/// Intersection of segments `p1 p2` and `q1 q2`.
///
/// Proper crossings are solved parametrically. Touching and collinear
/// cases fall back to endpoint checks, and an overlap yields the point
/// of the overlap closest to `p1`.
pub fn segment_intersection(
    p1: &Vector2<f64>,
    p2: &Vector2<f64>,
    q1: &Vector2<f64>,
    q2: &Vector2<f64>,
) -> Option<Vector2<f64>> {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        let r = p2 - p1;
        let s = q2 - q1;
        let t = cross(&(q1 - p1), &s) / cross(&r, &s);
        return Some(p1 + r * t);
    }

    [
        (d1 == 0.0 && on_segment(q1, q2, p1)).then_some(*p1),
        (d2 == 0.0 && on_segment(q1, q2, p2)).then_some(*p2),
        (d3 == 0.0 && on_segment(p1, p2, q1)).then_some(*q1),
        (d4 == 0.0 && on_segment(p1, p2, q2)).then_some(*q2),
    ]
    .into_iter()
    .flatten()
    .min_by_key(|point| OrderedFloat((point - p1).norm_squared()))
}

/// Every edge crossing of the path from `start` to `end`, both in the
/// ship's frame, nearest first. Crossings at equal distance keep part
/// and edge order.
pub fn find_hits(parts: &[Part], start: &Vector2<f64>, end: &Vector2<f64>) -> Vec<Hit> {
    let path = end - start;
    let length = path.norm();
    if length == 0.0 {
        return Vec::new();
    }
    let dir = path / length;

    let mut hits = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let double_sided = part.part_type() == PartType::Radiator;
        for edge in part.edges() {
            let Some(point) = segment_intersection(start, end, &edge.a, &edge.b) else {
                continue;
            };
            let facing = -dir.dot(&edge.normal);
            let damage_factor = match edge.side {
                // Thin plates take hits on either face
                EdgeSide::Front | EdgeSide::Rear if double_sided => facing.abs(),
                _ => facing,
            };
            hits.push(Hit {
                part: i,
                edge: edge.side,
                point,
                normal: edge.normal,
                damage_factor,
                distance: (point - start).norm(),
            });
        }
    }
    hits.sort_by_key(|hit| OrderedFloat(hit.distance));
    hits
}

/// Chance that a hit with the given damage factor glances off.
pub fn ricochet_probability(
    damage_factor: f64,
    mass: f64,
    speed_squared: f64,
    penetration: f64,
) -> f64 {
    let exponent = 2.0 + RICOCHET_SCALE * mass * speed_squared * penetration.max(0.0);
    (1.0 - damage_factor).clamp(0.0, 1.0).powf(exponent)
}

/// Resolve one projectile against one ship.
///
/// Damage goes against kinetic armor. A consumed projectile is left at
/// the hit point with no penetration. A ricochet reflects the velocity
/// about the hit normal in the ship's rest frame and moves the projectile
/// to the hit point.
pub fn raycast(projectile: &mut Projectile, ship: &mut Ship, rng: &mut impl Rng) -> RaycastOutcome {
    let start = rotate(projectile.state.last_pos - ship.state.last_pos, -ship.last_rot);
    let end = rotate(projectile.state.pos - ship.state.pos, -ship.rot);
    let hits = find_hits(&ship.parts, &start, &end);
    if hits.is_empty() {
        return RaycastOutcome::Missed;
    }
    trace!(ship = %ship.name, count = hits.len(), "projectile path crosses ship");

    let rel_vel = projectile.state.vel - ship.state.vel;
    let speed_squared = rel_vel.norm_squared();
    let energy = kinetic_energy(projectile.mass, speed_squared);

    let mut reports = Vec::new();
    for hit in hits {
        let part = &mut ship.parts[hit.part];
        let roll: f64 = rng.gen();
        if roll > part.hit_chance || hit.damage_factor <= 0.0 {
            continue;
        }

        let damage = energy * hit.damage_factor * part.damage_multiplier;
        let report = part.apply_damage(damage, ArmorTier::Kinetic);
        projectile.penetration -= damage;
        reports.push(HitReport {
            part: hit.part,
            damage,
            report,
        });
        debug!(
            ship = %ship.name,
            part = hit.part,
            damage,
            absorbed = report.absorbed,
            "hit"
        );

        let point = ship.state.pos + rotate(hit.point, ship.rot);
        if projectile.penetration <= 0.0 {
            projectile.state.pos = point;
            projectile.state.vel = ship.state.vel;
            return RaycastOutcome::Consumed {
                point,
                hits: reports,
            };
        }

        if part.part_type() != PartType::Radiator {
            let p = ricochet_probability(
                hit.damage_factor,
                projectile.mass,
                speed_squared,
                projectile.penetration,
            );
            if rng.gen::<f64>() < p {
                let normal = rotate(hit.normal, ship.rot);
                let reflected = rel_vel - normal * (2.0 * rel_vel.dot(&normal));
                projectile.state.vel = ship.state.vel + reflected;
                projectile.state.pos = point;
                projectile.state.last_pos = point;
                debug!(ship = %ship.name, part = hit.part, "ricochet");
                return RaycastOutcome::Ricocheted {
                    point,
                    hits: reports,
                };
            }
        }
    }

    if reports.is_empty() {
        RaycastOutcome::Missed
    } else {
        RaycastOutcome::Passed { hits: reports }
    }
}

#[cfg(test)]
mod tests {
    use rand::{
        rngs::{mock::StepRng, StdRng},
        SeedableRng,
    };

    use super::*;
    use crate::{
        bodies::BodyId,
        integrator::ObjectState,
        part::{Footprint, PartParams},
        weapon::ProjectileTemplate,
    };

    fn hull(pos: [f64; 2], size: [f64; 3], tiers: [u8; 3]) -> Part {
        Part::hull(PartParams::new(
            PartType::Hull,
            Vector2::from(pos),
            Footprint::new(size).unwrap(),
            tiers,
        ))
    }

    fn ship(parts: Vec<Part>) -> Ship {
        Ship::new(
            "Target".into(),
            "Enemies".into(),
            BodyId::default(),
            Vector2::zeros(),
            Vector2::zeros(),
            0.0,
            1000.0,
            parts,
        )
    }

    fn projectile(from: Vector2<f64>, to: Vector2<f64>, vel: Vector2<f64>, mass: f64, penetration: f64) -> Projectile {
        let template = ProjectileTemplate {
            mass,
            penetration,
            color: "#ffffff".into(),
            lifetime: 3600.0,
        };
        let mut p = Projectile::from_template(&template, "Allies".into(), to, vel, BodyId::default(), 0.0);
        p.state = ObjectState { last_pos: from, ..p.state };
        p
    }

    #[test]
    fn crossing_segments() {
        let hit = segment_intersection(
            &Vector2::new(0.0, 0.0),
            &Vector2::new(2.0, 2.0),
            &Vector2::new(0.0, 2.0),
            &Vector2::new(2.0, 0.0),
        );
        assert_eq!(hit, Some(Vector2::new(1.0, 1.0)));

        let miss = segment_intersection(
            &Vector2::new(0.0, 0.0),
            &Vector2::new(1.0, 0.0),
            &Vector2::new(2.0, -1.0),
            &Vector2::new(2.0, 1.0),
        );
        assert_eq!(miss, None);
    }

    #[test]
    fn touching_and_collinear_segments() {
        // Endpoint resting on the other segment
        let touch = segment_intersection(
            &Vector2::new(0.0, 0.0),
            &Vector2::new(1.0, 0.0),
            &Vector2::new(1.0, -1.0),
            &Vector2::new(1.0, 1.0),
        );
        assert_eq!(touch, Some(Vector2::new(1.0, 0.0)));

        // Overlap resolves to the point nearest the start
        let overlap = segment_intersection(
            &Vector2::new(5.0, 0.0),
            &Vector2::new(-5.0, 0.0),
            &Vector2::new(-1.0, 0.0),
            &Vector2::new(2.0, 0.0),
        );
        assert_eq!(overlap, Some(Vector2::new(2.0, 0.0)));

        let apart = segment_intersection(
            &Vector2::new(0.0, 0.0),
            &Vector2::new(1.0, 0.0),
            &Vector2::new(2.0, 0.0),
            &Vector2::new(3.0, 0.0),
        );
        assert_eq!(apart, None);
    }

    #[test]
    fn vertical_path_is_handled() {
        let parts = vec![hull([0.0, 0.0], [10.0, 10.0, 10.0], [0; 3])];
        let hits = find_hits(&parts, &Vector2::new(1.0, 20.0), &Vector2::new(1.0, -20.0));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].edge, EdgeSide::Left);
        assert_eq!(hits[0].point, Vector2::new(1.0, 5.0));
        assert!((hits[0].damage_factor - 1.0).abs() < 1e-12);
        assert_eq!(hits[1].edge, EdgeSide::Right);
        assert!(hits[1].damage_factor < 0.0);
        for hit in &hits {
            assert!(hit.point.iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn zero_length_path_hits_nothing() {
        let parts = vec![hull([0.0, 0.0], [10.0, 10.0, 10.0], [0; 3])];
        let p = Vector2::new(5.0, 0.0);
        assert!(find_hits(&parts, &p, &p).is_empty());
    }

    #[test]
    fn hits_are_ordered_by_distance() {
        let parts = vec![
            hull([-30.0, 0.0], [10.0, 10.0, 10.0], [0; 3]),
            hull([30.0, 0.0], [4.0, 8.0, 10.0], [0; 3]),
            hull([0.0, 0.0], [10.0, 10.0, 10.0], [0; 3]),
        ];
        let start = Vector2::new(100.0, 1.0);
        let end = Vector2::new(-100.0, -1.0);
        let hits = find_hits(&parts, &start, &end);
        assert_eq!(hits.len(), 6);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        let order: Vec<_> = hits.iter().map(|h| h.part).collect();
        assert_eq!(order, vec![1, 1, 2, 2, 0, 0]);
        assert_eq!(find_hits(&parts, &start, &end), hits);

        // Two parts sharing an edge tie, and keep their part order
        let parts = vec![
            hull([5.0, 0.0], [10.0, 10.0, 10.0], [0; 3]),
            hull([-5.0, 0.0], [10.0, 10.0, 10.0], [0; 3]),
        ];
        let hits = find_hits(&parts, &Vector2::new(20.0, 0.0), &Vector2::new(-20.0, 0.0));
        let order: Vec<_> = hits.iter().map(|h| (h.part, h.edge)).collect();
        assert_eq!(
            order,
            vec![
                (0, EdgeSide::Front),
                (0, EdgeSide::Rear),
                (1, EdgeSide::Front),
                (1, EdgeSide::Rear)
            ]
        );
    }

    #[test]
    fn radiators_take_hits_from_behind() {
        let radiator = Part::radiator(
            PartParams::new(
                PartType::Radiator,
                Vector2::zeros(),
                Footprint::new([20.0, 20.0, 8.0]).unwrap(),
                [0; 3],
            ),
            0.2,
        );
        let hits = find_hits(&[radiator], &Vector2::new(-20.0, 0.0), &Vector2::new(20.0, 0.0));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| (h.damage_factor - 1.0).abs() < 1e-12));
    }

    #[test]
    fn heavy_round_is_consumed_on_first_hit() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut target = ship(vec![hull([0.0, 0.0], [20.0, 20.0, 10.0], [4, 0, 0])]);
        let max_health = target.parts[0].max_health;
        let max_armor = target.parts[0].max_armor[0];
        assert_eq!(max_health, 100.0 * 200.0);
        assert!((target.parts[0].reduction[0] - 0.8).abs() < 1e-12);

        let mut round = projectile(
            Vector2::new(100.0, 0.0),
            Vector2::new(-100.0, 0.0),
            Vector2::new(-1500.0, 0.0),
            0.05,
            10.0,
        );
        let outcome = raycast(&mut round, &mut target, &mut rng);

        let RaycastOutcome::Consumed { point, hits } = outcome else {
            panic!("expected the round to be consumed, got {outcome:?}");
        };
        assert_eq!(point, Vector2::new(5.0, 0.0));
        assert_eq!(hits.len(), 1);
        assert!((hits[0].damage - 56.25).abs() < 1e-9);
        assert!((max_health - target.parts[0].health - 11.25).abs() < 1e-9);
        assert!((max_armor - target.parts[0].armor[0] - 45.0).abs() < 1e-9);
        assert!((round.penetration - (10.0 - 56.25)).abs() < 1e-9);
        assert!(round.is_spent());
    }

    #[test]
    fn penetration_budget_limits_damage() {
        let mut rng = StdRng::seed_from_u64(3);
        let parts = (0..10)
            .map(|i| hull([-20.0 * f64::from(i), 0.0], [10.0, 10.0, 10.0], [0; 3]))
            .collect();
        let mut target = ship(parts);
        let mut round = projectile(
            Vector2::new(50.0, 0.0),
            Vector2::new(-300.0, 0.0),
            Vector2::new(-100.0, 0.0),
            0.05,
            2.0,
        );
        let outcome = raycast(&mut round, &mut target, &mut rng);
        assert!(matches!(outcome, RaycastOutcome::Consumed { .. }));
        // Each hit deals 0.25; all but the last fit inside the budget
        let dealt: f64 = outcome.hits().iter().map(|h| h.damage).sum();
        assert!(dealt - outcome.hits().last().unwrap().damage < 2.0);
        assert_eq!(outcome.hits().len(), 8);
    }

    #[test]
    fn grazing_hit_ricochets() {
        let mut target = ship(vec![hull([0.0, 0.0], [20.0, 20.0, 10.0], [0; 3])]);
        // Every roll comes up zero, so the hit lands and the bounce happens
        let mut rng = StepRng::new(0, 0);
        // Nearly parallel to the front edge, slow and light
        let dir = Vector2::new(-0.001, 1.0).normalize();
        let at = Vector2::new(5.0, 0.0);
        let mut round = projectile(at - dir * 50.0, at + dir * 50.0, dir * 10.0, 0.01, 1.0);

        let outcome = raycast(&mut round, &mut target, &mut rng);
        let RaycastOutcome::Ricocheted { point, hits } = outcome else {
            panic!("expected a ricochet, got {outcome:?}");
        };
        assert_eq!(hits.len(), 1);
        assert!((point - at).norm() < 1e-9);
        assert!(round.state.vel[0] > 0.0);
        assert!((round.state.vel.norm() - 10.0).abs() < 1e-9);
        assert_eq!(round.state.last_pos, round.state.pos);
    }

    #[test]
    fn ricochet_probability_shape() {
        assert_eq!(ricochet_probability(1.0, 1.0, 1e6, 10.0), 0.0);
        assert_eq!(ricochet_probability(0.0, 1.0, 1e6, 10.0), 1.0);
        let light = ricochet_probability(0.3, 0.01, 100.0, 1.0);
        let heavy = ricochet_probability(0.3, 1.0, 1e6, 100.0);
        assert!(light > heavy);
        assert!((light - 0.7_f64.powf(2.0 + 1e-5)).abs() < 1e-12);
    }

    #[test]
    fn hits_follow_ship_rotation() {
        // A ship turned a quarter turn sees the round arrive on its front
        let mut rng = StdRng::seed_from_u64(0);
        let mut target = ship(vec![hull([0.0, 0.0], [20.0, 20.0, 10.0], [0; 3])]);
        target.rot = std::f64::consts::FRAC_PI_2;
        target.last_rot = target.rot;
        let mut round = projectile(
            Vector2::new(0.0, 100.0),
            Vector2::new(0.0, -100.0),
            Vector2::new(0.0, -1500.0),
            0.05,
            10.0,
        );
        let RaycastOutcome::Consumed { point, .. } = raycast(&mut round, &mut target, &mut rng) else {
            panic!("expected a hit");
        };
        assert!((point - Vector2::new(0.0, 5.0)).norm() < 1e-9);
    }
}
