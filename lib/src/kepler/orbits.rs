//! Planar Keplerian orbits.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::math::{self, TAU};

/// Newton's gravitational constant (`m^3 kg^-1 s^-2`).
pub const G: f64 = 6.67430e-11;

/// Eccentricities this close to one are treated as parabolic.
pub const PARABOLIC_TOLERANCE: f64 = 1e-8;

const ANOMALY_TOLERANCE: f64 = 1e-12;
const ANOMALY_MAXITER: u64 = 100;

/// Sense of travel along the conic.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Counterclockwise, positive specific angular momentum.
    #[default]
    Prograde,
    /// Clockwise.
    Retrograde,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Prograde => 1.0,
            Direction::Retrograde => -1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Conic {
    Elliptic,
    Parabolic,
    Hyperbolic,
}

/// A planar Keplerian orbit.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    /// Semi-major axis (m). Negative for hyperbolae, infinite for
    /// parabolae.
    pub sma: f64,
    /// Eccentricity (dimensionless).
    pub e: f64,
    /// Argument of periapsis (radians).
    pub arg: f64,
    /// Mean anomaly at epoch (radians).
    pub mna: f64,
    /// Epoch of the mean anomaly (s).
    pub epoch: f64,
    pub direction: Direction,
    /// Semi-latus rectum (m).
    pub p: f64,
}

impl Orbit {
    /// A prograde closed or hyperbolic orbit from its classical elements.
    pub fn new(sma: f64, e: f64, arg: f64, mna: f64, epoch: f64) -> Self {
        Self {
            sma,
            e,
            arg,
            mna,
            epoch,
            direction: Direction::Prograde,
            p: sma * (1.0 - e * e),
        }
    }

    pub fn conic(&self) -> Conic {
        if self.sma.is_infinite() {
            Conic::Parabolic
        } else if self.e < 1.0 {
            Conic::Elliptic
        } else {
            Conic::Hyperbolic
        }
    }

    pub fn periapsis(&self) -> f64 {
        self.p / (1.0 + self.e)
    }

    pub fn apoapsis(&self) -> f64 {
        match self.conic() {
            Conic::Elliptic => self.p / (1.0 - self.e),
            Conic::Parabolic | Conic::Hyperbolic => f64::INFINITY,
        }
    }

    /// Orbital period (s), closed orbits only.
    pub fn period(&self, mu: f64) -> Option<f64> {
        match self.conic() {
            Conic::Elliptic => Some(TAU * libm::sqrt(self.sma.powi(3) / mu)),
            Conic::Parabolic | Conic::Hyperbolic => None,
        }
    }

    /// Mean motion (rad/s), signed by the direction of travel.
    pub fn mean_motion(&self, mu: f64) -> f64 {
        let n = match self.conic() {
            Conic::Elliptic => libm::sqrt(mu / self.sma.powi(3)),
            Conic::Hyperbolic => libm::sqrt(mu / (-self.sma).powi(3)),
            // Barker's equation in the form M = D + D^3/3
            Conic::Parabolic => 2.0 * libm::sqrt(mu / self.p.powi(3)),
        };
        self.direction.sign() * n
    }

    pub fn mean_anomaly_at(&self, mu: f64, time: f64) -> f64 {
        self.mna + self.mean_motion(mu) * (time - self.epoch)
    }

    /// Derive an orbit from a position and velocity relative to the
    /// central body.
    pub fn from_state_vectors(
        pos: Vector2<f64>,
        vel: Vector2<f64>,
        mu: f64,
        epoch: f64,
    ) -> Self {
        let r = pos.norm();
        let v2 = vel.norm_squared();
        let dot_rv = pos.dot(&vel);
        let h = math::cross(&pos, &vel);

        let ev = ((v2 - mu / r) * pos - dot_rv * vel) / mu;
        let e = ev.norm();
        let energy = v2 / 2.0 - mu / r;

        let sma = if (e - 1.0).abs() < PARABOLIC_TOLERANCE {
            f64::INFINITY
        } else {
            -mu / (2.0 * energy)
        };
        let p = h * h / mu;
        let arg = libm::atan2(ev[1], ev[0]);
        let ta = math::wrap_angle(libm::atan2(pos[1], pos[0]) - arg);

        let direction = if h < 0.0 {
            Direction::Retrograde
        } else {
            Direction::Prograde
        };

        let mut orbit = Self {
            sma,
            e,
            arg,
            mna: 0.0,
            epoch,
            direction,
            p,
        };
        orbit.mna = orbit.mean_anomaly_from_true_anomaly(ta);
        orbit
    }

    /// Mean anomaly corresponding to a true anomaly on this conic.
    /// Closed orbits are normalized to `[0, 2π)`.
    pub fn mean_anomaly_from_true_anomaly(&self, ta: f64) -> f64 {
        let e = self.e;
        match self.conic() {
            Conic::Elliptic => {
                let ea = libm::atan2(
                    libm::sqrt(1.0 - e * e) * libm::sin(ta),
                    e + libm::cos(ta),
                );
                math::wrap_angle(ea - e * libm::sin(ea))
            }
            Conic::Hyperbolic => {
                let x = libm::sqrt((e - 1.0) / (e + 1.0)) * libm::tan(ta / 2.0);
                let ha = 2.0 * libm::atanh(x.clamp(-1.0 + f64::EPSILON, 1.0 - f64::EPSILON));
                e * libm::sinh(ha) - ha
            }
            Conic::Parabolic => {
                let d = libm::tan(ta / 2.0);
                d + d.powi(3) / 3.0
            }
        }
    }

    /// Position and velocity relative to the central body at `time`.
    pub fn state_vectors(&self, mu: f64, time: f64) -> (Vector2<f64>, Vector2<f64>) {
        let ma = self.mean_anomaly_at(mu, time);
        let sign = self.direction.sign();
        let e = self.e;
        match self.conic() {
            Conic::Elliptic => {
                let ea = solve_eccentric_anomaly(ma, e);
                let (sin_ea, cos_ea) = libm::sincos(ea);
                let sqrt_one_minus_e2 = libm::sqrt(1.0 - e * e);
                let ta = libm::atan2(sqrt_one_minus_e2 * sin_ea, cos_ea - e);
                let r = self.sma * (1.0 - e * cos_ea);

                let pos = math::from_polar(r, ta + self.arg);
                let k = libm::sqrt(mu * self.sma) / r;
                let vel = math::rotate(
                    Vector2::new(-k * sin_ea, k * sqrt_one_minus_e2 * cos_ea),
                    self.arg,
                );
                (pos, sign * vel)
            }
            Conic::Hyperbolic => {
                let ha = solve_eccentric_anomaly(ma, e);
                let ta = libm::atan2(
                    libm::sqrt(e * e - 1.0) * libm::sinh(ha),
                    e - libm::cosh(ha),
                );
                let pos = math::from_polar(self.sma * (1.0 - e * libm::cosh(ha)), ta + self.arg);
                (pos, self.velocity_at_true_anomaly(mu, ta))
            }
            Conic::Parabolic => {
                let d = solve_parabolic_anomaly(ma);
                let ta = 2.0 * libm::atan(d);
                let pos = math::from_polar(self.p * (1.0 + d * d) / 2.0, ta + self.arg);
                (pos, self.velocity_at_true_anomaly(mu, ta))
            }
        }
    }

    pub fn position_at(&self, mu: f64, time: f64) -> Vector2<f64> {
        self.state_vectors(mu, time).0
    }

    pub fn velocity_at(&self, mu: f64, time: f64) -> Vector2<f64> {
        self.state_vectors(mu, time).1
    }

    pub fn radius_at_true_anomaly(&self, ta: f64) -> f64 {
        self.p / (1.0 + self.e * libm::cos(ta))
    }

    pub fn position_at_true_anomaly(&self, ta: f64) -> Vector2<f64> {
        math::from_polar(self.radius_at_true_anomaly(ta), ta + self.arg)
    }

    /// Velocity at a true anomaly, in the same frame as
    /// [`Self::position_at_true_anomaly`].
    pub fn velocity_at_true_anomaly(&self, mu: f64, ta: f64) -> Vector2<f64> {
        let k = libm::sqrt(mu / self.p);
        let (sin_ta, cos_ta) = libm::sincos(ta);
        let vr = k * self.e * sin_ta;
        let vtheta = k * (1.0 + self.e * cos_ta);
        let vel = Vector2::new(vr * cos_ta - vtheta * sin_ta, vr * sin_ta + vtheta * cos_ta);
        self.direction.sign() * math::rotate(vel, self.arg)
    }

    /// True anomaly (radians, `(-π, π]`) at `time`.
    pub fn true_anomaly_at(&self, mu: f64, time: f64) -> f64 {
        let ma = self.mean_anomaly_at(mu, time);
        let e = self.e;
        match self.conic() {
            Conic::Elliptic => {
                let ea = solve_eccentric_anomaly(math::wrap_angle(ma), e);
                libm::atan2(libm::sqrt(1.0 - e * e) * libm::sin(ea), libm::cos(ea) - e)
            }
            Conic::Hyperbolic => {
                let ha = solve_eccentric_anomaly(ma, e);
                libm::atan2(
                    libm::sqrt(e * e - 1.0) * libm::sinh(ha),
                    e - libm::cosh(ha),
                )
            }
            Conic::Parabolic => 2.0 * libm::atan(solve_parabolic_anomaly(ma)),
        }
    }

    /// Time at which the orbiting object passes true anomaly `ta`.
    ///
    /// Closed orbits pass every anomaly once per period, so the first
    /// passage at or after `after` is returned. Open orbits have a single
    /// passage, which may precede `after`.
    pub fn time_at_true_anomaly(&self, mu: f64, ta: f64, after: f64) -> f64 {
        let ma = self.mean_anomaly_from_true_anomaly(ta);
        let n = self.mean_motion(mu);
        match self.conic() {
            Conic::Elliptic => {
                let ma_after = self.mean_anomaly_at(mu, after);
                let dma = math::wrap_angle((ma - ma_after) * self.direction.sign());
                after + dma / n.abs()
            }
            Conic::Parabolic | Conic::Hyperbolic => self.epoch + (ma - self.mna) / n,
        }
    }
}

/// Specific orbital energy of a state relative to a body (`J/kg`).
pub fn specific_energy(pos: &Vector2<f64>, vel: &Vector2<f64>, mu: f64) -> f64 {
    vel.norm_squared() / 2.0 - mu / pos.norm()
}

/// Solve Kepler's equation for the eccentric anomaly, or for the
/// hyperbolic anomaly when `e >= 1`.
pub fn solve_eccentric_anomaly(ma: f64, e: f64) -> f64 {
    if e < 0.8 {
        let mut ea = ma;
        for _ in 0..ANOMALY_MAXITER {
            let f = ea - e * libm::sin(ea) - ma;
            let fprime = 1.0 - e * libm::cos(ea);
            let dea = -f / fprime;
            ea += dea;
            if dea.abs() < ANOMALY_TOLERANCE {
                break;
            }
        }
        ea
    } else if e < 1.0 {
        // Newton-Raphson is badly conditioned near periapsis here
        let ma = math::wrap_angle(ma);
        math::bisect(
            |ea| ea - e * libm::sin(ea),
            0.0,
            TAU,
            ma,
            ANOMALY_TOLERANCE,
            ANOMALY_MAXITER,
        )
    } else {
        let mut ha = libm::log(2.0 * ma.abs() / e + 1.8);
        for _ in 0..ANOMALY_MAXITER {
            let f = e * libm::sinh(ha) - ha - ma;
            let fprime = e * libm::cosh(ha) - 1.0;
            let dha = -f / fprime;
            ha += dha;
            if dha.abs() < ANOMALY_TOLERANCE {
                break;
            }
        }
        ha
    }
}

/// Solve Barker's equation `M = D + D^3/3` for `D = tan(ν/2)`.
pub fn solve_parabolic_anomaly(ma: f64) -> f64 {
    if ma < 0.0 {
        return -solve_parabolic_anomaly(-ma);
    }
    let w = 1.5 * ma;
    let y = libm::cbrt(w + libm::sqrt(w * w + 1.0));
    y - 1.0 / y
}
