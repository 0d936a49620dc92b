//! Hookean springs.
//!
//! Energy `E = k/2 (ℓ − L)²` with `ℓ = ‖p − q‖`. With `d = p − q` and
//! `d̂ = d/ℓ`:
//!
//! ```text
//! ∂E/∂p = k (ℓ − L) d̂          ∂E/∂q = −∂E/∂p
//! K     = k [(1 − L/ℓ) I + (L/ℓ) d̂ d̂ᵀ]
//! H     = [ K  −K ]
//!         [ −K  K ]
//! ```
//!
//! `K` is exact away from the rest length (it keeps the `1 − L/ℓ` term),
//! so it is indefinite under compression. Coincident endpoints give a zero
//! gradient and `K = k·I`.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use tensio_types::constants::EPSILON;
use tensio_types::PointId;

/// An immutable spring between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringData {
    pub origin: PointId,
    pub end: PointId,
    pub rest_length: f64,
    pub spring_constant: f64,
}

impl SpringData {
    pub fn new(origin: PointId, end: PointId, rest_length: f64, spring_constant: f64) -> Self {
        Self {
            origin,
            end,
            rest_length,
            spring_constant,
        }
    }

    /// Energy with endpoints at `p` (origin) and `q` (end).
    pub fn energy(&self, p: DVec3, q: DVec3) -> f64 {
        energy(p, q, self.rest_length, self.spring_constant)
    }

    /// Gradient with respect to the origin; the end's is its negation.
    pub fn gradient(&self, p: DVec3, q: DVec3) -> DVec3 {
        gradient(p, q, self.rest_length, self.spring_constant)
    }

    /// 3×3 stiffness block `K`.
    pub fn hessian_block(&self, p: DVec3, q: DVec3) -> DMat3 {
        hessian_block(p, q, self.rest_length, self.spring_constant)
    }

    /// Gradient with respect to `point`, which must be one of the endpoints.
    pub fn gradient_at(&self, point: PointId, p: DVec3, q: DVec3) -> DVec3 {
        let g = self.gradient(p, q);
        if point == self.origin {
            g
        } else {
            -g
        }
    }

    /// Closest configuration of `d = p − q` at rest length, keeping its direction.
    ///
    /// Coincident endpoints project to zero.
    pub fn project(&self, p: DVec3, q: DVec3) -> DVec3 {
        let d = p - q;
        let length = d.length();
        if length < EPSILON {
            DVec3::ZERO
        } else {
            d * (self.rest_length / length)
        }
    }
}

pub fn energy(p: DVec3, q: DVec3, rest_length: f64, k: f64) -> f64 {
    let stretch = p.distance(q) - rest_length;
    0.5 * k * stretch * stretch
}

pub fn gradient(p: DVec3, q: DVec3, rest_length: f64, k: f64) -> DVec3 {
    let d = p - q;
    let length = d.length();
    if length < EPSILON {
        return DVec3::ZERO;
    }
    d * (k * (length - rest_length) / length)
}

pub fn hessian_block(p: DVec3, q: DVec3, rest_length: f64, k: f64) -> DMat3 {
    let d = p - q;
    let length = d.length();
    if length < EPSILON {
        return DMat3::from_diagonal(DVec3::splat(k));
    }
    let dir = d / length;
    let ratio = rest_length / length;
    let outer = DMat3::from_cols(dir * dir.x, dir * dir.y, dir * dir.z);
    (DMat3::IDENTITY * (1.0 - ratio) + outer * ratio) * k
}
