//! Energy, gradient and Hessian assembly.
//!
//! [`SystemObjective`] sums the terms of one implicit-Euler step:
//!
//! ```text
//! E(x) = Σ m/(2h²)‖x − x₀ − h·v‖²      (kinetic, optional)
//!      + Σ mᵢ g zᵢ                     (gravity)
//!      + Σ kₛ/2 (‖pₛ − qₛ‖ − Lₛ)²       (springs)
//!      + ½ k_fix Σ_fixed ‖xᵢ − x̄ᵢ‖²     (fixed-point penalty, Newton only)
//! ```
//!
//! The spring gradient is gathered per point through the
//! `springs_connected_to` adjacency; the Hessian scatters one 6×6 block per
//! spring.
//!
//! Also assembles the constant Projective Dynamics system matrix
//! `M/h² + Σ kₛ Sₛᵀ Aᵀ A Sₛ` and its right-hand side.

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use tensio_math::{Matrix, Vector};
use tensio_types::{TensioError, TensioResult};

use crate::descent::Objective;
use crate::gravity;
use crate::kinetic;
use crate::penalty::FixedPointPenalty;
use crate::spring::SpringData;

/// Inertial reference of a step: previous positions and velocities.
#[derive(Debug, Clone, Copy)]
pub struct Inertia<'a> {
    pub previous: &'a Vector,
    pub velocities: &'a Vector,
}

/// Total energy of a step, borrowed from the simulator's buffers.
#[derive(Debug, Clone, Copy)]
pub struct SystemObjective<'a> {
    pub springs: &'a [SpringData],
    pub springs_connected_to: &'a [Vec<usize>],
    pub mass3: &'a Vector,
    pub timestep: f64,
    pub gravity: f64,
    pub inertia: Option<Inertia<'a>>,
    pub penalty: Option<FixedPointPenalty<'a>>,
}

/// Energy split by term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyBreakdown {
    pub kinetic: f64,
    pub gravity: f64,
    pub elastic: f64,
    pub penalty: f64,
}

impl EnergyBreakdown {
    pub fn total(&self) -> f64 {
        self.kinetic + self.gravity + self.elastic + self.penalty
    }
}

fn add_block(hessian: &mut Matrix, row: usize, col: usize, block: &DMat3, sign: f64) {
    for c in 0..3 {
        let column = block.col(c);
        for r in 0..3 {
            hessian.add_at(row + r, col + c, sign * column[r]);
        }
    }
}

/// Total spring energy at `x`.
pub fn elastic_energy(springs: &[SpringData], x: &Vector) -> f64 {
    springs
        .iter()
        .map(|s| s.energy(x.block3(s.origin.index()), x.block3(s.end.index())))
        .sum()
}

impl SystemObjective<'_> {
    fn check(&self, x: &Vector) -> TensioResult<()> {
        if x.len() != self.mass3.len() {
            return Err(TensioError::shape("system_objective", x.shape(), self.mass3.shape()));
        }
        Ok(())
    }
}

impl Objective for SystemObjective<'_> {
    fn energy(&self, x: &Vector) -> TensioResult<f64> {
        self.check(x)?;
        let mut energy = gravity::energy(x, self.mass3, self.gravity) + elastic_energy(self.springs, x);
        if let Some(inertia) = self.inertia {
            energy += kinetic::energy_gain(x, inertia.previous, inertia.velocities, self.timestep, self.mass3)?;
        }
        if let Some(penalty) = self.penalty {
            energy += penalty.energy(x);
        }
        Ok(energy)
    }

    fn gradient(&self, x: &Vector) -> TensioResult<Vector> {
        self.check(x)?;
        let mut gradient = match self.inertia {
            Some(inertia) => {
                kinetic::gradient(x, inertia.previous, inertia.velocities, self.timestep, self.mass3)?
            }
            None => Vector::zeros(x.len()),
        };
        gravity::add_gradient(&mut gradient, self.mass3, self.gravity);

        for (i, connected) in self.springs_connected_to.iter().enumerate() {
            let mut g = DVec3::ZERO;
            for &s in connected {
                let spring = &self.springs[s];
                let p = x.block3(spring.origin.index());
                let q = x.block3(spring.end.index());
                g += spring.gradient_at(i.into(), p, q);
            }
            gradient.add_block3(i, g);
        }

        if let Some(penalty) = self.penalty {
            penalty.add_gradient(x, &mut gradient);
        }
        Ok(gradient)
    }

    fn hessian(&self, x: &Vector) -> TensioResult<Matrix> {
        self.check(x)?;
        let n = x.len();
        let mut hessian = Matrix::zeros(n, n);
        if self.inertia.is_some() {
            kinetic::add_hessian(&mut hessian, self.timestep, self.mass3)?;
        }

        for spring in self.springs {
            let (a, b) = (spring.origin.offset(), spring.end.offset());
            let k = spring.hessian_block(x.block3(spring.origin.index()), x.block3(spring.end.index()));
            add_block(&mut hessian, a, a, &k, 1.0);
            add_block(&mut hessian, b, b, &k, 1.0);
            add_block(&mut hessian, a, b, &k, -1.0);
            add_block(&mut hessian, b, a, &k, -1.0);
        }

        if let Some(penalty) = self.penalty {
            penalty.add_hessian(&mut hessian);
        }
        Ok(hessian)
    }
}

/// Builds `springs_connected_to`: every spring index touching each point.
pub fn springs_connected_to(point_count: usize, springs: &[SpringData]) -> Vec<Vec<usize>> {
    let mut connected = vec![Vec::new(); point_count];
    for (s, spring) in springs.iter().enumerate() {
        connected[spring.origin.index()].push(s);
        connected[spring.end.index()].push(s);
    }
    connected
}

/// Assemble the Projective Dynamics system matrix `M/h² + Σ kₛ SₛᵀAᵀASₛ`.
///
/// For a spring `A·Sₛ` selects `p − q`, so each spring adds `kₛ·I₃` to both
/// diagonal blocks and `−kₛ·I₃` to both off-diagonal blocks. The matrix is
/// constant while masses, stiffnesses and the timestep are.
pub fn assemble_projective_system(mass3: &Vector, springs: &[SpringData], dt: f64) -> Matrix {
    let n = mass3.len();
    let inv_dt2 = 1.0 / (dt * dt);
    let mut system = Matrix::zeros(n, n);
    for (i, &m) in mass3.as_slice().iter().enumerate() {
        system.add_at(i, i, m * inv_dt2);
    }
    for spring in springs {
        let (a, b) = (spring.origin.offset(), spring.end.offset());
        let k = spring.spring_constant;
        for axis in 0..3 {
            system.add_at(a + axis, a + axis, k);
            system.add_at(b + axis, b + axis, k);
            system.add_at(a + axis, b + axis, -k);
            system.add_at(b + axis, a + axis, -k);
        }
    }
    system
}

/// Assemble the right-hand side `M/h²·y + f_ext + Σ kₛ SₛᵀAᵀ dₛ`.
///
/// `targets[s]` is the projected edge vector `dₛ` of spring `s`.
pub fn assemble_projective_rhs(
    mass3: &Vector,
    dt: f64,
    predicted: &Vector,
    external: &Vector,
    springs: &[SpringData],
    targets: &[DVec3],
) -> TensioResult<Vector> {
    if predicted.len() != mass3.len() || external.len() != mass3.len() {
        return Err(TensioError::shape("projective_rhs", predicted.shape(), mass3.shape()));
    }
    let inv_dt2 = 1.0 / (dt * dt);
    let mut rhs = external.clone();
    for i in 0..rhs.len() {
        rhs[i] += mass3[i] * inv_dt2 * predicted[i];
    }
    for (spring, &d) in springs.iter().zip(targets) {
        let scaled = d * spring.spring_constant;
        rhs.add_block3(spring.origin.index(), scaled);
        rhs.add_block3(spring.end.index(), -scaled);
    }
    Ok(rhs)
}
