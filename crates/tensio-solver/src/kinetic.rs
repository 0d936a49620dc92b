//! Inertial term of the implicit-Euler energy.
//!
//! `E = Σ m/(2h²) (x − x₀ − h·v)²` over every degree of freedom, with the
//! mass replicated per axis. Its Hessian is the constant diagonal `M/h²`.

use tensio_math::{Matrix, Vector};
use tensio_types::{TensioError, TensioResult};

fn check(x: &Vector, x0: &Vector, v: &Vector, mass3: &Vector) -> TensioResult<()> {
    for other in [x0, v, mass3] {
        if other.len() != x.len() {
            return Err(TensioError::shape("kinetic", x.shape(), other.shape()));
        }
    }
    Ok(())
}

/// Energy gained relative to the inertial prediction `x₀ + h·v`.
pub fn energy_gain(x: &Vector, x0: &Vector, v: &Vector, h: f64, mass3: &Vector) -> TensioResult<f64> {
    check(x, x0, v, mass3)?;
    let inv_h2 = 1.0 / (h * h);
    Ok((0..x.len())
        .map(|i| {
            let r = x[i] - x0[i] - h * v[i];
            0.5 * mass3[i] * inv_h2 * r * r
        })
        .sum())
}

pub fn gradient(x: &Vector, x0: &Vector, v: &Vector, h: f64, mass3: &Vector) -> TensioResult<Vector> {
    check(x, x0, v, mass3)?;
    let inv_h2 = 1.0 / (h * h);
    Ok(Vector::from_vec(
        (0..x.len())
            .map(|i| mass3[i] * inv_h2 * (x[i] - x0[i] - h * v[i]))
            .collect(),
    ))
}

/// Adds `M/h²` to the diagonal of `hessian`.
pub fn add_hessian(hessian: &mut Matrix, h: f64, mass3: &Vector) -> TensioResult<()> {
    if hessian.height() != mass3.len() || !hessian.is_square() {
        return Err(TensioError::shape("kinetic_hessian", hessian.shape(), mass3.shape()));
    }
    let inv_h2 = 1.0 / (h * h);
    for (i, &m) in mass3.as_slice().iter().enumerate() {
        hessian.add_at(i, i, m * inv_h2);
    }
    Ok(())
}

/// Physical kinetic energy `½ Σ m v²`.
pub fn kinetic_energy(v: &Vector, mass3: &Vector) -> f64 {
    v.as_slice()
        .iter()
        .zip(mass3.as_slice())
        .map(|(v, m)| 0.5 * m * v * v)
        .sum()
}
