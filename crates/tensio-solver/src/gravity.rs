//! Uniform gravity along −z.
//!
//! Potential `Σ mᵢ g zᵢ`. The gradient carries the same mass factor
//! (`mᵢ g` on each z component), so it is the exact derivative of the
//! potential. The Hessian is zero.

use tensio_math::Vector;

/// Gravitational potential of point-major positions.
pub fn energy(x: &Vector, mass3: &Vector, g: f64) -> f64 {
    (2..x.len()).step_by(3).map(|i| mass3[i] * g * x[i]).sum()
}

/// Adds the gravity gradient into `gradient`.
pub fn add_gradient(gradient: &mut Vector, mass3: &Vector, g: f64) {
    for i in (2..gradient.len()).step_by(3) {
        gradient[i] += mass3[i] * g;
    }
}

/// External force `−∇E`, used as the Projective Dynamics right-hand side.
pub fn force(mass3: &Vector, g: f64) -> Vector {
    let mut f = Vector::zeros(mass3.len());
    for i in (2..f.len()).step_by(3) {
        f[i] = -mass3[i] * g;
    }
    f
}
