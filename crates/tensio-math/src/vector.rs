//! Dense vector with an explicit orientation.
//!
//! A `Vector` is a flat buffer plus an [`Orientation`] tag. Row and column
//! vectors never get coerced into each other: elementwise operations
//! require the same orientation and the same length.
//!
//! Simulation state vectors are laid out point-major
//! (`[x0, y0, z0, x1, y1, z1, ...]`); the `*_block3` accessors read and write
//! one point as a `glam::DVec3`.

use std::ops::{Index, IndexMut};

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tensio_accel::AccelContext;
use tensio_types::{TensioError, TensioResult};

use crate::matrix::Matrix;

/// Whether a vector is an `n × 1` column or a `1 × n` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Column,
    Row,
}

/// A dense vector of `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    elements: Vec<f64>,
    orientation: Orientation,
}

impl Vector {
    /// Column vector of zeros.
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![0.0; len])
    }

    /// Column vector of ones.
    pub fn ones(len: usize) -> Self {
        Self::from_vec(vec![1.0; len])
    }

    /// Wraps a buffer as a column vector.
    pub fn from_vec(elements: Vec<f64>) -> Self {
        Self {
            elements,
            orientation: Orientation::Column,
        }
    }

    /// Copies a slice into a column vector.
    pub fn from_slice(elements: &[f64]) -> Self {
        Self::from_vec(elements.to_vec())
    }

    /// Flattens points into a column vector `[x0, y0, z0, x1, ...]`.
    pub fn from_points(points: &[DVec3]) -> Self {
        Self::from_vec(points.iter().flat_map(|p| p.to_array()).collect())
    }

    /// Reinterprets a single-row or single-column matrix.
    pub fn from_matrix(m: &Matrix) -> TensioResult<Self> {
        let orientation = if m.width() == 1 {
            Orientation::Column
        } else if m.height() == 1 {
            Orientation::Row
        } else {
            return Err(TensioError::shape("from_matrix", m.shape(), (m.height(), 1)));
        };
        Ok(Self {
            elements: m.elements().to_vec(),
            orientation,
        })
    }

    /// Returns the `n × 1` or `1 × n` matrix view of this vector.
    pub fn to_matrix(&self) -> Matrix {
        let (h, w) = self.shape();
        Matrix::from_raw(h, w, self.elements.clone())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Matrix shape `(height, width)` implied by the orientation.
    pub fn shape(&self) -> (usize, usize) {
        match self.orientation {
            Orientation::Column => (self.len(), 1),
            Orientation::Row => (1, self.len()),
        }
    }

    /// Same elements, opposite orientation.
    pub fn transpose(&self) -> Vector {
        let orientation = match self.orientation {
            Orientation::Column => Orientation::Row,
            Orientation::Row => Orientation::Column,
        };
        Self {
            elements: self.elements.clone(),
            orientation,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.elements
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.elements
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.elements
    }

    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.elements[i]
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: f64) {
        self.elements[i] = value;
    }

    /// Copies all elements from `other`, keeping this vector's orientation.
    pub fn copy_from(&mut self, other: &Vector) -> TensioResult<()> {
        if self.len() != other.len() {
            return Err(TensioError::shape("copy_from", self.shape(), other.shape()));
        }
        self.elements.copy_from_slice(&other.elements);
        Ok(())
    }

    fn check_compatible(&self, other: &Vector, operation: &'static str) -> TensioResult<()> {
        if self.shape() != other.shape() {
            return Err(TensioError::shape(operation, self.shape(), other.shape()));
        }
        Ok(())
    }

    /// `self += other`.
    pub fn add(&mut self, other: &Vector) -> TensioResult<&mut Self> {
        self.check_compatible(other, "add")?;
        for (a, b) in self.elements.iter_mut().zip(&other.elements) {
            *a += b;
        }
        Ok(self)
    }

    pub fn add_new(&self, other: &Vector) -> TensioResult<Vector> {
        let mut v = self.clone();
        v.add(other)?;
        Ok(v)
    }

    /// `self -= other`.
    pub fn subtract(&mut self, other: &Vector) -> TensioResult<&mut Self> {
        self.check_compatible(other, "subtract")?;
        for (a, b) in self.elements.iter_mut().zip(&other.elements) {
            *a -= b;
        }
        Ok(self)
    }

    pub fn subtract_new(&self, other: &Vector) -> TensioResult<Vector> {
        let mut v = self.clone();
        v.subtract(other)?;
        Ok(v)
    }

    /// `self *= scalar`.
    pub fn multiply_scalar(&mut self, scalar: f64) -> &mut Self {
        for a in &mut self.elements {
            *a *= scalar;
        }
        self
    }

    pub fn multiply_scalar_new(&self, scalar: f64) -> Vector {
        let mut v = self.clone();
        v.multiply_scalar(scalar);
        v
    }

    /// `self += scale * other` on the serial path.
    pub fn add_scaled(&mut self, other: &Vector, scale: f64) -> TensioResult<&mut Self> {
        self.check_compatible(other, "add_scaled")?;
        for (a, b) in self.elements.iter_mut().zip(&other.elements) {
            *a += scale * b;
        }
        Ok(self)
    }

    /// `self += scale * other`, dispatched through the acceleration context.
    pub fn add_scaled_with(
        &mut self,
        other: &Vector,
        scale: f64,
        accel: &AccelContext,
    ) -> TensioResult<&mut Self> {
        self.check_compatible(other, "add_scaled")?;
        accel
            .backend_for(self.len())
            .axpy_in_place(&mut self.elements, &other.elements, scale)?;
        Ok(self)
    }

    /// `self *= scale`, dispatched through the acceleration context.
    pub fn scale_with(&mut self, scale: f64, accel: &AccelContext) -> &mut Self {
        accel.backend_for(self.len()).scale(&mut self.elements, scale);
        self
    }

    /// Inner product. Orientation is ignored; lengths must match.
    pub fn dot(&self, other: &Vector) -> TensioResult<f64> {
        if self.len() != other.len() {
            return Err(TensioError::shape("dot", self.shape(), other.shape()));
        }
        Ok(self
            .elements
            .iter()
            .zip(&other.elements)
            .map(|(a, b)| a * b)
            .sum())
    }

    pub fn squared_norm(&self) -> f64 {
        self.elements.iter().map(|x| x * x).sum()
    }

    pub fn norm(&self) -> f64 {
        self.squared_norm().sqrt()
    }

    /// Scales to unit length. A zero vector is left unchanged.
    pub fn normalize(&mut self) -> &mut Self {
        let n = self.norm();
        if n > 0.0 {
            self.multiply_scalar(1.0 / n);
        }
        self
    }

    pub fn normalized(&self) -> Vector {
        let mut v = self.clone();
        v.normalize();
        v
    }

    /// Orthogonal projection of `self` onto the line spanned by `onto`.
    pub fn project_to(&self, onto: &Vector) -> TensioResult<Vector> {
        let denom = onto.squared_norm();
        if denom == 0.0 {
            return Ok(Vector {
                elements: vec![0.0; onto.len()],
                orientation: onto.orientation,
            });
        }
        let coefficient = self.dot(onto)? / denom;
        Ok(onto.multiply_scalar_new(coefficient))
    }

    /// `self · otherᵀ`, an `len × other.len` matrix.
    pub fn outer_product(&self, other: &Vector) -> Matrix {
        let mut out = Matrix::zeros(self.len(), other.len());
        for (i, &a) in self.elements.iter().enumerate() {
            for (j, &b) in other.elements.iter().enumerate() {
                out[(i, j)] = a * b;
            }
        }
        out
    }

    /// Point `i` of a point-major 3n vector.
    #[inline]
    pub fn block3(&self, i: usize) -> DVec3 {
        DVec3::new(
            self.elements[3 * i],
            self.elements[3 * i + 1],
            self.elements[3 * i + 2],
        )
    }

    #[inline]
    pub fn set_block3(&mut self, i: usize, value: DVec3) {
        self.elements[3 * i] = value.x;
        self.elements[3 * i + 1] = value.y;
        self.elements[3 * i + 2] = value.z;
    }

    #[inline]
    pub fn add_block3(&mut self, i: usize, value: DVec3) {
        self.elements[3 * i] += value.x;
        self.elements[3 * i + 1] += value.y;
        self.elements[3 * i + 2] += value.z;
    }

    /// Largest absolute element.
    pub fn max_abs(&self) -> f64 {
        self.elements.iter().fold(0.0, |m, x| m.max(x.abs()))
    }

    pub fn is_finite(&self) -> bool {
        self.elements.iter().all(|x| x.is_finite())
    }

    /// Elementwise comparison within `tolerance`; shapes must match.
    pub fn approx_eq(&self, other: &Vector, tolerance: f64) -> bool {
        self.shape() == other.shape()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.elements[i]
    }
}

impl IndexMut<usize> for Vector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.elements[i]
    }
}
