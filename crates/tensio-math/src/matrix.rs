//! Dense row-major matrix.
//!
//! The solver stack works on small dense systems (a few hundred rows), so
//! storage is a single flat `Vec<f64>` and every product is the plain
//! triple loop. In-place operations mutate `self`; the `*_new` variants
//! clone first.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use tensio_accel::AccelContext;
use tensio_types::constants::EPSILON;
use tensio_types::{TensioError, TensioResult};

use crate::vector::{Orientation, Vector};

/// A dense `height × width` matrix stored row-major.
///
/// Invariant: `elements.len() == width * height`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    elements: Vec<f64>,
    width: usize,
    height: usize,
}

impl Matrix {
    /// Creates a zero matrix.
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            elements: vec![0.0; width * height],
            width,
            height,
        }
    }

    /// Creates the `n × n` identity.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Creates a square matrix with `diagonal` on its diagonal.
    pub fn from_diagonal(diagonal: &[f64]) -> Self {
        let n = diagonal.len();
        let mut m = Self::zeros(n, n);
        for (i, &d) in diagonal.iter().enumerate() {
            m[(i, i)] = d;
        }
        m
    }

    /// Wraps a flat row-major buffer.
    pub fn from_vec(height: usize, width: usize, elements: Vec<f64>) -> TensioResult<Self> {
        if elements.len() != width * height {
            return Err(TensioError::shape(
                "from_vec",
                (height, width),
                (elements.len(), 1),
            ));
        }
        Ok(Self {
            elements,
            width,
            height,
        })
    }

    /// Caller guarantees `elements.len() == height * width`.
    pub(crate) fn from_raw(height: usize, width: usize, elements: Vec<f64>) -> Self {
        debug_assert_eq!(elements.len(), height * width);
        Self {
            elements,
            width,
            height,
        }
    }

    /// Builds a matrix from equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> TensioResult<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut elements = Vec::with_capacity(width * height);
        for row in rows {
            if row.len() != width {
                return Err(TensioError::shape("from_rows", (1, width), (1, row.len())));
            }
            elements.extend_from_slice(row);
        }
        Ok(Self {
            elements,
            width,
            height,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(height, width)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Row-major element buffer.
    pub fn elements(&self) -> &[f64] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [f64] {
        &mut self.elements
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.elements[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.elements[row * self.width + col] = value;
    }

    /// `self[row, col] += value`.
    #[inline]
    pub fn add_at(&mut self, row: usize, col: usize, value: f64) {
        self.elements[row * self.width + col] += value;
    }

    fn check_same_shape(&self, other: &Matrix, operation: &'static str) -> TensioResult<()> {
        if self.shape() != other.shape() {
            return Err(TensioError::shape(operation, self.shape(), other.shape()));
        }
        Ok(())
    }

    fn require_square(&self, operation: &'static str) -> TensioResult<()> {
        if !self.is_square() {
            return Err(TensioError::shape(operation, self.shape(), (self.height, self.height)));
        }
        Ok(())
    }

    /// `self += other`.
    pub fn add(&mut self, other: &Matrix) -> TensioResult<&mut Self> {
        self.check_same_shape(other, "add")?;
        for (a, b) in self.elements.iter_mut().zip(&other.elements) {
            *a += b;
        }
        Ok(self)
    }

    pub fn add_new(&self, other: &Matrix) -> TensioResult<Matrix> {
        let mut m = self.clone();
        m.add(other)?;
        Ok(m)
    }

    /// `self -= other`.
    pub fn subtract(&mut self, other: &Matrix) -> TensioResult<&mut Self> {
        self.check_same_shape(other, "subtract")?;
        for (a, b) in self.elements.iter_mut().zip(&other.elements) {
            *a -= b;
        }
        Ok(self)
    }

    pub fn subtract_new(&self, other: &Matrix) -> TensioResult<Matrix> {
        let mut m = self.clone();
        m.subtract(other)?;
        Ok(m)
    }

    /// `self *= scalar`.
    pub fn multiply_scalar(&mut self, scalar: f64) -> &mut Self {
        for a in &mut self.elements {
            *a *= scalar;
        }
        self
    }

    pub fn multiply_scalar_new(&self, scalar: f64) -> Matrix {
        let mut m = self.clone();
        m.multiply_scalar(scalar);
        m
    }

    /// `self += scale * other`, dispatched through the acceleration context.
    pub fn add_scaled_with(
        &mut self,
        other: &Matrix,
        scale: f64,
        accel: &AccelContext,
    ) -> TensioResult<&mut Self> {
        self.check_same_shape(other, "add_scaled")?;
        accel
            .backend_for(self.elements.len())
            .axpy_in_place(&mut self.elements, &other.elements, scale)?;
        Ok(self)
    }

    /// Dense product `self · other`.
    pub fn multiply(&self, other: &Matrix) -> TensioResult<Matrix> {
        if self.width != other.height {
            return Err(TensioError::shape("multiply", self.shape(), other.shape()));
        }
        let mut out = Matrix::zeros(self.height, other.width);
        for i in 0..self.height {
            for k in 0..self.width {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                let row = &other.elements[k * other.width..(k + 1) * other.width];
                let out_row = &mut out.elements[i * other.width..(i + 1) * other.width];
                for (o, &b) in out_row.iter_mut().zip(row) {
                    *o += a * b;
                }
            }
        }
        Ok(out)
    }

    /// Matrix-vector product `self · v` for a column vector.
    pub fn multiply_vector(&self, v: &Vector) -> TensioResult<Vector> {
        if v.orientation() != Orientation::Column || self.width != v.len() {
            return Err(TensioError::shape("multiply_vector", self.shape(), v.shape()));
        }
        let x = v.as_slice();
        let out = (0..self.height)
            .map(|i| {
                self.elements[i * self.width..(i + 1) * self.width]
                    .iter()
                    .zip(x)
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect();
        Ok(Vector::from_vec(out))
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.width, self.height);
        for i in 0..self.height {
            for j in 0..self.width {
                out[(j, i)] = self.get(i, j);
            }
        }
        out
    }

    /// Kronecker product `self ⊗ other`, shape `(h·h', w·w')`.
    pub fn kronecker(&self, other: &Matrix) -> Matrix {
        let mut out = Matrix::zeros(self.height * other.height, self.width * other.width);
        for i in 0..self.height {
            for j in 0..self.width {
                let a = self.get(i, j);
                if a == 0.0 {
                    continue;
                }
                for k in 0..other.height {
                    for l in 0..other.width {
                        out[(i * other.height + k, j * other.width + l)] = a * other.get(k, l);
                    }
                }
            }
        }
        out
    }

    /// Gauss-Jordan inverse, swapping rows when a pivot is exactly zero.
    pub fn inverse(&self) -> TensioResult<Matrix> {
        self.require_square("inverse")?;
        let n = self.height;
        let mut a = self.clone();
        let mut inv = Matrix::identity(n);

        for col in 0..n {
            if a.get(col, col) == 0.0 {
                let swap = (col + 1..n).find(|&r| a.get(r, col) != 0.0).ok_or_else(|| {
                    TensioError::SingularMatrix(format!("no nonzero pivot in column {col}"))
                })?;
                a.swap_rows(col, swap);
                inv.swap_rows(col, swap);
            }

            let pivot = a.get(col, col);
            for j in 0..n {
                a[(col, j)] /= pivot;
                inv[(col, j)] /= pivot;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a.get(row, col);
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    let av = a.get(col, j);
                    let iv = inv.get(col, j);
                    a[(row, j)] -= factor * av;
                    inv[(row, j)] -= factor * iv;
                }
            }
        }

        Ok(inv)
    }

    pub fn swap_rows(&mut self, r1: usize, r2: usize) {
        if r1 == r2 {
            return;
        }
        for j in 0..self.width {
            self.elements.swap(r1 * self.width + j, r2 * self.width + j);
        }
    }

    /// Row `i` as a row vector.
    pub fn row(&self, i: usize) -> Vector {
        Vector::from_vec(self.elements[i * self.width..(i + 1) * self.width].to_vec()).transpose()
    }

    /// Column `j` as a column vector.
    pub fn column(&self, j: usize) -> Vector {
        Vector::from_vec((0..self.height).map(|i| self.get(i, j)).collect())
    }

    /// Copies the `height × width` block starting at `(row, col)`.
    pub fn submatrix(&self, row: usize, col: usize, height: usize, width: usize) -> TensioResult<Matrix> {
        if row + height > self.height || col + width > self.width {
            return Err(TensioError::shape(
                "submatrix",
                self.shape(),
                (row + height, col + width),
            ));
        }
        let mut out = Matrix::zeros(height, width);
        for i in 0..height {
            for j in 0..width {
                out[(i, j)] = self.get(row + i, col + j);
            }
        }
        Ok(out)
    }

    /// Adds `block` into `self` with its top-left corner at `(row, col)`.
    pub fn add_block(&mut self, row: usize, col: usize, block: &Matrix) -> TensioResult<()> {
        if row + block.height > self.height || col + block.width > self.width {
            return Err(TensioError::shape("add_block", self.shape(), block.shape()));
        }
        for i in 0..block.height {
            for j in 0..block.width {
                self.add_at(row + i, col + j, block.get(i, j));
            }
        }
        Ok(())
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.height.min(self.width)).map(|i| self.get(i, i)).collect()
    }

    /// `self += shift · I` for a square matrix.
    pub fn add_diagonal(&mut self, shift: f64) -> TensioResult<&mut Self> {
        self.require_square("add_diagonal")?;
        for i in 0..self.height {
            self.add_at(i, i, shift);
        }
        Ok(self)
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.elements.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Largest absolute element.
    pub fn max_abs(&self) -> f64 {
        self.elements.iter().fold(0.0, |m, x| m.max(x.abs()))
    }

    pub fn is_finite(&self) -> bool {
        self.elements.iter().all(|x| x.is_finite())
    }

    /// True if symmetric within `tolerance`.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        self.is_square()
            && (0..self.height)
                .all(|i| (0..i).all(|j| (self.get(i, j) - self.get(j, i)).abs() <= tolerance))
    }

    /// Elementwise comparison within `tolerance`; shapes must match.
    pub fn approx_eq(&self, other: &Matrix, tolerance: f64) -> bool {
        self.shape() == other.shape()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Number of entries whose magnitude exceeds [`EPSILON`].
    pub fn count_nonzero(&self) -> usize {
        self.elements.iter().filter(|x| x.abs() > EPSILON).count()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.elements[row * self.width + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.elements[row * self.width + col]
    }
}
