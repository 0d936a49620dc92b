//! Construction input for a simulator.
//!
//! A [`Scene`] is the plain data a caller hands over: point positions,
//! which points are fixed, spring connectivity and masses. It is what the
//! CLI reads from JSON. Optional per-spring rest lengths and stiffnesses
//! override the defaults (initial distance, configured constant).

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tensio_types::{PointId, TensioError, TensioResult};

use crate::spring::SpringData;

/// Points, springs and masses of a mass-spring network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Point-major positions `[x0, y0, z0, x1, ...]`.
    pub positions: Vec<f64>,
    /// Per-point fixed flags. Empty means every point is free.
    #[serde(default)]
    pub fixed: Vec<bool>,
    /// Spring endpoints as point indices.
    pub edges: Vec<[usize; 2]>,
    /// Per-point masses.
    pub masses: Vec<f64>,
    /// Per-spring rest lengths; initial distances when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_lengths: Option<Vec<f64>>,
    /// Per-spring stiffnesses; the configured default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spring_constants: Option<Vec<f64>>,
}

impl Scene {
    /// Builds a scene with uniform `mass` and no fixed points.
    pub fn from_points(points: &[DVec3], edges: Vec<[usize; 2]>, mass: f64) -> Self {
        Self {
            positions: points.iter().flat_map(|p| p.to_array()).collect(),
            fixed: vec![false; points.len()],
            edges,
            masses: vec![mass; points.len()],
            rest_lengths: None,
            spring_constants: None,
        }
    }

    /// Marks every point for which `predicate(index, position)` holds as fixed.
    pub fn with_fixed_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(usize, DVec3) -> bool,
    {
        self.fixed = (0..self.point_count())
            .map(|i| predicate(i, self.point(i)))
            .collect();
        self
    }

    pub fn point_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn point(&self, i: usize) -> DVec3 {
        DVec3::new(
            self.positions[3 * i],
            self.positions[3 * i + 1],
            self.positions[3 * i + 2],
        )
    }

    pub fn points(&self) -> Vec<DVec3> {
        (0..self.point_count()).map(|i| self.point(i)).collect()
    }

    pub fn is_fixed(&self, i: usize) -> bool {
        self.fixed.get(i).copied().unwrap_or(false)
    }

    pub fn fixed_count(&self) -> usize {
        self.fixed.iter().filter(|&&f| f).count()
    }

    /// Checks lengths, indices and value ranges.
    pub fn validate(&self) -> TensioResult<()> {
        fn invalid(message: String) -> TensioResult<()> {
            Err(TensioError::InvalidScene(message))
        }

        if self.positions.is_empty() || self.positions.len() % 3 != 0 {
            return invalid(format!(
                "positions must hold a positive multiple of 3 values, got {}",
                self.positions.len()
            ));
        }
        if let Some(i) = self.positions.iter().position(|p| !p.is_finite()) {
            return invalid(format!("position component {i} is not finite"));
        }

        let n = self.point_count();
        if !self.fixed.is_empty() && self.fixed.len() != n {
            return invalid(format!("fixed has {} flags for {n} points", self.fixed.len()));
        }
        if self.masses.len() != n {
            return invalid(format!("masses has {} entries for {n} points", self.masses.len()));
        }
        if let Some(i) = self.masses.iter().position(|m| !(*m > 0.0 && m.is_finite())) {
            return invalid(format!("mass of point {i} must be positive, got {}", self.masses[i]));
        }

        for (e, &[a, b]) in self.edges.iter().enumerate() {
            if a >= n || b >= n {
                return invalid(format!("edge {e} references point out of range ({a}, {b})"));
            }
            if a == b {
                return invalid(format!("edge {e} connects point {a} to itself"));
            }
        }

        if let Some(rest) = &self.rest_lengths {
            if rest.len() != self.edges.len() {
                return invalid(format!(
                    "rest_lengths has {} entries for {} edges",
                    rest.len(),
                    self.edges.len()
                ));
            }
            if let Some(e) = rest.iter().position(|l| !(*l >= 0.0 && l.is_finite())) {
                return invalid(format!("rest length of edge {e} must be non-negative"));
            }
        }
        if let Some(constants) = &self.spring_constants {
            if constants.len() != self.edges.len() {
                return invalid(format!(
                    "spring_constants has {} entries for {} edges",
                    constants.len(),
                    self.edges.len()
                ));
            }
            if let Some(e) = constants.iter().position(|k| !(*k > 0.0 && k.is_finite())) {
                return invalid(format!("spring constant of edge {e} must be positive"));
            }
        }

        Ok(())
    }

    /// Validates and builds the spring list.
    pub fn springs(&self, default_spring_constant: f64) -> TensioResult<Vec<SpringData>> {
        self.validate()?;
        Ok(self
            .edges
            .iter()
            .enumerate()
            .map(|(e, &[a, b])| {
                let rest_length = self
                    .rest_lengths
                    .as_ref()
                    .map_or_else(|| self.point(a).distance(self.point(b)), |r| r[e]);
                let spring_constant = self
                    .spring_constants
                    .as_ref()
                    .map_or(default_spring_constant, |k| k[e]);
                SpringData::new(PointId::from(a), PointId::from(b), rest_length, spring_constant)
            })
            .collect())
    }
}
