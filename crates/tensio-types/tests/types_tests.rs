//! Integration tests for tensio-types.

use tensio_types::{PointId, SpringId, TensioError};

// ─── ID Tests ──────────────────────────────────────────────────

#[test]
fn point_id_index_and_offset() {
    let id = PointId(7);
    assert_eq!(id.index(), 7);
    assert_eq!(id.offset(), 21);
}

#[test]
fn spring_id_index() {
    let id = SpringId(3);
    assert_eq!(id.index(), 3);
}

#[test]
fn point_id_from_usize() {
    let id: PointId = 12usize.into();
    assert_eq!(id, PointId(12));
}

#[test]
fn ids_are_serializable() {
    let id = PointId(100);
    let json = serde_json::to_string(&id).unwrap();
    let deserialized: PointId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, deserialized);
}

// ─── Error Tests ──────────────────────────────────────────────

#[test]
fn shape_mismatch_display() {
    let err = TensioError::shape("add", (2, 3), (3, 2));
    let msg = err.to_string();
    assert!(msg.contains("add"));
    assert!(msg.contains("(2, 3)"));
}

#[test]
fn solver_divergence_display() {
    let err = TensioError::SolverDivergence {
        iterations: 100,
        residual: 1.5e-2,
    };
    let msg = err.to_string();
    assert!(msg.contains("100"));
    assert!(msg.contains("1.50e-2") || msg.contains("1.5e-2"));
}

#[test]
fn recoverable_classification() {
    assert!(TensioError::SingularMatrix("zero pivot".into()).is_recoverable());
    assert!(TensioError::NotPositiveDefinite { index: 2 }.is_recoverable());
    assert!(!TensioError::InvalidScene("bad".into()).is_recoverable());
    assert!(!TensioError::shape("multiply", (1, 2), (3, 4)).is_recoverable());
}
