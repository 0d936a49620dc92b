//! Integration tests for tensio-accel.

use tensio_accel::backend::{ElementwiseBackend, ParallelBackend, SerialBackend, MIN_ITEMS_PER_TASK};
use tensio_accel::context::{select_strategy, AccelContext, ElementwiseStrategy};

fn ramp(n: usize, scale: f64) -> Vec<f64> {
    (0..n).map(|i| (i as f64 * 0.37 + 1.0) * scale).collect()
}

// ─── SerialBackend Tests ──────────────────────────────────────

#[test]
fn serial_axpy() {
    let backend = SerialBackend::new();
    let a = [1.0, 2.0, 3.0];
    let b = [4.0, 5.0, 6.0];
    let mut out = [0.0; 3];

    backend.axpy(&a, &b, 2.0, &mut out).unwrap();
    // out = a + 2*b = [1+8, 2+10, 3+12] = [9, 12, 15]
    assert_eq!(out, [9.0, 12.0, 15.0]);
}

#[test]
fn serial_axpy_length_mismatch() {
    let backend = SerialBackend::new();
    let a = [1.0, 2.0];
    let b = [4.0, 5.0, 6.0];
    let mut out = [0.0; 3];

    assert!(backend.axpy(&a, &b, 1.0, &mut out).is_err());
}

#[test]
fn serial_dot() {
    let backend = SerialBackend::new();
    let result = backend.dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]).unwrap();
    // 1*4 + 2*5 + 3*6 = 32
    assert!((result - 32.0).abs() < 1e-12);
}

#[test]
fn serial_fill_and_scale() {
    let backend = SerialBackend::new();
    let mut buf = vec![0.0; 5];
    backend.fill(&mut buf, 1.5);
    backend.scale(&mut buf, 2.0);
    assert!(buf.iter().all(|&x| x == 3.0));
}

// ─── ParallelBackend Tests ────────────────────────────────────

#[test]
fn parallel_elementwise_matches_serial_bitwise() {
    let serial = SerialBackend::new();
    let parallel = ParallelBackend::new();
    // Several tasks, the last one partial.
    let n = 3 * MIN_ITEMS_PER_TASK + 41;
    let a = ramp(n, 1.0);
    let b = ramp(n, -0.25);

    let mut out_s = vec![0.0; n];
    let mut out_p = vec![0.0; n];
    serial.axpy(&a, &b, 0.7, &mut out_s).unwrap();
    parallel.axpy(&a, &b, 0.7, &mut out_p).unwrap();
    assert_eq!(out_s, out_p);

    let mut in_s = a.clone();
    let mut in_p = a.clone();
    serial.axpy_in_place(&mut in_s, &b, -1.3).unwrap();
    parallel.axpy_in_place(&mut in_p, &b, -1.3).unwrap();
    assert_eq!(in_s, in_p);

    serial.scale(&mut in_s, 0.5);
    parallel.scale(&mut in_p, 0.5);
    assert_eq!(in_s, in_p);

    parallel.fill(&mut in_p, -2.0);
    assert!(in_p.iter().all(|&x| x == -2.0));
}

#[test]
fn parallel_dot_is_deterministic() {
    let serial = SerialBackend::new();
    let parallel = ParallelBackend::new();
    let a = ramp(5 * MIN_ITEMS_PER_TASK + 7, 1.0);
    let b = ramp(a.len(), -0.5);

    let expected = serial.dot(&a, &b).unwrap();
    let first = parallel.dot(&a, &b).unwrap();
    assert!((first - expected).abs() <= 1e-12 * expected.abs());
    for _ in 0..8 {
        assert_eq!(parallel.dot(&a, &b).unwrap(), first);
    }
}

#[test]
fn parallel_length_mismatch() {
    let backend = ParallelBackend::new();
    let mut target = vec![0.0; 4];
    assert!(backend.axpy_in_place(&mut target, &[1.0; 5], 1.0).is_err());
    assert!(backend.dot(&[1.0; 3], &[1.0; 2]).is_err());
}

// ─── Strategy Tests ──────────────────────────────────────────

#[test]
fn strategy_threshold_is_exclusive() {
    assert_eq!(select_strategy(100, 100), ElementwiseStrategy::Scalar);
    assert_eq!(select_strategy(101, 100), ElementwiseStrategy::Parallel);
    assert_eq!(select_strategy(0, 0), ElementwiseStrategy::Scalar);
}

#[test]
fn context_dispatches_by_length() {
    let ctx = AccelContext::new(10);
    assert_eq!(ctx.backend_for(10).name(), "serial");
    assert_eq!(ctx.backend_for(11).name(), "parallel");
    assert_eq!(AccelContext::serial_only().backend_for(1 << 20).name(), "serial");
}

#[test]
fn default_context_threshold() {
    assert_eq!(AccelContext::default().threshold(), 100);
}
