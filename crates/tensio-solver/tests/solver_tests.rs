//! Integration tests for tensio-solver.

use glam::{DMat3, DVec3};
use tensio_accel::AccelContext;
use tensio_math::{Matrix, Vector};
use tensio_solver::assembly::{assemble_projective_system, springs_connected_to, Inertia};
use tensio_solver::descent::{
    update_by_newton_multigrid, update_by_newton_raphson, NewtonOptions, NewtonStep, Objective, SkipReason,
};
use tensio_solver::kinetic;
use tensio_solver::multigrid::{furthest_point_sampling, AFFINE_DOFS};
use tensio_solver::spring;
use tensio_solver::{
    Multigrid, MultigridConfig, Scene, SimulationState, Simulator, SimulatorConfig, SpringData,
    SystemObjective, UpdateMode,
};
use tensio_types::{PointId, SpringId, TensioError, TensioResult};

/// Point 0 fixed at the origin, point 1 one unit along x, unit masses.
fn two_point_scene() -> Scene {
    Scene::from_points(&[DVec3::ZERO, DVec3::X], vec![[0, 1]], 1.0).with_fixed_predicate(|i, _| i == 0)
}

/// `nx × ny` grid in the xy plane with structural and shear springs; the
/// row at the largest y is fixed.
fn cloth_scene(nx: usize, ny: usize, mass: f64) -> Scene {
    let mut points = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            points.push(DVec3::new(i as f64 / (nx - 1) as f64, j as f64 / (ny - 1) as f64, 0.0));
        }
    }
    let idx = |i: usize, j: usize| j * nx + i;
    let mut edges = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            if i + 1 < nx {
                edges.push([idx(i, j), idx(i + 1, j)]);
            }
            if j + 1 < ny {
                edges.push([idx(i, j), idx(i, j + 1)]);
            }
            if i + 1 < nx && j + 1 < ny {
                edges.push([idx(i, j), idx(i + 1, j + 1)]);
                edges.push([idx(i + 1, j), idx(i, j + 1)]);
            }
        }
    }
    Scene::from_points(&points, edges, mass).with_fixed_predicate(move |_, p| p.y == 1.0)
}

fn pendulum_config(mode: UpdateMode) -> SimulatorConfig {
    SimulatorConfig {
        air_resistance: 0.05,
        ..SimulatorConfig::default()
    }
    .with_mode(mode)
}

fn finite_difference_gradient<O: Objective>(objective: &O, x: &Vector) -> Vector {
    let h = 1e-6;
    let mut g = Vector::zeros(x.len());
    for i in 0..x.len() {
        let mut plus = x.clone();
        let mut minus = x.clone();
        plus[i] += h;
        minus[i] -= h;
        g[i] = (objective.energy(&plus).unwrap() - objective.energy(&minus).unwrap()) / (2.0 * h);
    }
    g
}

// ─── Spring Tests ─────────────────────────────────────────────

#[test]
fn spring_energy_and_gradient_vanish_at_rest() {
    let p = DVec3::new(0.3, -0.2, 1.0);
    let q = DVec3::new(1.1, 0.5, 0.4);
    let s = SpringData::new(PointId(0), PointId(1), p.distance(q), 50.0);
    assert_eq!(s.energy(p, q), 0.0);
    assert_eq!(s.gradient(p, q), DVec3::ZERO);
}

#[test]
fn spring_gradient_matches_finite_difference() {
    let p = DVec3::new(0.0, 0.0, 0.0);
    let q = DVec3::new(1.5, 0.2, -0.3);
    let (rest, k) = (1.0, 80.0);
    let g = spring::gradient(p, q, rest, k);
    let h = 1e-6;
    for axis in 0..3 {
        let mut e = DVec3::ZERO;
        e[axis] = h;
        let fd = (spring::energy(p + e, q, rest, k) - spring::energy(p - e, q, rest, k)) / (2.0 * h);
        assert!((fd - g[axis]).abs() < 1e-5, "axis {axis}: {fd} vs {}", g[axis]);
    }
}

#[test]
fn spring_hessian_block_matches_gradient_derivative() {
    let p = DVec3::new(0.1, 0.4, 0.0);
    let q = DVec3::new(1.2, -0.1, 0.7);
    let (rest, k) = (0.8, 30.0);
    let block = spring::hessian_block(p, q, rest, k);
    let h = 1e-6;
    for axis in 0..3 {
        let mut e = DVec3::ZERO;
        e[axis] = h;
        let column = (spring::gradient(p + e, q, rest, k) - spring::gradient(p - e, q, rest, k)) / (2.0 * h);
        assert!((column - block.col(axis)).abs().max_element() < 1e-5);
    }
    // Symmetric
    assert!((block - block.transpose()).abs_diff_eq(DMat3::ZERO, 1e-12));
}

#[test]
fn spring_degenerate_length() {
    let p = DVec3::new(1.0, 1.0, 1.0);
    assert_eq!(spring::gradient(p, p, 1.0, 10.0), DVec3::ZERO);
    assert_eq!(
        spring::hessian_block(p, p, 1.0, 10.0),
        DMat3::from_diagonal(DVec3::splat(10.0))
    );
}

#[test]
fn spring_projection_keeps_direction() {
    let s = SpringData::new(PointId(0), PointId(1), 2.0, 1.0);
    let d = s.project(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO);
    assert!((d - DVec3::new(0.0, 0.0, 2.0)).length() < 1e-12);
}

// ─── Kinetic / Gravity Tests ──────────────────────────────────

#[test]
fn kinetic_term_vanishes_without_deviation() {
    let h = 0.1;
    let x0 = Vector::from_vec(vec![0.0, 1.0, 2.0]);
    let v = Vector::from_vec(vec![1.0, 0.0, -1.0]);
    let mut x = x0.clone();
    x.add_scaled(&v, h).unwrap();
    let mass3 = Vector::from_vec(vec![2.0; 3]);
    assert!(kinetic::energy_gain(&x, &x0, &v, h, &mass3).unwrap().abs() < 1e-12);
    assert!(kinetic::gradient(&x, &x0, &v, h, &mass3).unwrap().norm() < 1e-12);
}

#[test]
fn kinetic_hessian_is_mass_over_h_squared() {
    let mass3 = Vector::from_vec(vec![2.0, 2.0, 2.0]);
    let mut hessian = Matrix::zeros(3, 3);
    kinetic::add_hessian(&mut hessian, 0.5, &mass3).unwrap();
    assert_eq!(hessian.diagonal(), vec![8.0, 8.0, 8.0]);
}

#[test]
fn gravity_gradient_carries_mass() {
    let x = Vector::from_vec(vec![0.0, 0.0, 2.0, 0.0, 0.0, -1.0]);
    let mass3 = Vector::from_vec(vec![2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
    assert!((tensio_solver::gravity::energy(&x, &mass3, 10.0) - (40.0 - 30.0)).abs() < 1e-12);
    let mut g = Vector::zeros(6);
    tensio_solver::gravity::add_gradient(&mut g, &mass3, 10.0);
    assert_eq!(g.as_slice(), &[0.0, 0.0, 20.0, 0.0, 0.0, 30.0]);
}

// ─── Scene Tests ──────────────────────────────────────────────

#[test]
fn scene_defaults_rest_length_to_initial_distance() {
    let scene = Scene::from_points(&[DVec3::ZERO, DVec3::new(3.0, 4.0, 0.0)], vec![[0, 1]], 1.0);
    let springs = scene.springs(42.0).unwrap();
    assert_eq!(springs.len(), 1);
    assert!((springs[0].rest_length - 5.0).abs() < 1e-12);
    assert_eq!(springs[0].spring_constant, 42.0);
}

#[test]
fn scene_overrides_take_precedence() {
    let mut scene = two_point_scene();
    scene.rest_lengths = Some(vec![0.5]);
    scene.spring_constants = Some(vec![7.0]);
    let springs = scene.springs(100.0).unwrap();
    assert_eq!(springs[0].rest_length, 0.5);
    assert_eq!(springs[0].spring_constant, 7.0);
}

#[test]
fn scene_validation_rejects_bad_input() {
    let mut out_of_range = two_point_scene();
    out_of_range.edges.push([0, 5]);
    assert!(matches!(out_of_range.validate(), Err(TensioError::InvalidScene(_))));

    let mut self_loop = two_point_scene();
    self_loop.edges.push([1, 1]);
    assert!(self_loop.validate().is_err());

    let mut massless = two_point_scene();
    massless.masses[1] = 0.0;
    assert!(massless.validate().is_err());

    let mut ragged = two_point_scene();
    ragged.positions.pop();
    assert!(ragged.validate().is_err());

    let mut wrong_rest = two_point_scene();
    wrong_rest.rest_lengths = Some(vec![1.0, 2.0]);
    assert!(wrong_rest.validate().is_err());
}

#[test]
fn scene_fixed_predicate() {
    let scene = cloth_scene(3, 3, 1.0);
    assert_eq!(scene.fixed_count(), 3);
    assert!(scene.is_fixed(8));
    assert!(!scene.is_fixed(0));
}

#[test]
fn scene_json_round_trip() {
    let scene = two_point_scene();
    let json = serde_json::to_string(&scene).unwrap();
    assert!(!json.contains("rest_lengths"));
    let back: Scene = serde_json::from_str(&json).unwrap();
    assert_eq!(scene, back);
}

#[test]
fn scene_json_without_fixed_means_all_free() {
    let json = r#"{"positions":[0,0,0,1,0,0],"edges":[[0,1]],"masses":[1,1]}"#;
    let scene: Scene = serde_json::from_str(json).unwrap();
    scene.validate().unwrap();
    assert_eq!(scene.fixed_count(), 0);
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn config_presets_validate() {
    SimulatorConfig::default().validate().unwrap();
    SimulatorConfig::debug().validate().unwrap();
    SimulatorConfig::high_quality().validate().unwrap();
}

#[test]
fn full_air_resistance_stops_motion() {
    let config = SimulatorConfig {
        air_resistance: 1.0,
        ..SimulatorConfig::default()
    };
    config.validate().unwrap();
    let mut sim = Simulator::new(&two_point_scene(), config).unwrap();
    for _ in 0..3 {
        sim.simulate().unwrap();
        assert_eq!(sim.velocities().norm(), 0.0);
    }
}

#[test]
fn config_toml_round_trip() {
    let config = SimulatorConfig::high_quality().with_mode(UpdateMode::Multigrid);
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("mode = \"multigrid\""));
    let back: SimulatorConfig = toml::from_str(&text).unwrap();
    assert_eq!(config, back);
}

#[test]
fn config_partial_toml_uses_defaults() {
    let config: SimulatorConfig = toml::from_str(
        r#"
        mode = "projective_dynamics"
        pd_iterations = 4

        [multigrid]
        levels = 3
        "#,
    )
    .unwrap();
    assert_eq!(config.mode, UpdateMode::ProjectiveDynamics);
    assert_eq!(config.pd_iterations, 4);
    assert_eq!(config.multigrid.levels, 3);
    assert_eq!(config.multigrid.iterations, MultigridConfig::default().iterations);
    assert_eq!(config.timestep, SimulatorConfig::default().timestep);
}

#[test]
fn config_validation_rejects_bad_values() {
    let bad = [
        SimulatorConfig {
            timestep: 0.0,
            ..Default::default()
        },
        SimulatorConfig {
            air_resistance: 1.5,
            ..Default::default()
        },
        SimulatorConfig {
            air_resistance: -0.1,
            ..Default::default()
        },
        SimulatorConfig {
            constant_of_restitution: 1.5,
            ..Default::default()
        },
        SimulatorConfig {
            newton_iterations: 0,
            ..Default::default()
        },
    ];
    for config in bad {
        assert!(matches!(config.validate(), Err(TensioError::InvalidConfig(_))));
    }
}

#[test]
fn update_mode_parses_aliases() {
    assert_eq!("pd".parse::<UpdateMode>().unwrap(), UpdateMode::ProjectiveDynamics);
    assert_eq!("multigrid".parse::<UpdateMode>().unwrap(), UpdateMode::Multigrid);
    assert!("gauss".parse::<UpdateMode>().is_err());
}

// ─── Objective Tests ──────────────────────────────────────────

#[test]
fn system_gradient_and_hessian_match_finite_differences() {
    let scene = cloth_scene(3, 3, 0.5);
    let config = SimulatorConfig::default();
    let springs = scene.springs(config.default_spring_constant).unwrap();
    let state = SimulationState::from_scene(&scene).unwrap();
    let connected = springs_connected_to(state.point_count(), &springs);
    let velocities = Vector::from_vec((0..27).map(|i| (i as f64 * 0.7).sin()).collect());

    let objective = SystemObjective {
        springs: &springs,
        springs_connected_to: &connected,
        mass3: &state.mass3,
        timestep: config.timestep,
        gravity: config.gravity,
        inertia: Some(Inertia {
            previous: &state.positions,
            velocities: &velocities,
        }),
        penalty: None,
    };

    let mut x = state.positions.clone();
    for i in 0..x.len() {
        x[i] += 0.05 * ((i * 7 % 5) as f64 - 2.0);
    }

    let g = objective.gradient(&x).unwrap();
    let fd = finite_difference_gradient(&objective, &x);
    assert!(g.approx_eq(&fd, 1e-3 * g.max_abs().max(1.0)));

    let h = objective.hessian(&x).unwrap();
    assert!(h.is_symmetric(1e-9));
    let step = 1e-6;
    for j in [0, 4, 13, 26] {
        let mut plus = x.clone();
        let mut minus = x.clone();
        plus[j] += step;
        minus[j] -= step;
        let mut column = objective.gradient(&plus).unwrap();
        column.subtract(&objective.gradient(&minus).unwrap()).unwrap();
        column.multiply_scalar(1.0 / (2.0 * step));
        for i in 0..x.len() {
            assert!((column[i] - h.get(i, j)).abs() < 1e-2, "H[{i},{j}]");
        }
    }
}

#[test]
fn adjacency_lists_every_touching_spring() {
    let scene = Scene::from_points(&[DVec3::ZERO, DVec3::X, DVec3::Y], vec![[0, 1], [1, 2], [2, 0]], 1.0);
    let springs = scene.springs(1.0).unwrap();
    let connected = springs_connected_to(3, &springs);
    assert_eq!(connected[0], vec![0, 2]);
    assert_eq!(connected[1], vec![0, 1]);
    assert_eq!(connected[2], vec![1, 2]);
}

// ─── Descent Tests ────────────────────────────────────────────

/// `E = ½ Σ aᵢ xᵢ² − Σ bᵢ xᵢ` with a diagonal (possibly indefinite) `a`.
struct Diagonal {
    a: Vec<f64>,
    b: Vec<f64>,
}

impl Objective for Diagonal {
    fn energy(&self, x: &Vector) -> TensioResult<f64> {
        Ok((0..x.len())
            .map(|i| 0.5 * self.a[i] * x[i] * x[i] - self.b[i] * x[i])
            .sum())
    }

    fn gradient(&self, x: &Vector) -> TensioResult<Vector> {
        Ok(Vector::from_vec(
            (0..x.len()).map(|i| self.a[i] * x[i] - self.b[i]).collect(),
        ))
    }

    fn hessian(&self, _x: &Vector) -> TensioResult<Matrix> {
        Ok(Matrix::from_diagonal(&self.a))
    }
}

#[test]
fn newton_solves_quadratic_in_one_step() {
    let objective = Diagonal {
        a: vec![2.0, 4.0],
        b: vec![2.0, -4.0],
    };
    let mut x = Vector::zeros(2);
    let options = NewtonOptions {
        simulates_inertia: true,
        tries_orthogonal_directions: 0,
    };
    let step = update_by_newton_raphson(&mut x, &objective, options, &AccelContext::default()).unwrap();
    assert!(step.is_applied());
    assert!(x.approx_eq(&Vector::from_vec(vec![1.0, -1.0]), 1e-12));
}

#[test]
fn newton_with_line_search_decreases_energy() {
    let objective = Diagonal {
        a: vec![1.0, 10.0],
        b: vec![3.0, 1.0],
    };
    let mut x = Vector::from_vec(vec![5.0, 5.0]);
    let before = objective.energy(&x).unwrap();
    let options = NewtonOptions {
        simulates_inertia: false,
        tries_orthogonal_directions: 0,
    };
    let step = update_by_newton_raphson(&mut x, &objective, options, &AccelContext::default()).unwrap();
    assert!(matches!(step, NewtonStep::Applied { .. }));
    assert!(objective.energy(&x).unwrap() < before);
}

#[test]
fn newton_skips_at_stationary_point() {
    let objective = Diagonal {
        a: vec![1.0, 1.0],
        b: vec![0.0, 0.0],
    };
    let mut x = Vector::zeros(2);
    let step = update_by_newton_raphson(&mut x, &objective, NewtonOptions::default(), &AccelContext::default())
        .unwrap();
    assert_eq!(step, NewtonStep::Skipped(SkipReason::ZeroDirection));
    assert_eq!(x.as_slice(), &[0.0, 0.0]);
}

#[test]
fn only_zero_direction_counts_as_rest() {
    assert!(SkipReason::ZeroDirection.is_at_rest());
    for reason in [
        SkipReason::SolveFailed,
        SkipReason::NonFinite,
        SkipReason::NoDescent,
        SkipReason::CriticalPoint,
    ] {
        assert!(!reason.is_at_rest(), "{}", reason.as_str());
    }
}

#[test]
fn newton_escapes_saddle_along_negative_curvature() {
    let objective = Diagonal {
        a: vec![2.0, -2.0],
        b: vec![0.0, 0.0],
    };
    let mut x = Vector::zeros(2);
    let options = NewtonOptions {
        simulates_inertia: true,
        tries_orthogonal_directions: 1,
    };
    let step = update_by_newton_raphson(&mut x, &objective, options, &AccelContext::default()).unwrap();
    assert!(step.is_applied());
    assert!(x[0].abs() < 1e-3);
    assert!((x[1].abs() - 1.0).abs() < 1e-3);
    assert!(objective.energy(&x).unwrap() < 0.0);
}

#[test]
fn saddle_escape_disabled_by_default() {
    let objective = Diagonal {
        a: vec![2.0, -2.0],
        b: vec![0.0, 0.0],
    };
    let mut x = Vector::zeros(2);
    let step = update_by_newton_raphson(&mut x, &objective, NewtonOptions::default(), &AccelContext::default())
        .unwrap();
    assert!(!step.is_applied());
    assert_eq!(x.as_slice(), &[0.0, 0.0]);
}

// ─── Multigrid Tests ──────────────────────────────────────────

#[test]
fn furthest_point_sampling_spreads_points() {
    let points: Vec<DVec3> = (0..5).map(|i| DVec3::new(i as f64, 0.0, 0.0)).collect();
    let chosen = furthest_point_sampling(&points, &[0, 1, 2, 3, 4], 3);
    assert_eq!(chosen, vec![0, 4, 2]);
}

#[test]
fn hierarchy_invariants() {
    let scene = cloth_scene(4, 4, 1.0);
    let points = scene.points();
    let config = MultigridConfig {
        levels: 3,
        ..MultigridConfig::default()
    };
    let mg = Multigrid::build(&points, config).unwrap();

    assert_eq!(mg.levels(), 3);
    let grids = mg.grids();
    assert_eq!(grids[0].len(), 16);
    assert_eq!(grids[1].len(), 8);
    assert_eq!(grids[2].len(), 4);
    for level in 1..grids.len() {
        assert_eq!(grids[level][0], grids[level - 1][0]);
        assert!(grids[level].iter().all(|p| grids[level - 1].contains(p)));
    }

    let u0 = mg.interpolation(0).unwrap();
    assert_eq!(u0.shape(), (3 * 16, AFFINE_DOFS * 8));
    let u1 = mg.interpolation(1).unwrap();
    assert_eq!(u1.shape(), (AFFINE_DOFS * 8, AFFINE_DOFS * 4));
    assert_eq!(mg.restriction(0).unwrap(), &u0.transpose());
    assert_eq!(mg.restriction(1).unwrap(), &u1.transpose());
    assert!(mg.interpolation(2).is_none());

    // Each fine row of the finest operator touches exactly one coarse point.
    for row in 0..u0.height() {
        let touched: Vec<usize> = (0..u0.width())
            .filter(|&c| u0.get(row, c) != 0.0)
            .map(|c| c / AFFINE_DOFS)
            .collect();
        assert!(touched.windows(2).all(|w| w[0] == w[1]));
    }
}

#[test]
fn coarse_point_interpolates_its_own_translation() {
    let points = vec![DVec3::ZERO, DVec3::X, DVec3::new(5.0, 0.0, 0.0)];
    let mg = Multigrid::build(&points, MultigridConfig::default()).unwrap();
    assert_eq!(mg.grids()[1], vec![0, 2]);
    let u = mg.interpolation(0).unwrap();
    // Point 0 is itself coarse point 0: zero offset, unit translation weight.
    for axis in 0..3 {
        assert_eq!(u.get(axis, 9 + axis), 1.0);
        for j in 0..3 {
            assert_eq!(u.get(axis, 3 * j + axis), 0.0);
        }
    }
    // Point 1 follows coarse point 0 with offset (1, 0, 0).
    assert_eq!(u.get(3, 0), 1.0);
}

#[test]
fn hierarchy_stops_when_not_coarsening() {
    let mg = Multigrid::build(&[DVec3::ZERO], MultigridConfig::default()).unwrap();
    assert_eq!(mg.levels(), 1);
    assert!(Multigrid::build(&[], MultigridConfig::default()).is_err());
}

#[test]
fn v_cycle_solves_spd_system() {
    let scene = cloth_scene(4, 4, 1.0);
    let springs = scene.springs(100.0).unwrap();
    let mass3 = Vector::from_vec(vec![1.0; 48]);
    let a = assemble_projective_system(&mass3, &springs, 1.0 / 60.0);

    let mut mg = Multigrid::build(&scene.points(), MultigridConfig::default()).unwrap();
    mg.set_system(&a).unwrap();
    assert_eq!(mg.system(1).unwrap().shape(), (AFFINE_DOFS * 8, AFFINE_DOFS * 8));

    let b = Vector::from_vec((0..48).map(|i| ((i * 13 % 7) as f64) - 3.0).collect());
    let mut x = Vector::zeros(48);
    mg.solve(&mut x, &b).unwrap();
    let residual = tensio_math::solve::residual(&a, &x, &b).unwrap();
    assert!(residual.norm() < 1e-6 * b.norm());
}

#[test]
fn multigrid_solve_requires_system() {
    let mg = Multigrid::build(&[DVec3::ZERO, DVec3::X], MultigridConfig::default()).unwrap();
    let mut x = Vector::zeros(6);
    assert!(mg.solve(&mut x, &Vector::zeros(6)).is_err());
}

#[test]
fn multigrid_newton_descends_on_quadratic() {
    let objective = Diagonal {
        a: vec![4.0, 1.0, 2.0, 3.0, 1.0, 5.0],
        b: vec![1.0, -2.0, 0.5, 3.0, 0.0, -1.0],
    };
    let mut mg = Multigrid::build(&[DVec3::ZERO, DVec3::X], MultigridConfig::default()).unwrap();
    let mut x = Vector::zeros(6);
    let velocity = Vector::zeros(6);
    let before = objective.energy(&x).unwrap();

    let step =
        update_by_newton_multigrid(&mut mg, &mut x, &objective, &velocity, 0.5, &AccelContext::default()).unwrap();
    assert!(step.is_applied());
    assert!(objective.energy(&x).unwrap() < before);
}

#[test]
fn multigrid_skip_restores_positions() {
    // Minimum sits exactly at the inertial prediction x + v·dt.
    let objective = Diagonal {
        a: vec![2.0; 6],
        b: vec![1.0, 2.0, 3.0, -1.0, -2.0, -3.0],
    };
    let mut mg = Multigrid::build(&[DVec3::ZERO, DVec3::X], MultigridConfig::default()).unwrap();
    let mut x = Vector::zeros(6);
    let velocity = Vector::from_vec(vec![1.0, 2.0, 3.0, -1.0, -2.0, -3.0]);

    let step =
        update_by_newton_multigrid(&mut mg, &mut x, &objective, &velocity, 0.5, &AccelContext::default()).unwrap();
    assert_eq!(step, NewtonStep::Skipped(SkipReason::ZeroDirection));
    assert_eq!(x.as_slice(), &[0.0; 6]);
}

// ─── Simulator Tests ──────────────────────────────────────────

#[test]
fn two_point_spring_settles_under_newton() {
    let mut sim = Simulator::new(&two_point_scene(), pendulum_config(UpdateMode::Newton)).unwrap();
    let mut last = None;
    for _ in 0..300 {
        last = Some(sim.simulate().unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.mode, UpdateMode::Newton);
    assert_eq!(last.skipped, 0);

    let hanging = sim.position(PointId(1));
    // Rest length 1 stretched by m·g/k.
    assert!((hanging.z + 1.0981).abs() < 1e-3, "z = {}", hanging.z);
    assert!(hanging.x.abs() < 1e-2);
    assert!(sim.state().max_displacement() < 1e-3);
    // The penalty keeps the fixed point close, not exact.
    assert!(sim.position(PointId(0)).length() < 1e-3);
}

#[test]
fn two_point_spring_rests_on_ground() {
    let ground = -1.05;
    let config = SimulatorConfig {
        ground_height: ground,
        ..pendulum_config(UpdateMode::Newton)
    };
    let mut sim = Simulator::new(&two_point_scene(), config).unwrap();
    let mut collisions = 0;
    for _ in 0..300 {
        collisions += sim.simulate().unwrap().collisions;
        assert!(sim.position(PointId(1)).z >= ground);
    }
    assert!(collisions > 0);
    assert!((sim.position(PointId(1)).z - ground).abs() < 1e-9);
    assert!(sim.velocities().norm() < 0.1);
}

#[test]
fn projective_dynamics_repins_fixed_points_exactly() {
    let mut sim =
        Simulator::new(&two_point_scene(), pendulum_config(UpdateMode::ProjectiveDynamics)).unwrap();
    for _ in 0..300 {
        let result = sim.simulate().unwrap();
        assert_eq!(result.iterations, SimulatorConfig::default().pd_iterations);
        assert_eq!(sim.position(PointId(0)), DVec3::ZERO);
    }
    let hanging = sim.position(PointId(1));
    assert!((hanging.z + 1.0981).abs() < 2e-2, "z = {}", hanging.z);
    assert!(sim.state().max_displacement() < 1e-3);
}

#[test]
fn multigrid_repins_fixed_points_exactly() {
    let mut sim = Simulator::new(&two_point_scene(), pendulum_config(UpdateMode::Multigrid)).unwrap();
    assert_eq!(sim.multigrid().unwrap().levels(), 2);
    for _ in 0..300 {
        sim.simulate().unwrap();
        assert_eq!(sim.position(PointId(0)), DVec3::ZERO);
    }
    let hanging = sim.position(PointId(1));
    assert!((hanging.z + 1.0981).abs() < 2e-2, "z = {}", hanging.z);
}

#[test]
fn cloth_stays_finite_in_every_mode() {
    for mode in UpdateMode::ALL {
        let scene = cloth_scene(4, 4, 1.0);
        let mut sim = Simulator::new(&scene, pendulum_config(mode)).unwrap();
        for _ in 0..20 {
            sim.simulate().unwrap();
        }
        assert!(sim.positions().is_finite(), "{mode}");
        let lowest = sim.points().iter().map(|p| p.z).fold(f64::INFINITY, f64::min);
        assert!(lowest < 0.0, "{mode}: cloth should sag");
        if mode != UpdateMode::Newton {
            for i in 12..16 {
                assert_eq!(sim.position(PointId(i)), scene.point(i as usize));
            }
        }
    }
}

#[test]
fn stiff_cloth_stays_bounded_in_every_mode() {
    let scene = cloth_scene(6, 6, 0.1);
    for mode in UpdateMode::ALL {
        let config = SimulatorConfig {
            default_spring_constant: 1e4,
            ..SimulatorConfig::default()
        }
        .with_mode(mode);
        let mut sim = Simulator::new(&scene, config).unwrap();
        for step in 0..60 {
            sim.simulate().unwrap();
            assert!(sim.positions().is_finite(), "{mode} at step {step}");
            let stretch = sim
                .springs()
                .iter()
                .map(|s| sim.position(s.origin).distance(sim.position(s.end)) / s.rest_length)
                .fold(0.0, f64::max);
            assert!(stretch < 1.5, "{mode} at step {step}: stretch {stretch}");
        }
    }
}

#[test]
fn rest_configuration_is_idempotent_without_gravity() {
    for mode in UpdateMode::ALL {
        let scene = cloth_scene(3, 3, 1.0);
        let config = SimulatorConfig {
            gravity: 0.0,
            ..SimulatorConfig::default()
        }
        .with_mode(mode);
        let mut sim = Simulator::new(&scene, config).unwrap();
        for _ in 0..10 {
            sim.simulate().unwrap();
        }
        let original = Vector::from_slice(&scene.positions);
        assert!(sim.positions().approx_eq(&original, 1e-9), "{mode}");
        assert!(sim.kinetic_energy() < 1e-12, "{mode}");
    }
}

#[test]
fn newton_at_rest_reports_skipped_update() {
    let config = SimulatorConfig {
        gravity: 0.0,
        ..SimulatorConfig::default()
    };
    let mut sim = Simulator::new(&two_point_scene(), config).unwrap();
    let result = sim.simulate().unwrap();
    assert_eq!(result.iterations, 0);
    assert_eq!(result.skipped, 1);
    assert_eq!(sim.step_count(), 1);
}

#[test]
fn energy_breakdown_at_construction() {
    let scene = Scene::from_points(&[DVec3::new(0.0, 0.0, 2.0), DVec3::new(1.0, 0.0, 2.0)], vec![[0, 1]], 0.5);
    let sim = Simulator::new(&scene, SimulatorConfig::default()).unwrap();
    let energy = sim.energy_breakdown();
    assert_eq!(energy.kinetic, 0.0);
    assert_eq!(energy.elastic, 0.0);
    assert_eq!(energy.penalty, 0.0);
    assert!((energy.gravity - 2.0 * 0.5 * 9.81 * 2.0).abs() < 1e-12);
    assert_eq!(sim.total_energy(), energy.total());
}

#[test]
fn simulator_accessors() {
    let sim = Simulator::new(&cloth_scene(3, 3, 1.0), SimulatorConfig::default()).unwrap();
    assert_eq!(sim.point_count(), 9);
    // Center point: 4 structural + 4 shear springs.
    assert_eq!(sim.springs_connected_to(PointId(4)).len(), 8);
    assert!(sim.spring(SpringId(0)).is_some());
    assert!(sim.spring(SpringId(10_000)).is_none());
    assert!(sim.multigrid().is_none());
}

#[test]
fn simulator_rejects_invalid_input() {
    let config = SimulatorConfig {
        timestep: -1.0,
        ..SimulatorConfig::default()
    };
    assert!(matches!(
        Simulator::new(&two_point_scene(), config),
        Err(TensioError::InvalidConfig(_))
    ));

    let mut scene = two_point_scene();
    scene.masses.pop();
    assert!(matches!(
        Simulator::new(&scene, SimulatorConfig::default()),
        Err(TensioError::InvalidScene(_))
    ));
}

#[test]
fn accelerated_and_serial_paths_agree() {
    let scene = cloth_scene(5, 5, 1.0);
    let parallel = SimulatorConfig {
        accel_threshold: 8,
        ..SimulatorConfig::default()
    };
    let serial = SimulatorConfig {
        accel_threshold: usize::MAX,
        ..SimulatorConfig::default()
    };
    let mut a = Simulator::new(&scene, parallel).unwrap();
    let mut b = Simulator::new(&scene, serial).unwrap();
    for _ in 0..5 {
        a.simulate().unwrap();
        b.simulate().unwrap();
    }
    // Chunked reductions round differently.
    assert!(a.positions().approx_eq(b.positions(), 1e-9));
}
