use crate::FiniteVolume::fields::{BoundaryCondition, VolField};
use crate::FiniteVolume::mesh::FvMesh;
use crate::Models::pressure_reference::PressureReferenceDict;
use crate::Models::two_phase_mixture::PhaseProperties;
use crate::VoF::phase_physics::PhysicsDict;
use crate::VoF::settings::CaseProperties;
use crate::VoF::vof_solver::InitialFields;
use nalgebra::Vector3;

/// water (phase 1) and air, no gravity, no surface tension
pub(super) fn water_air() -> CaseProperties {
    CaseProperties {
        phases: [
            PhaseProperties::new("water", 1000.0, 1e-6),
            PhaseProperties::new("air", 1.0, 1.48e-5),
        ],
        sigma: 0.0,
        physics: PhysicsDict::Incompressible,
        g: [0.0; 3],
        h_ref: 0.0,
        momentum_transport: Default::default(),
        mrf_zones: Vec::new(),
        mesh_motion: Default::default(),
        pressure_reference: PressureReferenceDict::default(),
    }
}

/// Fields of a 1-D channel: water enters on the left with velocity `u_in`, `p_rgh` is fixed on
/// the right.
pub(super) fn channel_fields(mesh: &FvMesh, alpha: Vec<f64>, u: Vec<f64>, u_in: f64) -> InitialFields {
    let n = mesh.n_cells();
    let alpha1 = VolField::with_conditions(
        "alpha.water",
        mesh,
        alpha,
        vec![
            BoundaryCondition::FixedValue { value: 1.0 },
            BoundaryCondition::ZeroGradient,
        ],
    )
    .unwrap();
    let u = VolField::with_conditions(
        "U",
        mesh,
        u.iter().map(|u| Vector3::new(*u, 0.0, 0.0)).collect(),
        vec![
            BoundaryCondition::FixedValue {
                value: Vector3::new(u_in, 0.0, 0.0),
            },
            BoundaryCondition::ZeroGradient,
        ],
    )
    .unwrap();
    let p_rgh = VolField::with_conditions(
        "p_rgh",
        mesh,
        vec![0.0; n],
        vec![
            BoundaryCondition::ZeroGradient,
            BoundaryCondition::FixedValue { value: 0.0 },
        ],
    )
    .unwrap();
    InitialFields {
        alpha1,
        u,
        p_rgh,
        phi: None,
        alpha_phi0: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{channel_fields, water_air};
    use crate::FiniteVolume::fields::{BoundaryCondition, VolField};
    use crate::FiniteVolume::mesh::FvMesh;
    use crate::Models::mrf::MRFZoneList;
    use crate::VoF::alpha_solve::{alpha_sub_cycles, high_order_flux, van_leer_interpolate};
    use crate::VoF::settings::SolverSettings;
    use crate::VoF::vof_solver::{InitialFields, VoFSolver};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn volume_of_phase1(mesh: &FvMesh, alpha: &[f64]) -> f64 {
        alpha.iter().zip(mesh.v.iter()).map(|(a, v)| a * v).sum()
    }

    /// net phase-1 outflow through the boundary faces
    fn boundary_outflow(mesh: &FvMesh, alpha_phi: &[f64]) -> f64 {
        alpha_phi[mesh.n_internal_faces()..].iter().sum()
    }

    /// a smeared water slug in front of air
    fn slug(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| match i {
                i if i < 4 => 1.0,
                4 => 0.5,
                _ => 0.0,
            })
            .collect()
    }

    /// Uniform stream `u` entering a rectangle through the left and bottom patches, air inflow,
    /// `p_rgh` fixed on the outlets.
    fn stream_fields(mesh: &FvMesh, alpha: Vec<f64>, u: Vector3<f64>) -> InitialFields {
        let n = mesh.n_cells();
        let zg = BoundaryCondition::ZeroGradient;
        let air = BoundaryCondition::FixedValue { value: 0.0 };
        let alpha1 = VolField::with_conditions(
            "alpha.water",
            mesh,
            alpha,
            vec![air.clone(), zg.clone(), air, zg.clone()],
        )
        .unwrap();
        let inlet = BoundaryCondition::FixedValue { value: u };
        let u = VolField::with_conditions(
            "U",
            mesh,
            vec![u; n],
            vec![
                inlet.clone(),
                BoundaryCondition::ZeroGradient,
                inlet,
                BoundaryCondition::ZeroGradient,
            ],
        )
        .unwrap();
        let outlet = BoundaryCondition::FixedValue { value: 0.0 };
        let p_rgh = VolField::with_conditions(
            "p_rgh",
            mesh,
            vec![0.0; n],
            vec![zg.clone(), outlet.clone(), zg, outlet],
        )
        .unwrap();
        InitialFields {
            alpha1,
            u,
            p_rgh,
            phi: None,
            alpha_phi0: None,
        }
    }

    /// centre of the phase-1 volume
    fn phase1_centroid(mesh: &FvMesh, alpha: &[f64]) -> Vector3<f64> {
        let moment = (0..mesh.n_cells()).fold(Vector3::zeros(), |m, c| {
            m + mesh.c[c] * (alpha[c] * mesh.v[c])
        });
        moment / volume_of_phase1(mesh, alpha)
    }

    #[test]
    fn sub_cycles_follow_the_interface_courant_number() {
        assert_eq!(alpha_sub_cycles(1.0, 1.0, 5, false), 1);
        assert_eq!(alpha_sub_cycles(0.0, 1.0, 5, false), 1);
        assert_eq!(alpha_sub_cycles(2.5, 1.0, 5, false), 3);
        // capped at the configured maximum
        assert_eq!(alpha_sub_cycles(3.5, 1.0, 3, false), 3);
        // never more than one with local time stepping
        assert_eq!(alpha_sub_cycles(10.0, 1.0, 5, true), 1);

        let mut previous = 0;
        for co in [0.1, 0.6, 1.2, 1.9, 2.4, 4.0, 7.5] {
            let n = alpha_sub_cycles(co, 0.5, 20, false);
            assert!(n >= previous);
            previous = n;
        }
    }

    #[test]
    fn van_leer_is_linear_on_smooth_profiles() {
        let mesh = FvMesh::line(4, 4.0).unwrap();
        let mut vf = VolField::uniform("x", &mesh, 0.0);
        vf.internal = mesh.c.iter().map(|c| c.x).collect();
        vf.correct_boundary_conditions(&mesh);
        let phi = vec![1.0; mesh.n_faces()];
        let faces = van_leer_interpolate(&mesh, &phi, &vf);

        let face_at = |x: f64| {
            (0..mesh.n_internal_faces())
                .find(|f| (mesh.cf[*f].x - x).abs() < 1e-12)
                .unwrap()
        };
        // interior face: r = 1, the limiter recovers linear interpolation
        assert_relative_eq!(faces[face_at(2.0)], 2.0, epsilon = 1e-12);
        // next to the zero-gradient wall the profile is flat upstream, so upwind
        assert_relative_eq!(faces[face_at(1.0)], 0.5, epsilon = 1e-12);

        let uniform = VolField::uniform("one", &mesh, 0.3);
        for value in van_leer_interpolate(&mesh, &phi, &uniform) {
            assert_relative_eq!(value, 0.3, epsilon = 1e-14);
        }
    }

    #[test]
    fn without_compression_the_flux_is_convective() {
        let mut mesh = FvMesh::line(8, 1.0).unwrap();
        let mrf = MRFZoneList::default();
        let mut settings = SolverSettings::default();
        settings.alpha.c_alpha = 0.0;
        let fields = channel_fields(&mesh, slug(8), vec![1.0; 8], 1.0);
        let solver = VoFSolver::new(&mut mesh, &mrf, settings, &water_air(), fields).unwrap();
        let state = &solver.state;
        let mesh: &FvMesh = &*state.mesh;
        let flux = high_order_flux(mesh, &state.phi, &state.mixture, &state.interface);
        let alpha_f = van_leer_interpolate(mesh, &state.phi.values, &state.mixture.alpha1);
        for f in 0..mesh.n_faces() {
            assert_relative_eq!(flux[f], state.phi.values[f] * alpha_f[f], epsilon = 1e-14);
        }
    }

    #[test]
    fn two_cell_inflow_moves_the_phase_downstream() {
        let mut mesh = FvMesh::line(2, 1.0).unwrap();
        let mrf = MRFZoneList::default();
        let fields = channel_fields(&mesh, vec![1.0, 0.0], vec![0.1, 0.1], 0.1);
        let mut solver =
            VoFSolver::new(&mut mesh, &mrf, SolverSettings::default(), &water_air(), fields)
                .unwrap();
        let before = volume_of_phase1(&solver.state.mesh, &solver.state.mixture.alpha1.internal);

        solver.advance_time(1.0);
        solver.pre_solve().unwrap();
        solver.alpha_predictor().unwrap();

        let state = &solver.state;
        let mesh: &FvMesh = &*state.mesh;
        let alpha = &state.mixture.alpha1.internal;
        assert!(alpha.iter().all(|a| (0.0..=1.0).contains(a)));
        assert!(alpha[1] > 0.0);
        for (a1, a2) in alpha.iter().zip(state.mixture.alpha2.internal.iter()) {
            assert_relative_eq!(a1 + a2, 1.0, epsilon = 1e-14);
        }
        // water enters through the left face only
        let left = mesh.n_internal_faces();
        assert_relative_eq!(state.alpha_phi1.values[left], -0.1, epsilon = 1e-14);
        let after = volume_of_phase1(mesh, alpha);
        assert_relative_eq!(
            after - before,
            -boundary_outflow(mesh, &state.alpha_phi1.values),
            epsilon = 1e-12
        );
    }

    #[test]
    fn zero_flux_leaves_the_phase_fraction_unchanged() {
        for mules_corr in [false, true] {
            let mut mesh = FvMesh::line(3, 1.0).unwrap();
            let mrf = MRFZoneList::default();
            let mut settings = SolverSettings::default();
            settings.alpha.mules_corr = mules_corr;
            let fields = channel_fields(&mesh, vec![1.0, 0.3, 0.0], vec![0.0; 3], 0.0);
            let mut solver =
                VoFSolver::new(&mut mesh, &mrf, settings, &water_air(), fields).unwrap();
            solver.advance_time(0.01);
            solver.pre_solve().unwrap();
            solver.alpha_predictor().unwrap();
            let alpha = &solver.state.mixture.alpha1.internal;
            for (a, expected) in alpha.iter().zip([1.0, 0.3, 0.0]) {
                assert_relative_eq!(*a, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn sub_cycled_explicit_transport_is_bounded_and_conservative() {
        let n = 20;
        let mut mesh = FvMesh::line(n, 1.0).unwrap();
        let mrf = MRFZoneList::default();
        let mut settings = SolverSettings::default();
        settings.time.max_alpha_co = 0.25;
        settings.alpha.n_alpha_sub_cycles = 10;
        settings.alpha.n_alpha_corr = 2;
        let fields = channel_fields(&mesh, slug(n), vec![1.0; n], 1.0);
        let mut solver = VoFSolver::new(&mut mesh, &mrf, settings, &water_air(), fields).unwrap();

        for step in 0..10 {
            let before =
                volume_of_phase1(&solver.state.mesh, &solver.state.mixture.alpha1.internal);
            solver.advance_time(0.04);
            solver.pre_solve().unwrap();
            solver.alpha_predictor().unwrap();
            let state = &solver.state;
            let mesh: &FvMesh = &*state.mesh;
            if step == 0 {
                // Co = 0.8 in the interface cells
                assert_eq!(state.n_alpha_sub_cycles, 4);
            }
            let alpha = &state.mixture.alpha1.internal;
            assert!(alpha.iter().all(|a| (0.0..=1.0).contains(a)));
            let after = volume_of_phase1(mesh, alpha);
            assert_relative_eq!(
                after - before,
                -0.04 * boundary_outflow(mesh, &state.alpha_phi1.values),
                epsilon = 1e-10
            );
        }
        // the front has advanced by about 0.4
        let alpha = &solver.state.mixture.alpha1.internal;
        assert!(alpha[10] > 0.5);
        assert!(alpha[n - 1] < 0.5);
    }

    #[test]
    fn semi_implicit_transport_stays_bounded() {
        let n = 20;
        let mut mesh = FvMesh::line(n, 1.0).unwrap();
        let mrf = MRFZoneList::default();
        let mut settings = SolverSettings::default();
        settings.alpha.mules_corr = true;
        settings.alpha.alpha_apply_prev_corr = true;
        settings.alpha.n_alpha_corr = 2;
        let fields = channel_fields(&mesh, slug(n), vec![1.0; n], 1.0);
        let mut solver = VoFSolver::new(&mut mesh, &mrf, settings, &water_air(), fields).unwrap();

        for _ in 0..10 {
            let before =
                volume_of_phase1(&solver.state.mesh, &solver.state.mixture.alpha1.internal);
            solver.advance_time(0.04);
            solver.pre_solve().unwrap();
            solver.alpha_predictor().unwrap();
            let state = &solver.state;
            let mesh: &FvMesh = &*state.mesh;
            let (min, max) = state.alpha_extrema;
            assert!(min >= -1e-9 && max <= 1.0 + 1e-9);
            let alpha = &state.mixture.alpha1.internal;
            assert!(alpha.iter().all(|a| (0.0..=1.0).contains(a)));
            // conserved to the tolerance of the implicit predictor
            let after = volume_of_phase1(mesh, alpha);
            assert_relative_eq!(
                after - before,
                -0.04 * boundary_outflow(mesh, &state.alpha_phi1.values),
                epsilon = 1e-8
            );
            for (a1, a2) in alpha.iter().zip(state.mixture.alpha2.internal.iter()) {
                assert_relative_eq!(a1 + a2, 1.0, epsilon = 1e-14);
            }
            assert!(state.alpha_phi1_corr0.is_some());
        }
        assert!(solver.state.mixture.alpha1.internal[6] > 0.5);
    }

    #[test]
    fn two_cell_front_crosses_a_cell_at_unit_courant_number() {
        for n_alpha_corr in [1, 2] {
            let mut mesh = FvMesh::line(2, 1.0).unwrap();
            let mrf = MRFZoneList::default();
            let mut settings = SolverSettings::default();
            settings.alpha.n_alpha_corr = n_alpha_corr;
            let fields = channel_fields(&mesh, vec![1.0, 0.0], vec![0.5, 0.5], 0.5);
            let mut solver = VoFSolver::new(&mut mesh, &mrf, settings, &water_air(), fields).unwrap();
            let before =
                volume_of_phase1(&solver.state.mesh, &solver.state.mixture.alpha1.internal);

            solver.advance_time(1.0);
            solver.pre_solve().unwrap();
            assert_relative_eq!(solver.co_num(), 1.0, epsilon = 1e-12);
            solver.alpha_predictor().unwrap();

            let state = &solver.state;
            let mesh: &FvMesh = &*state.mesh;
            let (min, max) = state.alpha_extrema;
            assert!(min >= -1e-12 && max <= 1.0 + 1e-12);
            // the inflow fills the downstream cell completely
            let alpha = &state.mixture.alpha1.internal;
            assert_relative_eq!(alpha[0], 1.0, epsilon = 1e-12);
            assert_relative_eq!(alpha[1], 1.0, epsilon = 1e-12);
            let after = volume_of_phase1(mesh, alpha);
            assert_relative_eq!(after - before, 0.5, epsilon = 1e-12);
            assert_relative_eq!(
                after - before,
                -boundary_outflow(mesh, &state.alpha_phi1.values),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn two_cell_front_at_unit_courant_number_semi_implicit() {
        let mut mesh = FvMesh::line(2, 1.0).unwrap();
        let mrf = MRFZoneList::default();
        let mut settings = SolverSettings::default();
        settings.alpha.mules_corr = true;
        settings.alpha.n_alpha_corr = 2;
        let fields = channel_fields(&mesh, vec![1.0, 0.0], vec![0.5, 0.5], 0.5);
        let mut solver = VoFSolver::new(&mut mesh, &mrf, settings, &water_air(), fields).unwrap();
        let before = volume_of_phase1(&solver.state.mesh, &solver.state.mixture.alpha1.internal);

        solver.advance_time(1.0);
        solver.pre_solve().unwrap();
        solver.alpha_predictor().unwrap();

        let state = &solver.state;
        let mesh: &FvMesh = &*state.mesh;
        let (min, max) = state.alpha_extrema;
        assert!(min >= -1e-12 && max <= 1.0 + 1e-12);
        // the implicit upwind predictor half fills the downstream cell and spills the rest
        let alpha = &state.mixture.alpha1.internal;
        assert_relative_eq!(alpha[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(alpha[1], 0.5, epsilon = 1e-9);
        let after = volume_of_phase1(mesh, alpha);
        assert_relative_eq!(
            after - before,
            -boundary_outflow(mesh, &state.alpha_phi1.values),
            epsilon = 1e-9
        );
    }

    #[test]
    fn compressed_blob_in_an_oblique_stream_is_bounded_and_conservative() {
        let nx = 16;
        let mut mesh = FvMesh::rectangle(nx, nx, 1.0, 1.0).unwrap();
        let mrf = MRFZoneList::default();
        let mut settings = SolverSettings::default();
        settings.alpha.n_alpha_corr = 2;
        settings.alpha.c_alpha = 1.0;
        let blob: Vec<f64> = (0..nx * nx)
            .map(|c| {
                let (i, j) = (c % nx, c / nx);
                if (3..7).contains(&i) && (3..7).contains(&j) { 1.0 } else { 0.0 }
            })
            .collect();
        let fields = stream_fields(&mesh, blob, Vector3::new(1.0, 0.5, 0.0));
        let mut solver = VoFSolver::new(&mut mesh, &mrf, settings, &water_air(), fields).unwrap();
        let start = phase1_centroid(&solver.state.mesh, &solver.state.mixture.alpha1.internal);
        let dt = 0.02;

        for _ in 0..20 {
            let before =
                volume_of_phase1(&solver.state.mesh, &solver.state.mixture.alpha1.internal);
            solver.advance_time(dt);
            solver.pre_solve().unwrap();
            assert!(solver.co_num() <= 0.5);
            solver.alpha_predictor().unwrap();

            let state = &solver.state;
            let mesh: &FvMesh = &*state.mesh;
            let (min, max) = state.alpha_extrema;
            assert!(min >= -1e-12, "undershoot {}", min);
            assert!(max <= 1.0 + 1e-12, "overshoot {}", max);
            let after = volume_of_phase1(mesh, &state.mixture.alpha1.internal);
            assert_relative_eq!(
                after - before,
                -dt * boundary_outflow(mesh, &state.alpha_phi1.values),
                epsilon = 1e-12
            );
        }
        // carried by (0.4, 0.2) over the 20 steps
        let state = &solver.state;
        let end = phase1_centroid(&state.mesh, &state.mixture.alpha1.internal);
        assert_relative_eq!(end.x - start.x, 0.4, epsilon = 0.05);
        assert_relative_eq!(end.y - start.y, 0.2, epsilon = 0.05);
    }
}
