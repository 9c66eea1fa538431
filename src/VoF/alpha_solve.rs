//! Phase-fraction transport with MULES.
//!
//! The high-order flux is the vanLeer-limited convective flux plus the interface compression flux
//! `phir alpha1 alpha2` on internal faces. It is bounded either fully explicitly (`limit` +
//! `explicit_solve`) or, with `MULESCorr`, on top of an implicit upwind predictor (`limit_corr` +
//! `correct`). The step can be split into sub-cycles; the phase flux of the sub-cycles is
//! accumulated with weight `1/n`.
use crate::FiniteVolume::direction_interpolate;
use crate::FiniteVolume::fields::{SurfaceField, SurfaceScalarField, VolField, VolScalarField};
use crate::FiniteVolume::fv_matrix::FvMatrix;
use crate::FiniteVolume::fvc::{self, InverseTimeStep};
use crate::FiniteVolume::mesh::FvMesh;
use crate::FiniteVolume::mules::{self, MulesLimits};
use crate::Models::interface_properties::InterfaceProperties;
use crate::Models::two_phase_mixture::TwoPhaseMixture;
use crate::VoF::errors::VoFError;
use crate::VoF::vof_solver::VoFState;
use log::{info, warn};

/// gradient ratio beyond which the vanLeer `r` is clamped
const R_CLAMP: f64 = 1000.0;

/// Number of alpha sub-cycles for the interface Courant number `alpha_co`.
///
/// `ceil(alpha_co / max_alpha_co)` clamped to `[1, n_max]`; always one with local time stepping.
pub fn alpha_sub_cycles(alpha_co: f64, max_alpha_co: f64, n_max: usize, lts: bool) -> usize {
    if lts {
        return 1;
    }
    let required = (alpha_co / max_alpha_co).ceil();
    let n_max = n_max.max(1);
    if required > n_max as f64 {
        warn!(
            "interface Courant number {} needs {} alpha sub-cycles, limited to {}",
            alpha_co, required, n_max
        );
        return n_max;
    }
    (required as usize).max(1)
}

/// vanLeer TVD interpolation of `vf` in the direction of `phi`
pub fn van_leer_interpolate(mesh: &FvMesh, phi: &[f64], vf: &VolScalarField) -> Vec<f64> {
    let sign = |x: f64| if x >= 0.0 { 1.0 } else { -1.0 };
    let grad = fvc::grad(mesh, vf);
    let mut values = Vec::with_capacity(mesh.n_faces());
    for f in 0..mesh.n_internal_faces() {
        let own = mesh.owner[f];
        let nei = mesh.neighbour[f];
        let (c_p, c_n) = (vf.internal[own], vf.internal[nei]);
        let d = mesh.c[nei] - mesh.c[own];
        let gradf = c_n - c_p;
        let (gradcf, w_upwind) = if phi[f] >= 0.0 {
            (d.dot(&grad.internal[own]), 1.0)
        } else {
            (d.dot(&grad.internal[nei]), 0.0)
        };
        let r = if gradcf.abs() >= R_CLAMP * gradf.abs() {
            2.0 * R_CLAMP * sign(gradcf) * sign(gradf) - 1.0
        } else {
            2.0 * gradcf / gradf - 1.0
        };
        let limiter = (r + r.abs()) / (1.0 + r.abs());
        let w = limiter * mesh.weights[f] + (1.0 - limiter) * w_upwind;
        values.push(w * c_p + (1.0 - w) * c_n);
    }
    values.extend_from_slice(&vf.boundary);
    values
}

/// `phi alpha1_vanLeer + phir alpha2_up(-phir) alpha1_up`
pub fn high_order_flux(
    mesh: &FvMesh,
    phi: &SurfaceScalarField,
    mixture: &TwoPhaseMixture,
    interface: &InterfaceProperties,
) -> Vec<f64> {
    let alpha1 = &mixture.alpha1;
    let alpha1_f = van_leer_interpolate(mesh, &phi.values, alpha1);
    let mut flux: Vec<f64> = phi
        .values
        .iter()
        .zip(alpha1_f.iter())
        .map(|(phi, a)| phi * a)
        .collect();
    if interface.c_alpha <= 0.0 {
        return flux;
    }

    let n_internal = mesh.n_internal_faces();
    let phic: Vec<f64> = (0..mesh.n_faces())
        .map(|f| phi.values[f].abs() / mesh.mag_sf[f])
        .collect();
    let phic_max = fvc::g_max(&phic);
    let phir: Vec<f64> = (0..mesh.n_faces())
        .map(|f| {
            if f < n_internal {
                (interface.c_alpha * phic[f]).min(phic_max) * interface.n_hatf.values[f]
            } else {
                0.0
            }
        })
        .collect();
    let minus_phir = SurfaceField::from_values("-phir", phir.iter().map(|p| -p).collect());
    let alpha2_up = direction_interpolate::interpolate(
        mesh,
        &mixture.alpha2,
        &minus_phir,
        Some(alpha1.name.as_str()),
    );
    let compression = SurfaceField::from_values(
        "phirAlpha2",
        phir.iter()
            .zip(alpha2_up.values.iter())
            .map(|(p, a2)| p * a2)
            .collect(),
    );
    let alpha1_up = direction_interpolate::interpolate(mesh, alpha1, &compression, None);
    for f in 0..n_internal {
        flux[f] += compression.values[f] * alpha1_up.values[f];
    }
    flux
}

/// Sub-cycled alpha solve; updates `alpha_phi1`, `rho_phi`, the mixture and the interface.
///
/// Returns the number of sub-cycles used.
pub fn alpha_solve(state: &mut VoFState<'_>, su: &[f64], sp: &[f64]) -> Result<usize, VoFError> {
    let n_faces = state.mesh.n_faces();
    state.alpha_extrema = (f64::INFINITY, f64::NEG_INFINITY);
    let n = alpha_sub_cycles(
        state.co.alpha_max,
        state.settings.time.max_alpha_co,
        state.settings.alpha.n_alpha_sub_cycles,
        state.time.r_delta_t.is_some(),
    );
    let alpha_phi1 = if let Some(r_delta_t) = state.time.r_delta_t.clone() {
        alpha_eqn(state, &InverseTimeStep::Local(&r_delta_t), su, sp)?
    } else if n == 1 {
        alpha_eqn(state, &InverseTimeStep::Uniform(1.0 / state.time.delta_t), su, sp)?
    } else {
        let step_old = state.mixture.alpha1.old_time().to_vec();
        let sub_r_delta_t = InverseTimeStep::Uniform(n as f64 / state.time.delta_t);
        let mut total = vec![0.0; n_faces];
        for cycle in 0..n {
            if cycle > 0 {
                let start = state.mixture.alpha1.internal.clone();
                state.mixture.alpha1.set_old_time(start);
            }
            info!("alpha sub-cycle {} of {}", cycle + 1, n);
            let sub_flux = alpha_eqn(state, &sub_r_delta_t, su, sp)?;
            for (t, s) in total.iter_mut().zip(sub_flux.iter()) {
                *t += s / n as f64;
            }
        }
        state.mixture.alpha1.set_old_time(step_old);
        total
    };

    let mesh: &FvMesh = &*state.mesh;
    let mixture = &mut state.mixture;
    let rho1_f = TwoPhaseMixture::interpolate_cells(mesh, &mixture.rho1);
    let rho2_f = TwoPhaseMixture::interpolate_cells(mesh, &mixture.rho2);
    state.rho_phi.values = (0..n_faces)
        .map(|f| alpha_phi1[f] * (rho1_f[f] - rho2_f[f]) + state.phi.values[f] * rho2_f[f])
        .collect();
    state.alpha_phi1.values = alpha_phi1;
    mixture.correct(mesh);
    state.interface.correct(mesh, &mixture.alpha1);

    info!(
        "Phase-1 volume fraction = {} Min({}) = {} Max({}) = {}",
        fvc::weighted_average(mesh, &mixture.alpha1.internal),
        mixture.alpha1.name,
        mixture.alpha1.min(),
        mixture.alpha1.name,
        mixture.alpha1.max()
    );
    Ok(n)
}

/// One alpha solve over the time step `1/r_delta_t`; returns the phase flux.
///
/// The explicit update is limited once and conserves the phase volume to round-off. With
/// `MULESCorr` the implicit predictor conserves it only to the tolerance of the alpha solver.
fn alpha_eqn(
    state: &mut VoFState<'_>,
    r_delta_t: &InverseTimeStep,
    su: &[f64],
    sp: &[f64],
) -> Result<Vec<f64>, VoFError> {
    let VoFState {
        mesh,
        phi,
        mixture,
        interface,
        settings,
        alpha_phi1,
        alpha_phi1_corr0,
        alpha_restart,
        alpha_extrema,
        ..
    } = state;
    let mesh: &FvMesh = &**mesh;
    let phi: &SurfaceScalarField = phi;
    let interface: &InterfaceProperties = interface;
    let controls = &settings.alpha;
    let limits = MulesLimits {
        n_limiter_iter: controls.n_limiter_iter,
        ..MulesLimits::default()
    };
    let psi0 = mixture.alpha1.old_time().to_vec();
    let zeros = vec![0.0; mesh.n_cells()];

    let alpha_phi = if *alpha_restart && controls.mules_corr {
        // continue with the phase flux of the previous run instead of a fresh predictor
        info!("Applying the stored {}", alpha_phi1.name);
        let mut restored = alpha_phi1.values.clone();
        let start = VolField::like(&mixture.alpha1.name, mesh, &mixture.alpha1, psi0.clone());
        mules::limit(
            mesh,
            r_delta_t,
            &start,
            &psi0,
            phi,
            &mut restored,
            sp,
            su,
            &limits,
            false,
        );
        mules::explicit_solve(mesh, r_delta_t, &mut mixture.alpha1, &psi0, &restored, sp, su)?;
        mixture.correct_alpha2();
        *alpha_restart = false;
        restored
    } else if controls.mules_corr {
        let mut alpha1_eqn = FvMatrix::ddt(mesh, None, &mixture.alpha1, r_delta_t)
            + FvMatrix::div(mesh, &phi.values, &mixture.alpha1);
        alpha1_eqn.add_explicit_source(mesh, su);
        alpha1_eqn.add_implicit_source(mesh, sp);
        for performance in alpha1_eqn.solve(mesh, &mut mixture.alpha1, &controls.solver) {
            performance.log();
        }
        mixture.alpha1.check_finite()?;
        let mut alpha_phi10 = mules::upwind_flux(mesh, phi, &mixture.alpha1);

        if controls.alpha_apply_prev_corr {
            if let Some(corr0) = alpha_phi1_corr0.as_mut() {
                info!("Applying the previous iteration compression flux");
                mules::limit_corr(
                    mesh,
                    r_delta_t,
                    &mixture.alpha1,
                    &mut corr0.values,
                    &zeros,
                    &zeros,
                    &limits,
                );
                mules::correct(mesh, r_delta_t, &mut mixture.alpha1, &corr0.values, &zeros, &zeros)?;
                alpha_phi10
                    .iter_mut()
                    .zip(corr0.values.iter())
                    .for_each(|(a, c)| *a += c);
            }
        }
        let bounded = alpha_phi10.clone();
        mixture.correct_alpha2();

        for a_corr in 0..controls.n_alpha_corr {
            let ho = high_order_flux(mesh, phi, mixture, interface);
            let mut corr: Vec<f64> = ho.iter().zip(alpha_phi10.iter()).map(|(h, a)| h - a).collect();
            let alpha10 = mixture.alpha1.internal.clone();
            let su_corr: Vec<f64> = sp
                .iter()
                .zip(mixture.alpha1.internal.iter())
                .map(|(sp, a)| -sp * a)
                .collect();
            mules::limit_corr(mesh, r_delta_t, &mixture.alpha1, &mut corr, sp, &su_corr, &limits);
            mules::correct(mesh, r_delta_t, &mut mixture.alpha1, &corr, sp, &su_corr)?;
            if a_corr == 0 {
                alpha_phi10.iter_mut().zip(corr.iter()).for_each(|(a, c)| *a += c);
            } else {
                for (a, a0) in mixture.alpha1.internal.iter_mut().zip(alpha10.iter()) {
                    *a = 0.5 * *a + 0.5 * a0;
                }
                mixture.alpha1.correct_boundary_conditions(mesh);
                alpha_phi10.iter_mut().zip(corr.iter()).for_each(|(a, c)| *a += 0.5 * c);
            }
            mixture.correct_alpha2();
        }

        *alpha_phi1_corr0 = controls.alpha_apply_prev_corr.then(|| {
            SurfaceField::from_values(
                &format!("{}Corr0", alpha_phi1.name),
                alpha_phi10.iter().zip(bounded.iter()).map(|(a, b)| a - b).collect(),
            )
        });
        alpha_phi10
    } else {
        // the bounded flux and the local extrema come from the start of the sub-step
        let start = VolField::like(&mixture.alpha1.name, mesh, &mixture.alpha1, psi0.clone());
        let mut alpha_phi = high_order_flux(mesh, phi, mixture, interface);
        mules::limit(
            mesh,
            r_delta_t,
            &start,
            &psi0,
            phi,
            &mut alpha_phi,
            sp,
            su,
            &limits,
            false,
        );
        mules::explicit_solve(mesh, r_delta_t, &mut mixture.alpha1, &psi0, &alpha_phi, sp, su)?;
        mixture.correct_alpha2();
        alpha_phi
    };

    let (min, max) = bound_alpha(mesh, &mut mixture.alpha1, controls.alpha_bound_tolerance)?;
    alpha_extrema.0 = alpha_extrema.0.min(min);
    alpha_extrema.1 = alpha_extrema.1.max(max);
    mixture.correct_alpha2();
    Ok(alpha_phi)
}

/// clip alpha1 to `[0, 1]`, warning when the overshoot exceeds `tolerance`
///
/// Returns the extrema before clipping.
fn bound_alpha(
    mesh: &FvMesh,
    alpha1: &mut VolScalarField,
    tolerance: f64,
) -> Result<(f64, f64), VoFError> {
    alpha1.check_finite()?;
    let (min, max) = (alpha1.min(), alpha1.max());
    if min < -tolerance || max > 1.0 + tolerance {
        warn!(
            "{} out of bounds: min {} max {}, clipping to [0, 1]",
            alpha1.name, min, max
        );
    }
    alpha1.internal.iter_mut().for_each(|a| *a = a.clamp(0.0, 1.0));
    alpha1.correct_boundary_conditions(mesh);
    Ok((min, max))
}
