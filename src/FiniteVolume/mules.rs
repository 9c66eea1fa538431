//! MULES: multidimensional universal limiter for explicit solution.
//!
//! A high-order face flux is split into a bounded upwind part and a correction. The correction is
//! scaled face by face with a Zalesak-type limiter so that the explicit update stays within the
//! local extrema of the neighbourhood and the global bounds `[psi_min, psi_max]`. The limiter is
//! iterated `n_limiter_iter` times; each pass refines the face coefficients `lambda` in `[0, 1]`.
//!
//! Two entry points:
//! - `limit` + `explicit_solve`: limit the full high-order flux against the upwind flux, then
//!   advance `psi` from its start-of-step value
//! - `limit_corr` + `correct`: limit a correction flux on top of an already bounded predictor
//!   (semi-implicit mode) and apply it in place
use crate::FiniteVolume::ROOT_VSMALL;
use crate::FiniteVolume::direction_interpolate;
use crate::FiniteVolume::fields::{SurfaceScalarField, VolScalarField};
use crate::FiniteVolume::fvc::{self, InverseTimeStep};
use crate::FiniteVolume::mesh::FvMesh;
use crate::VoF::errors::VoFError;

const SMALL_FLUX: f64 = 1e-30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MulesLimits {
    pub psi_max: f64,
    pub psi_min: f64,
    pub n_limiter_iter: usize,
    /// widening of the local extrema as a fraction of `psi_max - psi_min`
    pub extrema_coeff: f64,
}

impl Default for MulesLimits {
    fn default() -> Self {
        Self {
            psi_max: 1.0,
            psi_min: 0.0,
            n_limiter_iter: 3,
            extrema_coeff: 0.0,
        }
    }
}

/// bounded upwind flux `phi * psi_upwind`
pub fn upwind_flux(mesh: &FvMesh, phi: &SurfaceScalarField, psi: &VolScalarField) -> Vec<f64> {
    let psi_up = direction_interpolate::interpolate(mesh, psi, phi, None);
    phi.values
        .iter()
        .zip(psi_up.values.iter())
        .map(|(phi, psi)| phi * psi)
        .collect()
}

/// advance `psi` from `psi0` with the (limited) flux `phi_psi` and the sources `su + sp*psi`
pub fn explicit_solve(
    mesh: &FvMesh,
    r_delta_t: &InverseTimeStep,
    psi: &mut VolScalarField,
    psi0: &[f64],
    phi_psi: &[f64],
    sp: &[f64],
    su: &[f64],
) -> Result<(), VoFError> {
    let div = fvc::surface_integrate(mesh, phi_psi);
    for cell in 0..mesh.n_cells() {
        let r_dt = r_delta_t.at(cell);
        psi.internal[cell] =
            (psi0[cell] * r_dt * mesh.v0[cell] / mesh.v[cell] + su[cell] - div[cell])
                / (r_dt - sp[cell]);
    }
    psi.correct_boundary_conditions(mesh);
    psi.check_finite()
}

/// apply an already limited correction flux in place
pub fn correct(
    mesh: &FvMesh,
    r_delta_t: &InverseTimeStep,
    psi: &mut VolScalarField,
    phi_corr: &[f64],
    sp: &[f64],
    su: &[f64],
) -> Result<(), VoFError> {
    let div = fvc::surface_integrate(mesh, phi_corr);
    for cell in 0..mesh.n_cells() {
        let r_dt = r_delta_t.at(cell);
        psi.internal[cell] =
            (psi.internal[cell] * r_dt + su[cell] - div[cell]) / (r_dt - sp[cell]);
    }
    psi.correct_boundary_conditions(mesh);
    psi.check_finite()
}

/// limit the high-order flux `phi_psi` in place
///
/// `psi` must hold the cell values `psi0` the explicit update starts from: the bounded upwind flux
/// and the local extrema are taken from it. On return `phi_psi` holds `phi_bd + lambda*phi_corr`, or only `lambda*phi_corr` when
/// `return_corr` is set.
#[allow(clippy::too_many_arguments)]
pub fn limit(
    mesh: &FvMesh,
    r_delta_t: &InverseTimeStep,
    psi: &VolScalarField,
    psi0: &[f64],
    phi: &SurfaceScalarField,
    phi_psi: &mut [f64],
    sp: &[f64],
    su: &[f64],
    limits: &MulesLimits,
    return_corr: bool,
) {
    let phi_bd = upwind_flux(mesh, phi, psi);
    let phi_corr: Vec<f64> = phi_psi
        .iter()
        .zip(phi_bd.iter())
        .map(|(ho, bd)| ho - bd)
        .collect();
    let lambda = limiter(
        mesh, r_delta_t, psi, psi0, &phi_bd, &phi_corr, sp, su, limits,
    );
    for f in 0..mesh.n_faces() {
        phi_psi[f] = if return_corr {
            lambda[f] * phi_corr[f]
        } else {
            phi_bd[f] + lambda[f] * phi_corr[f]
        };
    }
}

/// limit a correction flux in place against the current (bounded) `psi`
pub fn limit_corr(
    mesh: &FvMesh,
    r_delta_t: &InverseTimeStep,
    psi: &VolScalarField,
    phi_corr: &mut [f64],
    sp: &[f64],
    su: &[f64],
    limits: &MulesLimits,
) {
    let zero = vec![0.0; mesh.n_faces()];
    let lambda = limiter(
        mesh,
        r_delta_t,
        psi,
        &psi.internal,
        &zero,
        phi_corr,
        sp,
        su,
        limits,
    );
    phi_corr
        .iter_mut()
        .zip(lambda.iter())
        .for_each(|(c, l)| *c *= l);
}

/// face limiter coefficients in `[0, 1]`
#[allow(clippy::too_many_arguments)]
pub fn limiter(
    mesh: &FvMesh,
    r_delta_t: &InverseTimeStep,
    psi: &VolScalarField,
    psi0: &[f64],
    phi_bd: &[f64],
    phi_corr: &[f64],
    sp: &[f64],
    su: &[f64],
    limits: &MulesLimits,
) -> Vec<f64> {
    let n_cells = mesh.n_cells();
    let n_internal = mesh.n_internal_faces();

    // local extrema over the cell, its old value, face neighbours and boundary values
    let mut psi_maxn: Vec<f64> = (0..n_cells)
        .map(|c| psi.internal[c].max(psi0[c]))
        .collect();
    let mut psi_minn: Vec<f64> = (0..n_cells)
        .map(|c| psi.internal[c].min(psi0[c]))
        .collect();
    let mut sum_phip = vec![0.0; n_cells];
    let mut m_sum_phim = vec![0.0; n_cells];

    for f in 0..n_internal {
        let own = mesh.owner[f];
        let nei = mesh.neighbour[f];
        psi_maxn[own] = psi_maxn[own].max(psi.internal[nei]);
        psi_minn[own] = psi_minn[own].min(psi.internal[nei]);
        psi_maxn[nei] = psi_maxn[nei].max(psi.internal[own]);
        psi_minn[nei] = psi_minn[nei].min(psi.internal[own]);

        let corr = phi_corr[f];
        if corr > 0.0 {
            sum_phip[own] += corr;
            m_sum_phim[nei] += corr;
        } else {
            m_sum_phim[own] -= corr;
            sum_phip[nei] -= corr;
        }
    }
    for f in n_internal..mesh.n_faces() {
        let own = mesh.owner[f];
        let b = psi.boundary_value(mesh, f);
        psi_maxn[own] = psi_maxn[own].max(b);
        psi_minn[own] = psi_minn[own].min(b);
        let corr = phi_corr[f];
        if corr > 0.0 {
            sum_phip[own] += corr;
        } else {
            m_sum_phim[own] -= corr;
        }
    }

    let widen = limits.extrema_coeff * (limits.psi_max - limits.psi_min);
    let sum_phi_bd = fvc::surface_sum(mesh, phi_bd);
    for c in 0..n_cells {
        let max_c = (psi_maxn[c] + widen).min(limits.psi_max);
        let min_c = (psi_minn[c] - widen).max(limits.psi_min);
        let r_dt = r_delta_t.at(c);
        let v = mesh.v[c];
        let old = mesh.v0[c] * r_dt * psi0[c];
        // admissible net inflow and outflow of correction flux
        psi_maxn[c] = v * ((r_dt - sp[c]) * max_c - su[c]) - old + sum_phi_bd[c];
        psi_minn[c] = v * (su[c] - (r_dt - sp[c]) * min_c) + old - sum_phi_bd[c];
    }

    let mut lambda = vec![1.0; mesh.n_faces()];
    let mut lambdap = vec![0.0; n_cells];
    let mut lambdam = vec![0.0; n_cells];

    for _ in 0..limits.n_limiter_iter {
        let mut sum_l_phip = vec![0.0; n_cells];
        let mut m_sum_l_phim = vec![0.0; n_cells];
        for f in 0..n_internal {
            let own = mesh.owner[f];
            let nei = mesh.neighbour[f];
            let l_corr = lambda[f] * phi_corr[f];
            if l_corr > 0.0 {
                sum_l_phip[own] += l_corr;
                m_sum_l_phim[nei] += l_corr;
            } else {
                m_sum_l_phim[own] -= l_corr;
                sum_l_phip[nei] -= l_corr;
            }
        }
        for f in n_internal..mesh.n_faces() {
            let own = mesh.owner[f];
            let l_corr = lambda[f] * phi_corr[f];
            if l_corr > 0.0 {
                sum_l_phip[own] += l_corr;
            } else {
                m_sum_l_phim[own] -= l_corr;
            }
        }

        for c in 0..n_cells {
            lambdam[c] =
                ((sum_l_phip[c] + psi_maxn[c]) / (m_sum_phim[c] + ROOT_VSMALL)).clamp(0.0, 1.0);
            lambdap[c] =
                ((m_sum_l_phim[c] + psi_minn[c]) / (sum_phip[c] + ROOT_VSMALL)).clamp(0.0, 1.0);
        }

        for f in 0..n_internal {
            let own = mesh.owner[f];
            let nei = mesh.neighbour[f];
            lambda[f] = if phi_corr[f] >= 0.0 {
                lambda[f].min(lambdap[own].min(lambdam[nei]))
            } else {
                lambda[f].min(lambdam[own].min(lambdap[nei]))
            };
        }
        for f in n_internal..mesh.n_faces() {
            let own = mesh.owner[f];
            let fixed = psi.condition(mesh, f).fixes_value();
            let outflow = phi_bd[f] + phi_corr[f] > SMALL_FLUX;
            if fixed || outflow {
                lambda[f] = if phi_corr[f] > 0.0 {
                    lambda[f].min(lambdap[own])
                } else {
                    lambda[f].min(lambdam[own])
                };
            }
        }
    }
    lambda
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiniteVolume::fields::{BoundaryCondition, SurfaceField, VolField};
    use approx::assert_relative_eq;

    /// step profile advected to the right at Courant number `co` with a central flux
    fn setup(co: f64) -> (FvMesh, VolScalarField, SurfaceScalarField, Vec<f64>, f64) {
        let mesh = FvMesh::line(20, 1.0).unwrap();
        let internal: Vec<f64> = (0..20).map(|i| if (5..10).contains(&i) { 1.0 } else { 0.0 }).collect();
        let alpha = VolField::with_conditions(
            "alpha.water",
            &mesh,
            internal,
            vec![
                BoundaryCondition::FixedValue { value: 0.0 },
                BoundaryCondition::ZeroGradient,
            ],
        )
        .unwrap();
        let mut phi = SurfaceField::uniform("phi", &mesh, 1.0);
        let left = mesh.patch("left").unwrap().start;
        phi.values[left] = -1.0;
        let central = fvc::interpolate(&mesh, &alpha);
        let phi_alpha: Vec<f64> = phi
            .values
            .iter()
            .zip(central.values.iter())
            .map(|(p, a)| p * a)
            .collect();
        let dt = co * 0.05;
        (mesh, alpha, phi, phi_alpha, dt)
    }

    #[test]
    fn limited_explicit_update_is_bounded_and_conservative() {
        let (mesh, mut alpha, phi, mut phi_alpha, dt) = setup(0.5);
        let r_dt = InverseTimeStep::Uniform(1.0 / dt);
        let zeros = vec![0.0; mesh.n_cells()];
        let alpha0 = alpha.internal.clone();
        limit(
            &mesh, &r_dt, &alpha, &alpha0, &phi, &mut phi_alpha, &zeros, &zeros,
            &MulesLimits::default(), false,
        );
        explicit_solve(&mesh, &r_dt, &mut alpha, &alpha0, &phi_alpha, &zeros, &zeros).unwrap();

        assert!(alpha.min() >= -1e-12);
        assert!(alpha.max() <= 1.0 + 1e-12);
        let before: f64 = fvc::domain_integrate(&mesh, &alpha0);
        let after: f64 = fvc::domain_integrate(&mesh, &alpha.internal);
        let boundary: f64 = phi_alpha[mesh.n_internal_faces()..].iter().sum();
        assert_relative_eq!(after - before, -boundary * dt, epsilon = 1e-12);
    }

    #[test]
    fn limiter_coefficients_are_fractions() {
        let (mesh, alpha, phi, phi_alpha, dt) = setup(0.9);
        let r_dt = InverseTimeStep::Uniform(1.0 / dt);
        let zeros = vec![0.0; mesh.n_cells()];
        let phi_bd = upwind_flux(&mesh, &phi, &alpha);
        let corr: Vec<f64> = phi_alpha.iter().zip(phi_bd.iter()).map(|(a, b)| a - b).collect();
        let lambda = limiter(
            &mesh, &r_dt, &alpha, &alpha.internal, &phi_bd, &corr, &zeros, &zeros,
            &MulesLimits::default(),
        );
        assert!(lambda.iter().all(|l| (0.0..=1.0).contains(l)));
        // the correction at the leading edge would overshoot and is cut back
        assert!(lambda.iter().any(|l| *l < 1.0));
    }

    #[test]
    fn limited_correction_keeps_predictor_bounds() {
        let (mesh, mut alpha, phi, phi_alpha, dt) = setup(0.5);
        let r_dt = InverseTimeStep::Uniform(1.0 / dt);
        let zeros = vec![0.0; mesh.n_cells()];
        let alpha0 = alpha.internal.clone();
        let mut upwind = upwind_flux(&mesh, &phi, &alpha);
        explicit_solve(&mesh, &r_dt, &mut alpha, &alpha0, &upwind, &zeros, &zeros).unwrap();
        let mut corr: Vec<f64> = phi_alpha.iter().zip(upwind.iter()).map(|(a, b)| a - b).collect();
        limit_corr(&mesh, &r_dt, &alpha, &mut corr, &zeros, &zeros, &MulesLimits::default());
        correct(&mesh, &r_dt, &mut alpha, &corr, &zeros, &zeros).unwrap();
        assert!(alpha.min() >= -1e-12);
        assert!(alpha.max() <= 1.0 + 1e-12);
        upwind.iter_mut().zip(corr.iter()).for_each(|(u, c)| *u += c);
        let before = fvc::domain_integrate(&mesh, &alpha0);
        let after = fvc::domain_integrate(&mesh, &alpha.internal);
        let boundary: f64 = upwind[mesh.n_internal_faces()..].iter().sum();
        assert_relative_eq!(after - before, -boundary * dt, epsilon = 1e-12);
    }
}
