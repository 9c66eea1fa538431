//! Courant numbers, adaptive time step and the local time-step field.
use crate::FiniteVolume::fields::VolScalarField;
use crate::FiniteVolume::fvc;
use crate::FiniteVolume::mesh::FvMesh;
use crate::FiniteVolume::{GREAT, SMALL};
use crate::Models::interface_properties::in_interface_band;
use crate::VoF::settings::{LtsControls, TimeControls};
use log::info;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CourantNumbers {
    pub mean: f64,
    pub max: f64,
    /// restricted to interface cells
    pub alpha_mean: f64,
    pub alpha_max: f64,
}

/// `Co = 0.5 Σ|φ| Δt / V`, and the same over cells with `0.01 < alpha1 < 0.99`
pub fn courant_numbers(
    mesh: &FvMesh,
    phi: &[f64],
    alpha1: &VolScalarField,
    delta_t: f64,
) -> CourantNumbers {
    let sum_phi = fvc::sum_mag(mesh, phi);
    let local: Vec<f64> = sum_phi.iter().zip(mesh.v.iter()).map(|(s, v)| s / v).collect();
    let interface: Vec<f64> = local
        .iter()
        .zip(alpha1.internal.iter())
        .map(|(co, a)| if in_interface_band(*a) { *co } else { 0.0 })
        .collect();
    let total_v = mesh.total_volume();
    let co = CourantNumbers {
        mean: 0.5 * sum_phi.iter().sum::<f64>() / total_v * delta_t,
        max: 0.5 * fvc::g_max(&local).max(0.0) * delta_t,
        alpha_mean: 0.5 * fvc::domain_integrate(mesh, &interface) / total_v * delta_t,
        alpha_max: 0.5 * fvc::g_max(&interface).max(0.0) * delta_t,
    };
    info!("Courant Number mean: {:.6} max: {:.6}", co.mean, co.max);
    info!(
        "Interface Courant Number mean: {:.6} max: {:.6}",
        co.alpha_mean, co.alpha_max
    );
    co
}

/// Largest stable step from both Courant limits.
///
/// The step grows by at most 20 % per step, and growth is damped by `1 + 0.1 factor`.
pub fn max_delta_t(controls: &TimeControls, co: &CourantNumbers, delta_t: f64) -> f64 {
    if !controls.adjust_time_step {
        return delta_t.min(controls.max_delta_t);
    }
    let max_factor = (controls.max_co / (co.max + SMALL))
        .min(controls.max_alpha_co / (co.alpha_max + SMALL));
    let factor = max_factor.min(1.0 + 0.1 * max_factor).min(1.2);
    (factor * delta_t).min(controls.max_delta_t)
}

/// initial step reduced so that the first step respects `max_co`
pub fn initial_delta_t(controls: &TimeControls, co: &CourantNumbers, delta_t: f64) -> f64 {
    if controls.adjust_time_step && co.max > SMALL {
        (controls.max_co * delta_t / co.max).min(delta_t).min(controls.max_delta_t)
    } else {
        delta_t
    }
}

/// Reciprocal local time step for pseudo-transient runs.
///
/// `rDeltaT = max(1/maxDeltaT, Σ|φ|/(2 maxCo V))`, raised in interface cells to honour `maxAlphaCo`,
/// smoothed so that neighbouring cells differ by at most `1 + smoothingCoeff`, and damped against
/// `previous` when the damping coefficient is below one.
pub fn local_r_delta_t(
    mesh: &FvMesh,
    phi: &[f64],
    alpha1: &VolScalarField,
    time: &TimeControls,
    lts: &LtsControls,
    previous: Option<&[f64]>,
) -> Vec<f64> {
    let sum_phi = fvc::sum_mag(mesh, phi);
    let floor = if time.max_delta_t < GREAT {
        1.0 / time.max_delta_t
    } else {
        0.0
    };
    let mut r_delta_t: Vec<f64> = sum_phi
        .iter()
        .zip(mesh.v.iter())
        .map(|(s, v)| (s / (2.0 * time.max_co * v)).max(floor))
        .collect();

    if time.max_alpha_co < time.max_co {
        let alpha_bar = face_average(mesh, alpha1);
        for c in 0..mesh.n_cells() {
            if alpha_bar[c] >= 0.01 && alpha_bar[c] <= 0.99 {
                let r_alpha = sum_phi[c] / (2.0 * time.max_alpha_co * mesh.v[c]);
                r_delta_t[c] = r_delta_t[c].max(r_alpha);
            }
        }
    }

    smooth(mesh, &mut r_delta_t, lts.r_delta_t_smoothing_coeff);

    if let Some(r0) = previous {
        if lts.r_delta_t_damping_coeff < 1.0 {
            for (r, r0) in r_delta_t.iter_mut().zip(r0) {
                *r = r.max((1.0 - lts.r_delta_t_damping_coeff) * r0);
            }
        }
    }
    info!(
        "deltaT = {} {}",
        1.0 / fvc::g_max(&r_delta_t).max(SMALL),
        1.0 / fvc::g_min(&r_delta_t).max(SMALL)
    );
    r_delta_t
}

/// face-area weighted average of the face values around each cell
fn face_average(mesh: &FvMesh, vf: &VolScalarField) -> Vec<f64> {
    let vf_f = fvc::interpolate(mesh, vf);
    let mut sum = vec![0.0; mesh.n_cells()];
    let mut area = vec![0.0; mesh.n_cells()];
    for f in 0..mesh.n_faces() {
        let own = mesh.owner[f];
        sum[own] += mesh.mag_sf[f] * vf_f.values[f];
        area[own] += mesh.mag_sf[f];
        if f < mesh.n_internal_faces() {
            let nei = mesh.neighbour[f];
            sum[nei] += mesh.mag_sf[f] * vf_f.values[f];
            area[nei] += mesh.mag_sf[f];
        }
    }
    sum.iter().zip(area.iter()).map(|(s, a)| s / (a + SMALL)).collect()
}

/// raise cell values until no cell is below `neighbour / (1 + coeff)`
pub fn smooth(mesh: &FvMesh, field: &mut [f64], coeff: f64) {
    let ratio = 1.0 + coeff;
    for _ in 0..mesh.n_cells().max(1) {
        let mut changed = false;
        for f in 0..mesh.n_internal_faces() {
            let own = mesh.owner[f];
            let nei = mesh.neighbour[f];
            if field[own] < field[nei] / ratio {
                field[own] = field[nei] / ratio;
                changed = true;
            } else if field[nei] < field[own] / ratio {
                field[nei] = field[own] / ratio;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}
