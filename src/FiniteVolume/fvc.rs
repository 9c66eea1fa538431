//! Explicit finite-volume calculus.
//!
//! All operators act on the face-addressed mesh: cell-to-face interpolation, face fluxes,
//! divergence via face summation, Gauss gradient, face-normal gradient and reconstruction of a
//! cell vector from face fluxes. The global reductions used by the solver (maximum, weighted
//! average) also live here so that a partitioned build would only replace these functions.
use crate::FiniteVolume::field_value::FieldValue;
use crate::FiniteVolume::fields::{
    BoundaryCondition, SurfaceField, SurfaceScalarField, VolField, VolScalarField, VolVectorField,
};
use crate::FiniteVolume::mesh::FvMesh;
use crate::FiniteVolume::{SMALL, VSMALL};
use crate::VoF::errors::VoFError;
use nalgebra::{Matrix3, Vector3};

/// reciprocal time step, uniform or per cell (local time stepping)
#[derive(Debug, Clone, Copy)]
pub enum InverseTimeStep<'a> {
    Uniform(f64),
    Local(&'a [f64]),
}

impl InverseTimeStep<'_> {
    pub fn at(&self, cell: usize) -> f64 {
        match self {
            InverseTimeStep::Uniform(r) => *r,
            InverseTimeStep::Local(r) => r[cell],
        }
    }
}

/// linear interpolation of cell values to faces; boundary faces take the boundary values
pub fn interpolate<T: FieldValue>(mesh: &FvMesh, vf: &VolField<T>) -> SurfaceField<T> {
    let mut values = Vec::with_capacity(mesh.n_faces());
    for f in 0..mesh.n_internal_faces() {
        let w = mesh.weights[f];
        values.push(vf.internal[mesh.owner[f]] * w + vf.internal[mesh.neighbour[f]] * (1.0 - w));
    }
    values.extend_from_slice(&vf.boundary);
    let mut sf = SurfaceField::from_values(&format!("interpolate({})", vf.name), values);
    sf.scheme = Some("linear".to_string());
    sf
}

/// face flux `U_f · Sf` of a cell velocity field
pub fn flux(mesh: &FvMesh, u: &VolVectorField) -> SurfaceScalarField {
    let uf = interpolate(mesh, u);
    let values = uf
        .values
        .iter()
        .zip(mesh.sf.iter())
        .map(|(u, s)| u.dot(s))
        .collect();
    SurfaceField::from_values(&format!("flux({})", u.name), values)
}

/// sum of face values over the faces of each cell, signed outward
pub fn surface_sum<T: FieldValue>(mesh: &FvMesh, ssf: &[T]) -> Vec<T> {
    let mut sum = vec![T::zero(); mesh.n_cells()];
    for f in 0..mesh.n_internal_faces() {
        sum[mesh.owner[f]] += ssf[f];
        sum[mesh.neighbour[f]] -= ssf[f];
    }
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        sum[mesh.owner[f]] += ssf[f];
    }
    sum
}

/// surface sum divided by the cell volume
pub fn surface_integrate<T: FieldValue>(mesh: &FvMesh, ssf: &[T]) -> Vec<T> {
    surface_sum(mesh, ssf)
        .into_iter()
        .zip(mesh.v.iter())
        .map(|(s, v)| s * (1.0 / v))
        .collect()
}

/// divergence of a face flux field
pub fn div(mesh: &FvMesh, phi: &[f64]) -> Vec<f64> {
    surface_integrate(mesh, phi)
}

/// `Σ|φ|` over the faces of each cell
pub fn sum_mag(mesh: &FvMesh, phi: &[f64]) -> Vec<f64> {
    let abs: Vec<f64> = phi.iter().map(|p| p.abs()).collect();
    let mut sum = vec![0.0; mesh.n_cells()];
    for f in 0..mesh.n_internal_faces() {
        sum[mesh.owner[f]] += abs[f];
        sum[mesh.neighbour[f]] += abs[f];
    }
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        sum[mesh.owner[f]] += abs[f];
    }
    sum
}

/// Gauss gradient with linear interpolation; the boundary of the result is zero-gradient
pub fn grad(mesh: &FvMesh, vf: &VolScalarField) -> VolVectorField {
    let vf_f = interpolate(mesh, vf);
    let flux: Vec<Vector3<f64>> = vf_f
        .values
        .iter()
        .zip(mesh.sf.iter())
        .map(|(v, s)| s * *v)
        .collect();
    let internal = surface_integrate(mesh, &flux);
    let mut g = VolField::uniform(&format!("grad({})", vf.name), mesh, Vector3::zeros());
    g.internal = internal;
    g.correct_boundary_conditions(mesh);
    g
}

/// Gauss gradient of a vector field, `(grad U)_ij = d U_j / d x_i`
pub fn grad_vector(mesh: &FvMesh, u: &VolVectorField) -> VolField<Matrix3<f64>> {
    let uf = interpolate(mesh, u);
    let flux: Vec<Matrix3<f64>> = uf
        .values
        .iter()
        .zip(mesh.sf.iter())
        .map(|(u, s)| s * u.transpose())
        .collect();
    let internal = surface_integrate(mesh, &flux);
    let mut g = VolField::uniform(&format!("grad({})", u.name), mesh, Matrix3::zeros());
    g.internal = internal;
    g.correct_boundary_conditions(mesh);
    g
}

/// face-normal gradient `(ψ_N - ψ_P)·Δ`; boundary faces use the boundary value
pub fn sn_grad(mesh: &FvMesh, vf: &VolScalarField) -> SurfaceScalarField {
    let mut values = Vec::with_capacity(mesh.n_faces());
    for f in 0..mesh.n_internal_faces() {
        values.push(
            mesh.delta_coeffs[f] * (vf.internal[mesh.neighbour[f]] - vf.internal[mesh.owner[f]]),
        );
    }
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        let value = match vf.condition(mesh, f) {
            BoundaryCondition::FixedValue { .. } => {
                mesh.delta_coeffs[f] * (vf.boundary_value(mesh, f) - vf.internal[mesh.owner[f]])
            }
            BoundaryCondition::ZeroGradient => 0.0,
        };
        values.push(value);
    }
    SurfaceField::from_values(&format!("snGrad({})", vf.name), values)
}

/// cell vector whose face projections best match the given face fluxes
///
/// Solves `(Σ Sf Sf/|Sf|) U = Σ Sf/|Sf| ssf` per cell. Directions without faces (2-D and 1-D
/// meshes) are decoupled by putting a unit diagonal in the tensor.
pub fn reconstruct(mesh: &FvMesh, ssf: &SurfaceScalarField) -> VolVectorField {
    let mut tensor = vec![Matrix3::<f64>::zeros(); mesh.n_cells()];
    let mut rhs = vec![Vector3::<f64>::zeros(); mesh.n_cells()];
    for f in 0..mesh.n_faces() {
        let s = mesh.sf[f];
        let mag = mesh.mag_sf[f] + VSMALL;
        let t = s * s.transpose() / mag;
        let r = s * (ssf.values[f] / mag);
        tensor[mesh.owner[f]] += t;
        rhs[mesh.owner[f]] += r;
        if f < mesh.n_internal_faces() {
            tensor[mesh.neighbour[f]] += t;
            rhs[mesh.neighbour[f]] += r;
        }
    }
    let internal = tensor
        .into_iter()
        .zip(rhs)
        .map(|(mut t, r)| {
            let trace = t.trace();
            for d in 0..3 {
                if t[(d, d)] <= SMALL * trace {
                    t[(d, d)] = 1.0;
                }
            }
            t.try_inverse().map(|inv| inv * r).unwrap_or_else(Vector3::zeros)
        })
        .collect();
    let mut u = VolField::uniform(&format!("reconstruct({})", ssf.name), mesh, Vector3::zeros());
    u.internal = internal;
    u.correct_boundary_conditions(mesh);
    u
}

/// Euler time derivative of cell values
pub fn ddt(current: &[f64], old: &[f64], r_delta_t: &InverseTimeStep) -> Vec<f64> {
    current
        .iter()
        .zip(old.iter())
        .enumerate()
        .map(|(i, (c, o))| (c - o) * r_delta_t.at(i))
        .collect()
}

pub fn g_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn g_min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// volume-weighted average of cell values
pub fn weighted_average(mesh: &FvMesh, values: &[f64]) -> f64 {
    let total = mesh.total_volume();
    values.iter().zip(mesh.v.iter()).map(|(x, v)| x * v).sum::<f64>() / (total + VSMALL)
}

pub fn domain_integrate(mesh: &FvMesh, values: &[f64]) -> f64 {
    values.iter().zip(mesh.v.iter()).map(|(x, v)| x * v).sum()
}

/// Scales the outflow through zero-gradient velocity patches so that the boundary flux balances.
///
/// Needed when the pressure level is fixed by a reference cell: the pressure equation of a closed
/// or fully velocity-specified domain is only solvable for a balanced flux. Returns true when the
/// domain carries no boundary flux at all.
pub fn adjust_phi(mesh: &FvMesh, phi: &mut [f64], u: &VolVectorField) -> Result<bool, VoFError> {
    let mut mass_in = 0.0;
    let mut fixed_mass_out = 0.0;
    let mut adjustable_mass_out = 0.0;
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        if phi[f] < 0.0 {
            mass_in -= phi[f];
        } else if u.condition(mesh, f).fixes_value() {
            fixed_mass_out += phi[f];
        } else {
            adjustable_mass_out += phi[f];
        }
    }
    let total_flux = VSMALL + phi.iter().map(|p| p.abs()).sum::<f64>();

    let mass_corr = if adjustable_mass_out > VSMALL && adjustable_mass_out / total_flux > SMALL {
        (mass_in - fixed_mass_out) / adjustable_mass_out
    } else if (fixed_mass_out - mass_in).abs() / total_flux > 1e-8 {
        return Err(VoFError::Continuity(format!(
            "total flux {}, specified mass inflow {}, specified mass outflow {}, adjustable mass outflow {}",
            total_flux, mass_in, fixed_mass_out, adjustable_mass_out
        )));
    } else {
        1.0
    };
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        if phi[f] > 0.0 && !u.condition(mesh, f).fixes_value() {
            phi[f] *= mass_corr;
        }
    }
    Ok(mass_in / total_flux < SMALL
        && fixed_mass_out / total_flux < SMALL
        && adjustable_mass_out / total_flux < SMALL)
}
