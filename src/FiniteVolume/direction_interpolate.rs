//! Upwind-side reconstruction of a cell field onto faces.
//!
//! The side of each internal face is chosen by the sign of a direction field: the owner value
//! where `dir >= 0`, the neighbour value otherwise. Boundary faces always take the boundary value.
//! The interpolated field is named `<field>_<direction>` and tagged with the scheme name
//! `reconstruct(<field>)` (or `reconstruct(<recon_field_name>)` when given), so the same call
//! always produces the same names.
use crate::FiniteVolume::field_value::FieldValue;
use crate::FiniteVolume::fields::{SurfaceField, SurfaceScalarField, VolField};
use crate::FiniteVolume::mesh::FvMesh;

pub fn interpolate<T: FieldValue>(
    mesh: &FvMesh,
    vf: &VolField<T>,
    dir: &SurfaceScalarField,
    recon_field_name: Option<&str>,
) -> SurfaceField<T> {
    let mut values = Vec::with_capacity(mesh.n_faces());
    for f in 0..mesh.n_internal_faces() {
        let cell = if dir.values[f] >= 0.0 {
            mesh.owner[f]
        } else {
            mesh.neighbour[f]
        };
        values.push(vf.internal[cell]);
    }
    values.extend_from_slice(&vf.boundary);

    let mut result = SurfaceField::from_values(&format!("{}_{}", vf.name, dir.name), values);
    result.scheme = Some(format!(
        "reconstruct({})",
        recon_field_name.unwrap_or(&vf.name)
    ));
    result
}

/// direction field selecting the owner side on every face
pub fn pos(mesh: &FvMesh) -> SurfaceScalarField {
    SurfaceField::uniform("pos", mesh, 1.0)
}

/// direction field selecting the neighbour side on every internal face
pub fn neg(mesh: &FvMesh) -> SurfaceScalarField {
    SurfaceField::uniform("neg", mesh, -1.0)
}
