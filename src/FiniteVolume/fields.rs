//! Cell-centred and face-centred fields.
//!
//! A `VolField<T>` stores one value per cell, one value per boundary face and one boundary
//! condition per patch. Boundary values are kept consistent with the conditions by
//! `correct_boundary_conditions`. An optional old-time copy of the cell values is kept for time
//! derivatives. A `SurfaceField<T>` stores one value per face, internal faces first.
use crate::FiniteVolume::field_value::FieldValue;
use crate::FiniteVolume::mesh::FvMesh;
use crate::VoF::errors::VoFError;
use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BoundaryCondition<T> {
    FixedValue { value: T },
    ZeroGradient,
}

impl<T: FieldValue> BoundaryCondition<T> {
    pub fn fixes_value(&self) -> bool {
        matches!(self, BoundaryCondition::FixedValue { .. })
    }
}

#[derive(Debug, Clone)]
pub struct VolField<T: FieldValue> {
    pub name: String,
    /// cell values
    pub internal: Vec<T>,
    /// boundary face values, indexed by `mesh.boundary_index(face)`
    pub boundary: Vec<T>,
    /// one condition per mesh patch
    pub conditions: Vec<BoundaryCondition<T>>,
    old_time: Option<Vec<T>>,
}

pub type VolScalarField = VolField<f64>;
pub type VolVectorField = VolField<Vector3<f64>>;

impl<T: FieldValue> VolField<T> {
    /// uniform field with zero-gradient conditions on every patch
    pub fn uniform(name: &str, mesh: &FvMesh, value: T) -> Self {
        Self {
            name: name.to_string(),
            internal: vec![value; mesh.n_cells()],
            boundary: vec![value; mesh.n_boundary_faces()],
            conditions: vec![BoundaryCondition::ZeroGradient; mesh.patches.len()],
            old_time: None,
        }
    }

    pub fn with_conditions(
        name: &str,
        mesh: &FvMesh,
        internal: Vec<T>,
        conditions: Vec<BoundaryCondition<T>>,
    ) -> Result<Self, VoFError> {
        if internal.len() != mesh.n_cells() {
            return Err(VoFError::SizeMismatch {
                name: name.to_string(),
                expected: mesh.n_cells(),
                found: internal.len(),
            });
        }
        if conditions.len() != mesh.patches.len() {
            return Err(VoFError::SizeMismatch {
                name: format!("boundary conditions of {}", name),
                expected: mesh.patches.len(),
                found: conditions.len(),
            });
        }
        let mut field = Self {
            name: name.to_string(),
            internal,
            boundary: vec![T::zero(); mesh.n_boundary_faces()],
            conditions,
            old_time: None,
        };
        field.correct_boundary_conditions(mesh);
        debug!("constructed field {}", name);
        Ok(field)
    }

    /// new field with the conditions of `other` and the given cell values
    pub fn like(name: &str, mesh: &FvMesh, other: &VolField<T>, internal: Vec<T>) -> Self {
        let mut field = Self {
            name: name.to_string(),
            internal,
            boundary: other.boundary.clone(),
            conditions: other.conditions.clone(),
            old_time: None,
        };
        field.correct_boundary_conditions(mesh);
        field
    }

    pub fn set_patch(
        &mut self,
        mesh: &FvMesh,
        patch: &str,
        condition: BoundaryCondition<T>,
    ) -> Result<(), VoFError> {
        let id = mesh
            .patch_id(patch)
            .ok_or_else(|| VoFError::UnknownPatch(patch.to_string()))?;
        self.conditions[id] = condition;
        self.correct_boundary_conditions(mesh);
        Ok(())
    }

    /// refresh boundary face values from the patch conditions
    pub fn correct_boundary_conditions(&mut self, mesh: &FvMesh) {
        for (patch_id, patch) in mesh.patches.iter().enumerate() {
            for face in patch.faces() {
                let b = mesh.boundary_index(face);
                self.boundary[b] = match &self.conditions[patch_id] {
                    BoundaryCondition::FixedValue { value } => *value,
                    BoundaryCondition::ZeroGradient => self.internal[mesh.owner[face]],
                };
            }
        }
    }

    /// condition governing a boundary face
    pub fn condition(&self, mesh: &FvMesh, face: usize) -> &BoundaryCondition<T> {
        &self.conditions[mesh.face_patch[mesh.boundary_index(face)]]
    }

    pub fn boundary_value(&self, mesh: &FvMesh, face: usize) -> T {
        self.boundary[mesh.boundary_index(face)]
    }

    pub fn store_old_time(&mut self) {
        self.old_time = Some(self.internal.clone());
    }

    /// replace the old-time values, e.g. with the start of a sub-cycle
    pub fn set_old_time(&mut self, old: Vec<T>) {
        self.old_time = Some(old);
    }

    pub fn has_old_time(&self) -> bool {
        self.old_time.is_some()
    }

    /// old-time cell values; the current values until `store_old_time` has been called
    pub fn old_time(&self) -> &[T] {
        self.old_time.as_deref().unwrap_or(&self.internal)
    }

    pub fn set_internal(&mut self, mesh: &FvMesh, values: Vec<T>) -> Result<(), VoFError> {
        if values.len() != self.internal.len() {
            return Err(VoFError::SizeMismatch {
                name: self.name.clone(),
                expected: self.internal.len(),
                found: values.len(),
            });
        }
        self.internal = values;
        self.correct_boundary_conditions(mesh);
        Ok(())
    }

    pub fn check_finite(&self) -> Result<(), VoFError> {
        let finite = |v: &T| (0..T::N_COMPONENTS).all(|d| v.component(d).is_finite());
        if self.internal.iter().all(finite) && self.boundary.iter().all(finite) {
            Ok(())
        } else {
            Err(VoFError::NonFinite(self.name.clone()))
        }
    }
}

impl VolField<f64> {
    pub fn min(&self) -> f64 {
        self.internal.iter().copied().fold(f64::INFINITY, f64::min)
    }
    pub fn max(&self) -> f64 {
        self.internal.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

#[derive(Debug, Clone)]
pub struct SurfaceField<T: FieldValue> {
    pub name: String,
    /// one value per face, internal faces first
    pub values: Vec<T>,
    /// name of the interpolation scheme that produced the field, if any
    pub scheme: Option<String>,
}

pub type SurfaceScalarField = SurfaceField<f64>;
pub type SurfaceVectorField = SurfaceField<Vector3<f64>>;

impl<T: FieldValue> SurfaceField<T> {
    pub fn uniform(name: &str, mesh: &FvMesh, value: T) -> Self {
        Self {
            name: name.to_string(),
            values: vec![value; mesh.n_faces()],
            scheme: None,
        }
    }

    pub fn from_values(name: &str, values: Vec<T>) -> Self {
        Self {
            name: name.to_string(),
            values,
            scheme: None,
        }
    }

    pub fn internal<'m>(&'m self, mesh: &FvMesh) -> &'m [T] {
        &self.values[..mesh.n_internal_faces()]
    }

    pub fn boundary<'m>(&'m self, mesh: &FvMesh) -> &'m [T] {
        &self.values[mesh.n_internal_faces()..]
    }

    pub fn check_finite(&self) -> Result<(), VoFError> {
        let finite = |v: &T| (0..T::N_COMPONENTS).all(|d| v.component(d).is_finite());
        if self.values.iter().all(finite) {
            Ok(())
        } else {
            Err(VoFError::NonFinite(self.name.clone()))
        }
    }
}
