use crate::FiniteVolume::fields::VolScalarField;
use crate::FiniteVolume::mesh::FvMesh;
use crate::VoF::errors::VoFError;
use log::info;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// reference settings as written in the case dictionaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PressureReferenceDict {
    pub p_ref_cell: Option<usize>,
    pub p_ref_point: Option<[f64; 3]>,
    pub p_ref_value: f64,
}

/// Pressure level of a closed domain.
///
/// When no patch of `p_rgh` fixes its value the pressure equation is singular; the reference cell
/// and value remove the null space and set the level of `p`.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureReference {
    pub ref_cell: Option<usize>,
    pub ref_value: f64,
}

impl PressureReference {
    pub fn new(
        mesh: &FvMesh,
        p_rgh: &VolScalarField,
        dict: &PressureReferenceDict,
    ) -> Result<Self, VoFError> {
        if !Self::needs_reference(p_rgh) {
            return Ok(Self {
                ref_cell: None,
                ref_value: dict.p_ref_value,
            });
        }
        let cell = match (dict.p_ref_cell, dict.p_ref_point) {
            (Some(cell), _) => cell,
            (None, Some(point)) => mesh
                .find_nearest_cell(&Vector3::from(point))
                .ok_or_else(|| VoFError::InvalidConfig("empty mesh".to_string()))?,
            (None, None) => {
                return Err(VoFError::InvalidConfig(format!(
                    "{} needs a reference: give pRefCell or pRefPoint",
                    p_rgh.name
                )));
            }
        };
        if cell >= mesh.n_cells() {
            return Err(VoFError::InvalidConfig(format!(
                "pRefCell {} is outside the mesh ({} cells)",
                cell,
                mesh.n_cells()
            )));
        }
        info!("pressure reference: cell {} value {}", cell, dict.p_ref_value);
        Ok(Self {
            ref_cell: Some(cell),
            ref_value: dict.p_ref_value,
        })
    }

    /// no patch of the field fixes its value
    pub fn needs_reference(p_rgh: &VolScalarField) -> bool {
        !p_rgh.conditions.iter().any(|bc| bc.fixes_value())
    }

    pub fn ref_cell(&self) -> Option<usize> {
        self.ref_cell
    }

    pub fn ref_value(&self) -> f64 {
        self.ref_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiniteVolume::fields::{BoundaryCondition, VolField};

    #[test]
    fn closed_domain_needs_a_reference() {
        let mesh = FvMesh::line(4, 1.0).unwrap();
        let p_rgh = VolField::uniform("p_rgh", &mesh, 0.0);
        assert!(PressureReference::needs_reference(&p_rgh));
        let missing = PressureReference::new(&mesh, &p_rgh, &PressureReferenceDict::default());
        assert!(matches!(missing, Err(VoFError::InvalidConfig(_))));

        let dict = PressureReferenceDict {
            p_ref_point: Some([0.9, 0.5, 0.5]),
            p_ref_value: 1e5,
            ..Default::default()
        };
        let reference = PressureReference::new(&mesh, &p_rgh, &dict).unwrap();
        assert_eq!(reference.ref_cell(), Some(3));
        assert_eq!(reference.ref_value(), 1e5);
    }

    #[test]
    fn open_domain_has_no_reference_cell() {
        let mesh = FvMesh::line(4, 1.0).unwrap();
        let p_rgh = VolField::with_conditions(
            "p_rgh",
            &mesh,
            vec![0.0; 4],
            vec![
                BoundaryCondition::ZeroGradient,
                BoundaryCondition::FixedValue { value: 0.0 },
            ],
        )
        .unwrap();
        let reference = PressureReference::new(&mesh, &p_rgh, &PressureReferenceDict::default()).unwrap();
        assert_eq!(reference.ref_cell(), None);
    }
}
