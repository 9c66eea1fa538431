//! Multiple reference frame zones.
//!
//! Each zone rotates with angular velocity `omega * axis` about `origin`. Inside a zone the momentum
//! equation gains the Coriolis source `-rho (Omega x U)` and face fluxes can be converted between
//! the absolute and the rotating frame by subtracting or adding `(Omega x (Cf - origin)) · Sf`.
//! A face belongs to a zone when all of its cells do.
use crate::FiniteVolume::fields::{VolScalarField, VolVectorField};
use crate::FiniteVolume::fv_matrix::FvMatrix;
use crate::FiniteVolume::mesh::FvMesh;
use crate::VoF::errors::VoFError;
use log::info;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// axis-aligned box selecting the cells of a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl CellBox {
    fn contains(&self, p: &Vector3<f64>) -> bool {
        (0..3).all(|d| p[d] >= self.min[d] && p[d] <= self.max[d])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MRFZoneDict {
    pub name: String,
    /// all cells when absent
    #[serde(default)]
    pub cell_box: Option<CellBox>,
    pub origin: [f64; 3],
    pub axis: [f64; 3],
    /// rotation rate [rad/s]
    pub omega: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct MRFZone {
    pub name: String,
    pub origin: Vector3<f64>,
    /// angular velocity vector
    pub omega: Vector3<f64>,
    in_zone: Vec<bool>,
    faces: Vec<usize>,
}

impl MRFZone {
    pub fn new(mesh: &FvMesh, dict: &MRFZoneDict) -> Result<Self, VoFError> {
        let axis = Vector3::from(dict.axis);
        if axis.norm() == 0.0 {
            return Err(VoFError::InvalidConfig(format!(
                "MRF zone {}: zero rotation axis",
                dict.name
            )));
        }
        let in_zone: Vec<bool> = mesh
            .c
            .iter()
            .map(|c| dict.cell_box.as_ref().is_none_or(|b| b.contains(c)))
            .collect();
        let faces = (0..mesh.n_faces())
            .filter(|&f| {
                in_zone[mesh.owner[f]] && (f >= mesh.n_internal_faces() || in_zone[mesh.neighbour[f]])
            })
            .collect();
        let zone = Self {
            name: dict.name.clone(),
            origin: Vector3::from(dict.origin),
            omega: axis.normalize() * dict.omega,
            in_zone,
            faces,
        };
        info!(
            "MRF zone {}: {} cells, omega = {:?}",
            zone.name,
            zone.n_cells(),
            zone.omega.as_slice()
        );
        Ok(zone)
    }

    pub fn n_cells(&self) -> usize {
        self.in_zone.iter().filter(|z| **z).count()
    }

    fn frame_flux(&self, mesh: &FvMesh, f: usize) -> f64 {
        self.omega.cross(&(mesh.cf[f] - self.origin)).dot(&mesh.sf[f])
    }
}

#[derive(Debug, Clone, Default)]
pub struct MRFZoneList {
    pub zones: Vec<MRFZone>,
}

impl MRFZoneList {
    pub fn new(mesh: &FvMesh, dicts: &[MRFZoneDict]) -> Result<Self, VoFError> {
        let zones = dicts
            .iter()
            .filter(|d| d.active)
            .map(|d| MRFZone::new(mesh, d))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { zones })
    }

    pub fn active(&self) -> bool {
        !self.zones.is_empty()
    }

    /// Coriolis force `-rho (Omega x U)` on the cells of every zone
    pub fn add_coriolis(
        &self,
        mesh: &FvMesh,
        rho: &VolScalarField,
        u: &VolVectorField,
        eqn: &mut FvMatrix<Vector3<f64>>,
    ) {
        if !self.active() {
            return;
        }
        let mut su = vec![Vector3::zeros(); mesh.n_cells()];
        for zone in &self.zones {
            for c in (0..mesh.n_cells()).filter(|&c| zone.in_zone[c]) {
                su[c] -= zone.omega.cross(&u.internal[c]) * rho.internal[c];
            }
        }
        eqn.add_explicit_source(mesh, &su);
    }

    /// absolute flux to flux relative to the rotating frames
    pub fn make_relative(&self, mesh: &FvMesh, phi: &mut [f64]) {
        for zone in &self.zones {
            for &f in &zone.faces {
                phi[f] -= zone.frame_flux(mesh, f);
            }
        }
    }

    /// relative flux back to the absolute frame
    pub fn make_absolute(&self, mesh: &FvMesh, phi: &mut [f64]) {
        for zone in &self.zones {
            for &f in &zone.faces {
                phi[f] += zone.frame_flux(mesh, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiniteVolume::fields::VolField;
    use approx::assert_relative_eq;

    fn spinning(mesh: &FvMesh) -> MRFZoneList {
        let dict: Vec<MRFZoneDict> = serde_json::from_str(
            r#"[{"name": "rotor", "cellBox": {"min": [0, 0, 0], "max": [0.5, 1, 1]},
                 "origin": [0.5, 0.5, 0.5], "axis": [0, 0, 2], "omega": 3.0}]"#,
        )
        .unwrap();
        MRFZoneList::new(mesh, &dict).unwrap()
    }

    #[test]
    fn relative_and_absolute_fluxes_are_inverse() {
        let mesh = FvMesh::rectangle(4, 4, 1.0, 1.0).unwrap();
        let mrf = spinning(&mesh);
        assert!(mrf.active());
        assert_eq!(mrf.zones[0].n_cells(), 8);
        assert_relative_eq!(mrf.zones[0].omega.z, 3.0);
        let original: Vec<f64> = (0..mesh.n_faces()).map(|f| f as f64 * 0.01).collect();
        let mut phi = original.clone();
        mrf.make_relative(&mesh, &mut phi);
        assert!(phi.iter().zip(original.iter()).any(|(a, b)| a != b));
        mrf.make_absolute(&mesh, &mut phi);
        for (a, b) in phi.iter().zip(original.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn coriolis_force_acts_only_inside_the_zone() {
        let mesh = FvMesh::rectangle(4, 4, 1.0, 1.0).unwrap();
        let mrf = spinning(&mesh);
        let rho = VolField::uniform("rho", &mesh, 2.0);
        let u = VolField::uniform("U", &mesh, Vector3::new(1.0, 0.0, 0.0));
        let mut eqn = FvMatrix::new("U", &mesh);
        mrf.add_coriolis(&mesh, &rho, &u, &mut eqn);
        // Omega x U = (0, 3, 0)
        let v = mesh.v[0];
        assert_relative_eq!(eqn.source[0].y, -6.0 * v, epsilon = 1e-12);
        assert_relative_eq!(eqn.source[3].norm(), 0.0);
    }

    #[test]
    fn inactive_zones_are_skipped() {
        let mesh = FvMesh::line(2, 1.0).unwrap();
        let dict = MRFZoneDict {
            name: "off".to_string(),
            cell_box: None,
            origin: [0.0; 3],
            axis: [0.0, 0.0, 1.0],
            omega: 1.0,
            active: false,
        };
        assert!(!MRFZoneList::new(&mesh, &[dict]).unwrap().active());
    }
}
