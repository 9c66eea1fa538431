use crate::FiniteVolume::fields::{BoundaryCondition, VolField, VolScalarField};
use crate::FiniteVolume::mesh::FvMesh;
use crate::VoF::errors::VoFError;
use log::info;
use serde::{Deserialize, Serialize};

/// properties of one phase as given in `phaseProperties.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseProperties {
    pub name: String,
    /// reference density [kg/m3]
    pub rho: f64,
    /// kinematic viscosity [m2/s]
    pub nu: f64,
    /// compressibility d(rho)/dp [s2/m2]; zero for an incompressible phase
    #[serde(default)]
    pub psi: f64,
}

impl PhaseProperties {
    pub fn new(name: &str, rho: f64, nu: f64) -> Self {
        Self {
            name: name.to_string(),
            rho,
            nu,
            psi: 0.0,
        }
    }

    fn validate(&self) -> Result<(), VoFError> {
        if self.rho <= 0.0 || self.nu < 0.0 || self.psi < 0.0 {
            return Err(VoFError::InvalidConfig(format!(
                "phase {}: rho must be positive, nu and psi non-negative",
                self.name
            )));
        }
        Ok(())
    }
}

/// Two immiscible phases sharing one velocity field.
///
/// `alpha1` is the evolved phase fraction; `alpha2` is always recomputed as `1 - alpha1`, cell and
/// boundary values alike. The phase densities are stored per cell so that barotropic phases can
/// follow the pressure.
#[derive(Debug, Clone)]
pub struct TwoPhaseMixture {
    pub phase1: PhaseProperties,
    pub phase2: PhaseProperties,
    pub alpha1: VolScalarField,
    pub alpha2: VolScalarField,
    /// density of phase 1 per cell
    pub rho1: Vec<f64>,
    /// density of phase 2 per cell
    pub rho2: Vec<f64>,
    /// mixture density
    pub rho: VolScalarField,
    /// mixture dynamic viscosity
    pub mu: VolScalarField,
}

impl TwoPhaseMixture {
    pub fn new(
        mesh: &FvMesh,
        phase1: PhaseProperties,
        phase2: PhaseProperties,
        alpha1: VolScalarField,
    ) -> Result<Self, VoFError> {
        phase1.validate()?;
        phase2.validate()?;
        if phase1.name == phase2.name {
            return Err(VoFError::InvalidConfig(format!(
                "both phases are called {}",
                phase1.name
            )));
        }
        let conditions = alpha1
            .conditions
            .iter()
            .map(|bc| match bc {
                BoundaryCondition::FixedValue { value } => {
                    BoundaryCondition::FixedValue { value: 1.0 - value }
                }
                BoundaryCondition::ZeroGradient => BoundaryCondition::ZeroGradient,
            })
            .collect();
        let alpha2 = VolField::with_conditions(
            &format!("alpha.{}", phase2.name),
            mesh,
            alpha1.internal.iter().map(|a| 1.0 - a).collect(),
            conditions,
        )?;
        info!(
            "two-phase mixture {} (rho = {}) / {} (rho = {})",
            phase1.name, phase1.rho, phase2.name, phase2.rho
        );
        let n = mesh.n_cells();
        let mut mixture = Self {
            rho1: vec![phase1.rho; n],
            rho2: vec![phase2.rho; n],
            phase1,
            phase2,
            alpha1,
            alpha2,
            rho: VolField::uniform("rho", mesh, 0.0),
            mu: VolField::uniform("mu", mesh, 0.0),
        };
        mixture.correct(mesh);
        mixture.rho.store_old_time();
        Ok(mixture)
    }

    pub fn alpha1_name(&self) -> &str {
        &self.alpha1.name
    }

    /// true if either phase has a non-zero compressibility
    pub fn compressible(&self) -> bool {
        self.phase1.psi > 0.0 || self.phase2.psi > 0.0
    }

    /// `alpha2 = 1 - alpha1` on cells and boundary faces
    pub fn correct_alpha2(&mut self) {
        for (a2, a1) in self.alpha2.internal.iter_mut().zip(self.alpha1.internal.iter()) {
            *a2 = 1.0 - a1;
        }
        for (a2, a1) in self.alpha2.boundary.iter_mut().zip(self.alpha1.boundary.iter()) {
            *a2 = 1.0 - a1;
        }
    }

    /// refresh alpha2, mixture density and mixture viscosity from alpha1
    pub fn correct(&mut self, mesh: &FvMesh) {
        self.correct_alpha2();
        let (nu1, nu2) = (self.phase1.nu, self.phase2.nu);
        for c in 0..mesh.n_cells() {
            let a1 = self.alpha1.internal[c];
            let a2 = self.alpha2.internal[c];
            self.rho.internal[c] = a1 * self.rho1[c] + a2 * self.rho2[c];
            self.mu.internal[c] = a1 * self.rho1[c] * nu1 + a2 * self.rho2[c] * nu2;
        }
        for f in mesh.n_internal_faces()..mesh.n_faces() {
            let b = mesh.boundary_index(f);
            let own = mesh.owner[f];
            let a1 = self.alpha1.boundary[b];
            let a2 = self.alpha2.boundary[b];
            self.rho.boundary[b] = a1 * self.rho1[own] + a2 * self.rho2[own];
            self.mu.boundary[b] = a1 * self.rho1[own] * nu1 + a2 * self.rho2[own] * nu2;
        }
    }

    /// barotropic phase densities `rho_i = rho_i,ref + psi_i p`
    pub fn update_densities(&mut self, p: &[f64]) {
        for (c, p) in p.iter().enumerate() {
            self.rho1[c] = (self.phase1.rho + self.phase1.psi * p).max(1e-3 * self.phase1.rho);
            self.rho2[c] = (self.phase2.rho + self.phase2.psi * p).max(1e-3 * self.phase2.rho);
        }
    }

    /// linear face interpolation of a per-cell phase property
    pub fn interpolate_cells(mesh: &FvMesh, values: &[f64]) -> Vec<f64> {
        let mut faces = Vec::with_capacity(mesh.n_faces());
        for f in 0..mesh.n_internal_faces() {
            let w = mesh.weights[f];
            faces.push(w * values[mesh.owner[f]] + (1.0 - w) * values[mesh.neighbour[f]]);
        }
        for f in mesh.n_internal_faces()..mesh.n_faces() {
            faces.push(values[mesh.owner[f]]);
        }
        faces
    }

    /// phase-1 volume `Σ V alpha1`
    pub fn phase1_volume(&self, mesh: &FvMesh) -> f64 {
        self.alpha1
            .internal
            .iter()
            .zip(mesh.v.iter())
            .map(|(a, v)| a * v)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn water_air(mesh: &FvMesh) -> TwoPhaseMixture {
        let alpha1 = VolField::with_conditions(
            "alpha.water",
            mesh,
            vec![1.0, 0.25, 0.0],
            vec![
                BoundaryCondition::FixedValue { value: 1.0 },
                BoundaryCondition::ZeroGradient,
            ],
        )
        .unwrap();
        TwoPhaseMixture::new(
            mesh,
            PhaseProperties::new("water", 1000.0, 1e-6),
            PhaseProperties::new("air", 1.0, 1.48e-5),
            alpha1,
        )
        .unwrap()
    }

    #[test]
    fn mixture_density_is_volume_weighted() {
        let mesh = FvMesh::line(3, 3.0).unwrap();
        let mixture = water_air(&mesh);
        assert_eq!(mixture.alpha2.name, "alpha.air");
        assert_relative_eq!(mixture.rho.internal[1], 0.25 * 1000.0 + 0.75, epsilon = 1e-12);
        assert_relative_eq!(mixture.rho.boundary[0], 1000.0, epsilon = 1e-12);
        assert_relative_eq!(mixture.mu.internal[0], 1e-3, epsilon = 1e-15);
        assert_relative_eq!(mixture.phase1_volume(&mesh), 1.25, epsilon = 1e-12);
        assert!(!mixture.compressible());
    }

    #[test]
    fn alpha2_complements_alpha1_exactly() {
        let mesh = FvMesh::line(3, 3.0).unwrap();
        let mut mixture = water_air(&mesh);
        mixture.alpha1.internal = vec![0.3, 0.6, 0.9];
        mixture.alpha1.correct_boundary_conditions(&mesh);
        mixture.correct(&mesh);
        for (a1, a2) in mixture.alpha1.internal.iter().zip(mixture.alpha2.internal.iter()) {
            assert_eq!(*a2, 1.0 - a1);
        }
        assert_eq!(mixture.alpha2.boundary[0], 0.0);
    }

    #[test]
    fn invalid_phase_is_rejected() {
        let mesh = FvMesh::line(1, 1.0).unwrap();
        let alpha1 = VolField::uniform("alpha.water", &mesh, 1.0);
        let result = TwoPhaseMixture::new(
            &mesh,
            PhaseProperties::new("water", -1.0, 1e-6),
            PhaseProperties::new("air", 1.0, 1e-5),
            alpha1,
        );
        assert!(matches!(result, Err(VoFError::InvalidConfig(_))));
    }

    #[test]
    fn barotropic_densities_follow_pressure() {
        let mesh = FvMesh::line(3, 3.0).unwrap();
        let mut mixture = water_air(&mesh);
        mixture.phase2.psi = 1e-5;
        assert!(mixture.compressible());
        mixture.update_densities(&[1e4, 0.0, -1e4]);
        assert_relative_eq!(mixture.rho2[0], 1.1, epsilon = 1e-12);
        assert_relative_eq!(mixture.rho2[2], 0.9, epsilon = 1e-12);
        assert_relative_eq!(mixture.rho1[0], 1000.0, epsilon = 1e-12);
    }
}
