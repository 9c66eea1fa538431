use crate::FiniteVolume::fields::{VolField, VolScalarField, VolVectorField};
use crate::FiniteVolume::fv_matrix::FvMatrix;
use crate::FiniteVolume::fvc;
use crate::FiniteVolume::mesh::FvMesh;
use enum_dispatch::enum_dispatch;
use log::debug;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// model selection as written in `phaseProperties.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum MomentumTransportType {
    #[serde(rename = "laminar")]
    Laminar,
    Smagorinsky {
        #[serde(rename = "Cs", default = "default_cs")]
        cs: f64,
    },
}

fn default_cs() -> f64 {
    0.17
}

impl Default for MomentumTransportType {
    fn default() -> Self {
        MomentumTransportType::Laminar
    }
}

// Common trait for the stress models of the mixture
#[enum_dispatch]
pub trait MomentumTransportModel {
    fn type_name(&self) -> &'static str;
    /// eddy viscosity per cell, zero for laminar flow
    fn nut(&self) -> &[f64];
    /// update the model from the current velocity
    fn correct(&mut self, mesh: &FvMesh, u: &VolVectorField);
    /// `-div(mu_eff dev2(T(grad U))) - laplacian(mu_eff, U)`
    fn div_dev_tau(
        &self,
        mesh: &FvMesh,
        rho: &VolScalarField,
        mu: &VolScalarField,
        u: &VolVectorField,
    ) -> FvMatrix<Vector3<f64>> {
        let mu_eff = effective_viscosity(mesh, rho, mu, self.nut());
        div_dev_tau_eff(mesh, &mu_eff, u)
    }
}

#[derive(Debug, Clone)]
pub struct Laminar {
    nut: Vec<f64>,
}

impl Laminar {
    pub fn new(mesh: &FvMesh) -> Self {
        Self {
            nut: vec![0.0; mesh.n_cells()],
        }
    }
}

impl MomentumTransportModel for Laminar {
    fn type_name(&self) -> &'static str {
        "laminar"
    }
    fn nut(&self) -> &[f64] {
        &self.nut
    }
    fn correct(&mut self, _mesh: &FvMesh, _u: &VolVectorField) {}
}

/// Smagorinsky LES model with the cube root of the cell volume as filter width
#[derive(Debug, Clone)]
pub struct Smagorinsky {
    pub cs: f64,
    nut: Vec<f64>,
}

impl Smagorinsky {
    pub fn new(mesh: &FvMesh, cs: f64) -> Self {
        Self {
            cs,
            nut: vec![0.0; mesh.n_cells()],
        }
    }
}

impl MomentumTransportModel for Smagorinsky {
    fn type_name(&self) -> &'static str {
        "Smagorinsky"
    }
    fn nut(&self) -> &[f64] {
        &self.nut
    }
    fn correct(&mut self, mesh: &FvMesh, u: &VolVectorField) {
        let grad_u = fvc::grad_vector(mesh, u);
        for (c, g) in grad_u.internal.iter().enumerate() {
            let s = (g + g.transpose()) * 0.5;
            let mag_s = (2.0 * s.component_mul(&s).sum()).sqrt();
            let delta = mesh.v[c].cbrt();
            self.nut[c] = (self.cs * delta).powi(2) * mag_s;
        }
        debug!(
            "Smagorinsky: max(nut) = {}",
            fvc::g_max(&self.nut)
        );
    }
}

#[derive(Debug, Clone)]
#[enum_dispatch(MomentumTransportModel)]
pub enum MomentumTransport {
    Laminar(Laminar),
    Smagorinsky(Smagorinsky),
}

pub fn create_momentum_transport(mesh: &FvMesh, model: &MomentumTransportType) -> MomentumTransport {
    match model {
        MomentumTransportType::Laminar => MomentumTransport::Laminar(Laminar::new(mesh)),
        MomentumTransportType::Smagorinsky { cs } => {
            MomentumTransport::Smagorinsky(Smagorinsky::new(mesh, *cs))
        }
    }
}

/// `mu + rho nut` as a cell field with boundary values
pub fn effective_viscosity(
    mesh: &FvMesh,
    rho: &VolScalarField,
    mu: &VolScalarField,
    nut: &[f64],
) -> VolScalarField {
    let mut mu_eff = mu.clone();
    mu_eff.name = "muEff".to_string();
    for c in 0..mesh.n_cells() {
        mu_eff.internal[c] += rho.internal[c] * nut[c];
    }
    for f in mesh.n_internal_faces()..mesh.n_faces() {
        let b = mesh.boundary_index(f);
        mu_eff.boundary[b] += rho.boundary[b] * nut[mesh.owner[f]];
    }
    mu_eff
}

/// deviatoric stress divergence for a given effective viscosity
pub fn div_dev_tau_eff(
    mesh: &FvMesh,
    mu_eff: &VolScalarField,
    u: &VolVectorField,
) -> FvMatrix<Vector3<f64>> {
    let mu_eff_f = fvc::interpolate(mesh, mu_eff);
    let mut m = -FvMatrix::laplacian(mesh, &mu_eff_f.values, u);

    let grad_u = fvc::grad_vector(mesh, u);
    let mut dev2_t = VolField::uniform("dev2(T(grad(U)))", mesh, Matrix3::zeros());
    dev2_t.internal = grad_u
        .internal
        .iter()
        .map(|g| {
            let t = g.transpose();
            t - Matrix3::identity() * (2.0 / 3.0 * t.trace())
        })
        .collect();
    dev2_t.correct_boundary_conditions(mesh);
    let dev2_t_f = fvc::interpolate(mesh, &dev2_t);
    let face_force: Vec<Vector3<f64>> = (0..mesh.n_faces())
        .map(|f| dev2_t_f.values[f].transpose() * mesh.sf[f] * mu_eff_f.values[f])
        .collect();
    m.add_explicit_source(mesh, &fvc::surface_integrate(mesh, &face_force));
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiniteVolume::fields::BoundaryCondition;
    use approx::assert_relative_eq;

    #[test]
    fn model_selection_from_json() {
        let laminar: MomentumTransportType = serde_json::from_str(r#"{"model": "laminar"}"#).unwrap();
        assert_eq!(laminar, MomentumTransportType::Laminar);
        let les: MomentumTransportType = serde_json::from_str(r#"{"model": "Smagorinsky"}"#).unwrap();
        assert_eq!(les, MomentumTransportType::Smagorinsky { cs: 0.17 });
        let mesh = FvMesh::line(2, 1.0).unwrap();
        assert_eq!(create_momentum_transport(&mesh, &les).type_name(), "Smagorinsky");
    }

    #[test]
    fn smagorinsky_viscosity_in_simple_shear() {
        let mesh = FvMesh::rectangle(3, 3, 3.0, 3.0).unwrap();
        let u = VolField::with_conditions(
            "U",
            &mesh,
            mesh.c.iter().map(|c| Vector3::new(c.y, 0.0, 0.0)).collect(),
            vec![BoundaryCondition::ZeroGradient; 4],
        )
        .unwrap();
        let mut model = create_momentum_transport(&mesh, &MomentumTransportType::Smagorinsky { cs: 0.2 });
        model.correct(&mesh, &u);
        // centre cell: dU/dy = 1, |S| = 1, delta = 1
        assert_relative_eq!(model.nut()[4], 0.04, epsilon = 1e-12);
    }

    #[test]
    fn uniform_flow_has_no_stress() {
        let mesh = FvMesh::rectangle(3, 3, 1.0, 1.0).unwrap();
        let u = VolField::uniform("U", &mesh, Vector3::new(1.0, 2.0, 0.0));
        let mut rho = VolField::uniform("rho", &mesh, 1000.0);
        rho.correct_boundary_conditions(&mesh);
        let mu = VolField::uniform("mu", &mesh, 1e-3);
        let model = create_momentum_transport(&mesh, &MomentumTransportType::Laminar);
        let m = model.div_dev_tau(&mesh, &rho, &mu, &u);
        for r in m.residual(&mesh, &u) {
            assert_relative_eq!(r.norm(), 0.0, epsilon = 1e-12);
        }
    }
}
