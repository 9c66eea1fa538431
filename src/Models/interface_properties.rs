//! Interface normal, curvature and surface-tension force of a two-phase mixture.
//!
//! The interface normal on faces is the normalised, face-interpolated gradient of alpha1. The
//! normalisation is stabilised with `delta_n = 1e-8 / cbrt(average cell volume)`, so the normal
//! vanishes away from the interface. Curvature is `K = -div(nHatf)` and the surface-tension force
//! per face is `interpolate(sigma K) * snGrad(alpha1)`.
use crate::FiniteVolume::fields::{SurfaceField, SurfaceScalarField, VolField, VolScalarField};
use crate::FiniteVolume::fvc;
use crate::FiniteVolume::mesh::FvMesh;
use crate::VoF::errors::VoFError;
use log::debug;
use nalgebra::Vector3;

/// lower and upper alpha1 bounds of the cells counted as interface cells
pub const INTERFACE_BAND: (f64, f64) = (0.01, 0.99);

pub fn in_interface_band(alpha: f64) -> bool {
    alpha > INTERFACE_BAND.0 && alpha < INTERFACE_BAND.1
}

#[derive(Debug, Clone)]
pub struct InterfaceProperties {
    /// interface compression coefficient
    pub c_alpha: f64,
    /// surface tension coefficient [N/m]
    pub sigma: f64,
    delta_n: f64,
    /// face flux of the interface unit normal, `nHat_f · Sf`
    pub n_hatf: SurfaceScalarField,
    /// interface curvature
    pub k: VolScalarField,
}

impl InterfaceProperties {
    pub fn new(
        mesh: &FvMesh,
        alpha1: &VolScalarField,
        c_alpha: f64,
        sigma: f64,
    ) -> Result<Self, VoFError> {
        if c_alpha < 0.0 || sigma < 0.0 {
            return Err(VoFError::InvalidConfig(format!(
                "cAlpha ({}) and sigma ({}) must be non-negative",
                c_alpha, sigma
            )));
        }
        let avg_v = mesh.total_volume() / mesh.n_cells().max(1) as f64;
        let mut interface = Self {
            c_alpha,
            sigma,
            delta_n: 1e-8 / avg_v.cbrt(),
            n_hatf: SurfaceField::uniform("nHatf", mesh, 0.0),
            k: VolField::uniform("interfaceProperties:K", mesh, 0.0),
        };
        interface.correct(mesh, alpha1);
        Ok(interface)
    }

    pub fn delta_n(&self) -> f64 {
        self.delta_n
    }

    /// recompute the interface normal and curvature from alpha1
    pub fn correct(&mut self, mesh: &FvMesh, alpha1: &VolScalarField) {
        let grad_alpha = fvc::grad(mesh, alpha1);
        let grad_alpha_f = fvc::interpolate(mesh, &grad_alpha);
        let n_hatfv: Vec<Vector3<f64>> = grad_alpha_f
            .values
            .iter()
            .map(|g| g / (g.norm() + self.delta_n))
            .collect();
        self.n_hatf.values = n_hatfv
            .iter()
            .zip(mesh.sf.iter())
            .map(|(n, s)| n.dot(s))
            .collect();
        self.k.internal = fvc::div(mesh, &self.n_hatf.values)
            .into_iter()
            .map(|d| -d)
            .collect();
        self.k.correct_boundary_conditions(mesh);
        debug!(
            "interface curvature range [{}, {}]",
            self.k.min(),
            self.k.max()
        );
    }

    /// `interpolate(sigma K) * snGrad(alpha1)`
    pub fn surface_tension_force(&self, mesh: &FvMesh, alpha1: &VolScalarField) -> SurfaceScalarField {
        let mut sigma_k = self.k.clone();
        sigma_k.internal.iter_mut().for_each(|k| *k *= self.sigma);
        sigma_k.correct_boundary_conditions(mesh);
        let sigma_k_f = fvc::interpolate(mesh, &sigma_k);
        let sn_grad = fvc::sn_grad(mesh, alpha1);
        SurfaceField::from_values(
            "surfaceTensionForce",
            sigma_k_f
                .values
                .iter()
                .zip(sn_grad.values.iter())
                .map(|(s, g)| s * g)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiniteVolume::fields::BoundaryCondition;
    use approx::assert_relative_eq;

    #[test]
    fn planar_interface_has_no_curvature() {
        let mesh = FvMesh::rectangle(4, 6, 1.0, 1.5).unwrap();
        let alpha: Vec<f64> = mesh.c.iter().map(|c| if c.y < 0.75 { 1.0 } else { 0.0 }).collect();
        let alpha1 = VolField::with_conditions(
            "alpha.water",
            &mesh,
            alpha,
            vec![BoundaryCondition::ZeroGradient; 4],
        )
        .unwrap();
        let interface = InterfaceProperties::new(&mesh, &alpha1, 1.0, 0.07).unwrap();
        // horizontal faces between rows 2 and 3 carry the whole normal, pointing into phase 1
        for f in 0..mesh.n_internal_faces() {
            let s = mesh.sf[f];
            if s.y > 0.0 && (mesh.cf[f].y - 0.75).abs() < 1e-12 {
                assert_relative_eq!(interface.n_hatf.values[f], -s.norm(), epsilon = 1e-6);
            }
        }
        // the rows on either side of the interface see no curvature
        for c in 0..mesh.n_cells() {
            let y = mesh.c[c].y;
            if y > 0.5 && y < 1.0 {
                assert_relative_eq!(interface.k.internal[c], 0.0, epsilon = 1e-6);
            }
        }
        let stf = interface.surface_tension_force(&mesh, &alpha1);
        for v in stf.values {
            assert_relative_eq!(v, 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn negative_coefficients_are_rejected() {
        let mesh = FvMesh::line(2, 1.0).unwrap();
        let alpha1 = VolField::uniform("alpha.water", &mesh, 0.5);
        assert!(InterfaceProperties::new(&mesh, &alpha1, -1.0, 0.0).is_err());
        assert!(in_interface_band(0.5));
        assert!(!in_interface_band(0.995));
        assert!(!in_interface_band(0.01));
    }
}
