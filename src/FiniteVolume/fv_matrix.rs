//! Finite-volume matrix in LDU addressing.
//!
//! `FvMatrix<T>` represents `A psi = source` where `A` has one diagonal coefficient per cell and one
//! upper and one lower coefficient per internal face. Boundary contributions are kept apart
//! (`internal_coeffs` add to the owner diagonal, `boundary_coeffs` add to the owner source) so that
//! `A()` and `H()` can be formed the same way as for the momentum equation of a pressure-velocity
//! algorithm.
//!
//! Builders:
//! - `ddt`: Euler implicit time derivative, optionally with density and a local time step field
//! - `div`: upwind convection by a face flux
//! - `laplacian`: face-diffusivity Laplacian
//!
//! Sources written on the right-hand side of the equation are added by `add_explicit_source`
//! (`== su`) and `add_implicit_source` (`== Sp(sp, psi)`).
use crate::FiniteVolume::field_value::{FieldValue, component_name};
use crate::FiniteVolume::fields::{BoundaryCondition, VolField};
use crate::FiniteVolume::fvc::InverseTimeStep;
use crate::FiniteVolume::linear_solvers::{self, LduSystem, LinearSolverControls, SolverPerformance};
use crate::FiniteVolume::mesh::FvMesh;
use std::ops::{Add, AddAssign, Neg, Sub};

#[derive(Debug, Clone)]
pub struct FvMatrix<T: FieldValue> {
    pub psi_name: String,
    pub diag: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub source: Vec<T>,
    /// per boundary face, added to the owner diagonal
    pub internal_coeffs: Vec<f64>,
    /// per boundary face, added to the owner source
    pub boundary_coeffs: Vec<T>,
}

impl<T: FieldValue> FvMatrix<T> {
    pub fn new(psi_name: &str, mesh: &FvMesh) -> Self {
        Self {
            psi_name: psi_name.to_string(),
            diag: vec![0.0; mesh.n_cells()],
            lower: vec![0.0; mesh.n_internal_faces()],
            upper: vec![0.0; mesh.n_internal_faces()],
            source: vec![T::zero(); mesh.n_cells()],
            internal_coeffs: vec![0.0; mesh.n_boundary_faces()],
            boundary_coeffs: vec![T::zero(); mesh.n_boundary_faces()],
        }
    }

    /// `ddt(rho, psi)` with Euler implicit differencing; `rho` is `(current, old)`
    pub fn ddt(
        mesh: &FvMesh,
        rho: Option<(&[f64], &[f64])>,
        vf: &VolField<T>,
        r_delta_t: &InverseTimeStep,
    ) -> Self {
        let mut m = Self::new(&vf.name, mesh);
        let old = vf.old_time();
        for cell in 0..mesh.n_cells() {
            let (rho, rho0) = rho.map_or((1.0, 1.0), |(r, r0)| (r[cell], r0[cell]));
            let r_dt = r_delta_t.at(cell);
            m.diag[cell] = r_dt * rho * mesh.v[cell];
            m.source[cell] = old[cell] * (r_dt * rho0 * mesh.v0[cell]);
        }
        m
    }

    /// `div(flux, psi)` with upwind interpolation
    pub fn div(mesh: &FvMesh, flux: &[f64], vf: &VolField<T>) -> Self {
        let mut m = Self::new(&vf.name, mesh);
        for f in 0..mesh.n_internal_faces() {
            let phi = flux[f];
            if phi >= 0.0 {
                m.lower[f] = -phi;
                m.diag[mesh.owner[f]] += phi;
            } else {
                m.upper[f] = phi;
                m.diag[mesh.neighbour[f]] -= phi;
            }
        }
        for f in mesh.n_internal_faces()..mesh.n_faces() {
            let b = mesh.boundary_index(f);
            match vf.condition(mesh, f) {
                BoundaryCondition::FixedValue { value } => {
                    m.boundary_coeffs[b] = *value * (-flux[f]);
                }
                BoundaryCondition::ZeroGradient => {
                    m.internal_coeffs[b] = flux[f];
                }
            }
        }
        m
    }

    /// `laplacian(gamma, psi)` with the diffusivity given on faces
    pub fn laplacian(mesh: &FvMesh, gamma_f: &[f64], vf: &VolField<T>) -> Self {
        let mut m = Self::new(&vf.name, mesh);
        for f in 0..mesh.n_internal_faces() {
            let coeff = gamma_f[f] * mesh.mag_sf[f] * mesh.delta_coeffs[f];
            m.upper[f] = coeff;
            m.lower[f] = coeff;
            m.diag[mesh.owner[f]] -= coeff;
            m.diag[mesh.neighbour[f]] -= coeff;
        }
        for f in mesh.n_internal_faces()..mesh.n_faces() {
            let b = mesh.boundary_index(f);
            if let BoundaryCondition::FixedValue { value } = vf.condition(mesh, f) {
                let coeff = gamma_f[f] * mesh.mag_sf[f] * mesh.delta_coeffs[f];
                m.internal_coeffs[b] = -coeff;
                m.boundary_coeffs[b] = *value * (-coeff);
            }
        }
        m
    }

    /// right-hand side explicit source `== su`, given per unit volume
    pub fn add_explicit_source(&mut self, mesh: &FvMesh, su: &[T]) {
        for cell in 0..mesh.n_cells() {
            self.source[cell] += su[cell] * mesh.v[cell];
        }
    }

    /// right-hand side implicit source `== Sp(sp, psi)`, given per unit volume
    pub fn add_implicit_source(&mut self, mesh: &FvMesh, sp: &[f64]) {
        for cell in 0..mesh.n_cells() {
            self.diag[cell] -= sp[cell] * mesh.v[cell];
        }
    }

    fn total_diag(&self, mesh: &FvMesh) -> Vec<f64> {
        let mut diag = self.diag.clone();
        for f in mesh.n_internal_faces()..mesh.n_faces() {
            diag[mesh.owner[f]] += self.internal_coeffs[mesh.boundary_index(f)];
        }
        diag
    }

    fn total_source(&self, mesh: &FvMesh) -> Vec<T> {
        let mut source = self.source.clone();
        for f in mesh.n_internal_faces()..mesh.n_faces() {
            source[mesh.owner[f]] += self.boundary_coeffs[mesh.boundary_index(f)];
        }
        source
    }

    /// implicit under-relaxation; the relaxed diagonal includes the boundary contributions
    pub fn relax(&mut self, mesh: &FvMesh, psi: &VolField<T>, alpha: f64) {
        if alpha <= 0.0 || alpha >= 1.0 {
            return;
        }
        let d = self.total_diag(mesh);
        for cell in 0..mesh.n_cells() {
            let relaxed = d[cell] / alpha;
            self.source[cell] += psi.internal[cell] * (relaxed - d[cell]);
            self.diag[cell] += relaxed - d[cell];
        }
    }

    /// fix the level of a singular matrix by pinning `psi[cell]` towards `value`
    pub fn set_reference(&mut self, cell: usize, value: T) {
        self.source[cell] += value * self.diag[cell];
        self.diag[cell] += self.diag[cell];
    }

    /// diagonal coefficient per unit volume
    pub fn a(&self, mesh: &FvMesh) -> Vec<f64> {
        self.total_diag(mesh)
            .iter()
            .zip(mesh.v.iter())
            .map(|(d, v)| d / v)
            .collect()
    }

    /// off-diagonal and source contributions per unit volume, `(b - Σ a_nb psi_nb)/V`
    pub fn h(&self, mesh: &FvMesh, psi: &VolField<T>) -> Vec<T> {
        let mut h = self.total_source(mesh);
        for f in 0..mesh.n_internal_faces() {
            let own = mesh.owner[f];
            let nei = mesh.neighbour[f];
            h[own] -= psi.internal[nei] * self.upper[f];
            h[nei] -= psi.internal[own] * self.lower[f];
        }
        h.into_iter()
            .zip(mesh.v.iter())
            .map(|(h, v)| h * (1.0 / v))
            .collect()
    }

    /// residual `b - A psi` per cell
    pub fn residual(&self, mesh: &FvMesh, psi: &VolField<T>) -> Vec<T> {
        let diag = self.total_diag(mesh);
        let mut r = self.total_source(mesh);
        for cell in 0..mesh.n_cells() {
            r[cell] -= psi.internal[cell] * diag[cell];
        }
        for f in 0..mesh.n_internal_faces() {
            let own = mesh.owner[f];
            let nei = mesh.neighbour[f];
            r[own] -= psi.internal[nei] * self.upper[f];
            r[nei] -= psi.internal[own] * self.lower[f];
        }
        r
    }

    /// solve component by component and refresh the boundary values of `psi`
    pub fn solve(
        &self,
        mesh: &FvMesh,
        psi: &mut VolField<T>,
        controls: &LinearSolverControls,
    ) -> Vec<SolverPerformance> {
        let diag = self.total_diag(mesh);
        let source = self.total_source(mesh);
        let system = LduSystem::new(mesh, &diag, &self.lower, &self.upper);
        let mut performance = Vec::with_capacity(T::N_COMPONENTS);
        for d in 0..T::N_COMPONENTS {
            let b: Vec<f64> = source.iter().map(|s| s.component(d)).collect();
            let mut x: Vec<f64> = psi.internal.iter().map(|v| v.component(d)).collect();
            let name = component_name::<T>(&psi.name, d);
            performance.push(linear_solvers::solve(&system, &mut x, &b, controls, &name));
            for (v, x) in psi.internal.iter_mut().zip(x) {
                v.set_component(d, x);
            }
        }
        psi.correct_boundary_conditions(mesh);
        performance
    }
}

impl<T: FieldValue> AddAssign for FvMatrix<T> {
    fn add_assign(&mut self, rhs: Self) {
        let add = |a: &mut Vec<f64>, b: &[f64]| a.iter_mut().zip(b).for_each(|(a, b)| *a += b);
        add(&mut self.diag, &rhs.diag[..]);
        add(&mut self.lower, &rhs.lower[..]);
        add(&mut self.upper, &rhs.upper[..]);
        add(&mut self.internal_coeffs, &rhs.internal_coeffs[..]);
        self.source
            .iter_mut()
            .zip(rhs.source)
            .for_each(|(a, b)| *a += b);
        self.boundary_coeffs
            .iter_mut()
            .zip(rhs.boundary_coeffs)
            .for_each(|(a, b)| *a += b);
    }
}

impl<T: FieldValue> Add for FvMatrix<T> {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<T: FieldValue> Neg for FvMatrix<T> {
    type Output = Self;
    fn neg(mut self) -> Self {
        let flip = |a: &mut Vec<f64>| a.iter_mut().for_each(|a| *a = -*a);
        flip(&mut self.diag);
        flip(&mut self.lower);
        flip(&mut self.upper);
        flip(&mut self.internal_coeffs);
        self.source.iter_mut().for_each(|s| *s = -*s);
        self.boundary_coeffs.iter_mut().for_each(|s| *s = -*s);
        self
    }
}

impl<T: FieldValue> Sub for FvMatrix<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiniteVolume::fields::BoundaryCondition;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn upwind_convection_of_uniform_inflow() {
        // steady div(phi, T) = 0 with T = 1 entering on the left
        let mesh = FvMesh::line(4, 1.0).unwrap();
        let mut t = VolField::with_conditions(
            "T",
            &mesh,
            vec![0.0; 4],
            vec![
                BoundaryCondition::FixedValue { value: 1.0 },
                BoundaryCondition::ZeroGradient,
            ],
        )
        .unwrap();
        let mut phi = vec![1.0; mesh.n_faces()];
        phi[mesh.patch("left").unwrap().start] = -1.0;
        let m = FvMatrix::div(&mesh, &phi, &t);
        let controls = LinearSolverControls {
            tolerance: 1e-12,
            ..LinearSolverControls::default()
        };
        m.solve(&mesh, &mut t, &controls);
        for v in t.internal.iter() {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn laplacian_with_fixed_ends_is_linear() {
        let mesh = FvMesh::line(5, 1.0).unwrap();
        let mut t = VolField::with_conditions(
            "T",
            &mesh,
            vec![0.0; 5],
            vec![
                BoundaryCondition::FixedValue { value: 0.0 },
                BoundaryCondition::FixedValue { value: 1.0 },
            ],
        )
        .unwrap();
        let gamma = vec![1.0; mesh.n_faces()];
        let m = -FvMatrix::laplacian(&mesh, &gamma, &t);
        m.solve(&mesh, &mut t, &LinearSolverControls::pcg(1e-12, 0.0));
        for (c, v) in mesh.c.iter().zip(t.internal.iter()) {
            assert_relative_eq!(*v, c.x, epsilon = 1e-9);
        }
    }

    #[test]
    fn a_and_h_reproduce_the_solution() {
        let mesh = FvMesh::line(3, 3.0).unwrap();
        let mut u = VolField::uniform("U", &mesh, Vector3::new(1.0, 0.0, 0.0));
        u.store_old_time();
        let mut phi = vec![1.0; mesh.n_faces()];
        phi[mesh.patch("left").unwrap().start] = -1.0;
        let mut m = FvMatrix::ddt(&mesh, None, &u, &InverseTimeStep::Uniform(2.0))
            + FvMatrix::div(&mesh, &phi, &u);
        m.relax(&mesh, &u, 0.7);
        let a = m.a(&mesh);
        let h = m.h(&mesh, &u);
        // a uniform field is a steady solution of the relaxed system
        let r = m.residual(&mesh, &u);
        for cell in 0..3 {
            assert_relative_eq!(r[cell].norm(), 0.0, epsilon = 1e-12);
            assert_relative_eq!((h[cell] / a[cell]).x, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn reference_pins_a_singular_system() {
        let mesh = FvMesh::line(3, 1.0).unwrap();
        let mut p = VolField::uniform("p_rgh", &mesh, 0.0);
        let gamma = vec![1.0; mesh.n_faces()];
        let mut m = -FvMatrix::laplacian(&mesh, &gamma, &p);
        m.set_reference(0, 5.0);
        m.solve(&mesh, &mut p, &LinearSolverControls::pcg(1e-12, 0.0));
        for v in p.internal.iter() {
            assert_relative_eq!(*v, 5.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn sources_and_operators_combine() {
        let mesh = FvMesh::line(2, 2.0).unwrap();
        let alpha = VolField::uniform("alpha", &mesh, 0.5);
        let mut m = FvMatrix::<f64>::new("alpha", &mesh);
        m.add_explicit_source(&mesh, &[2.0, 2.0]);
        m.add_implicit_source(&mesh, &[-1.0, -1.0]);
        assert_eq!(m.source, vec![2.0, 2.0]);
        assert_eq!(m.diag, vec![1.0, 1.0]);
        let zero = m.clone() - m;
        assert!(zero.diag.iter().all(|d| *d == 0.0));
        assert_eq!(alpha.name, zero.psi_name);
    }
}
