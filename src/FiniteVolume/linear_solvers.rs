//! Iterative solvers for LDU-addressed matrices.
//!
//! The matrix is given by its diagonal and one upper and one lower coefficient per internal face.
//! Two solvers are provided: a Gauss-Seidel smoother for asymmetric matrices (alpha predictor,
//! momentum) and a diagonal-preconditioned conjugate gradient for symmetric positive-definite
//! matrices (pressure). Residuals are normalised the same way for both so that tolerances are
//! comparable across fields.
use crate::FiniteVolume::mesh::FvMesh;
use log::{info, warn};
use serde::{Deserialize, Serialize};

const SOLVER_SMALL: f64 = 1e-20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    GaussSeidel,
    PCG,
}

impl SolverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::GaussSeidel => "GaussSeidel",
            SolverKind::PCG => "DICPCG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinearSolverControls {
    pub solver: SolverKind,
    pub tolerance: f64,
    pub rel_tol: f64,
    pub max_iter: usize,
    pub min_iter: usize,
}

impl Default for LinearSolverControls {
    fn default() -> Self {
        Self {
            solver: SolverKind::GaussSeidel,
            tolerance: 1e-8,
            rel_tol: 0.0,
            max_iter: 1000,
            min_iter: 0,
        }
    }
}

impl LinearSolverControls {
    pub fn pcg(tolerance: f64, rel_tol: f64) -> Self {
        Self {
            solver: SolverKind::PCG,
            tolerance,
            rel_tol,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverPerformance {
    pub solver_name: String,
    pub field_name: String,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub n_iterations: usize,
    pub converged: bool,
}

impl SolverPerformance {
    pub fn log(&self) {
        info!(
            "{}:  Solving for {}, Initial residual = {:e}, Final residual = {:e}, No Iterations {}",
            self.solver_name,
            self.field_name,
            self.initial_residual,
            self.final_residual,
            self.n_iterations
        );
        if !self.converged {
            warn!(
                "{} for {} did not converge in {} iterations",
                self.solver_name, self.field_name, self.n_iterations
            );
        }
    }
}

/// borrowed view of an assembled LDU matrix
pub struct LduSystem<'a> {
    pub mesh: &'a FvMesh,
    pub diag: &'a [f64],
    pub lower: &'a [f64],
    pub upper: &'a [f64],
}

impl<'a> LduSystem<'a> {
    pub fn new(mesh: &'a FvMesh, diag: &'a [f64], lower: &'a [f64], upper: &'a [f64]) -> Self {
        Self {
            mesh,
            diag,
            lower,
            upper,
        }
    }

    /// `A x`
    pub fn amul(&self, x: &[f64]) -> Vec<f64> {
        let mut y: Vec<f64> = self.diag.iter().zip(x.iter()).map(|(d, x)| d * x).collect();
        for f in 0..self.mesh.n_internal_faces() {
            let own = self.mesh.owner[f];
            let nei = self.mesh.neighbour[f];
            y[own] += self.upper[f] * x[nei];
            y[nei] += self.lower[f] * x[own];
        }
        y
    }

    /// residual normalisation factor, invariant to a uniform shift of the solution
    fn norm_factor(&self, x: &[f64], b: &[f64], ax: &[f64]) -> f64 {
        let n = x.len().max(1) as f64;
        let x_ref = x.iter().sum::<f64>() / n;
        let a_ref = self.amul(&vec![x_ref; x.len()]);
        ax.iter()
            .zip(b.iter())
            .zip(a_ref.iter())
            .map(|((ax, b), ar)| (ax - ar).abs() + (b - ar).abs())
            .sum::<f64>()
            + SOLVER_SMALL
    }

    fn residual_sum(&self, x: &[f64], b: &[f64]) -> f64 {
        self.amul(x)
            .iter()
            .zip(b.iter())
            .map(|(ax, b)| (b - ax).abs())
            .sum()
    }
}

fn converged(controls: &LinearSolverControls, initial: f64, current: f64, iter: usize) -> bool {
    iter >= controls.min_iter
        && (current < controls.tolerance
            || (controls.rel_tol > 0.0 && current < controls.rel_tol * initial))
}

/// solve `A x = b` starting from the given `x`
pub fn solve(
    system: &LduSystem,
    x: &mut [f64],
    b: &[f64],
    controls: &LinearSolverControls,
    field_name: &str,
) -> SolverPerformance {
    let performance = match controls.solver {
        SolverKind::GaussSeidel => gauss_seidel(system, x, b, controls, field_name),
        SolverKind::PCG => pcg(system, x, b, controls, field_name),
    };
    performance.log();
    performance
}

pub fn gauss_seidel(
    system: &LduSystem,
    x: &mut [f64],
    b: &[f64],
    controls: &LinearSolverControls,
    field_name: &str,
) -> SolverPerformance {
    let mesh = system.mesh;
    let ax = system.amul(x);
    let norm = system.norm_factor(x, b, &ax);
    let initial = ax.iter().zip(b.iter()).map(|(ax, b)| (b - ax).abs()).sum::<f64>() / norm;
    let mut current = initial;
    let mut iter = 0;
    while iter < controls.max_iter && !converged(controls, initial, current, iter) {
        for cell in 0..mesh.n_cells() {
            let mut sum = b[cell];
            for &f in mesh.cell_faces[cell].iter() {
                if mesh.owner[f] == cell {
                    sum -= system.upper[f] * x[mesh.neighbour[f]];
                } else {
                    sum -= system.lower[f] * x[mesh.owner[f]];
                }
            }
            x[cell] = sum / system.diag[cell];
        }
        iter += 1;
        current = system.residual_sum(x, b) / norm;
    }
    SolverPerformance {
        solver_name: SolverKind::GaussSeidel.as_str().to_string(),
        field_name: field_name.to_string(),
        initial_residual: initial,
        final_residual: current,
        n_iterations: iter,
        converged: converged(controls, initial, current, iter),
    }
}

/// conjugate gradient with diagonal preconditioning, for symmetric positive-definite matrices
pub fn pcg(
    system: &LduSystem,
    x: &mut [f64],
    b: &[f64],
    controls: &LinearSolverControls,
    field_name: &str,
) -> SolverPerformance {
    let ax = system.amul(x);
    let norm = system.norm_factor(x, b, &ax);
    let mut r: Vec<f64> = b.iter().zip(ax.iter()).map(|(b, ax)| b - ax).collect();
    let initial = r.iter().map(|r| r.abs()).sum::<f64>() / norm;
    let mut current = initial;
    let mut iter = 0;

    let precondition = |r: &[f64]| -> Vec<f64> {
        r.iter().zip(system.diag.iter()).map(|(r, d)| r / d).collect()
    };
    let mut z = precondition(&r);
    let mut p = z.clone();
    let mut rz: f64 = r.iter().zip(z.iter()).map(|(r, z)| r * z).sum();

    while iter < controls.max_iter && !converged(controls, initial, current, iter) {
        let q = system.amul(&p);
        let pq: f64 = p.iter().zip(q.iter()).map(|(p, q)| p * q).sum();
        if pq.abs() < SOLVER_SMALL {
            break;
        }
        let alpha = rz / pq;
        for i in 0..x.len() {
            x[i] += alpha * p[i];
            r[i] -= alpha * q[i];
        }
        iter += 1;
        current = r.iter().map(|r| r.abs()).sum::<f64>() / norm;

        z = precondition(&r);
        let rz_new: f64 = r.iter().zip(z.iter()).map(|(r, z)| r * z).sum();
        let beta = rz_new / (rz + SOLVER_SMALL);
        rz = rz_new;
        for i in 0..p.len() {
            p[i] = z[i] + beta * p[i];
        }
    }
    SolverPerformance {
        solver_name: SolverKind::PCG.as_str().to_string(),
        field_name: field_name.to_string(),
        initial_residual: initial,
        final_residual: current,
        n_iterations: iter,
        converged: converged(controls, initial, current, iter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// -d2x/dx2 = 1 on (0,1), x = 0 at both ends; exact x = s(1-s)/2
    fn poisson(n: usize) -> (FvMesh, Vec<f64>, Vec<f64>, Vec<f64>) {
        let mesh = FvMesh::line(n, 1.0).unwrap();
        let h = 1.0 / n as f64;
        let mut diag = vec![2.0 / h; n];
        diag[0] = 1.0 / h + 2.0 / h;
        diag[n - 1] = 1.0 / h + 2.0 / h;
        let off = vec![-1.0 / h; n - 1];
        let b = vec![h; n];
        (mesh, diag, off, b)
    }

    #[test]
    fn pcg_solves_poisson() {
        let (mesh, diag, off, b) = poisson(20);
        let system = LduSystem::new(&mesh, &diag, &off, &off);
        let mut x = vec![0.0; 20];
        let perf = pcg(&system, &mut x, &b, &LinearSolverControls::pcg(1e-12, 0.0), "T");
        assert!(perf.converged);
        assert!(perf.n_iterations <= 40);
        for (c, x) in mesh.c.iter().zip(x.iter()) {
            assert_relative_eq!(*x, 0.5 * c.x * (1.0 - c.x), epsilon = 2e-3);
        }
    }

    #[test]
    fn gauss_seidel_matches_pcg() {
        let (mesh, diag, off, b) = poisson(10);
        let system = LduSystem::new(&mesh, &diag, &off, &off);
        let mut x_cg = vec![0.0; 10];
        pcg(&system, &mut x_cg, &b, &LinearSolverControls::pcg(1e-12, 0.0), "T");
        let mut x_gs = vec![0.0; 10];
        let controls = LinearSolverControls {
            tolerance: 1e-12,
            max_iter: 10000,
            ..LinearSolverControls::default()
        };
        let perf = gauss_seidel(&system, &mut x_gs, &b, &controls, "T");
        assert!(perf.converged);
        for (a, b) in x_cg.iter().zip(x_gs.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn converged_start_needs_no_iterations() {
        let (mesh, diag, off, _) = poisson(4);
        let system = LduSystem::new(&mesh, &diag, &off, &off);
        let mut x = vec![1.0; 4];
        let b = system.amul(&x);
        let perf = solve(&system, &mut x, &b, &LinearSolverControls::default(), "p_rgh");
        assert_eq!(perf.n_iterations, 0);
        assert!(perf.converged);
        assert_eq!(perf.field_name, "p_rgh");
    }
}
