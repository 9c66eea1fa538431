use crate::FiniteVolume::mesh::FvMesh;
use log::info;
use nalgebra::Vector3;

/// Gravity potential on cells and faces.
///
/// `gh = g·C - ghRef` and `ghf = g·Cf - ghRef` with `ghRef = -|g| hRef`, so that `p = p_rgh + rho gh`.
/// A zero gravity vector gives `p = p_rgh`.
#[derive(Debug, Clone)]
pub struct Buoyancy {
    pub g: Vector3<f64>,
    pub h_ref: f64,
    pub gh: Vec<f64>,
    pub ghf: Vec<f64>,
}

impl Buoyancy {
    pub fn new(mesh: &FvMesh, g: Vector3<f64>, h_ref: f64) -> Self {
        let mut buoyancy = Self {
            g,
            h_ref,
            gh: Vec::new(),
            ghf: Vec::new(),
        };
        buoyancy.move_mesh(mesh);
        info!("buoyancy: g = {:?}, hRef = {}", g.as_slice(), h_ref);
        buoyancy
    }

    pub fn buoyant(&self) -> bool {
        self.g.norm() > 0.0
    }

    fn gh_ref(&self) -> f64 {
        -self.g.norm() * self.h_ref
    }

    /// recompute `gh` and `ghf` after the mesh geometry changed
    pub fn move_mesh(&mut self, mesh: &FvMesh) {
        let gh_ref = self.gh_ref();
        self.gh = mesh.c.iter().map(|c| self.g.dot(c) - gh_ref).collect();
        self.ghf = mesh.cf.iter().map(|cf| self.g.dot(cf) - gh_ref).collect();
    }
}
