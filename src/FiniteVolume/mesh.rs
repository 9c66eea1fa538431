//! Face-addressed finite-volume mesh.
//!
//! Cells are addressed by index, faces by index with internal faces first. Every face has an owner
//! cell; internal faces also have a neighbour with `owner < neighbour`. Boundary faces are grouped
//! into named patches. Geometry derived from the primitive data (face magnitudes, interpolation
//! weights, delta coefficients, cell-to-face addressing) is computed by `update_geometry`.
use crate::FiniteVolume::SMALL;
use crate::VoF::errors::VoFError;
use log::{debug, info};
use nalgebra::Vector3;
use std::ops::Range;

/// named group of consecutive boundary faces
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub name: String,
    /// index of the first face of the patch in the global face list
    pub start: usize,
    pub size: usize,
}

impl Patch {
    pub fn new(name: &str, start: usize, size: usize) -> Self {
        Self {
            name: name.to_string(),
            start,
            size,
        }
    }
    /// global face indices of the patch
    pub fn faces(&self) -> Range<usize> {
        self.start..self.start + self.size
    }
}

#[derive(Debug, Clone)]
pub struct FvMesh {
    /// owner cell of every face
    pub owner: Vec<usize>,
    /// neighbour cell of every internal face
    pub neighbour: Vec<usize>,
    /// face area vectors, pointing out of the owner
    pub sf: Vec<Vector3<f64>>,
    pub mag_sf: Vec<f64>,
    /// face centres
    pub cf: Vec<Vector3<f64>>,
    /// cell centres
    pub c: Vec<Vector3<f64>>,
    /// cell volumes
    pub v: Vec<f64>,
    /// cell volumes at the old time
    pub v0: Vec<f64>,
    pub patches: Vec<Patch>,
    /// linear interpolation weight of the owner value on each face
    pub weights: Vec<f64>,
    /// 1/|d| on internal faces, 1/|n·(Cf - C)| on boundary faces
    pub delta_coeffs: Vec<f64>,
    /// internal faces of each cell
    pub cell_faces: Vec<Vec<usize>>,
    /// patch index of each boundary face
    pub face_patch: Vec<usize>,
    /// face volume swept by the mesh motion per unit time, present only on moving meshes
    pub mesh_phi: Option<Vec<f64>>,
    moving: bool,
}

impl FvMesh {
    pub fn new(
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        sf: Vec<Vector3<f64>>,
        cf: Vec<Vector3<f64>>,
        c: Vec<Vector3<f64>>,
        v: Vec<f64>,
        patches: Vec<Patch>,
    ) -> Result<Self, VoFError> {
        let n_faces = owner.len();
        if sf.len() != n_faces || cf.len() != n_faces {
            return Err(VoFError::SizeMismatch {
                name: "face geometry".to_string(),
                expected: n_faces,
                found: sf.len().min(cf.len()),
            });
        }
        if c.len() != v.len() {
            return Err(VoFError::SizeMismatch {
                name: "cell geometry".to_string(),
                expected: v.len(),
                found: c.len(),
            });
        }
        let n_boundary: usize = patches.iter().map(|p| p.size).sum();
        if neighbour.len() + n_boundary != n_faces {
            return Err(VoFError::SizeMismatch {
                name: "patches".to_string(),
                expected: n_faces - neighbour.len(),
                found: n_boundary,
            });
        }
        let n_cells = v.len();
        if owner.iter().chain(neighbour.iter()).any(|&cell| cell >= n_cells) {
            return Err(VoFError::InvalidConfig(
                "face addressing refers to a cell outside the mesh".to_string(),
            ));
        }
        let v0 = v.clone();
        let mut mesh = Self {
            owner,
            neighbour,
            sf,
            mag_sf: Vec::new(),
            cf,
            c,
            v,
            v0,
            patches,
            weights: Vec::new(),
            delta_coeffs: Vec::new(),
            cell_faces: Vec::new(),
            face_patch: Vec::new(),
            mesh_phi: None,
            moving: false,
        };
        mesh.update_geometry();
        debug!(
            "mesh: {} cells, {} faces, {} patches",
            mesh.n_cells(),
            mesh.n_faces(),
            mesh.patches.len()
        );
        Ok(mesh)
    }

    /// recompute face magnitudes, weights, delta coefficients and cell-face addressing
    pub fn update_geometry(&mut self) {
        let n_internal = self.n_internal_faces();
        self.mag_sf = self.sf.iter().map(|s| s.norm()).collect();
        self.weights = vec![1.0; self.n_faces()];
        self.delta_coeffs = vec![0.0; self.n_faces()];
        for f in 0..self.n_faces() {
            let n = self.sf[f] / (self.mag_sf[f] + SMALL);
            let own = self.owner[f];
            if f < n_internal {
                let nei = self.neighbour[f];
                let d_own = n.dot(&(self.cf[f] - self.c[own])).abs();
                let d_nei = n.dot(&(self.c[nei] - self.cf[f])).abs();
                self.weights[f] = d_nei / (d_own + d_nei + SMALL);
                self.delta_coeffs[f] = 1.0 / ((self.c[nei] - self.c[own]).norm() + SMALL);
            } else {
                let d = n.dot(&(self.cf[f] - self.c[own])).abs();
                self.delta_coeffs[f] = 1.0 / (d + SMALL);
            }
        }
        let mut cell_faces = vec![Vec::new(); self.n_cells()];
        for f in 0..n_internal {
            cell_faces[self.owner[f]].push(f);
            cell_faces[self.neighbour[f]].push(f);
        }
        self.cell_faces = cell_faces;
        let mut face_patch = vec![0; self.n_boundary_faces()];
        for (patch_id, patch) in self.patches.iter().enumerate() {
            for face in patch.faces() {
                face_patch[face - n_internal] = patch_id;
            }
        }
        self.face_patch = face_patch;
    }

    pub fn n_cells(&self) -> usize {
        self.v.len()
    }
    pub fn n_faces(&self) -> usize {
        self.owner.len()
    }
    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }
    pub fn n_boundary_faces(&self) -> usize {
        self.n_faces() - self.n_internal_faces()
    }
    /// position of a boundary face in per-boundary-face storage
    pub fn boundary_index(&self, face: usize) -> usize {
        face - self.n_internal_faces()
    }

    pub fn patch_id(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name == name)
    }

    pub fn patch(&self, name: &str) -> Result<&Patch, VoFError> {
        self.patches
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| VoFError::UnknownPatch(name.to_string()))
    }

    pub fn total_volume(&self) -> f64 {
        self.v.iter().sum()
    }

    /// index of the cell whose centre is closest to `point`
    pub fn find_nearest_cell(&self, point: &Vector3<f64>) -> Option<usize> {
        self.c
            .iter()
            .enumerate()
            .map(|(i, c)| (i, (c - point).norm()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    pub fn moving(&self) -> bool {
        self.moving
    }

    /// solid-body translation of the whole mesh over a time step
    ///
    /// Cell volumes are unchanged; the swept face volumes are stored as `mesh_phi`.
    pub fn translate(&mut self, displacement: &Vector3<f64>, delta_t: f64) {
        self.v0 = self.v.clone();
        for c in self.c.iter_mut() {
            *c += displacement;
        }
        for cf in self.cf.iter_mut() {
            *cf += displacement;
        }
        let velocity = displacement / delta_t;
        self.mesh_phi = Some(self.sf.iter().map(|s| velocity.dot(s)).collect());
        self.moving = true;
        self.update_geometry();
    }

    /// 1-D row of `n` cells along x with unit cross-section and patches `left`/`right`
    pub fn line(n: usize, length: f64) -> Result<Self, VoFError> {
        Self::block(n, 1, length, 1.0, false)
    }

    /// 2-D block of `nx` by `ny` cells of unit depth with patches `left`, `right`, `bottom`, `top`
    pub fn rectangle(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self, VoFError> {
        Self::block(nx, ny, lx, ly, true)
    }

    fn block(nx: usize, ny: usize, lx: f64, ly: f64, y_patches: bool) -> Result<Self, VoFError> {
        if nx == 0 || ny == 0 || lx <= 0.0 || ly <= 0.0 {
            return Err(VoFError::InvalidConfig(format!(
                "invalid block dimensions {}x{} of size {}x{}",
                nx, ny, lx, ly
            )));
        }
        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        let cell_id = |i: usize, j: usize| -> usize { j * nx + i };

        let mut owner = Vec::new();
        let mut neighbour = Vec::new();
        let mut sf = Vec::new();
        let mut cf = Vec::new();

        // internal faces normal to x, then normal to y
        for j in 0..ny {
            for i in 0..nx - 1 {
                owner.push(cell_id(i, j));
                neighbour.push(cell_id(i + 1, j));
                sf.push(Vector3::new(dy, 0.0, 0.0));
                cf.push(Vector3::new((i + 1) as f64 * dx, (j as f64 + 0.5) * dy, 0.5));
            }
        }
        for j in 0..ny - 1 {
            for i in 0..nx {
                owner.push(cell_id(i, j));
                neighbour.push(cell_id(i, j + 1));
                sf.push(Vector3::new(0.0, dx, 0.0));
                cf.push(Vector3::new((i as f64 + 0.5) * dx, (j + 1) as f64 * dy, 0.5));
            }
        }

        let mut patches = Vec::new();
        let mut add_patch = |name: &str, faces: Vec<(usize, Vector3<f64>, Vector3<f64>)>| {
            patches.push(Patch::new(name, owner.len(), faces.len()));
            for (cell, s, centre) in faces {
                owner.push(cell);
                sf.push(s);
                cf.push(centre);
            }
        };
        add_patch(
            "left",
            (0..ny)
                .map(|j| {
                    (
                        cell_id(0, j),
                        Vector3::new(-dy, 0.0, 0.0),
                        Vector3::new(0.0, (j as f64 + 0.5) * dy, 0.5),
                    )
                })
                .collect(),
        );
        add_patch(
            "right",
            (0..ny)
                .map(|j| {
                    (
                        cell_id(nx - 1, j),
                        Vector3::new(dy, 0.0, 0.0),
                        Vector3::new(lx, (j as f64 + 0.5) * dy, 0.5),
                    )
                })
                .collect(),
        );
        if y_patches {
            add_patch(
                "bottom",
                (0..nx)
                    .map(|i| {
                        (
                            cell_id(i, 0),
                            Vector3::new(0.0, -dx, 0.0),
                            Vector3::new((i as f64 + 0.5) * dx, 0.0, 0.5),
                        )
                    })
                    .collect(),
            );
            add_patch(
                "top",
                (0..nx)
                    .map(|i| {
                        (
                            cell_id(i, ny - 1),
                            Vector3::new(0.0, dx, 0.0),
                            Vector3::new((i as f64 + 0.5) * dx, ly, 0.5),
                        )
                    })
                    .collect(),
            );
        }

        let mut c = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                c.push(Vector3::new((i as f64 + 0.5) * dx, (j as f64 + 0.5) * dy, 0.5));
            }
        }
        let v = vec![dx * dy; nx * ny];
        info!("creating block mesh {}x{} ({} x {})", nx, ny, lx, ly);
        Self::new(owner, neighbour, sf, cf, c, v, patches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn line_mesh_addressing() {
        let mesh = FvMesh::line(4, 2.0).unwrap();
        assert_eq!(mesh.n_cells(), 4);
        assert_eq!(mesh.n_internal_faces(), 3);
        assert_eq!(mesh.n_boundary_faces(), 2);
        assert_eq!(mesh.patches.len(), 2);
        assert_eq!(mesh.patch("right").unwrap().start, 4);
        assert_relative_eq!(mesh.total_volume(), 2.0, epsilon = 1e-14);
        for f in 0..mesh.n_internal_faces() {
            assert!(mesh.owner[f] < mesh.neighbour[f]);
            assert_relative_eq!(mesh.weights[f], 0.5, epsilon = 1e-12);
            assert_relative_eq!(mesh.delta_coeffs[f], 2.0, epsilon = 1e-12);
        }
        // boundary faces are half a cell away from the centre
        assert_relative_eq!(mesh.delta_coeffs[3], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn rectangle_faces_close_every_cell() {
        let mesh = FvMesh::rectangle(3, 2, 3.0, 1.0).unwrap();
        assert_eq!(mesh.n_cells(), 6);
        assert_eq!(mesh.n_internal_faces(), 2 * 2 + 3);
        assert_eq!(mesh.n_boundary_faces(), 2 * 2 + 2 * 3);
        let mut sum = vec![Vector3::<f64>::zeros(); mesh.n_cells()];
        for f in 0..mesh.n_faces() {
            sum[mesh.owner[f]] += mesh.sf[f];
            if f < mesh.n_internal_faces() {
                sum[mesh.neighbour[f]] -= mesh.sf[f];
            }
        }
        for s in sum {
            assert_relative_eq!(s.norm(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn unknown_patch_is_an_error() {
        let mesh = FvMesh::line(2, 1.0).unwrap();
        assert!(matches!(
            mesh.patch("outlet"),
            Err(VoFError::UnknownPatch(_))
        ));
        assert!(FvMesh::line(0, 1.0).is_err());
    }

    #[test]
    fn translation_records_mesh_flux() {
        let mut mesh = FvMesh::line(2, 1.0).unwrap();
        assert!(!mesh.moving());
        mesh.translate(&Vector3::new(0.1, 0.0, 0.0), 0.1);
        assert!(mesh.moving());
        assert_relative_eq!(mesh.c[0].x, 0.35, epsilon = 1e-12);
        let mesh_phi = mesh.mesh_phi.as_ref().unwrap();
        assert_relative_eq!(mesh_phi[0], 1.0, epsilon = 1e-12);
        assert_eq!(mesh.find_nearest_cell(&Vector3::new(1.0, 0.5, 0.5)), Some(1));
    }
}
