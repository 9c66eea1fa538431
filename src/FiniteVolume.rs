//! # Finite-Volume Collaborator Layer
//!
//! The VOF solver is written against a narrow finite-volume interface. This module provides the
//! smallest concrete implementation of that interface that is needed to run and test the solver:
//!
//! | Module | Role |
//! |--------|------|
//! | `mesh` | face-addressed mesh (owner/neighbour, `Sf`, `V`, patches) and structured builders |
//! | `field_value` | value types carried by fields: scalar, vector, tensor |
//! | `fields` | cell-centred `VolField<T>` and face-centred `SurfaceField<T>` with boundary conditions |
//! | `fvc` | explicit calculus: interpolation, flux, divergence, gradient, snGrad, reconstruction |
//! | `direction_interpolate` | upwind-side reconstruction selected by a signed face field |
//! | `fv_matrix` | LDU matrix with `fvm`-style builders (ddt, upwind div, laplacian, sources) |
//! | `linear_solvers` | Gauss-Seidel and diagonal-preconditioned CG |
//! | `mules` | multidimensional universal limiter for explicit solution (bounded FCT) |
//!
//! ## Conventions
//! - faces `0..n_internal_faces` are internal, boundary faces follow grouped by patch
//! - face flux is positive from owner to neighbour (outward for the owner on boundary faces)
//! - an `FvMatrix` represents `A psi = source`, like an OpenFOAM-style `fvMatrix`

/// small number used to stabilise divisions
pub const SMALL: f64 = 1e-15;
/// very small number, used where `SMALL` would still bias the result
pub const VSMALL: f64 = 1e-300;
/// square root of `VSMALL`
pub const ROOT_VSMALL: f64 = 1e-150;
/// large number used as "unbounded"
pub const GREAT: f64 = 1e15;

pub mod direction_interpolate;
pub mod field_value;
pub mod fields;
pub mod fv_matrix;
pub mod fvc;
pub mod linear_solvers;
pub mod mesh;
pub mod mules;
