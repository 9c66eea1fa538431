//! # Physical Models Used by the VOF Solver
//!
//! Collaborators of the solver that carry physics rather than numerics:
//!
//! - `two_phase_mixture`: phase fractions, phase densities and viscosities, mixture `rho` and `mu`
//! - `interface_properties`: interface normal, curvature, surface-tension force, compression
//!   coefficient
//! - `momentum_transport`: laminar and Smagorinsky stress models (enum dispatched)
//! - `buoyancy`: `gh`, `ghf` and the reference height
//! - `pressure_reference`: reference cell and value for closed domains
//! - `mrf`: multiple reference frame zones (Coriolis source, relative fluxes)
//! - `mesh_motion`: mesh motion solvers behind a trait object

/// two immiscible phases, alpha1 evolved and alpha2 = 1 - alpha1
pub mod two_phase_mixture;
/// interface normal, curvature and surface tension
pub mod interface_properties;
/// deviatoric stress models
pub mod momentum_transport;
/// gravity potential fields
pub mod buoyancy;
/// pressure level for closed domains
pub mod pressure_reference;
/// rotating zones
pub mod mrf;
/// moving meshes
pub mod mesh_motion;
