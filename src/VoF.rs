//! # Two-Phase Volume-of-Fluid Solver
//!
//! Segregated PIMPLE solver for two immiscible phases sharing one velocity field. The phase
//! fraction `alpha1` of the first phase is transported with MULES and kept within `[0, 1]`; the
//! mixture density and viscosity follow from it. Pressure and velocity are coupled through the
//! buoyancy-adjusted pressure `p_rgh = p - rho gh`.
//!
//! ## Modules
//! - `vof_solver`: solver state and the stages of one outer iteration
//! - `alpha_solve`: sub-cycled, bounded phase-fraction transport
//! - `phase_physics`: incompressible, phase-change and compressible variants
//! - `courant`: Courant numbers, adaptive and local time steps
//! - `run_loop`: time loop and case driver
//! - `settings`: `system/vofDict.json` and `constant/phaseProperties.json`
//! - `errors`: the crate error type
//!
//! ## Example
//! ```no_run
//! use VoFlow::VoF::run_loop::run_case;
//! let stats = run_case("cases/damBreak").unwrap();
//! println!("{} steps", stats.n_steps);
//! ```
pub mod alpha_solve;
pub mod courant;
pub mod errors;
pub mod phase_physics;
pub mod run_loop;
pub mod settings;
pub mod vof_solver;

#[cfg(test)]
mod alpha_solve_tests;
