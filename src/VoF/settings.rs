//! # Solver Settings
//!
//! ## Purpose
//! Deserialisable configuration of a VOF run, read from `<case>/system/vofDict.json`, and the case
//! properties read from `<case>/constant/phaseProperties.json` and `<case>/constant/meshDict.json`.
//! Every entry has a default so that a dictionary only needs to name what it changes.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "time": { "endTime": 1.0, "deltaT": 1e-3, "writeInterval": 0.1, "maxCo": 1, "maxAlphaCo": 1 },
//!   "pimple": { "nOuterCorrectors": 1, "nCorrectors": 3, "momentumPredictor": false },
//!   "alpha": { "nAlphaCorr": 2, "nAlphaSubCycles": 3, "cAlpha": 1, "MULESCorr": true },
//!   "lts": { "LTS": false },
//!   "solvers": { "pRgh": { "solver": "PCG", "tolerance": 1e-7, "relTol": 0.05 } },
//!   "relaxation": { "U": 1.0 }
//! }
//! ```
use crate::FiniteVolume::GREAT;
use crate::FiniteVolume::linear_solvers::{LinearSolverControls, SolverKind};
use crate::FiniteVolume::mesh::FvMesh;
use crate::Models::mesh_motion::MeshMotionDict;
use crate::Models::momentum_transport::MomentumTransportType;
use crate::Models::mrf::MRFZoneDict;
use crate::Models::pressure_reference::PressureReferenceDict;
use crate::Models::two_phase_mixture::PhaseProperties;
use crate::VoF::errors::VoFError;
use crate::VoF::phase_physics::PhysicsDict;
use serde::{Deserialize, Serialize};

/// Run control of the time loop.
///
/// # Fields
/// * `adjust_time_step` - choose the step from `max_co` and `max_alpha_co`
/// * `max_co` - largest flow Courant number
/// * `max_alpha_co` - largest Courant number in interface cells
/// * `max_delta_t` - upper bound of the time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeControls {
    pub start_time: f64,
    pub end_time: f64,
    pub delta_t: f64,
    pub write_interval: f64,
    pub adjust_time_step: bool,
    pub max_co: f64,
    pub max_alpha_co: f64,
    pub max_delta_t: f64,
}

impl Default for TimeControls {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: 1.0,
            delta_t: 1e-3,
            write_interval: 0.1,
            adjust_time_step: false,
            max_co: 1.0,
            max_alpha_co: 1.0,
            max_delta_t: GREAT,
        }
    }
}

/// Outer and inner corrector counts of the pressure-velocity coupling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PimpleControls {
    pub n_outer_correctors: usize,
    pub n_correctors: usize,
    pub momentum_predictor: bool,
    pub correct_phi: bool,
    pub move_mesh_outer_correctors: bool,
    pub correct_transport_every_iteration: bool,
}

impl Default for PimpleControls {
    fn default() -> Self {
        Self {
            n_outer_correctors: 1,
            n_correctors: 2,
            momentum_predictor: false,
            correct_phi: true,
            move_mesh_outer_correctors: false,
            correct_transport_every_iteration: false,
        }
    }
}

/// Controls of the phase-fraction sub-solve.
///
/// # Fields
/// * `n_alpha_corr` - MULES corrections per sub-cycle with `mules_corr`; the explicit update is
///   limited once
/// * `n_alpha_sub_cycles` - largest number of sub-cycles per time step
/// * `c_alpha` - interface compression coefficient
/// * `mules_corr` - semi-implicit MULES: implicit upwind predictor plus limited correction
/// * `alpha_apply_prev_corr` - re-apply the previous step's correction after the predictor
/// * `n_limiter_iter` - iterations of the MULES limiter
/// * `alpha_bound_tolerance` - overshoot outside `[0, 1]` reported as a warning
/// * `solver` - linear solver of the implicit predictor; with `mules_corr` the phase volume is
///   conserved only to its tolerance, the explicit path conserves it to round-off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlphaControls {
    pub n_alpha_corr: usize,
    pub n_alpha_sub_cycles: usize,
    pub c_alpha: f64,
    #[serde(rename = "MULESCorr")]
    pub mules_corr: bool,
    pub alpha_apply_prev_corr: bool,
    pub n_limiter_iter: usize,
    pub alpha_bound_tolerance: f64,
    pub solver: LinearSolverControls,
}

impl Default for AlphaControls {
    fn default() -> Self {
        Self {
            n_alpha_corr: 1,
            n_alpha_sub_cycles: 1,
            c_alpha: 1.0,
            mules_corr: false,
            alpha_apply_prev_corr: false,
            n_limiter_iter: 3,
            alpha_bound_tolerance: 1e-6,
            solver: LinearSolverControls {
                solver: SolverKind::GaussSeidel,
                tolerance: 1e-12,
                max_iter: 2000,
                ..LinearSolverControls::default()
            },
        }
    }
}

/// Local time stepping (pseudo-transient runs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LtsControls {
    #[serde(rename = "LTS")]
    pub enabled: bool,
    pub r_delta_t_smoothing_coeff: f64,
    pub r_delta_t_damping_coeff: f64,
}

impl Default for LtsControls {
    fn default() -> Self {
        Self {
            enabled: false,
            r_delta_t_smoothing_coeff: 1.0,
            r_delta_t_damping_coeff: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Solvers {
    #[serde(rename = "U")]
    pub u: LinearSolverControls,
    pub p_rgh: LinearSolverControls,
    /// used on the last corrector of the last outer iteration
    pub p_rgh_final: LinearSolverControls,
    pub pcorr: LinearSolverControls,
}

impl Default for Solvers {
    fn default() -> Self {
        Self {
            u: LinearSolverControls {
                tolerance: 1e-8,
                rel_tol: 0.1,
                ..LinearSolverControls::default()
            },
            p_rgh: LinearSolverControls::pcg(1e-8, 0.05),
            p_rgh_final: LinearSolverControls::pcg(1e-9, 0.0),
            pcorr: LinearSolverControls::pcg(1e-10, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationFactors {
    #[serde(rename = "U")]
    pub u: f64,
}

impl Default for RelaxationFactors {
    fn default() -> Self {
        Self { u: 1.0 }
    }
}

/// Content of `system/vofDict.json`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub time: TimeControls,
    pub pimple: PimpleControls,
    pub alpha: AlphaControls,
    pub lts: LtsControls,
    pub solvers: Solvers,
    pub relaxation: RelaxationFactors,
}

impl SolverSettings {
    /// Checks the values that would make the run meaningless.
    ///
    /// # Returns
    /// `VoFError::InvalidConfig` naming the first offending entry
    pub fn validate(&self) -> Result<(), VoFError> {
        let t = &self.time;
        if t.delta_t <= 0.0 || t.end_time < t.start_time || t.write_interval <= 0.0 {
            return Err(VoFError::InvalidConfig(
                "time: deltaT and writeInterval must be positive and endTime >= startTime"
                    .to_string(),
            ));
        }
        if t.max_co <= 0.0 || t.max_alpha_co <= 0.0 || t.max_delta_t <= 0.0 {
            return Err(VoFError::InvalidConfig(
                "time: maxCo, maxAlphaCo and maxDeltaT must be positive".to_string(),
            ));
        }
        if self.pimple.n_outer_correctors == 0 || self.pimple.n_correctors == 0 {
            return Err(VoFError::InvalidConfig(
                "pimple: nOuterCorrectors and nCorrectors must be at least 1".to_string(),
            ));
        }
        if self.alpha.n_alpha_corr == 0 || self.alpha.n_alpha_sub_cycles == 0 {
            return Err(VoFError::InvalidConfig(
                "alpha: nAlphaCorr and nAlphaSubCycles must be at least 1".to_string(),
            ));
        }
        if self.alpha.alpha_apply_prev_corr && !self.alpha.mules_corr {
            return Err(VoFError::InvalidConfig(
                "alpha: alphaApplyPrevCorr requires MULESCorr".to_string(),
            ));
        }
        Ok(())
    }
}

/// Content of `constant/phaseProperties.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseProperties {
    /// the first phase is the one whose fraction is solved for
    pub phases: [PhaseProperties; 2],
    #[serde(default)]
    pub sigma: f64,
    #[serde(default)]
    pub physics: PhysicsDict,
    #[serde(default)]
    pub g: [f64; 3],
    #[serde(default)]
    pub h_ref: f64,
    #[serde(default)]
    pub momentum_transport: MomentumTransportType,
    #[serde(default, rename = "MRFZones")]
    pub mrf_zones: Vec<MRFZoneDict>,
    #[serde(default)]
    pub mesh_motion: MeshMotionDict,
    #[serde(default)]
    pub pressure_reference: PressureReferenceDict,
}

/// Content of `constant/meshDict.json`: one of the structured block meshes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockMeshDict {
    Line { n: usize, length: f64 },
    Rectangle { nx: usize, ny: usize, lx: f64, ly: f64 },
}

impl BlockMeshDict {
    pub fn build(&self) -> Result<FvMesh, VoFError> {
        match self {
            BlockMeshDict::Line { n, length } => FvMesh::line(*n, *length),
            BlockMeshDict::Rectangle { nx, ny, lx, ly } => FvMesh::rectangle(*nx, *ny, *lx, *ly),
        }
    }
}
