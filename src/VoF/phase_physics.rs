//! Phase-physics variants of the VOF solver.
//!
//! The variants differ in the alpha sources, in whether the flux is divergent, in the
//! thermophysical update and in the source terms of the pressure equation. They share one
//! pressure corrector (`correct_pressure`).
use crate::FiniteVolume::fields::{SurfaceField, VolField, VolScalarField};
use crate::FiniteVolume::fv_matrix::FvMatrix;
use crate::FiniteVolume::fvc;
use crate::FiniteVolume::mesh::FvMesh;
use crate::Models::momentum_transport::MomentumTransportModel;
use crate::Models::pressure_reference::{PressureReference, PressureReferenceDict};
use crate::Models::two_phase_mixture::TwoPhaseMixture;
use crate::VoF::errors::VoFError;
use crate::VoF::vof_solver::VoFState;
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// physics selection as written in `phaseProperties.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PhysicsDict {
    #[default]
    Incompressible,
    PhaseChange {
        /// condensation rate coefficient [1/s], acting on phase 2
        #[serde(rename = "condensationRate")]
        condensation_rate: f64,
        /// evaporation rate coefficient [1/s], acting on phase 1
        #[serde(rename = "evaporationRate")]
        evaporation_rate: f64,
    },
    Compressible,
}

#[enum_dispatch]
pub trait PhasePhysics {
    fn name(&self) -> &'static str;
    fn pressure_reference(&self) -> &PressureReference;
    /// the flux is not divergence-free
    fn divergent(&self) -> bool;
    /// explicit and implicit alpha1 sources `(Su, Sp)` per unit volume
    fn alpha_su_sp(&self, state: &VoFState<'_>) -> (Vec<f64>, Vec<f64>);
    fn div_dev_tau(&self, state: &VoFState<'_>) -> FvMatrix<Vector3<f64>> {
        state.transport.div_dev_tau(
            &*state.mesh,
            &state.mixture.rho,
            &state.mixture.mu,
            &state.u,
        )
    }
    fn pre_predictor(&mut self, _state: &mut VoFState<'_>) -> Result<(), VoFError> {
        Ok(())
    }
    fn thermophysical_predictor(&mut self, state: &mut VoFState<'_>) -> Result<(), VoFError>;
    fn pressure_corrector(&mut self, state: &mut VoFState<'_>) -> Result<(), VoFError>;
}

/// Two incompressible phases without mass transfer.
#[derive(Debug, Clone)]
pub struct Incompressible {
    pub reference: PressureReference,
}

impl PhasePhysics for Incompressible {
    fn name(&self) -> &'static str {
        "incompressible"
    }
    fn pressure_reference(&self) -> &PressureReference {
        &self.reference
    }
    fn divergent(&self) -> bool {
        false
    }
    fn alpha_su_sp(&self, state: &VoFState<'_>) -> (Vec<f64>, Vec<f64>) {
        let n = state.mesh.n_cells();
        (vec![0.0; n], vec![0.0; n])
    }
    fn thermophysical_predictor(&mut self, _state: &mut VoFState<'_>) -> Result<(), VoFError> {
        Ok(())
    }
    fn pressure_corrector(&mut self, state: &mut VoFState<'_>) -> Result<(), VoFError> {
        correct_pressure(state, &self.reference, PressureSources::default())
    }
}

/// Incompressible phases with a linear condensation / evaporation model.
///
/// Phase 1 gains volume at `condensation_rate * alpha2` and loses it at
/// `evaporation_rate * alpha1`. The volume change of the mixture, `vDot`, enters the pressure
/// equation as a source.
#[derive(Debug, Clone)]
pub struct PhaseChange {
    pub reference: PressureReference,
    pub condensation_rate: f64,
    pub evaporation_rate: f64,
    /// mixture dilatation rate of the last thermophysical update
    pub v_dot: Vec<f64>,
}

impl PhaseChange {
    /// phase-1 volume source `Su + Sp alpha1`
    fn source(&self, alpha1: f64) -> f64 {
        self.condensation_rate - (self.condensation_rate + self.evaporation_rate) * alpha1
    }
}

impl PhasePhysics for PhaseChange {
    fn name(&self) -> &'static str {
        "phaseChange"
    }
    fn pressure_reference(&self) -> &PressureReference {
        &self.reference
    }
    fn divergent(&self) -> bool {
        true
    }
    fn alpha_su_sp(&self, state: &VoFState<'_>) -> (Vec<f64>, Vec<f64>) {
        let n = state.mesh.n_cells();
        (
            vec![self.condensation_rate; n],
            vec![-(self.condensation_rate + self.evaporation_rate); n],
        )
    }
    fn thermophysical_predictor(&mut self, state: &mut VoFState<'_>) -> Result<(), VoFError> {
        let mixture = &state.mixture;
        self.v_dot = (0..state.mesh.n_cells())
            .map(|c| {
                self.source(mixture.alpha1.internal[c]) * (1.0 - mixture.rho1[c] / mixture.rho2[c])
            })
            .collect();
        let max_v_dot = self.v_dot.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        debug!("phase change: max |vDot| = {}", max_v_dot);
        Ok(())
    }
    fn pressure_corrector(&mut self, state: &mut VoFState<'_>) -> Result<(), VoFError> {
        if self.v_dot.len() != state.mesh.n_cells() {
            self.thermophysical_predictor(state)?;
        }
        let sources = PressureSources {
            v_dot: Some(self.v_dot.as_slice()),
            ..PressureSources::default()
        };
        correct_pressure(state, &self.reference, sources)
    }
}

/// Barotropic phases `rho_i = rho_i,ref + psi_i p`.
///
/// The phase fraction changes with the pressure at the rate `dgdt`, which enters the alpha
/// equation as `Su`/`Sp`; the pressure equation gains the compressibility term
/// `comp ddt(p_rgh)`.
#[derive(Debug, Clone)]
pub struct Compressible {
    pub reference: PressureReference,
    /// alpha1 rate of change due to compression
    pub dgdt: Vec<f64>,
}

impl Compressible {
    /// `alpha1 psi1 / rho1 + alpha2 psi2 / rho2`
    fn compressibility(mixture: &TwoPhaseMixture) -> Vec<f64> {
        (0..mixture.rho1.len())
            .map(|c| {
                mixture.alpha1.internal[c] * mixture.phase1.psi / mixture.rho1[c]
                    + mixture.alpha2.internal[c] * mixture.phase2.psi / mixture.rho2[c]
            })
            .collect()
    }
}

impl PhasePhysics for Compressible {
    fn name(&self) -> &'static str {
        "compressible"
    }
    fn pressure_reference(&self) -> &PressureReference {
        &self.reference
    }
    fn divergent(&self) -> bool {
        true
    }
    fn alpha_su_sp(&self, state: &VoFState<'_>) -> (Vec<f64>, Vec<f64>) {
        let n = state.mesh.n_cells();
        let alpha1 = &state.mixture.alpha1.internal;
        let mut su = vec![0.0; n];
        let mut sp = vec![0.0; n];
        for c in 0..n.min(self.dgdt.len()) {
            let dgdt = self.dgdt[c];
            if dgdt > 0.0 {
                let a2 = (1.0 - alpha1[c]).max(1e-4);
                sp[c] -= dgdt / a2;
                su[c] += dgdt / a2;
            } else if dgdt < 0.0 {
                sp[c] += dgdt / alpha1[c].max(1e-4);
            }
        }
        if let Some(div_u) = &state.div_u {
            for c in 0..n {
                su[c] += div_u[c] * alpha1[c].min(1.0);
            }
        }
        (su, sp)
    }
    fn thermophysical_predictor(&mut self, state: &mut VoFState<'_>) -> Result<(), VoFError> {
        let mesh: &FvMesh = &*state.mesh;
        state.mixture.update_densities(&state.p.internal);
        state.mixture.correct(mesh);
        state.mixture.rho.check_finite()
    }
    fn pressure_corrector(&mut self, state: &mut VoFState<'_>) -> Result<(), VoFError> {
        let comp = Self::compressibility(&state.mixture);
        let sources = PressureSources {
            comp: Some(comp.as_slice()),
            ..PressureSources::default()
        };
        correct_pressure(state, &self.reference, sources)?;

        let mixture = &state.mixture;
        let r_delta_t = state.time.inverse_time_step();
        let p0 = state.p.old_time();
        self.dgdt = (0..state.mesh.n_cells())
            .map(|c| {
                let a1 = mixture.alpha1.internal[c];
                let a2 = mixture.alpha2.internal[c];
                a1 * a2
                    * (mixture.phase2.psi / mixture.rho2[c] - mixture.phase1.psi / mixture.rho1[c])
                    * (state.p.internal[c] - p0[c])
                    * r_delta_t.at(c)
            })
            .collect();
        Ok(())
    }
}

#[derive(Debug, Clone)]
#[enum_dispatch(PhasePhysics)]
pub enum PhaseModel {
    Incompressible(Incompressible),
    PhaseChange(PhaseChange),
    Compressible(Compressible),
}

pub fn create_phase_model(
    dict: &PhysicsDict,
    mesh: &FvMesh,
    p_rgh: &VolScalarField,
    mixture: &TwoPhaseMixture,
    reference: &PressureReferenceDict,
) -> Result<PhaseModel, VoFError> {
    let reference = PressureReference::new(mesh, p_rgh, reference)?;
    let model = match dict {
        PhysicsDict::Incompressible => {
            if mixture.compressible() {
                return Err(VoFError::InvalidConfig(
                    "phase compressibility given for incompressible physics".to_string(),
                ));
            }
            PhaseModel::Incompressible(Incompressible { reference })
        }
        PhysicsDict::PhaseChange {
            condensation_rate,
            evaporation_rate,
        } => {
            if *condensation_rate < 0.0 || *evaporation_rate < 0.0 {
                return Err(VoFError::InvalidConfig(
                    "phase-change rates must be non-negative".to_string(),
                ));
            }
            PhaseModel::PhaseChange(PhaseChange {
                reference,
                condensation_rate: *condensation_rate,
                evaporation_rate: *evaporation_rate,
                v_dot: Vec::new(),
            })
        }
        PhysicsDict::Compressible => {
            if !mixture.compressible() {
                return Err(VoFError::InvalidConfig(
                    "compressible physics needs psi > 0 for at least one phase".to_string(),
                ));
            }
            PhaseModel::Compressible(Compressible {
                reference,
                dgdt: vec![0.0; mesh.n_cells()],
            })
        }
    };
    info!("phase physics: {}", model.name());
    Ok(model)
}

/// extra source terms of the pressure equation
#[derive(Debug, Clone, Copy, Default)]
pub struct PressureSources<'s> {
    /// mixture dilatation rate per unit volume
    pub v_dot: Option<&'s [f64]>,
    /// compressibility `comp` multiplying `ddt(p_rgh)`
    pub comp: Option<&'s [f64]>,
}

/// One pressure corrector on the cached momentum matrix.
///
/// Builds `HbyA` and its flux, adds the buoyancy and surface-tension face force, solves
/// `laplacian(rAUf, p_rgh) = div(phiHbyA) - vDot (+ comp ddt(p_rgh))` and corrects `phi` and `U`.
/// On moving meshes `Uf` is refreshed and `phi` is made relative.
pub fn correct_pressure(
    state: &mut VoFState<'_>,
    reference: &PressureReference,
    sources: PressureSources<'_>,
) -> Result<(), VoFError> {
    let mesh: &FvMesh = &*state.mesh;
    let u_eqn = state
        .u_eqn
        .as_ref()
        .ok_or_else(|| VoFError::MissingMomentumMatrix("pressure corrector".to_string()))?;
    let n_cells = mesh.n_cells();
    let n_faces = mesh.n_faces();
    let n_internal = mesh.n_internal_faces();

    let r_au: Vec<f64> = u_eqn.a(mesh).iter().map(|a| 1.0 / a).collect();
    let mut r_au_field = VolField::uniform("rAU", mesh, 0.0);
    r_au_field.internal = r_au.clone();
    r_au_field.correct_boundary_conditions(mesh);
    let r_au_f = fvc::interpolate(mesh, &r_au_field).values;

    let h = u_eqn.h(mesh, &state.u);
    let hby_a_internal: Vec<Vector3<f64>> =
        h.iter().zip(r_au.iter()).map(|(h, r)| h * *r).collect();
    // fixed-velocity patches keep the boundary velocity
    let hby_a = VolField::like("HbyA", mesh, &state.u, hby_a_internal);
    let mut phi_hby_a = fvc::flux(mesh, &hby_a).values;
    state.mrf.make_relative(mesh, &mut phi_hby_a);

    // zero-gradient pressure patches carry the flux of the boundary velocity
    for f in n_internal..n_faces {
        if !state.p_rgh.condition(mesh, f).fixes_value() {
            phi_hby_a[f] = state.u.boundary_value(mesh, f).dot(&mesh.sf[f]);
        }
    }
    if reference.ref_cell().is_some() {
        fvc::adjust_phi(mesh, &mut phi_hby_a, &state.u)?;
    }

    let stf = state
        .interface
        .surface_tension_force(mesh, &state.mixture.alpha1);
    let sn_grad_rho = fvc::sn_grad(mesh, &state.mixture.rho);
    let phig: Vec<f64> = (0..n_faces)
        .map(|f| {
            if f < n_internal || state.p_rgh.condition(mesh, f).fixes_value() {
                (stf.values[f] - state.buoyancy.ghf[f] * sn_grad_rho.values[f])
                    * r_au_f[f]
                    * mesh.mag_sf[f]
            } else {
                0.0
            }
        })
        .collect();
    phi_hby_a.iter_mut().zip(phig.iter()).for_each(|(p, g)| *p += g);

    let div_hby_a = fvc::div(mesh, &phi_hby_a);
    let mut su: Vec<f64> = (0..n_cells)
        .map(|c| sources.v_dot.map_or(0.0, |v| v[c]) - div_hby_a[c])
        .collect();
    let mut p_eqn = -FvMatrix::laplacian(mesh, &r_au_f, &state.p_rgh);
    match sources.comp {
        Some(comp) => {
            let r_delta_t = state.time.inverse_time_step();
            let p0 = state.p_rgh.old_time();
            let sp: Vec<f64> = (0..n_cells).map(|c| -comp[c] * r_delta_t.at(c)).collect();
            for c in 0..n_cells {
                su[c] += comp[c] * r_delta_t.at(c) * p0[c];
            }
            p_eqn.add_implicit_source(mesh, &sp);
        }
        None => {
            if let Some(cell) = reference.ref_cell() {
                p_eqn.set_reference(cell, state.p_rgh.internal[cell]);
            }
        }
    }
    p_eqn.add_explicit_source(mesh, &su);

    let controls = if state.pimple.final_inner_iter() {
        &state.settings.solvers.p_rgh_final
    } else {
        &state.settings.solvers.p_rgh
    };
    for performance in p_eqn.solve(mesh, &mut state.p_rgh, controls) {
        performance.log();
    }
    state.p_rgh.check_finite()?;

    let sn_grad_p = fvc::sn_grad(mesh, &state.p_rgh);
    let p_flux: Vec<f64> = (0..n_faces)
        .map(|f| r_au_f[f] * sn_grad_p.values[f] * mesh.mag_sf[f])
        .collect();
    state.phi.values = (0..n_faces).map(|f| phi_hby_a[f] - p_flux[f]).collect();

    let face_acceleration = SurfaceField::from_values(
        "(phig - pFlux)/rAUf",
        (0..n_faces)
            .map(|f| (phig[f] - p_flux[f]) / r_au_f[f])
            .collect(),
    );
    let correction = fvc::reconstruct(mesh, &face_acceleration);
    for c in 0..n_cells {
        state.u.internal[c] = hby_a.internal[c] + correction.internal[c] * r_au[c];
    }
    state.u.correct_boundary_conditions(mesh);

    if let Some(uf) = state.uf.as_mut() {
        let interpolated = fvc::interpolate(mesh, &state.u);
        for f in 0..n_faces {
            let n = mesh.sf[f] / mesh.mag_sf[f];
            let u_f = interpolated.values[f];
            uf.values[f] = u_f + n * ((state.phi.values[f] - u_f.dot(&mesh.sf[f])) / mesh.mag_sf[f]);
        }
    }
    if let Some(mesh_phi) = &mesh.mesh_phi {
        state
            .phi
            .values
            .iter_mut()
            .zip(mesh_phi.iter())
            .for_each(|(phi, m)| *phi -= m);
    }

    state.update_p();
    if let (Some(cell), None) = (reference.ref_cell(), sources.comp) {
        state.apply_pressure_reference(cell, reference.ref_value());
    }
    Ok(())
}
