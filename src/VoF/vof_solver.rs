//! # Two-Phase VOF Solver
//!
//! `VoFSolver` owns the state of an immiscible two-phase flow (`VoFState`) and advances it through
//! the stages of one PIMPLE outer iteration:
//!
//! 1. `pre_solve`: old-time values, Courant numbers, local time step
//! 2. `move_mesh`: mesh motion, flux projection, relative fluxes
//! 3. `pre_predictor`: phase-physics hook
//! 4. `momentum_predictor`: assemble (and optionally solve) the momentum equation; the matrix is
//!    cached for the pressure corrector
//! 5. `alpha_predictor`: sub-cycled MULES transport of the phase fraction
//! 6. `thermophysical_predictor`: phase-physics hook
//! 7. `pressure_corrector`: phase-physics hook, called `nCorrectors` times; the last call drops
//!    the cached momentum matrix
//! 8. `post_corrector`: momentum-transport correction
//! 9. `post_solve`: continuity report and step summary
//!
//! The phase-physics variant (`PhaseModel`) is chosen at construction and receives the state
//! mutably at each hook, so the solver and the variant never alias.
use crate::FiniteVolume::fields::{
    BoundaryCondition, SurfaceField, SurfaceScalarField, SurfaceVectorField, VolField,
    VolScalarField, VolVectorField,
};
use crate::FiniteVolume::fv_matrix::FvMatrix;
use crate::FiniteVolume::fvc::{self, InverseTimeStep};
use crate::FiniteVolume::mesh::FvMesh;
use crate::Models::buoyancy::Buoyancy;
use crate::Models::interface_properties::InterfaceProperties;
use crate::Models::mesh_motion::{MeshMotion, create_mesh_motion};
use crate::Models::momentum_transport::{
    MomentumTransport, MomentumTransportModel, create_momentum_transport,
};
use crate::Models::mrf::MRFZoneList;
use crate::Models::two_phase_mixture::TwoPhaseMixture;
use crate::Utils::diagnostics::StepSummary;
use crate::Utils::field_io::{CaseDir, IOobject, ReadOption, WriteOption};
use crate::VoF::alpha_solve;
use crate::VoF::courant::{self, CourantNumbers};
use crate::VoF::errors::VoFError;
use crate::VoF::phase_physics::{PhaseModel, PhasePhysics, create_phase_model};
use crate::VoF::settings::{CaseProperties, SolverSettings};
use log::{info, warn};
use nalgebra::Vector3;

/// Time level seen by the solver
#[derive(Debug, Clone)]
pub struct SolverTime {
    pub value: f64,
    pub delta_t: f64,
    pub delta_t0: f64,
    pub index: usize,
    /// reciprocal local time step, present only with LTS
    pub r_delta_t: Option<Vec<f64>>,
}

impl SolverTime {
    pub fn inverse_time_step(&self) -> InverseTimeStep<'_> {
        match &self.r_delta_t {
            Some(r) => InverseTimeStep::Local(r),
            None => InverseTimeStep::Uniform(1.0 / self.delta_t),
        }
    }
}

/// Position inside the PIMPLE loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PimpleState {
    pub outer: usize,
    pub corr: usize,
    pub n_outer: usize,
    pub n_corr: usize,
}

impl PimpleState {
    pub fn first_iter(&self) -> bool {
        self.outer == 0
    }
    pub fn final_iter(&self) -> bool {
        self.outer + 1 >= self.n_outer
    }
    pub fn final_corr(&self) -> bool {
        self.corr + 1 >= self.n_corr
    }
    /// last pressure corrector of the last outer iteration
    pub fn final_inner_iter(&self) -> bool {
        self.final_iter() && self.final_corr()
    }
}

/// continuity errors of the last pressure corrector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContinuityErrors {
    pub sum_local: f64,
    pub global: f64,
    pub cumulative: f64,
}

/// fields read or derived at start-up
#[derive(Debug, Clone)]
pub struct InitialFields {
    pub alpha1: VolScalarField,
    pub u: VolVectorField,
    pub p_rgh: VolScalarField,
    /// derived from `U` when absent
    pub phi: Option<SurfaceScalarField>,
    /// persisted phase flux of a previous run
    pub alpha_phi0: Option<SurfaceScalarField>,
}

/// Everything the solver stages and the phase-physics hooks operate on.
#[derive(Debug)]
pub struct VoFState<'a> {
    pub mesh: &'a mut FvMesh,
    pub mrf: &'a MRFZoneList,
    pub settings: SolverSettings,
    pub mixture: Box<TwoPhaseMixture>,
    pub interface: InterfaceProperties,
    pub transport: MomentumTransport,
    pub buoyancy: Buoyancy,
    pub mesh_motion: Box<dyn MeshMotion>,
    pub u: VolVectorField,
    /// volumetric face flux, relative to mesh motion and rotating frames
    pub phi: SurfaceScalarField,
    pub p_rgh: VolScalarField,
    pub p: VolScalarField,
    /// phase-1 volumetric flux of the last alpha solve
    pub alpha_phi1: SurfaceScalarField,
    pub rho_phi: SurfaceScalarField,
    /// MULES correction carried to the next step (`alphaApplyPrevCorr`)
    pub alpha_phi1_corr0: Option<SurfaceScalarField>,
    /// a persisted phase flux was read at start-up and not used yet
    pub alpha_restart: bool,
    /// momentum matrix, alive from the momentum predictor to the final pressure corrector
    pub u_eqn: Option<FvMatrix<Vector3<f64>>>,
    /// face velocity on moving meshes
    pub uf: Option<SurfaceVectorField>,
    /// recorded flux divergence for divergent flows
    pub div_u: Option<Vec<f64>>,
    pub time: SolverTime,
    pub pimple: PimpleState,
    pub co: CourantNumbers,
    pub n_alpha_sub_cycles: usize,
    /// extrema of alpha1 before clipping, over the sub-cycles of the last alpha solve
    pub alpha_extrema: (f64, f64),
    pub cont_err: ContinuityErrors,
}

impl VoFState<'_> {
    /// `phi` plus the mesh flux when the mesh moves
    pub fn absolute_phi(&self) -> Vec<f64> {
        match &self.mesh.mesh_phi {
            Some(mesh_phi) => self
                .phi
                .values
                .iter()
                .zip(mesh_phi.iter())
                .map(|(phi, m)| phi + m)
                .collect(),
            None => self.phi.values.clone(),
        }
    }

    /// `p = p_rgh + rho gh` on cells and boundary faces
    pub fn update_p(&mut self) {
        let mesh: &FvMesh = &*self.mesh;
        let rho = &self.mixture.rho;
        for c in 0..mesh.n_cells() {
            self.p.internal[c] = self.p_rgh.internal[c] + rho.internal[c] * self.buoyancy.gh[c];
        }
        for f in mesh.n_internal_faces()..mesh.n_faces() {
            let b = mesh.boundary_index(f);
            self.p.boundary[b] = self.p_rgh.boundary[b] + rho.boundary[b] * self.buoyancy.ghf[f];
        }
    }

    /// shift `p` to the reference value and recompute `p_rgh` from it
    pub fn apply_pressure_reference(&mut self, cell: usize, value: f64) {
        let shift = value - self.p.internal[cell];
        self.p.internal.iter_mut().for_each(|p| *p += shift);
        self.p.boundary.iter_mut().for_each(|p| *p += shift);
        let mesh: &FvMesh = &*self.mesh;
        for c in 0..mesh.n_cells() {
            self.p_rgh.internal[c] =
                self.p.internal[c] - self.mixture.rho.internal[c] * self.buoyancy.gh[c];
        }
        self.p_rgh.correct_boundary_conditions(mesh);
    }

    /// `contErr = ddt(rho) + div(rhoPhi)` reduced to the logged error measures
    pub fn continuity_errors(&mut self) {
        let mesh: &FvMesh = &*self.mesh;
        let r_delta_t = self.time.inverse_time_step();
        let ddt_rho = fvc::ddt(
            &self.mixture.rho.internal,
            self.mixture.rho.old_time(),
            &r_delta_t,
        );
        let div_rho_phi = fvc::div(mesh, &self.rho_phi.values);
        let cont_err: Vec<f64> = ddt_rho.iter().zip(div_rho_phi.iter()).map(|(a, b)| a + b).collect();
        let mag: Vec<f64> = cont_err.iter().map(|e| e.abs()).collect();
        let dt = self.time.delta_t;
        let sum_local = dt * fvc::weighted_average(mesh, &mag);
        let global = dt * fvc::weighted_average(mesh, &cont_err);
        self.cont_err = ContinuityErrors {
            sum_local,
            global,
            cumulative: self.cont_err.cumulative + global,
        };
        info!(
            "time step continuity errors : sum local = {:e}, global = {:e}, cumulative = {:e}",
            sum_local, global, self.cont_err.cumulative
        );
    }
}

#[derive(Debug)]
pub struct VoFSolver<'a> {
    pub state: VoFState<'a>,
    pub physics: PhaseModel,
}

impl<'a> VoFSolver<'a> {
    pub fn new(
        mesh: &'a mut FvMesh,
        mrf: &'a MRFZoneList,
        settings: SolverSettings,
        properties: &CaseProperties,
        fields: InitialFields,
    ) -> Result<Self, VoFError> {
        settings.validate()?;
        let InitialFields {
            alpha1,
            u,
            p_rgh,
            phi,
            alpha_phi0,
        } = fields;
        let m: &FvMesh = &*mesh;
        for (name, len) in [
            (&alpha1.name, alpha1.internal.len()),
            (&u.name, u.internal.len()),
            (&p_rgh.name, p_rgh.internal.len()),
        ] {
            if len != m.n_cells() {
                return Err(VoFError::SizeMismatch {
                    name: name.clone(),
                    expected: m.n_cells(),
                    found: len,
                });
            }
        }
        alpha1.check_finite()?;
        u.check_finite()?;
        p_rgh.check_finite()?;

        let [phase1, phase2] = properties.phases.clone();
        let mixture = Box::new(TwoPhaseMixture::new(m, phase1, phase2, alpha1)?);
        let interface = InterfaceProperties::new(
            m,
            &mixture.alpha1,
            settings.alpha.c_alpha,
            properties.sigma,
        )?;
        let transport = create_momentum_transport(m, &properties.momentum_transport);
        let buoyancy = Buoyancy::new(m, Vector3::from(properties.g), properties.h_ref);
        let mesh_motion = create_mesh_motion(&properties.mesh_motion);
        let physics = create_phase_model(
            &properties.physics,
            m,
            &p_rgh,
            &mixture,
            &properties.pressure_reference,
        )?;

        let phi = match phi {
            Some(phi) if phi.values.len() != m.n_faces() => {
                return Err(VoFError::SizeMismatch {
                    name: phi.name,
                    expected: m.n_faces(),
                    found: phi.values.len(),
                });
            }
            Some(phi) => phi,
            None => {
                let mut phi = fvc::flux(m, &u);
                phi.name = "phi".to_string();
                mrf.make_relative(m, &mut phi.values);
                phi
            }
        };
        let alpha_phi_name = format!("alphaPhi0.{}", mixture.phase1.name);
        let alpha_restart = alpha_phi0.is_some();
        let alpha_phi1 = match alpha_phi0 {
            Some(mut restored) => {
                info!("Reading {} for restart", alpha_phi_name);
                restored.name = alpha_phi_name;
                restored
            }
            None => SurfaceField::from_values(
                &alpha_phi_name,
                crate::FiniteVolume::mules::upwind_flux(m, &phi, &mixture.alpha1),
            ),
        };
        let rho_f = fvc::interpolate(m, &mixture.rho);
        let rho_phi = SurfaceField::from_values(
            "rhoPhi",
            rho_f.values.iter().zip(phi.values.iter()).map(|(r, p)| r * p).collect(),
        );
        let uf = mesh_motion.dynamic().then(|| {
            let mut uf = fvc::interpolate(m, &u);
            uf.name = "Uf".to_string();
            uf
        });
        let co = courant::courant_numbers(m, &phi.values, &mixture.alpha1, settings.time.delta_t);
        let p = VolField::uniform("p", m, 0.0);
        let pimple = PimpleState {
            outer: 0,
            corr: 0,
            n_outer: settings.pimple.n_outer_correctors,
            n_corr: settings.pimple.n_correctors,
        };
        let time = SolverTime {
            value: settings.time.start_time,
            delta_t: settings.time.delta_t,
            delta_t0: settings.time.delta_t,
            index: 0,
            r_delta_t: None,
        };
        info!(
            "VoF solver: {} / {}, physics {}, transport {}",
            mixture.phase1.name,
            mixture.phase2.name,
            physics.name(),
            transport.type_name()
        );

        let mut state = VoFState {
            mesh,
            mrf,
            settings,
            mixture,
            interface,
            transport,
            buoyancy,
            mesh_motion,
            u,
            phi,
            p_rgh,
            p,
            alpha_phi1,
            rho_phi,
            alpha_phi1_corr0: None,
            alpha_restart,
            u_eqn: None,
            uf,
            div_u: None,
            time,
            pimple,
            co,
            n_alpha_sub_cycles: 1,
            alpha_extrema: (0.0, 1.0),
            cont_err: ContinuityErrors::default(),
        };
        state.update_p();
        if let Some(cell) = physics.pressure_reference().ref_cell() {
            state.apply_pressure_reference(cell, physics.pressure_reference().ref_value());
        }
        Ok(Self { state, physics })
    }

    /// Reads the start fields from the latest time directory of a case.
    ///
    /// `alpha.<phase1>`, `U` and `p_rgh` must exist; `phi` and `alphaPhi0.<phase1>` are read if
    /// present.
    pub fn from_case(
        case: &CaseDir,
        mut settings: SolverSettings,
        properties: &CaseProperties,
        mesh: &'a mut FvMesh,
        mrf: &'a MRFZoneList,
    ) -> Result<Self, VoFError> {
        let (start_time, time_name) = case.latest_time()?.ok_or_else(|| {
            VoFError::InvalidConfig(format!("no time directory in {}", case.root.display()))
        })?;
        info!("Starting from time {}", time_name);
        settings.time.start_time = start_time;
        let phase1 = &properties.phases[0].name;
        let m: &FvMesh = &*mesh;
        let must = |name: &str| IOobject::new(name, ReadOption::MustRead, WriteOption::AutoWrite);
        let optional =
            |name: &str| IOobject::new(name, ReadOption::ReadIfPresent, WriteOption::AutoWrite);

        let alpha1 = case
            .read_vol_field::<f64>(m, &must(&format!("alpha.{}", phase1)), &time_name)?
            .ok_or_else(|| VoFError::InvalidConfig("alpha field not read".to_string()))?;
        let u = case
            .read_vol_field::<Vector3<f64>>(m, &must("U"), &time_name)?
            .ok_or_else(|| VoFError::InvalidConfig("U not read".to_string()))?;
        let p_rgh = case
            .read_vol_field::<f64>(m, &must("p_rgh"), &time_name)?
            .ok_or_else(|| VoFError::InvalidConfig("p_rgh not read".to_string()))?;
        let phi = case.read_surface_field::<f64>(m, &optional("phi"), &time_name)?;
        let alpha_phi0 = case.read_surface_field::<f64>(
            m,
            &optional(&format!("alphaPhi0.{}", phase1)),
            &time_name,
        )?;
        Self::new(
            mesh,
            mrf,
            settings,
            properties,
            InitialFields {
                alpha1,
                u,
                p_rgh,
                phi,
                alpha_phi0,
            },
        )
    }

    pub fn co_num(&self) -> f64 {
        self.state.co.max
    }

    pub fn alpha_co_num(&self) -> f64 {
        self.state.co.alpha_max
    }

    /// largest stable time step for the next step
    pub fn max_delta_t(&self) -> f64 {
        courant::max_delta_t(&self.state.settings.time, &self.state.co, self.state.time.delta_t)
    }

    /// move to the next time level with step `delta_t`
    pub fn advance_time(&mut self, delta_t: f64) {
        let time = &mut self.state.time;
        time.delta_t0 = time.delta_t;
        time.delta_t = delta_t;
        time.value += delta_t;
        time.index += 1;
        info!("Time = {}", time.value);
    }

    pub fn begin_outer_iteration(&mut self, outer: usize) {
        self.state.pimple.outer = outer;
        self.state.pimple.corr = 0;
    }

    /// flow and interface Courant numbers for the current flux and step
    pub fn correct_co_num(&mut self) {
        let state = &mut self.state;
        state.co = courant::courant_numbers(
            &*state.mesh,
            &state.phi.values,
            &state.mixture.alpha1,
            state.time.delta_t,
        );
    }

    /// LTS: refresh the reciprocal local time step, damped against the previous one
    pub fn set_r_delta_t(&mut self) {
        let state = &mut self.state;
        if !state.settings.lts.enabled {
            state.time.r_delta_t = None;
            return;
        }
        let previous = state.time.r_delta_t.take().filter(|_| state.time.index > 1);
        state.time.r_delta_t = Some(courant::local_r_delta_t(
            &*state.mesh,
            &state.phi.values,
            &state.mixture.alpha1,
            &state.settings.time,
            &state.settings.lts,
            previous.as_deref(),
        ));
    }

    pub fn pre_solve(&mut self) -> Result<(), VoFError> {
        let state = &mut self.state;
        state.u.store_old_time();
        state.mixture.alpha1.store_old_time();
        state.mixture.rho.store_old_time();
        state.p_rgh.store_old_time();
        state.p.store_old_time();
        state.pimple.outer = 0;
        state.pimple.corr = 0;
        self.correct_co_num();
        self.set_r_delta_t();
        Ok(())
    }

    /// Moves the mesh on the first outer iteration (or on every one when configured).
    ///
    /// After a move the flux is rebuilt from the face velocity, projected to the recorded
    /// divergence and made relative to the mesh motion.
    pub fn move_mesh(&mut self) -> Result<bool, VoFError> {
        let divergent = self.physics.divergent();
        let state = &mut self.state;
        if !state.mesh_motion.dynamic()
            || !(state.pimple.first_iter() || state.settings.pimple.move_mesh_outer_correctors)
        {
            return Ok(false);
        }
        let correct_phi = state.settings.pimple.correct_phi;
        if correct_phi && divergent {
            let absolute = state.absolute_phi();
            state.div_u = Some(fvc::div(&*state.mesh, &absolute));
        }
        let moved = state
            .mesh_motion
            .update(&mut *state.mesh, state.time.delta_t)?;
        if moved {
            let mesh: &FvMesh = &*state.mesh;
            state.buoyancy.move_mesh(mesh);
            if correct_phi {
                if let Some(uf) = &state.uf {
                    state.phi.values = uf
                        .values
                        .iter()
                        .zip(mesh.sf.iter())
                        .map(|(u, s)| u.dot(s))
                        .collect();
                }
                correct_phi_projection(state)?;
                let mesh: &FvMesh = &*state.mesh;
                state.mixture.correct(mesh);
                if let Some(mesh_phi) = &mesh.mesh_phi {
                    state
                        .phi
                        .values
                        .iter_mut()
                        .zip(mesh_phi.iter())
                        .for_each(|(phi, m)| *phi -= m);
                }
            }
            info!("mesh moved ({})", state.mesh_motion.name());
        }
        state.div_u = None;
        Ok(moved)
    }

    pub fn pre_predictor(&mut self) -> Result<(), VoFError> {
        self.physics.pre_predictor(&mut self.state)
    }

    /// Assembles `ddt(rho, U) + div(rhoPhi, U) + MRF + divDevTau(U)` and caches it.
    pub fn momentum_predictor(&mut self) -> Result<(), VoFError> {
        let div_dev_tau = self.physics.div_dev_tau(&self.state);
        let state = &mut self.state;
        let mesh: &FvMesh = &*state.mesh;
        let r_delta_t = state.time.inverse_time_step();
        let rho = &state.mixture.rho;
        let mut u_eqn = FvMatrix::ddt(
            mesh,
            Some((&rho.internal, rho.old_time())),
            &state.u,
            &r_delta_t,
        ) + FvMatrix::div(mesh, &state.rho_phi.values, &state.u)
            + div_dev_tau;
        state.mrf.add_coriolis(mesh, rho, &state.u, &mut u_eqn);
        u_eqn.relax(mesh, &state.u, state.settings.relaxation.u);

        if state.settings.pimple.momentum_predictor {
            let stf = state.interface.surface_tension_force(mesh, &state.mixture.alpha1);
            let sn_grad_rho = fvc::sn_grad(mesh, rho);
            let sn_grad_p = fvc::sn_grad(mesh, &state.p_rgh);
            let face_force: Vec<f64> = (0..mesh.n_faces())
                .map(|f| {
                    (stf.values[f]
                        - state.buoyancy.ghf[f] * sn_grad_rho.values[f]
                        - sn_grad_p.values[f])
                        * mesh.mag_sf[f]
                })
                .collect();
            let force = fvc::reconstruct(mesh, &SurfaceField::from_values("faceForce", face_force));
            let mut eqn = u_eqn.clone();
            eqn.add_explicit_source(mesh, &force.internal);
            for performance in eqn.solve(mesh, &mut state.u, &state.settings.solvers.u) {
                performance.log();
            }
            state.u.check_finite()?;
        }
        state.u_eqn = Some(u_eqn);
        Ok(())
    }

    /// sub-cycled phase-fraction transport followed by the mixture update
    pub fn alpha_predictor(&mut self) -> Result<(), VoFError> {
        if self.physics.divergent() {
            let mesh: &FvMesh = &*self.state.mesh;
            self.state.div_u = Some(fvc::div(mesh, &self.state.phi.values));
        }
        let (su, sp) = self.physics.alpha_su_sp(&self.state);
        self.state.n_alpha_sub_cycles = alpha_solve::alpha_solve(&mut self.state, &su, &sp)?;
        Ok(())
    }

    pub fn thermophysical_predictor(&mut self) -> Result<(), VoFError> {
        self.physics.thermophysical_predictor(&mut self.state)
    }

    /// One pressure corrector; the last one of the outer iteration drops the momentum matrix.
    pub fn pressure_corrector(&mut self) -> Result<(), VoFError> {
        if self.state.u_eqn.is_none() {
            return Err(VoFError::MissingMomentumMatrix(
                "pressure_corrector".to_string(),
            ));
        }
        self.physics.pressure_corrector(&mut self.state)?;
        self.state.phi.check_finite()?;
        self.state.u.check_finite()?;
        self.state.continuity_errors();
        if self.state.pimple.final_corr() {
            self.state.u_eqn = None;
        } else {
            self.state.pimple.corr += 1;
        }
        Ok(())
    }

    pub fn post_corrector(&mut self) -> Result<(), VoFError> {
        let state = &mut self.state;
        if state.pimple.final_iter() || state.settings.pimple.correct_transport_every_iteration {
            let mesh: &FvMesh = &*state.mesh;
            state.transport.correct(mesh, &state.u);
        }
        Ok(())
    }

    pub fn post_solve(&mut self) -> Result<StepSummary, VoFError> {
        let state = &mut self.state;
        if state.u_eqn.take().is_some() {
            warn!("momentum matrix still cached at the end of the step");
        }
        state.div_u = None;
        let mesh: &FvMesh = &*state.mesh;
        let summary = StepSummary {
            time: state.time.value,
            delta_t: state.time.delta_t,
            co: state.co.max,
            alpha_co: state.co.alpha_max,
            n_alpha_sub_cycles: state.n_alpha_sub_cycles,
            alpha_min: state.mixture.alpha1.min(),
            alpha_max: state.mixture.alpha1.max(),
            phase1_volume: state.mixture.phase1_volume(mesh),
            cont_err_global: state.cont_err.global,
            cont_err_cumulative: state.cont_err.cumulative,
        };
        summary.log();
        Ok(summary)
    }

    /// writes the auto-write fields to the directory of the current time
    pub fn write_fields(&self, case: &CaseDir) -> Result<(), VoFError> {
        let state = &self.state;
        let mesh: &FvMesh = &*state.mesh;
        let time_name = case.time_name(state.time.value);
        let auto = |name: &str| IOobject::new(name, ReadOption::NoRead, WriteOption::AutoWrite);
        case.write_vol_field(mesh, &auto(&state.mixture.alpha1.name), &state.mixture.alpha1, &time_name)?;
        case.write_vol_field(mesh, &auto("U"), &state.u, &time_name)?;
        case.write_vol_field(mesh, &auto("p_rgh"), &state.p_rgh, &time_name)?;
        case.write_vol_field(mesh, &auto("p"), &state.p, &time_name)?;
        case.write_surface_field(&auto("phi"), &state.phi, &time_name)?;
        case.write_surface_field(&auto(&state.alpha_phi1.name), &state.alpha_phi1, &time_name)?;
        info!("wrote fields at time {}", time_name);
        Ok(())
    }
}

/// Projects `phi` onto the recorded divergence `divU` (zero when absent).
///
/// Solves `laplacian(pcorr) = div(phi) - divU` with the fixed-value patches of `p_rgh` held at
/// zero and subtracts the correction flux.
fn correct_phi_projection(state: &mut VoFState) -> Result<(), VoFError> {
    let mesh: &FvMesh = &*state.mesh;
    let conditions = state
        .p_rgh
        .conditions
        .iter()
        .map(|bc| {
            if bc.fixes_value() {
                BoundaryCondition::FixedValue { value: 0.0 }
            } else {
                BoundaryCondition::ZeroGradient
            }
        })
        .collect();
    let mut pcorr = VolField::with_conditions("pcorr", mesh, vec![0.0; mesh.n_cells()], conditions)?;
    let div_phi = fvc::div(mesh, &state.phi.values);
    let su: Vec<f64> = (0..mesh.n_cells())
        .map(|c| state.div_u.as_ref().map_or(0.0, |d| d[c]) - div_phi[c])
        .collect();
    let ones = vec![1.0; mesh.n_faces()];
    let mut pcorr_eqn = -FvMatrix::laplacian(mesh, &ones, &pcorr);
    pcorr_eqn.add_explicit_source(mesh, &su);
    if !pcorr.conditions.iter().any(|bc| bc.fixes_value()) {
        pcorr_eqn.set_reference(0, 0.0);
    }
    for performance in pcorr_eqn.solve(mesh, &mut pcorr, &state.settings.solvers.pcorr) {
        performance.log();
    }
    let sn_grad = fvc::sn_grad(mesh, &pcorr);
    for f in 0..mesh.n_faces() {
        state.phi.values[f] -= sn_grad.values[f] * mesh.mag_sf[f];
    }
    Ok(())
}
