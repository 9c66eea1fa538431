//! Time loop driving `VoFSolver` through PIMPLE outer iterations.
use crate::FiniteVolume::mesh::FvMesh;
use crate::Models::mrf::MRFZoneList;
use crate::Utils::diagnostics::StepSummary;
use crate::Utils::field_io::CaseDir;
use crate::VoF::courant;
use crate::VoF::errors::VoFError;
use crate::VoF::settings::{BlockMeshDict, CaseProperties, SolverSettings};
use crate::VoF::vof_solver::VoFSolver;
use log::info;
use std::path::Path;

/// everything read from a case directory before the solver is built
#[derive(Debug)]
pub struct Case {
    pub dir: CaseDir,
    pub settings: SolverSettings,
    pub properties: CaseProperties,
    pub mesh: FvMesh,
    pub mrf: MRFZoneList,
}

impl Case {
    pub fn load(root: impl AsRef<Path>) -> Result<Self, VoFError> {
        let dir = CaseDir::new(root);
        info!("Loading case {}", dir.root.display());
        let settings: SolverSettings = dir.read_json(&dir.system_file("vofDict.json"))?;
        settings.validate()?;
        let properties: CaseProperties = dir.read_json(&dir.constant_file("phaseProperties.json"))?;
        let mesh_dict: BlockMeshDict = dir.read_json(&dir.constant_file("meshDict.json"))?;
        let mesh = mesh_dict.build()?;
        let mrf = MRFZoneList::new(&mesh, &properties.mrf_zones)?;
        Ok(Self {
            dir,
            settings,
            properties,
            mesh,
            mrf,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    pub n_steps: usize,
    pub end_time: f64,
    pub n_writes: usize,
    pub last: Option<StepSummary>,
}

/// One time step: `pre_solve`, the outer iterations and `post_solve`.
pub fn solve_step(solver: &mut VoFSolver<'_>) -> Result<StepSummary, VoFError> {
    solver.pre_solve()?;
    let n_outer = solver.state.settings.pimple.n_outer_correctors;
    let n_corr = solver.state.settings.pimple.n_correctors;
    for outer in 0..n_outer {
        solver.begin_outer_iteration(outer);
        if n_outer > 1 {
            info!("PIMPLE: iteration {}", outer + 1);
        }
        solver.move_mesh()?;
        solver.pre_predictor()?;
        solver.momentum_predictor()?;
        solver.alpha_predictor()?;
        solver.thermophysical_predictor()?;
        for _ in 0..n_corr {
            solver.pressure_corrector()?;
        }
        solver.post_corrector()?;
    }
    solver.post_solve()
}

/// Advances the solver to `endTime`, writing fields every `writeInterval` when a case is given.
pub fn run(solver: &mut VoFSolver<'_>, case: Option<&CaseDir>) -> Result<RunStatistics, VoFError> {
    let controls = solver.state.settings.time.clone();
    let lts = solver.state.settings.lts.enabled;
    let mut stats = RunStatistics::default();
    let mut delta_t = if lts {
        controls.delta_t
    } else {
        courant::initial_delta_t(&controls, &solver.state.co, controls.delta_t)
    };
    let mut next_write = solver.state.time.value + controls.write_interval;
    let eps = 1e-9 * controls.delta_t;

    while solver.state.time.value < controls.end_time - eps {
        if stats.n_steps > 0 && controls.adjust_time_step && !lts {
            delta_t = solver.max_delta_t();
        }
        delta_t = delta_t.min(controls.end_time - solver.state.time.value);
        solver.advance_time(delta_t);
        let summary = solve_step(solver)?;
        stats.n_steps += 1;
        stats.last = Some(summary);

        let t = solver.state.time.value;
        let at_end = t >= controls.end_time - eps;
        if t >= next_write - eps || at_end {
            if let Some(case) = case {
                solver.write_fields(case)?;
                stats.n_writes += 1;
            }
            while next_write <= t + eps {
                next_write += controls.write_interval;
            }
        }
    }
    stats.end_time = solver.state.time.value;
    info!(
        "End: {} steps, time = {}, {} writes",
        stats.n_steps, stats.end_time, stats.n_writes
    );
    Ok(stats)
}

/// load a case directory, build the solver from its latest time and run it to the end
pub fn run_case(root: impl AsRef<Path>) -> Result<RunStatistics, VoFError> {
    let Case {
        dir,
        settings,
        properties,
        mut mesh,
        mrf,
    } = Case::load(root)?;
    let mut solver = VoFSolver::from_case(&dir, settings, &properties, &mut mesh, &mrf)?;
    run(&mut solver, Some(&dir))
}
