use crate::FiniteVolume::fields::{BoundaryCondition, VolField};
use crate::FiniteVolume::mesh::FvMesh;
use crate::Models::mrf::MRFZoneList;
use crate::Models::pressure_reference::PressureReferenceDict;
use crate::Models::two_phase_mixture::PhaseProperties;
use crate::Utils::field_io::{CaseDir, IOobject, ReadOption, WriteOption};
use crate::VoF::errors::VoFError;
use crate::VoF::phase_physics::PhysicsDict;
use crate::VoF::run_loop::{run, run_case};
use crate::VoF::settings::{BlockMeshDict, CaseProperties, SolverSettings};
use crate::VoF::vof_solver::{InitialFields, VoFSolver};
use log::error;
use nalgebra::Vector3;

fn water_air(g: [f64; 3], sigma: f64) -> CaseProperties {
    CaseProperties {
        phases: [
            PhaseProperties::new("water", 1000.0, 1e-6),
            PhaseProperties::new("air", 1.0, 1.48e-5),
        ],
        sigma,
        physics: PhysicsDict::Incompressible,
        g,
        h_ref: 0.0,
        momentum_transport: Default::default(),
        mrf_zones: Vec::new(),
        mesh_motion: Default::default(),
        pressure_reference: PressureReferenceDict::default(),
    }
}

/// water slug carried by a uniform stream through a 1-D channel
fn slug_in_channel() -> Result<(), VoFError> {
    let n = 50;
    let mut mesh = FvMesh::line(n, 1.0)?;
    let mrf = MRFZoneList::default();
    let mut settings = SolverSettings::default();
    settings.time.end_time = 0.3;
    settings.time.delta_t = 1e-3;
    settings.time.adjust_time_step = true;
    settings.time.max_co = 0.5;
    settings.time.max_alpha_co = 0.5;

    let alpha: Vec<f64> = mesh
        .c
        .iter()
        .map(|c| if c.x > 0.1 && c.x < 0.3 { 1.0 } else { 0.0 })
        .collect();
    let alpha1 = VolField::with_conditions(
        "alpha.water",
        &mesh,
        alpha,
        vec![
            BoundaryCondition::FixedValue { value: 0.0 },
            BoundaryCondition::ZeroGradient,
        ],
    )?;
    let inlet = Vector3::new(1.0, 0.0, 0.0);
    let u = VolField::with_conditions(
        "U",
        &mesh,
        vec![inlet; n],
        vec![
            BoundaryCondition::FixedValue { value: inlet },
            BoundaryCondition::ZeroGradient,
        ],
    )?;
    let p_rgh = VolField::with_conditions(
        "p_rgh",
        &mesh,
        vec![0.0; n],
        vec![
            BoundaryCondition::ZeroGradient,
            BoundaryCondition::FixedValue { value: 0.0 },
        ],
    )?;
    let fields = InitialFields {
        alpha1,
        u,
        p_rgh,
        phi: None,
        alpha_phi0: None,
    };
    let properties = water_air([0.0; 3], 0.0);
    let mut solver = VoFSolver::new(&mut mesh, &mrf, settings, &properties, fields)?;
    let stats = run(&mut solver, None)?;
    println!(
        "slug: {} steps to t = {}, water volume {:?}",
        stats.n_steps,
        stats.end_time,
        stats.last.map(|s| s.phase1_volume)
    );
    if let Some(last) = stats.last {
        last.table().printstd();
    }
    Ok(())
}

/// Fields of the dam break: a water column in the lower-left quarter of a closed box with an
/// open top.
fn dam_break_fields(mesh: &FvMesh, width: f64) -> Result<InitialFields, VoFError> {
    let n = mesh.n_cells();
    let alpha: Vec<f64> = mesh
        .c
        .iter()
        .map(|c| if c.x < 0.25 * width && c.y < 0.5 * width { 1.0 } else { 0.0 })
        .collect();
    let zg = BoundaryCondition::ZeroGradient;
    let wall = BoundaryCondition::FixedValue {
        value: Vector3::zeros(),
    };
    let alpha1 = VolField::with_conditions("alpha.water", mesh, alpha, vec![zg.clone(); 4])?;
    let u = VolField::with_conditions(
        "U",
        mesh,
        vec![Vector3::zeros(); n],
        vec![wall.clone(), wall.clone(), wall, BoundaryCondition::ZeroGradient],
    )?;
    let p_rgh = VolField::with_conditions(
        "p_rgh",
        mesh,
        vec![0.0; n],
        vec![
            zg.clone(),
            zg.clone(),
            zg,
            BoundaryCondition::FixedValue { value: 0.0 },
        ],
    )?;
    Ok(InitialFields {
        alpha1,
        u,
        p_rgh,
        phi: None,
        alpha_phi0: None,
    })
}

fn dam_break_settings() -> SolverSettings {
    let mut settings = SolverSettings::default();
    settings.time.end_time = 0.05;
    settings.time.delta_t = 1e-4;
    settings.time.write_interval = 0.01;
    settings.time.adjust_time_step = true;
    settings.time.max_co = 0.5;
    settings.time.max_alpha_co = 0.5;
    settings.pimple.n_correctors = 3;
    settings.alpha.mules_corr = true;
    settings.alpha.n_alpha_corr = 2;
    settings.alpha.n_alpha_sub_cycles = 1;
    settings
}

/// 2-D dam break in memory
fn dam_break() -> Result<(), VoFError> {
    let width = 0.584;
    let mut mesh = FvMesh::rectangle(24, 24, width, width)?;
    let mrf = MRFZoneList::default();
    let fields = dam_break_fields(&mesh, width)?;
    let properties = water_air([0.0, -9.81, 0.0], 0.07);
    let mut solver = VoFSolver::new(&mut mesh, &mrf, dam_break_settings(), &properties, fields)?;
    let stats = run(&mut solver, None)?;
    println!("dam break: {} steps to t = {}", stats.n_steps, stats.end_time);
    if let Some(last) = stats.last {
        last.table().printstd();
    }
    Ok(())
}

/// the dam break written as a case directory and run from disk
fn dam_break_case() -> Result<(), VoFError> {
    let width = 0.584;
    let root = std::env::temp_dir().join("VoFlow_damBreak");
    let case = CaseDir::new(&root);
    let block = BlockMeshDict::Rectangle {
        nx: 24,
        ny: 24,
        lx: width,
        ly: width,
    };
    case.write_json(&case.system_file("vofDict.json"), &dam_break_settings())?;
    case.write_json(
        &case.constant_file("phaseProperties.json"),
        &water_air([0.0, -9.81, 0.0], 0.07),
    )?;
    case.write_json(&case.constant_file("meshDict.json"), &block)?;

    let mesh = block.build()?;
    let fields = dam_break_fields(&mesh, width)?;
    let io = |name: &str| IOobject::new(name, ReadOption::NoRead, WriteOption::AutoWrite);
    case.write_vol_field(&mesh, &io("alpha.water"), &fields.alpha1, "0")?;
    case.write_vol_field(&mesh, &io("U"), &fields.u, "0")?;
    case.write_vol_field(&mesh, &io("p_rgh"), &fields.p_rgh, "0")?;

    let stats = run_case(&root)?;
    println!(
        "case {}: {} steps, {} writes",
        root.display(),
        stats.n_steps,
        stats.n_writes
    );
    Ok(())
}

pub fn vof_examples(task: usize) {
    let result = match task {
        0 => slug_in_channel(),
        1 => dam_break(),
        2 => dam_break_case(),
        _ => {
            println!("no example with number {}", task);
            Ok(())
        }
    };
    if let Err(e) = result {
        error!("example {} failed: {}", task, e);
    }
}
