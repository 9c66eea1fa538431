use crate::FiniteVolume::mesh::FvMesh;
use crate::VoF::errors::VoFError;
use log::info;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// motion selection as written in `phaseProperties.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MeshMotionDict {
    #[default]
    Static,
    SolidBodyTranslation { velocity: [f64; 3] },
}

/// Moves the mesh points once per time step and reports whether the geometry changed.
pub trait MeshMotion: Debug {
    fn name(&self) -> &'static str;
    /// true if the mesh can move at all
    fn dynamic(&self) -> bool;
    fn update(&mut self, mesh: &mut FvMesh, delta_t: f64) -> Result<bool, VoFError>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticMesh;

impl MeshMotion for StaticMesh {
    fn name(&self) -> &'static str {
        "static"
    }
    fn dynamic(&self) -> bool {
        false
    }
    fn update(&mut self, _mesh: &mut FvMesh, _delta_t: f64) -> Result<bool, VoFError> {
        Ok(false)
    }
}

#[derive(Debug, Clone)]
pub struct SolidBodyTranslation {
    pub velocity: Vector3<f64>,
}

impl MeshMotion for SolidBodyTranslation {
    fn name(&self) -> &'static str {
        "solidBodyTranslation"
    }
    fn dynamic(&self) -> bool {
        true
    }
    fn update(&mut self, mesh: &mut FvMesh, delta_t: f64) -> Result<bool, VoFError> {
        if delta_t <= 0.0 {
            return Err(VoFError::InvalidConfig(format!(
                "mesh motion needs a positive time step, got {}",
                delta_t
            )));
        }
        mesh.translate(&(self.velocity * delta_t), delta_t);
        Ok(true)
    }
}

pub fn create_mesh_motion(dict: &MeshMotionDict) -> Box<dyn MeshMotion> {
    let motion: Box<dyn MeshMotion> = match dict {
        MeshMotionDict::Static => Box::new(StaticMesh),
        MeshMotionDict::SolidBodyTranslation { velocity } => Box::new(SolidBodyTranslation {
            velocity: Vector3::from(*velocity),
        }),
    };
    info!("mesh motion: {}", motion.name());
    motion
}
