//! Case directory layout and JSON field files.
//!
//! ```text
//! <case>/system/vofDict.json          solver settings
//! <case>/constant/phaseProperties.json phase and model properties
//! <case>/constant/meshDict.json        block mesh
//! <case>/<time>/<field>.json           fields at a time level
//! ```
//! A cell field file holds `internalField` (`{"uniform": v}` or `{"nonuniform": [...]}`) and
//! `boundaryField`, a map from patch name to boundary condition. A face field file holds
//! `values` in the same uniform / nonuniform form, one entry per face.
use crate::FiniteVolume::field_value::FieldValue;
use crate::FiniteVolume::fields::{BoundaryCondition, SurfaceField, VolField};
use crate::FiniteVolume::mesh::FvMesh;
use crate::VoF::errors::VoFError;
use log::{debug, info};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOption {
    MustRead,
    ReadIfPresent,
    NoRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOption {
    AutoWrite,
    NoWrite,
}

/// name and read/write policy of a field file
#[derive(Debug, Clone, PartialEq)]
pub struct IOobject {
    pub name: String,
    pub read: ReadOption,
    pub write: WriteOption,
}

impl IOobject {
    pub fn new(name: &str, read: ReadOption, write: WriteOption) -> Self {
        Self {
            name: name.to_string(),
            read,
            write,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldData<T> {
    Uniform { uniform: T },
    Nonuniform { nonuniform: Vec<T> },
}

impl<T: FieldValue> FieldData<T> {
    fn expand(self, name: &str, n: usize) -> Result<Vec<T>, VoFError> {
        match self {
            FieldData::Uniform { uniform } => Ok(vec![uniform; n]),
            FieldData::Nonuniform { nonuniform } if nonuniform.len() == n => Ok(nonuniform),
            FieldData::Nonuniform { nonuniform } => Err(VoFError::SizeMismatch {
                name: name.to_string(),
                expected: n,
                found: nonuniform.len(),
            }),
        }
    }

    fn compact(values: &[T]) -> Self {
        match values.first() {
            Some(first) if values.iter().all(|v| v == first) => FieldData::Uniform { uniform: *first },
            _ => FieldData::Nonuniform {
                nonuniform: values.to_vec(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolFieldFile<T> {
    pub internal_field: FieldData<T>,
    pub boundary_field: BTreeMap<String, BoundaryCondition<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceFieldFile<T> {
    pub values: FieldData<T>,
}

/// time directory name: value rounded to 1e-9 and printed without trailing zeros
pub fn format_time(t: f64) -> String {
    let rounded = (t * 1e9).round() / 1e9;
    format!("{}", if rounded == 0.0 { 0.0 } else { rounded })
}

#[derive(Debug, Clone)]
pub struct CaseDir {
    pub root: PathBuf,
}

impl CaseDir {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn system_file(&self, name: &str) -> PathBuf {
        self.root.join("system").join(name)
    }

    pub fn constant_file(&self, name: &str) -> PathBuf {
        self.root.join("constant").join(name)
    }

    pub fn time_name(&self, t: f64) -> String {
        format_time(t)
    }

    pub fn read_json<D: DeserializeOwned>(&self, path: &Path) -> Result<D, VoFError> {
        if !path.exists() {
            return Err(VoFError::MissingField {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        debug!("read {}", path.display());
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write_json<S: Serialize>(&self, path: &Path, value: &S) -> Result<(), VoFError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(value)?)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    /// numeric time directories, sorted by time
    pub fn time_dirs(&self) -> Result<Vec<(f64, String)>, VoFError> {
        let time_pattern = Regex::new(r"^[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?$")
            .map_err(|e| VoFError::InvalidConfig(e.to_string()))?;
        let mut times = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if time_pattern.is_match(&name) {
                if let Ok(t) = name.parse::<f64>() {
                    times.push((t, name));
                }
            }
        }
        times.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(times)
    }

    pub fn latest_time(&self) -> Result<Option<(f64, String)>, VoFError> {
        Ok(self.time_dirs()?.pop())
    }

    fn field_path(&self, time_name: &str, name: &str) -> PathBuf {
        self.root.join(time_name).join(format!("{}.json", name))
    }

    /// `Ok(None)` for `NoRead` and for a missing `ReadIfPresent` file
    fn locate(&self, io: &IOobject, time_name: &str) -> Result<Option<PathBuf>, VoFError> {
        let path = self.field_path(time_name, &io.name);
        match io.read {
            ReadOption::NoRead => Ok(None),
            _ if path.exists() => Ok(Some(path)),
            ReadOption::ReadIfPresent => Ok(None),
            ReadOption::MustRead => Err(VoFError::MissingField {
                name: io.name.clone(),
                path,
            }),
        }
    }

    pub fn read_vol_field<T: FieldValue>(
        &self,
        mesh: &FvMesh,
        io: &IOobject,
        time_name: &str,
    ) -> Result<Option<VolField<T>>, VoFError> {
        let Some(path) = self.locate(io, time_name)? else {
            return Ok(None);
        };
        let file: VolFieldFile<T> = self.read_json(&path)?;
        if let Some(unknown) = file
            .boundary_field
            .keys()
            .find(|patch| mesh.patch_id(patch).is_none())
        {
            return Err(VoFError::UnknownPatch(format!("{} in {}", unknown, path.display())));
        }
        let conditions = mesh
            .patches
            .iter()
            .map(|patch| {
                file.boundary_field.get(&patch.name).cloned().ok_or_else(|| {
                    VoFError::InvalidConfig(format!(
                        "{}: no boundary condition for patch {}",
                        io.name, patch.name
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let internal = file.internal_field.expand(&io.name, mesh.n_cells())?;
        info!("Reading field {} from {}", io.name, time_name);
        VolField::with_conditions(&io.name, mesh, internal, conditions).map(Some)
    }

    pub fn read_surface_field<T: FieldValue>(
        &self,
        mesh: &FvMesh,
        io: &IOobject,
        time_name: &str,
    ) -> Result<Option<SurfaceField<T>>, VoFError> {
        let Some(path) = self.locate(io, time_name)? else {
            return Ok(None);
        };
        let file: SurfaceFieldFile<T> = self.read_json(&path)?;
        let values = file.values.expand(&io.name, mesh.n_faces())?;
        info!("Reading field {} from {}", io.name, time_name);
        Ok(Some(SurfaceField::from_values(&io.name, values)))
    }

    pub fn write_vol_field<T: FieldValue>(
        &self,
        mesh: &FvMesh,
        io: &IOobject,
        field: &VolField<T>,
        time_name: &str,
    ) -> Result<(), VoFError> {
        if io.write == WriteOption::NoWrite {
            return Ok(());
        }
        let file = VolFieldFile {
            internal_field: FieldData::compact(&field.internal),
            boundary_field: mesh
                .patches
                .iter()
                .zip(field.conditions.iter())
                .map(|(patch, bc)| (patch.name.clone(), bc.clone()))
                .collect(),
        };
        self.write_json(&self.field_path(time_name, &io.name), &file)
    }

    pub fn write_surface_field<T: FieldValue>(
        &self,
        io: &IOobject,
        field: &SurfaceField<T>,
        time_name: &str,
    ) -> Result<(), VoFError> {
        if io.write == WriteOption::NoWrite {
            return Ok(());
        }
        let file = SurfaceFieldFile {
            values: FieldData::compact(&field.values),
        };
        self.write_json(&self.field_path(time_name, &io.name), &file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use tempfile::tempdir;

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn time_names_are_short() {
        assert_eq!(format_time(0.0), "0");
        assert_eq!(format_time(1.0), "1");
        assert_eq!(format_time(0.1 + 0.2), "0.3");
        assert_eq!(format_time(2.5e-3), "0.0025");
    }

    #[test]
    fn latest_time_ignores_other_directories() {
        let dir = tempdir().unwrap();
        for d in ["0", "0.5", "10", "system", "constant", "1e-3"] {
            fs::create_dir_all(dir.path().join(d)).unwrap();
        }
        let case = CaseDir::new(dir.path());
        let times: Vec<String> = case.time_dirs().unwrap().into_iter().map(|t| t.1).collect();
        assert_eq!(times, vec!["0", "1e-3", "0.5", "10"]);
        assert_eq!(case.latest_time().unwrap().unwrap().0, 10.0);
    }

    #[test]
    fn reads_uniform_and_nonuniform_fields() {
        let dir = tempdir().unwrap();
        let case = CaseDir::new(dir.path());
        let mesh = FvMesh::line(3, 3.0).unwrap();
        write(
            &dir.path().join("0/alpha.water.json"),
            r#"{"internalField": {"nonuniform": [1, 0.5, 0]},
                "boundaryField": {"left": {"type": "fixedValue", "value": 1},
                                  "right": {"type": "zeroGradient"}}}"#,
        );
        write(
            &dir.path().join("0/U.json"),
            r#"{"internalField": {"uniform": [1, 0, 0]},
                "boundaryField": {"left": {"type": "fixedValue", "value": [1, 0, 0]},
                                  "right": {"type": "zeroGradient"}}}"#,
        );
        let must = |n: &str| IOobject::new(n, ReadOption::MustRead, WriteOption::AutoWrite);
        let alpha: VolField<f64> = case
            .read_vol_field(&mesh, &must("alpha.water"), "0")
            .unwrap()
            .unwrap();
        assert_eq!(alpha.internal, vec![1.0, 0.5, 0.0]);
        assert_eq!(alpha.boundary, vec![1.0, 0.0]);
        let u: VolField<Vector3<f64>> = case.read_vol_field(&mesh, &must("U"), "0").unwrap().unwrap();
        assert_eq!(u.internal[2], Vector3::new(1.0, 0.0, 0.0));

        let optional = IOobject::new("phi", ReadOption::ReadIfPresent, WriteOption::AutoWrite);
        let phi: Option<SurfaceField<f64>> = case.read_surface_field(&mesh, &optional, "0").unwrap();
        assert!(phi.is_none());
        let missing: Result<Option<VolField<f64>>, _> = case.read_vol_field(&mesh, &must("p_rgh"), "0");
        assert!(matches!(missing, Err(VoFError::MissingField { .. })));
    }

    #[test]
    fn rejects_wrong_sizes_and_patches() {
        let dir = tempdir().unwrap();
        let case = CaseDir::new(dir.path());
        let mesh = FvMesh::line(3, 3.0).unwrap();
        write(
            &dir.path().join("0/short.json"),
            r#"{"internalField": {"nonuniform": [1, 0]},
                "boundaryField": {"left": {"type": "zeroGradient"}, "right": {"type": "zeroGradient"}}}"#,
        );
        write(
            &dir.path().join("0/typo.json"),
            r#"{"internalField": {"uniform": 0},
                "boundaryField": {"lef": {"type": "zeroGradient"}, "right": {"type": "zeroGradient"}}}"#,
        );
        let must = |n: &str| IOobject::new(n, ReadOption::MustRead, WriteOption::AutoWrite);
        let short: Result<Option<VolField<f64>>, _> = case.read_vol_field(&mesh, &must("short"), "0");
        assert!(matches!(short, Err(VoFError::SizeMismatch { .. })));
        let typo: Result<Option<VolField<f64>>, _> = case.read_vol_field(&mesh, &must("typo"), "0");
        assert!(matches!(typo, Err(VoFError::UnknownPatch(_))));
    }

    #[test]
    fn written_fields_read_back() {
        let dir = tempdir().unwrap();
        let case = CaseDir::new(dir.path());
        let mesh = FvMesh::line(2, 1.0).unwrap();
        let mut p = VolField::uniform("p_rgh", &mesh, 0.0);
        p.internal = vec![3.0, 4.0];
        p.conditions[1] = BoundaryCondition::FixedValue { value: 0.0 };
        p.correct_boundary_conditions(&mesh);
        let io = IOobject::new("p_rgh", ReadOption::MustRead, WriteOption::AutoWrite);
        case.write_vol_field(&mesh, &io, &p, "0.1").unwrap();
        let back: VolField<f64> = case.read_vol_field(&mesh, &io, "0.1").unwrap().unwrap();
        assert_eq!(back.internal, p.internal);
        assert_eq!(back.conditions, p.conditions);

        let phi = SurfaceField::from_values("phi", vec![0.5; mesh.n_faces()]);
        let phi_io = IOobject::new("phi", ReadOption::MustRead, WriteOption::AutoWrite);
        case.write_surface_field(&phi_io, &phi, "0.1").unwrap();
        let text = fs::read_to_string(dir.path().join("0.1/phi.json")).unwrap();
        assert!(text.contains("uniform"));

        let skipped = IOobject::new("rho", ReadOption::NoRead, WriteOption::NoWrite);
        case.write_vol_field(&mesh, &skipped, &p, "0.1").unwrap();
        assert!(!dir.path().join("0.1/rho.json").exists());
    }
}
