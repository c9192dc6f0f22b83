use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::common::{DomainError, DomainResult, GeoPoint};
use crate::domains::simulation::{
    Destination, DestinationCategory, ReferenceTrajectoryStore, Trajectory, TrajectorySink,
};

const CATEGORIES: [DestinationCategory; 2] = [DestinationCategory::Farm, DestinationCategory::Retailer];

/// One entry of a per-category reference file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedTrajectory {
    name: String,
    points: Vec<GeoPoint>,
}

/// Stores reference trajectories as JSON, one file per destination category
/// (`references/farm.json`, `references/retailer.json`), and the latest
/// simulated run as `runs/latest_run.json`.
pub struct FilesystemTrajectoryStore {
    base: PathBuf,
    // Serializes read-modify-write cycles on the reference files
    write_lock: Mutex<()>,
}

impl FilesystemTrajectoryStore {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base: base.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn reference_path(&self, category: DestinationCategory) -> PathBuf {
        self.base.join("references").join(format!("{}.json", category.as_str()))
    }

    pub fn latest_run_path(&self) -> PathBuf {
        self.base.join("runs").join("latest_run.json")
    }

    fn read_category(&self, category: DestinationCategory) -> DomainResult<Vec<NamedTrajectory>> {
        let p = self.reference_path(category);
        if !p.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&p).map_err(|e| io_error(&p, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The last simulated run, if one was saved.
    pub fn load_latest_run(&self) -> DomainResult<Option<Trajectory>> {
        let p = self.latest_run_path();
        if !p.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&p).map_err(|e| io_error(&p, e))?;
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

impl ReferenceTrajectoryStore for FilesystemTrajectoryStore {
    fn load_reference(&self, name: &str) -> DomainResult<Trajectory> {
        for category in CATEGORIES {
            if let Some(entry) = self.read_category(category)?.into_iter().find(|t| t.name == name) {
                debug!("Loaded {}-point reference for {}", entry.points.len(), name);
                return Ok(Trajectory::new(entry.points));
            }
        }
        Ok(Trajectory::empty())
    }

    fn save_reference(&self, destination: &Destination, trajectory: &Trajectory) -> DomainResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| DomainError::InfrastructureError("reference store lock poisoned".to_string()))?;

        let mut entries = self.read_category(destination.category)?;
        let entry = NamedTrajectory {
            name: destination.name.clone(),
            points: trajectory.points().to_vec(),
        };
        match entries.iter_mut().find(|t| t.name == destination.name) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        write_json(&self.reference_path(destination.category), &entries)
    }
}

impl TrajectorySink for FilesystemTrajectoryStore {
    fn save_run(&self, trajectory: &Trajectory) -> DomainResult<()> {
        write_json(&self.latest_run_path(), trajectory)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> DomainResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
    }
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, e: std::io::Error) -> DomainError {
    DomainError::InfrastructureError(format!("{}: {}", path.display(), e))
}
