//! Storage port for grids and instruments

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use groove_core::{Grid, GridId, Instrument, InstrumentId};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where grids and instruments live between sessions
pub trait Persistence: Send {
    fn save_grid(&mut self, grid: &Grid) -> Result<(), PersistenceError>;
    fn load_grid(&self, id: GridId) -> Result<Option<Grid>, PersistenceError>;
    fn delete_grid(&mut self, id: GridId) -> Result<(), PersistenceError>;
    fn all_grids(&self) -> Result<Vec<Grid>, PersistenceError>;
    fn save_instrument(&mut self, instrument: &Instrument) -> Result<(), PersistenceError>;
    fn all_instruments(&self) -> Result<Vec<Instrument>, PersistenceError>;
}

/// In-memory store, for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    grids: BTreeMap<GridId, Grid>,
    instruments: BTreeMap<InstrumentId, Instrument>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemoryPersistence {
    fn save_grid(&mut self, grid: &Grid) -> Result<(), PersistenceError> {
        self.grids.insert(grid.id, grid.clone());
        Ok(())
    }

    fn load_grid(&self, id: GridId) -> Result<Option<Grid>, PersistenceError> {
        Ok(self.grids.get(&id).cloned())
    }

    fn delete_grid(&mut self, id: GridId) -> Result<(), PersistenceError> {
        self.grids.remove(&id);
        Ok(())
    }

    fn all_grids(&self) -> Result<Vec<Grid>, PersistenceError> {
        Ok(self.grids.values().cloned().collect())
    }

    fn save_instrument(&mut self, instrument: &Instrument) -> Result<(), PersistenceError> {
        self.instruments.insert(instrument.id, instrument.clone());
        Ok(())
    }

    fn all_instruments(&self) -> Result<Vec<Instrument>, PersistenceError> {
        Ok(self.instruments.values().cloned().collect())
    }
}

/// One JSON file per record under `grids/` and `instruments/`
#[derive(Debug, Clone)]
pub struct JsonDirPersistence {
    root: PathBuf,
}

impl JsonDirPersistence {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        fs::create_dir_all(root.join("grids"))?;
        fs::create_dir_all(root.join("instruments"))?;
        debug!(path = %root.display(), "Opened grid store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn grid_path(&self, id: GridId) -> PathBuf {
        self.root.join("grids").join(format!("{}.json", id.0))
    }

    fn instrument_path(&self, id: InstrumentId) -> PathBuf {
        self.root.join("instruments").join(format!("{}.json", id.0))
    }

    fn read_all<T: serde::de::DeserializeOwned>(&self, dir: &str) -> Result<Vec<T>, PersistenceError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(self.root.join(dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|p| -> Result<T, PersistenceError> {
                Ok(serde_json::from_str(&fs::read_to_string(p)?)?)
            })
            .collect()
    }
}

fn write_atomic(path: &Path, contents: String) -> Result<(), PersistenceError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl Persistence for JsonDirPersistence {
    fn save_grid(&mut self, grid: &Grid) -> Result<(), PersistenceError> {
        write_atomic(&self.grid_path(grid.id), serde_json::to_string_pretty(grid)?)
    }

    fn load_grid(&self, id: GridId) -> Result<Option<Grid>, PersistenceError> {
        match fs::read_to_string(self.grid_path(id)) {
            Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_grid(&mut self, id: GridId) -> Result<(), PersistenceError> {
        match fs::remove_file(self.grid_path(id)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn all_grids(&self) -> Result<Vec<Grid>, PersistenceError> {
        self.read_all("grids")
    }

    fn save_instrument(&mut self, instrument: &Instrument) -> Result<(), PersistenceError> {
        write_atomic(
            &self.instrument_path(instrument.id),
            serde_json::to_string_pretty(instrument)?,
        )
    }

    fn all_instruments(&self) -> Result<Vec<Instrument>, PersistenceError> {
        self.read_all("instruments")
    }
}
