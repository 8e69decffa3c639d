//! Interface configuration types
//!
//! Everything needed to build a [`crate::CarInterface`]: which vehicle is
//! driven and where its signal catalog lives. Control behavior itself is
//! fixed per variant and not configurable.

use crate::values::CarVariant;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a vehicle interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// Vehicle variant to drive
    pub variant: CarVariant,

    /// Explicit DBC file; when absent the variant's catalog is looked up in
    /// `dbc_dir`
    #[serde(default)]
    pub dbc_path: Option<PathBuf>,

    /// Directory holding the bundled catalogs (default: `dbc`)
    #[serde(default = "default_dbc_dir")]
    pub dbc_dir: PathBuf,
}

fn default_dbc_dir() -> PathBuf {
    PathBuf::from("dbc")
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self::new(CarVariant::Impreza)
    }
}

impl InterfaceConfig {
    /// Create a configuration with default catalog lookup
    pub fn new(variant: CarVariant) -> Self {
        Self {
            variant,
            dbc_path: None,
            dbc_dir: default_dbc_dir(),
        }
    }

    /// Builder method: use this DBC file
    pub fn with_dbc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dbc_path = Some(path.into());
        self
    }

    /// Builder method: look catalogs up in this directory
    pub fn with_dbc_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dbc_dir = dir.as_ref().to_path_buf();
        self
    }

    /// DBC file the interface will load
    pub fn dbc_file(&self) -> PathBuf {
        match &self.dbc_path {
            Some(path) => path.clone(),
            None => self.dbc_dir.join(format!("{}.dbc", self.variant.dbc_name())),
        }
    }
}
