//! Configuration for TesseraKV
//!
//! Centralized configuration with sensible defaults.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, TesseraError};

/// Extension of the index log file
pub const INDEX_EXTENSION: &str = "vidx";

/// Extension of the value log file
pub const VALUE_EXTENSION: &str = "vdb";

/// Main configuration for a TesseraKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Base path of the database. Both files live next to it:
    ///   {parent}/
    ///     ├── {name}.vidx      (index log)
    ///     └── {name}.vdb       (value log)
    pub base_path: PathBuf,

    /// Size of one value-log block in bytes. Fixed for the lifetime of the
    /// files; reopening an existing pair with a different size is undefined.
    pub block_size: u64,

    /// Remove both backing files when the process exits
    pub delete_on_exit: bool,

    // -------------------------------------------------------------------------
    // Block Pool Configuration
    // -------------------------------------------------------------------------
    /// Upper bound on idle mapped windows kept cached by the block pool
    pub max_mapped_blocks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./tessera_data/db"),
            block_size: 64 * 1024, // 64 KB
            delete_on_exit: false,
            max_mapped_blocks: 64,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the index log: `<base>.vidx`
    pub fn index_path(&self) -> PathBuf {
        with_extension(&self.base_path, INDEX_EXTENSION)
    }

    /// Path of the value log: `<base>.vdb`
    pub fn value_path(&self) -> PathBuf {
        with_extension(&self.base_path, VALUE_EXTENSION)
    }

    /// Check the values an engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(TesseraError::Config("block_size must be non-zero".to_string()));
        }
        if self.max_mapped_blocks == 0 {
            return Err(TesseraError::Config(
                "max_mapped_blocks must be non-zero".to_string(),
            ));
        }
        if self.base_path.file_name().is_none() {
            return Err(TesseraError::Config(format!(
                "base_path has no file name: {}",
                self.base_path.display()
            )));
        }
        Ok(())
    }
}

/// Appends `.ext` to the full file name (`db.v1` becomes `db.v1.vidx`)
fn with_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the base path (files are derived from it)
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_path = path.into();
        self
    }

    /// Set the value-log block size (in bytes)
    pub fn block_size(mut self, size: u64) -> Self {
        self.config.block_size = size;
        self
    }

    /// Mark the backing files for removal at process exit
    pub fn delete_on_exit(mut self, delete: bool) -> Self {
        self.config.delete_on_exit = delete;
        self
    }

    /// Set the bound on cached mapped windows
    pub fn max_mapped_blocks(mut self, count: usize) -> Self {
        self.config.max_mapped_blocks = count;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
