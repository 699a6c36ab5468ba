use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::data::model::ExperimentId;

/// Path of a JSON config file; takes precedence over [`ROOT_ENV`].
pub const CONFIG_ENV: &str = "DISSDATA_CONFIG";
/// Data root laid out as `Exp<n>/dissexp<n>r.txt`.
pub const ROOT_ENV: &str = "DISSDATA_ROOT";

// ---------------------------------------------------------------------------
// SourceConfig – where the eight experiment tables live
// ---------------------------------------------------------------------------

/// Locates the experiment tables and fixes how they are read.
///
/// JSON form:
///
/// ```json
/// {
///   "root": "/data/praat",
///   "files": { "3": "rerun/dissexp3r.txt" },
///   "delimiter": "\t",
///   "seed": 7
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    pub root: PathBuf,
    /// Per-experiment overrides; relative paths resolve against `root`.
    #[serde(default)]
    pub files: BTreeMap<u8, PathBuf>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Seed for jitter and participant sampling. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_delimiter() -> char {
    '\t'
}

impl SourceConfig {
    /// Use the default layout under `root`.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        SourceConfig {
            root: root.into(),
            files: BTreeMap::new(),
            delimiter: default_delimiter(),
            seed: None,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in config {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: SourceConfig = serde_json::from_str(text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Look for a configuration in the environment.
    pub fn from_env() -> Result<Option<Self>> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_json_file(Path::new(&path)).map(Some);
        }
        Ok(env::var_os(ROOT_ENV).map(Self::from_root))
    }

    fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            bail!("delimiter {:?} is not a single ASCII character", self.delimiter);
        }
        for n in self.files.keys() {
            if ExperimentId::new(*n as i64).is_err() {
                bail!("file override for unknown experiment {n}");
            }
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII for parsed configs; fall back to tab otherwise.
        u8::try_from(self.delimiter).unwrap_or(b'\t')
    }

    /// Location of the source table for `id`.
    pub fn path_for(&self, id: ExperimentId) -> PathBuf {
        match self.files.get(&id.get()) {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.root.join(path),
            None => self
                .root
                .join(format!("Exp{}", id.get()))
                .join(format!("dissexp{}r.txt", id.get())),
        }
    }
}
