//! File-backed artifact store
//!
//! Each artifact lives at `root/<name>.bin` as bincode. Writes go to a
//! hidden staging file in the same directory and are renamed into place, so
//! readers never observe a half-written artifact. Replaced artifacts are
//! kept at a hidden backup path until the whole group is installed.

use crate::error::{Result, SmartPriceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const PRICE_MODEL: &str = "price_model";
pub const PRICE_PREPROCESSOR: &str = "price_preprocessor";
pub const FRAUD_MODEL: &str = "fraud_model";
pub const FRAUD_PREPROCESSOR: &str = "fraud_preprocessor";

/// File extension of persisted artifacts
pub const ARTIFACT_EXTENSION: &str = "bin";

/// A named, already-serialized artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Serialize `value` under `name`
    pub fn encode<T: Serialize>(name: impl Into<String>, value: &T) -> Result<Self> {
        let name = name.into();
        let bytes = bincode::serialize(value).map_err(|e| {
            SmartPriceError::SerializationError(format!("Failed to serialize {}: {}", name, e))
        })?;
        Ok(Self { name, bytes })
    }

    /// Deserialize the payload; corrupt bytes surface as `ArtifactUnavailable`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        bincode::deserialize(&self.bytes)
            .map_err(|e| SmartPriceError::artifact_unavailable(&self.name, format!("corrupt: {}", e)))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Artifact store rooted at one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    /// Create a store; the directory is created on first write
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the artifact called `name`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, ARTIFACT_EXTENSION))
    }

    fn staging_path_for(&self, name: &str) -> PathBuf {
        self.root
            .join(format!(".{}.{}.tmp", name, ARTIFACT_EXTENSION))
    }

    fn backup_path_for(&self, name: &str) -> PathBuf {
        self.root
            .join(format!(".{}.{}.bak", name, ARTIFACT_EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Serialize and persist a single artifact, replacing any previous one
    pub fn save<T: Serialize>(&self, value: &T, name: &str) -> Result<PathBuf> {
        let artifact = Artifact::encode(name, value)?;
        let mut paths = self.commit(vec![artifact])?;
        paths.pop().ok_or_else(|| {
            SmartPriceError::TrainingError(format!("artifact {} was not written", name))
        })
    }

    /// Persist a group of artifacts together.
    ///
    /// Every artifact is written to a staging file first. Existing artifacts
    /// are then moved aside and the staged files renamed into place. Any
    /// failure removes what this call wrote and restores the previous
    /// artifacts, so the group is replaced entirely or not at all.
    pub fn commit(&self, artifacts: Vec<Artifact>) -> Result<Vec<PathBuf>> {
        for artifact in &artifacts {
            validate_name(&artifact.name)?;
        }

        fs::create_dir_all(&self.root).map_err(|e| {
            SmartPriceError::TrainingError(format!(
                "Failed to create model directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut staged: Vec<(PathBuf, PathBuf, &Artifact)> = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let staging = self.staging_path_for(&artifact.name);
            if let Err(e) = write_file(&staging, &artifact.bytes) {
                let _ = fs::remove_file(&staging);
                self.discard(&staged);
                return Err(SmartPriceError::TrainingError(format!(
                    "Failed to stage {}: {}",
                    artifact.name, e
                )));
            }
            staged.push((staging, self.path_for(&artifact.name), artifact));
        }

        let mut displaced: Vec<(PathBuf, PathBuf)> = Vec::new();
        for (_, target, artifact) in &staged {
            match self.displace(target, &artifact.name) {
                Ok(Some(backup)) => displaced.push((target.clone(), backup)),
                Ok(None) => {}
                Err(e) => {
                    restore(&displaced);
                    self.discard(&staged);
                    return Err(SmartPriceError::TrainingError(format!(
                        "Failed to replace {}: {}",
                        artifact.name, e
                    )));
                }
            }
        }

        let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
        for (index, (staging, target, artifact)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(staging, target) {
                for path in &written {
                    if let Err(e) = fs::remove_file(path) {
                        warn!(path = %path.display(), error = %e, "Failed to remove partially installed artifact");
                    }
                }
                restore(&displaced);
                self.discard(&staged[index..]);
                return Err(SmartPriceError::TrainingError(format!(
                    "Failed to install {}: {}",
                    artifact.name, e
                )));
            }
            debug!(artifact = %artifact.name, bytes = artifact.len(), path = %target.display(), "Artifact written");
            written.push(target.clone());
        }

        for (_, backup) in &displaced {
            if let Err(e) = fs::remove_file(backup) {
                warn!(path = %backup.display(), error = %e, "Failed to remove replaced artifact");
            }
        }

        info!(
            count = written.len(),
            replaced = displaced.len(),
            root = %self.root.display(),
            "Artifacts committed"
        );
        Ok(written)
    }

    /// Move an existing artifact to its backup path
    fn displace(&self, target: &Path, name: &str) -> std::io::Result<Option<PathBuf>> {
        match fs::symlink_metadata(target) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
            Ok(meta) if !meta.is_file() => Err(std::io::Error::new(
                ErrorKind::Other,
                format!("{} is not a regular file", target.display()),
            )),
            Ok(_) => {
                let backup = self.backup_path_for(name);
                fs::rename(target, &backup)?;
                Ok(Some(backup))
            }
        }
    }

    fn discard(&self, staged: &[(PathBuf, PathBuf, &Artifact)]) {
        for (staging, _, artifact) in staged {
            if let Err(e) = fs::remove_file(staging) {
                warn!(artifact = %artifact.name, error = %e, "Failed to remove staging file");
            }
        }
    }

    /// Read the raw bytes of an artifact
    pub fn read(&self, name: &str) -> Result<Artifact> {
        validate_name(name)?;
        let path = self.path_for(name);
        let mut file = File::open(&path).map_err(|e| {
            SmartPriceError::artifact_unavailable(name, format!("{}: {}", path.display(), e))
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| SmartPriceError::artifact_unavailable(name, e))?;
        Ok(Artifact {
            name: name.to_string(),
            bytes,
        })
    }

    /// Load and deserialize an artifact
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.read(name)?.decode()?;
        debug!(artifact = name, "Artifact loaded");
        Ok(value)
    }
}

/// Put displaced artifacts back in place
fn restore(displaced: &[(PathBuf, PathBuf)]) {
    for (target, backup) in displaced {
        if let Err(e) = fs::rename(backup, target) {
            warn!(path = %target.display(), error = %e, "Failed to restore previous artifact");
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Names map directly to file names inside the root
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(SmartPriceError::InvalidParameter {
            name: "artifact name".to_string(),
            value: name.to_string(),
            reason: "use ASCII letters, digits, '_' or '-'".to_string(),
        })
    }
}
