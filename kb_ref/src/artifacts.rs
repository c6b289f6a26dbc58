// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! The manifest of files produced by one reference build.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Name of a reference artifact within the manifest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKey {
    T2g,
    Index,
    CdnaFasta,
    IntronFasta,
    CdnaT2c,
    IntronT2c,
    /// Produced by the t2c writer; the pipelines store it under a class-specific key.
    T2c,
}

#[derive(Debug, thiserror::Error)]
#[error("artifact \"{key}\" was already recorded at {}", .existing.display())]
pub struct DuplicateArtifact {
    pub key: ArtifactKey,
    pub existing: PathBuf,
}

/// Artifact key to path. Entries are only ever added; a key is never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactResult(BTreeMap<ArtifactKey, PathBuf>);

impl ArtifactResult {
    pub fn new() -> ArtifactResult {
        ArtifactResult::default()
    }

    /// A manifest holding a single artifact.
    pub fn single(key: ArtifactKey, path: impl Into<PathBuf>) -> ArtifactResult {
        ArtifactResult(BTreeMap::from([(key, path.into())]))
    }

    /// Record `path` under `key`. Recording a key twice is an error.
    pub fn insert(&mut self, key: ArtifactKey, path: impl Into<PathBuf>) -> Result<()> {
        if let Some(existing) = self.0.get(&key) {
            bail!(DuplicateArtifact {
                key,
                existing: existing.clone(),
            });
        }
        self.0.insert(key, path.into());
        Ok(())
    }

    /// Record every artifact of `other`.
    pub fn update(&mut self, other: ArtifactResult) -> Result<()> {
        for (key, path) in other.0 {
            self.insert(key, path)?;
        }
        Ok(())
    }

    pub fn get(&self, key: ArtifactKey) -> Option<&Path> {
        self.0.get(&key).map(PathBuf::as_path)
    }

    pub fn contains(&self, key: ArtifactKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Take the path recorded under `key` out of a single-step result.
    pub fn into_path(mut self, key: ArtifactKey) -> Result<PathBuf> {
        match self.0.remove(&key) {
            Some(path) => Ok(path),
            None => bail!("no \"{key}\" artifact was produced"),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = ArtifactKey> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKey, &Path)> {
        self.0.iter().map(|(k, v)| (*k, v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
