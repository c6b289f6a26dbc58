// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

// Warning groups (as of rust 1.55)
#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

//! Tunable parameters of the reference build and the location of the `kallisto` binary.
//!
//! Parameters are read from `parameters.toml` next to the running executable. When that file is
//! absent, compiled defaults are used.

pub mod exe;

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// k-mer length passed to `kallisto index`.
    pub kmer_size: usize,
    /// Exonic bases kept around the intronic region of each transcript.
    pub intron_flank: u64,
    /// Explicit path to the `kallisto` binary.
    pub kallisto_binary: Option<PathBuf>,
}

const DEFAULT_PARAMETERS: Parameters = Parameters {
    kmer_size: 31,
    intron_flank: 30,
    kallisto_binary: None,
};

impl Default for Parameters {
    fn default() -> Self {
        DEFAULT_PARAMETERS
    }
}

static PARAMETERS: OnceLock<Result<Parameters>> = OnceLock::new();

/// Parse a parameters file. Fields that are not given keep their defaults.
pub fn load_parameters(path: &Path) -> Result<Parameters> {
    let s = std::fs::read_to_string(path).with_context(|| path.display().to_string())?;
    toml::from_str(&s).with_context(|| path.display().to_string())
}

/// Return a reference to the global parameters.
/// The parameters may need to be loaded; if loading fails, return Err.
fn parameters() -> &'static Result<Parameters> {
    PARAMETERS.get_or_init(|| {
        let Some(path) = exe::current_exe_dir().map(|dir| dir.join("parameters.toml")) else {
            return Ok(DEFAULT_PARAMETERS);
        };
        if !path.exists() {
            warn!(
                "could not find parameters.toml at {}, falling back to defaults",
                path.display()
            );
            Ok(DEFAULT_PARAMETERS)
        } else {
            load_parameters(&path)
        }
    })
}

macro_rules! parameter_getter {
    ($a:ident, $t:ty) => {
        pub fn $a() -> Result<&'static $t> {
            let val = match parameters() {
                Err(e) => return Err(anyhow::anyhow!("{e:#}")),
                Ok(p) => &p.$a,
            };
            if DEFAULT_PARAMETERS.$a != *val {
                warn!("using non-default {} = {:?}", stringify!($a), val);
            }
            Ok(val)
        }
    };
}

parameter_getter!(kmer_size, usize);
parameter_getter!(intron_flank, u64);
parameter_getter!(kallisto_binary, Option<PathBuf>);

/// No usable `kallisto` executable could be found.
#[derive(Debug, thiserror::Error)]
#[error("could not find an executable kallisto binary; searched: {}", join_paths(.searched))]
pub struct BinaryNotFound {
    pub searched: Vec<PathBuf>,
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Platform directory name used for bundled binaries.
fn platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        os => os,
    }
}

/// Bundled location of the binary relative to the directory of the running executable.
fn bundled_binary(exe_dir: &Path) -> PathBuf {
    exe_dir
        .join("bins")
        .join(platform())
        .join("kallisto")
        .join("kallisto")
}

/// Resolve the path of the `kallisto` binary.
///
/// In order: `explicit` (e.g. a command line flag), `kallisto_binary` from parameters.toml, the
/// bundled `bins/<platform>/kallisto/kallisto` next to the executable, and finally `PATH`.
/// An explicit or configured path that is not executable is an error rather than skipped.
pub fn kallisto_binary_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let configured = kallisto_binary()?.as_deref();
    resolve_binary(
        explicit.or(configured),
        exe::current_exe_dir().map(|dir| bundled_binary(&dir)),
        exe::find_on_path("kallisto"),
    )
}

fn resolve_binary(
    requested: Option<&Path>,
    bundled: Option<PathBuf>,
    on_path: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = requested {
        if exe::is_executable_file(path) {
            return Ok(path.to_path_buf());
        }
        return Err(BinaryNotFound {
            searched: vec![path.to_path_buf()],
        }
        .into());
    }

    let mut searched = Vec::new();
    if let Some(path) = bundled {
        if exe::is_executable_file(&path) {
            return Ok(path);
        }
        searched.push(path);
    }
    match on_path {
        Some(path) => Ok(path),
        None => {
            searched.push(PathBuf::from("$PATH/kallisto"));
            Err(BinaryNotFound { searched }.into())
        }
    }
}
