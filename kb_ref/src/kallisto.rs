// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Running external tools, and `kallisto index` in particular.

use crate::artifacts::{ArtifactKey, ArtifactResult};
use anyhow::{bail, Context, Result};
use itertools::Itertools;
use log::debug;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, ExitStatus, Output};

/// k-mer length used when none is configured.
pub const DEFAULT_KMER_SIZE: usize = 31;

/// An external command ran but exited unsuccessfully.
#[derive(Debug, thiserror::Error)]
#[error("`{command}` failed with {status}\n{stderr}")]
pub struct ToolFailed {
    pub command: String,
    pub status: ExitStatus,
    pub stderr: String,
}

fn display_command(command: &[OsString]) -> String {
    command.iter().map(|arg| arg.to_string_lossy()).join(" ")
}

/// Run `command` (program followed by its arguments) to completion and capture its output.
///
/// Failing to launch is an error with the command line attached; a non-zero exit is a
/// `ToolFailed` carrying the exit status and stderr.
pub fn run_executable(command: &[OsString]) -> Result<Output> {
    let Some((program, args)) = command.split_first() else {
        bail!("cannot run an empty command");
    };
    let command_line = display_command(command);
    debug!("Running {command_line}");

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Running {command_line}"))?;
    if !output.status.success() {
        bail!(ToolFailed {
            command: command_line,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }
    Ok(output)
}

/// The command line `<binary> index -i <index> -k <k> <fasta>`.
pub fn kallisto_index_command(
    binary: &Path,
    fasta_path: &Path,
    index_path: &Path,
    k: usize,
) -> Vec<OsString> {
    let k = k.to_string();
    [
        binary.as_os_str(),
        OsStr::new("index"),
        OsStr::new("-i"),
        index_path.as_os_str(),
        OsStr::new("-k"),
        OsStr::new(&k),
        fasta_path.as_os_str(),
    ]
    .into_iter()
    .map(OsStr::to_os_string)
    .collect()
}

/// Build a kallisto index of `fasta_path` at `index_path`.
pub fn kallisto_index(
    binary: &Path,
    fasta_path: &Path,
    index_path: &Path,
    k: usize,
) -> Result<ArtifactResult> {
    run_executable(&kallisto_index_command(binary, fasta_path, index_path, k))?;
    Ok(ArtifactResult::single(ArtifactKey::Index, index_path))
}
