// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Concatenate `path_a` and `path_b` into `out_path`.
///
/// The output is staged in `temp_dir` and moved into place once complete, so `out_path` is never
/// left truncated. A newline is inserted between the files if `path_a` does not end with one.
pub fn concatenate_files(
    path_a: &Path,
    path_b: &Path,
    out_path: &Path,
    temp_dir: &Path,
) -> Result<PathBuf> {
    let staged = tempfile::NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("creating temporary file in {}", temp_dir.display()))?;
    {
        let mut writer = BufWriter::new(staged.as_file());
        let a_ends_with_newline = copy_file(path_a, &mut writer)?;
        if !a_ends_with_newline {
            writer.write_all(b"\n")?;
        }
        copy_file(path_b, &mut writer)?;
        writer.flush()?;
    }
    staged
        .persist(out_path)
        .map_err(|err| err.error)
        .with_context(|| out_path.display().to_string())?;
    Ok(out_path.to_path_buf())
}

/// Append the file at `path` to `writer`. Returns whether the file is empty or ends with a newline.
fn copy_file(path: &Path, writer: &mut impl Write) -> Result<bool> {
    let mut file = File::open(path).with_context(|| path.display().to_string())?;
    let len = file.metadata()?.len();
    let ends_with_newline = if len == 0 {
        true
    } else {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        file.rewind()?;
        last[0] == b'\n'
    };
    io::copy(&mut BufReader::new(file), writer).with_context(|| path.display().to_string())?;
    Ok(ends_with_newline)
}
