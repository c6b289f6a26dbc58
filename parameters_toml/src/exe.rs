// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//!
//! Locating executables: the running program and tools on the PATH.
//!

use std::env;
use std::path::{Path, PathBuf};

/// Determines whether a path is a file and has executable permissions.
pub fn is_executable_file<P: AsRef<Path>>(path: P) -> bool {
    use libc::{access, X_OK};
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    if path.as_ref().is_file() {
        if let Ok(path) = CString::new(path.as_ref().as_os_str().as_bytes()) {
            return unsafe { access(path.as_c_str().as_ptr(), X_OK) } == 0;
        }
    }
    false
}

/// The directory holding the running executable, without resolving a symlinked executable.
pub fn current_exe_dir() -> Option<PathBuf> {
    let exe = PathBuf::from(env::args_os().next()?);
    match exe.parent() {
        // ./exe or foo/bar/exe: no PATH lookup happened
        Some(p) if !p.as_os_str().is_empty() => p.canonicalize().ok(),
        _ => env::current_exe().ok()?.parent().map(Path::to_path_buf),
    }
}

/// The first executable called `name` in the directories of `PATH`.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    find_in_dirs(name, env::split_paths(&paths))
}

pub(crate) fn find_in_dirs(name: &str, dirs: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    dirs.into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable_file(candidate))
}
