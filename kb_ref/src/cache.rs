// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! When the index, and everything derived on the way to it, has to be rebuilt.

use std::path::Path;

/// Reports whether an index is already present.
pub trait IndexCache {
    fn is_built(&self, index_path: &Path) -> bool;
}

/// An index is built when its file exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsIndexCache;

impl IndexCache for FsIndexCache {
    fn is_built(&self, index_path: &Path) -> bool {
        index_path.exists()
    }
}

impl<F: Fn(&Path) -> bool> IndexCache for F {
    fn is_built(&self, index_path: &Path) -> bool {
        self(index_path)
    }
}

/// Rebuild iff the index is missing or the caller asked to overwrite it.
pub fn needs_rebuild(cache: &dyn IndexCache, index_path: &Path, overwrite: bool) -> bool {
    overwrite || !cache.is_built(index_path)
}
