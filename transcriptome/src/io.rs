// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Open a possibly gzip-compressed text file. Compression is detected from the `.gz` extension.
pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| path.display().to_string())?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};

    #[test]
    fn test_reads_plain_and_gzip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let plain = dir.path().join("a.txt");
        std::fs::write(&plain, "hello\n")?;
        let gz = dir.path().join("a.txt.gz");
        let mut enc = GzEncoder::new(File::create(&gz)?, Compression::default());
        enc.write_all(b"hello\n")?;
        enc.finish()?;

        for path in [plain, gz] {
            let mut s = String::new();
            open_maybe_gz(&path)?.read_to_string(&mut s)?;
            assert_eq!(s, "hello\n");
        }
        Ok(())
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = open_maybe_gz(Path::new("/no/such/file.gtf")).err().unwrap();
        assert_eq!(err.to_string(), "/no/such/file.gtf");
    }
}
