// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! The standard and velocity reference builds.

use crate::artifacts::{ArtifactKey, ArtifactResult};
use crate::cache::{needs_rebuild, FsIndexCache, IndexCache};
use crate::events::{EventSink, LogSink, PipelineEvent};
use crate::t2c::create_t2c;
use crate::t2g::create_t2g_from_gtf;
use crate::toolkit::{NativeToolkit, Toolkit};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub const SORTED_FASTA_FILENAME: &str = "sorted.fa";
pub const SORTED_GTF_FILENAME: &str = "sorted.gtf";
pub const COMBINED_FILENAME: &str = "combined.fa";

/// Inputs and outputs of a standard (cDNA only) reference build.
#[derive(Debug, Clone)]
pub struct StandardRef<'a> {
    pub fasta_path: &'a Path,
    pub gtf_path: &'a Path,
    pub cdna_path: &'a Path,
    pub index_path: &'a Path,
    pub t2g_path: &'a Path,
    /// Scratch directory for sorted and combined intermediates. Must exist.
    pub temp_dir: &'a Path,
    pub overwrite: bool,
}

/// Inputs and outputs of an intron-aware reference build.
#[derive(Debug, Clone)]
pub struct VelocityRef<'a> {
    pub fasta_path: &'a Path,
    pub gtf_path: &'a Path,
    pub cdna_path: &'a Path,
    pub intron_path: &'a Path,
    pub index_path: &'a Path,
    pub t2g_path: &'a Path,
    pub cdna_t2c_path: &'a Path,
    pub intron_t2c_path: &'a Path,
    pub temp_dir: &'a Path,
    pub overwrite: bool,
}

/// A reference build with its collaborators.
pub struct Pipeline<'a> {
    pub toolkit: &'a dyn Toolkit,
    pub cache: &'a dyn IndexCache,
    pub events: &'a mut dyn EventSink,
}

struct Sorted {
    fasta: PathBuf,
    gtf: PathBuf,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        toolkit: &'a dyn Toolkit,
        cache: &'a dyn IndexCache,
        events: &'a mut dyn EventSink,
    ) -> Pipeline<'a> {
        Pipeline {
            toolkit,
            cache,
            events,
        }
    }

    fn t2g(&mut self, gtf_path: &Path, t2g_path: &Path, intron: bool) -> Result<ArtifactResult> {
        self.events
            .emit(PipelineEvent::CreatingT2g(t2g_path.to_path_buf()));
        create_t2g_from_gtf(gtf_path, t2g_path, intron)
    }

    /// Whether the index has to be built. Emits the skip notice when it does not.
    fn gate(&mut self, index_path: &Path, overwrite: bool) -> bool {
        if needs_rebuild(self.cache, index_path, overwrite) {
            return true;
        }
        self.events
            .emit(PipelineEvent::SkippedIndex(index_path.to_path_buf()));
        false
    }

    fn sort(&mut self, fasta_path: &Path, gtf_path: &Path, temp_dir: &Path) -> Result<Sorted> {
        self.events.emit(PipelineEvent::SortingFasta);
        let fasta = self
            .toolkit
            .sort_fasta(fasta_path, &temp_dir.join(SORTED_FASTA_FILENAME))?;
        self.events.emit(PipelineEvent::SortingGtf);
        let gtf = self
            .toolkit
            .sort_gtf(gtf_path, &temp_dir.join(SORTED_GTF_FILENAME))?;
        Ok(Sorted { fasta, gtf })
    }

    fn index(&mut self, fasta_path: &Path, index_path: &Path) -> Result<ArtifactResult> {
        self.events
            .emit(PipelineEvent::Indexing(index_path.to_path_buf()));
        self.toolkit.index(fasta_path, index_path)
    }

    /// Build the t2g map and, unless the index exists and `overwrite` is unset, the cDNA FASTA
    /// and its index. The manifest holds `t2g` and, when built, `index`.
    pub fn run_standard(&mut self, args: &StandardRef<'_>) -> Result<ArtifactResult> {
        let mut results = self.t2g(args.gtf_path, args.t2g_path, false)?;
        if !self.gate(args.index_path, args.overwrite) {
            return Ok(results);
        }

        let sorted = self.sort(args.fasta_path, args.gtf_path, args.temp_dir)?;
        self.events
            .emit(PipelineEvent::SplittingCdna(args.cdna_path.to_path_buf()));
        let cdna_path = self
            .toolkit
            .generate_cdna_fasta(&sorted.fasta, &sorted.gtf, args.cdna_path)?;
        results.update(self.index(&cdna_path, args.index_path)?)?;
        Ok(results)
    }

    /// Like `run_standard`, but also extracts intronic sequences, writes a capture list per
    /// sequence class and indexes cDNA and introns together.
    ///
    /// The capture lists are built from the per-class FASTAs; the index from their concatenation.
    pub fn run_velocity(&mut self, args: &VelocityRef<'_>) -> Result<ArtifactResult> {
        let mut results = self.t2g(args.gtf_path, args.t2g_path, true)?;
        if !self.gate(args.index_path, args.overwrite) {
            return Ok(results);
        }

        let sorted = self.sort(args.fasta_path, args.gtf_path, args.temp_dir)?;

        self.events
            .emit(PipelineEvent::SplittingCdna(args.cdna_path.to_path_buf()));
        let cdna_path = self
            .toolkit
            .generate_cdna_fasta(&sorted.fasta, &sorted.gtf, args.cdna_path)?;
        results.insert(ArtifactKey::CdnaFasta, &cdna_path)?;
        self.events
            .emit(PipelineEvent::CreatingCdnaT2c(args.cdna_t2c_path.to_path_buf()));
        let cdna_t2c =
            create_t2c(&cdna_path, args.cdna_t2c_path)?.into_path(ArtifactKey::T2c)?;
        results.insert(ArtifactKey::CdnaT2c, cdna_t2c)?;

        self.events
            .emit(PipelineEvent::SplittingIntrons(args.intron_path.to_path_buf()));
        let intron_path = self
            .toolkit
            .generate_intron_fasta(&sorted.fasta, &sorted.gtf, args.intron_path)?;
        results.insert(ArtifactKey::IntronFasta, &intron_path)?;
        self.events
            .emit(PipelineEvent::CreatingIntronT2c(args.intron_t2c_path.to_path_buf()));
        let intron_t2c =
            create_t2c(&intron_path, args.intron_t2c_path)?.into_path(ArtifactKey::T2c)?;
        results.insert(ArtifactKey::IntronT2c, intron_t2c)?;

        self.events.emit(PipelineEvent::Concatenating);
        let combined_path = self.toolkit.concatenate_files(
            &cdna_path,
            &intron_path,
            &args.temp_dir.join(COMBINED_FILENAME),
            args.temp_dir,
        )?;
        results.update(self.index(&combined_path, args.index_path)?)?;
        Ok(results)
    }
}

/// Standard build with the native toolkit, the filesystem as index cache and logging.
pub fn ref_standard(args: &StandardRef<'_>) -> Result<ArtifactResult> {
    ref_standard_with(args, &NativeToolkit::from_parameters()?, &FsIndexCache, &mut LogSink)
}

pub fn ref_standard_with(
    args: &StandardRef<'_>,
    toolkit: &dyn Toolkit,
    cache: &dyn IndexCache,
    events: &mut dyn EventSink,
) -> Result<ArtifactResult> {
    Pipeline::new(toolkit, cache, events).run_standard(args)
}

/// Velocity build with the native toolkit, the filesystem as index cache and logging.
pub fn ref_velocity(args: &VelocityRef<'_>) -> Result<ArtifactResult> {
    ref_velocity_with(args, &NativeToolkit::from_parameters()?, &FsIndexCache, &mut LogSink)
}

pub fn ref_velocity_with(
    args: &VelocityRef<'_>,
    toolkit: &dyn Toolkit,
    cache: &dyn IndexCache,
    events: &mut dyn EventSink,
) -> Result<ArtifactResult> {
    Pipeline::new(toolkit, cache, events).run_velocity(args)
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::bail;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    const GTF: &str = "\
chr1\tsrc\ttranscript\t1\t8\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; transcript_version \"2\"; gene_name \"ONE\";
chr1\tsrc\texon\t1\t8\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\"; transcript_version \"2\";
";

    /// Records every call and writes small placeholder outputs.
    #[derive(Default)]
    struct MockToolkit {
        calls: RefCell<Vec<&'static str>>,
        fail_index: bool,
    }

    impl MockToolkit {
        fn record(&self, name: &'static str) {
            self.calls.borrow_mut().push(name);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.borrow().clone()
        }
    }

    impl Toolkit for MockToolkit {
        fn sort_fasta(&self, _fasta_path: &Path, out_path: &Path) -> Result<PathBuf> {
            self.record("sort_fasta");
            Ok(out_path.to_path_buf())
        }

        fn sort_gtf(&self, _gtf_path: &Path, out_path: &Path) -> Result<PathBuf> {
            self.record("sort_gtf");
            Ok(out_path.to_path_buf())
        }

        fn generate_cdna_fasta(&self, _: &Path, _: &Path, out_path: &Path) -> Result<PathBuf> {
            self.record("generate_cdna_fasta");
            std::fs::write(out_path, ">T1.2\nACGT\n")?;
            Ok(out_path.to_path_buf())
        }

        fn generate_intron_fasta(&self, _: &Path, _: &Path, out_path: &Path) -> Result<PathBuf> {
            self.record("generate_intron_fasta");
            std::fs::write(out_path, ">T1.2-I\nACGTACGT\n")?;
            Ok(out_path.to_path_buf())
        }

        fn concatenate_files(
            &self,
            _path_a: &Path,
            _path_b: &Path,
            out_path: &Path,
            _temp_dir: &Path,
        ) -> Result<PathBuf> {
            self.record("concatenate_files");
            Ok(out_path.to_path_buf())
        }

        fn index(&self, _fasta_path: &Path, index_path: &Path) -> Result<ArtifactResult> {
            self.record("index");
            if self.fail_index {
                bail!("indexing failed");
            }
            std::fs::write(index_path, b"")?;
            Ok(ArtifactResult::single(ArtifactKey::Index, index_path))
        }
    }

    struct Layout {
        dir: tempfile::TempDir,
    }

    impl Layout {
        fn new() -> Layout {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("genes.gtf"), GTF).unwrap();
            std::fs::write(dir.path().join("genome.fa"), ">chr1\nACGTACGT\n").unwrap();
            std::fs::create_dir(dir.path().join("tmp")).unwrap();
            Layout { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }
    }

    struct Paths {
        fasta: PathBuf,
        gtf: PathBuf,
        cdna: PathBuf,
        intron: PathBuf,
        index: PathBuf,
        t2g: PathBuf,
        cdna_t2c: PathBuf,
        intron_t2c: PathBuf,
        tmp: PathBuf,
    }

    impl Paths {
        fn new(layout: &Layout) -> Paths {
            Paths {
                fasta: layout.path("genome.fa"),
                gtf: layout.path("genes.gtf"),
                cdna: layout.path("cdna.fa"),
                intron: layout.path("intron.fa"),
                index: layout.path("index.idx"),
                t2g: layout.path("t2g.txt"),
                cdna_t2c: layout.path("cdna_t2c.txt"),
                intron_t2c: layout.path("intron_t2c.txt"),
                tmp: layout.path("tmp"),
            }
        }

        fn standard(&self, overwrite: bool) -> StandardRef<'_> {
            StandardRef {
                fasta_path: &self.fasta,
                gtf_path: &self.gtf,
                cdna_path: &self.cdna,
                index_path: &self.index,
                t2g_path: &self.t2g,
                temp_dir: &self.tmp,
                overwrite,
            }
        }

        fn velocity(&self, overwrite: bool) -> VelocityRef<'_> {
            VelocityRef {
                fasta_path: &self.fasta,
                gtf_path: &self.gtf,
                cdna_path: &self.cdna,
                intron_path: &self.intron,
                index_path: &self.index,
                t2g_path: &self.t2g,
                cdna_t2c_path: &self.cdna_t2c,
                intron_t2c_path: &self.intron_t2c,
                temp_dir: &self.tmp,
                overwrite,
            }
        }
    }

    const INDEX_PRESENT: fn(&Path) -> bool = |_| true;
    const INDEX_ABSENT: fn(&Path) -> bool = |_| false;

    #[test]
    fn test_standard_builds_index() -> Result<()> {
        let layout = Layout::new();
        let paths = Paths::new(&layout);
        let toolkit = MockToolkit::default();
        let mut events: Vec<PipelineEvent> = Vec::new();

        let result =
            ref_standard_with(&paths.standard(false), &toolkit, &INDEX_ABSENT, &mut events)?;
        assert_eq!(
            result.keys().collect::<Vec<_>>(),
            vec![ArtifactKey::T2g, ArtifactKey::Index]
        );
        assert_eq!(result.get(ArtifactKey::Index), Some(paths.index.as_path()));
        assert_eq!(
            toolkit.calls(),
            vec!["sort_fasta", "sort_gtf", "generate_cdna_fasta", "index"]
        );
        assert_eq!(
            events,
            vec![
                PipelineEvent::CreatingT2g(paths.t2g.clone()),
                PipelineEvent::SortingFasta,
                PipelineEvent::SortingGtf,
                PipelineEvent::SplittingCdna(paths.cdna.clone()),
                PipelineEvent::Indexing(paths.index.clone()),
            ]
        );
        assert_eq!(std::fs::read_to_string(&paths.t2g)?, "T1.2\tG1\tONE\n");
        Ok(())
    }

    #[test]
    fn test_standard_skips_existing_index() -> Result<()> {
        let layout = Layout::new();
        let paths = Paths::new(&layout);
        let toolkit = MockToolkit::default();
        let mut events: Vec<PipelineEvent> = Vec::new();

        let result =
            ref_standard_with(&paths.standard(false), &toolkit, &INDEX_PRESENT, &mut events)?;
        assert_eq!(result.keys().collect::<Vec<_>>(), vec![ArtifactKey::T2g]);
        assert!(toolkit.calls().is_empty());
        assert_eq!(
            events.last(),
            Some(&PipelineEvent::SkippedIndex(paths.index.clone()))
        );
        assert!(events.last().unwrap().to_string().contains("--overwrite"));
        Ok(())
    }

    #[test]
    fn test_standard_overwrite() -> Result<()> {
        let layout = Layout::new();
        let paths = Paths::new(&layout);
        let toolkit = MockToolkit::default();

        let result =
            ref_standard_with(&paths.standard(true), &toolkit, &INDEX_PRESENT, &mut LogSink)?;
        assert_eq!(
            result.keys().collect::<Vec<_>>(),
            vec![ArtifactKey::T2g, ArtifactKey::Index]
        );
        assert_eq!(toolkit.calls().len(), 4);
        Ok(())
    }

    #[test]
    fn test_velocity_skips_existing_index() -> Result<()> {
        let layout = Layout::new();
        let paths = Paths::new(&layout);
        let toolkit = MockToolkit::default();

        let result =
            ref_velocity_with(&paths.velocity(false), &toolkit, &INDEX_PRESENT, &mut LogSink)?;
        assert_eq!(result.keys().collect::<Vec<_>>(), vec![ArtifactKey::T2g]);
        assert!(toolkit.calls().is_empty());
        assert!(!paths.cdna_t2c.exists());
        assert_eq!(
            std::fs::read_to_string(&paths.t2g)?,
            "T1.2\tG1\tONE\nT1.2-I\tG1\tONE\n"
        );
        Ok(())
    }

    #[test]
    fn test_velocity_overwrite() -> Result<()> {
        let layout = Layout::new();
        let paths = Paths::new(&layout);
        let toolkit = MockToolkit::default();
        let mut events: Vec<PipelineEvent> = Vec::new();

        let result =
            ref_velocity_with(&paths.velocity(true), &toolkit, &INDEX_PRESENT, &mut events)?;
        assert_eq!(result.len(), 6);
        assert_eq!(result.get(ArtifactKey::CdnaFasta), Some(paths.cdna.as_path()));
        assert_eq!(result.get(ArtifactKey::IntronFasta), Some(paths.intron.as_path()));
        assert_eq!(result.get(ArtifactKey::CdnaT2c), Some(paths.cdna_t2c.as_path()));
        assert_eq!(result.get(ArtifactKey::IntronT2c), Some(paths.intron_t2c.as_path()));
        assert!(!result.contains(ArtifactKey::T2c));
        assert_eq!(
            toolkit.calls(),
            vec![
                "sort_fasta",
                "sort_gtf",
                "generate_cdna_fasta",
                "generate_intron_fasta",
                "concatenate_files",
                "index"
            ]
        );
        assert_eq!(std::fs::read_to_string(&paths.cdna_t2c)?, "T1.2\n");
        assert_eq!(std::fs::read_to_string(&paths.intron_t2c)?, "T1.2-I\n");
        assert!(events.contains(&PipelineEvent::CreatingIntronT2c(paths.intron_t2c.clone())));
        Ok(())
    }

    #[test]
    fn test_failure_aborts() {
        let layout = Layout::new();
        let paths = Paths::new(&layout);
        let toolkit = MockToolkit {
            fail_index: true,
            ..Default::default()
        };
        let err = ref_velocity_with(&paths.velocity(false), &toolkit, &INDEX_ABSENT, &mut LogSink)
            .unwrap_err();
        assert_eq!(err.to_string(), "indexing failed");
        // Files written before the failure are left in place.
        assert!(paths.t2g.exists());
        assert!(paths.intron_t2c.exists());
    }
}
