// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

//! Derive transcript-level sequence files from a genome FASTA and its GTF.

use crate::fasta::{Fasta, FastaWriter};
use crate::transcript_sequence::{span_sequence, spliced_sequence};
use crate::transcriptome::{Transcript, Transcriptome};
use anyhow::Result;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Appended to a transcript id to name its intronic sequence.
pub const INTRON_SUFFIX: &str = "-I";

/// Exonic bases kept on either side of the intronic region, k - 1 for the default k of 31.
pub const DEFAULT_INTRON_FLANK: u64 = 30;

#[derive(Debug, Clone, Copy)]
enum SequenceClass {
    Cdna,
    Intron { flank: u64 },
}

struct Extracted {
    name: String,
    /// 0-based half-open genomic span the sequence was taken from.
    start: u64,
    end: u64,
    seq: Vec<u8>,
}

impl SequenceClass {
    fn extract(self, tx: &Transcript, chrom_seq: &[u8]) -> Option<Extracted> {
        match self {
            SequenceClass::Cdna => Some(Extracted {
                name: tx.id.clone(),
                start: tx.start(),
                end: tx.end(),
                seq: spliced_sequence(chrom_seq, &tx.exons, tx.strand)?,
            }),
            SequenceClass::Intron { flank } => {
                let introns = tx.introns();
                let (first, last) = (introns.first()?, introns.last()?);
                let start = first.start.saturating_sub(flank);
                let end = (last.end + flank).min(chrom_seq.len() as u64);
                Some(Extracted {
                    name: format!("{}{INTRON_SUFFIX}", tx.id),
                    start,
                    end,
                    seq: span_sequence(chrom_seq, start, end, tx.strand)?,
                })
            }
        }
    }
}

/// Write the spliced cDNA sequence of every transcript in `gtf_path` to `out_path`.
///
/// Both inputs are expected to be sorted (see `Fasta::sort` and `Gtf::sort`); the genome is read
/// one chromosome at a time. Sequences are named by versioned transcript id.
pub fn generate_cdna_fasta(
    fasta_path: &Path,
    gtf_path: &Path,
    out_path: &Path,
) -> Result<PathBuf> {
    write_sequences(fasta_path, gtf_path, out_path, SequenceClass::Cdna)?;
    Ok(out_path.to_path_buf())
}

/// Write one intronic sequence per multi-exon transcript, named `<transcript>-I`.
///
/// The sequence spans from `flank` bases before the first intron to `flank` bases after the last
/// one, on the transcript's strand. Single-exon transcripts have no intronic sequence.
pub fn generate_intron_fasta(
    fasta_path: &Path,
    gtf_path: &Path,
    out_path: &Path,
    flank: u64,
) -> Result<PathBuf> {
    write_sequences(fasta_path, gtf_path, out_path, SequenceClass::Intron { flank })?;
    Ok(out_path.to_path_buf())
}

fn write_sequences(
    fasta_path: &Path,
    gtf_path: &Path,
    out_path: &Path,
    class: SequenceClass,
) -> Result<usize> {
    let txome = Transcriptome::from_gtf_path(gtf_path)?;
    let by_chrom = txome.transcripts_by_chrom();
    let mut seen_chroms = HashSet::new();

    let mut writer = FastaWriter::create(out_path)?;
    let mut written = 0;
    for entry in Fasta::new(fasta_path).entries()? {
        let entry = entry?;
        let Some(txs) = by_chrom.get(entry.id.as_str()) else {
            continue;
        };
        seen_chroms.insert(entry.id.clone());
        for tx in txs {
            if tx.exons.is_empty() {
                warn!("transcript {} has no exons, skipping", tx.id);
                continue;
            }
            // Checked for both classes so that cDNA and intron outputs skip the same transcripts.
            if tx.exons.iter().any(|e| e.end > entry.seq.len() as u64) {
                warn!(
                    "transcript {} extends past the end of {}, skipping",
                    tx.id, entry.id
                );
                continue;
            }
            let Some(extracted) = class.extract(tx, &entry.seq) else {
                continue;
            };
            let gene = txome.gene(tx);
            let desc = format!(
                "gene_id:{} gene_name:{} chr:{} start:{} end:{} strand:{}",
                gene.id,
                gene.name,
                tx.chrom,
                extracted.start + 1,
                extracted.end,
                tx.strand_str()
            );
            writer.write(&extracted.name, Some(&desc), &extracted.seq)?;
            written += 1;
        }
    }
    writer.finish()?;

    let missing = by_chrom
        .keys()
        .filter(|chrom| !seen_chroms.contains(**chrom))
        .count();
    if missing > 0 {
        warn!(
            "{missing} chromosome(s) in {} are absent from {}",
            gtf_path.display(),
            fasta_path.display()
        );
    }
    debug!("wrote {written} {class:?} sequences to {}", out_path.display());
    Ok(written)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fasta::read_ids;
    use pretty_assertions::assert_eq;

    // chr1: 40 bases. T1 (+) has exons 1-4, 9-12, 25-28; T2 (-) is single exon 21-24.
    const GENOME: &str = ">chr1\nAAAACCCCGGGGTTTTACGTACGTAAAACCCCGGGGTTTT\n>chr2\nGGGG\n";
    const GTF: &str = "\
chr1\tsrc\ttranscript\t1\t28\t.\t+\t.\tgene_id \"G1\"; gene_version \"3\"; transcript_id \"T1\"; gene_name \"ONE\";
chr1\tsrc\texon\t1\t4\t.\t+\t.\tgene_id \"G1\"; gene_version \"3\"; transcript_id \"T1\";
chr1\tsrc\texon\t9\t12\t.\t+\t.\tgene_id \"G1\"; gene_version \"3\"; transcript_id \"T1\";
chr1\tsrc\texon\t25\t28\t.\t+\t.\tgene_id \"G1\"; gene_version \"3\"; transcript_id \"T1\";
chr1\tsrc\ttranscript\t21\t24\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T2\"; transcript_version \"1\";
chr1\tsrc\texon\t21\t24\t.\t-\t.\tgene_id \"G2\"; transcript_id \"T2\"; transcript_version \"1\";
chr3\tsrc\ttranscript\t1\t4\t.\t+\t.\tgene_id \"G3\"; transcript_id \"T3\";
chr3\tsrc\texon\t1\t4\t.\t+\t.\tgene_id \"G3\"; transcript_id \"T3\";
";

    fn inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let fa = dir.join("genome.fa");
        let gtf = dir.join("genes.gtf");
        std::fs::write(&fa, GENOME).unwrap();
        std::fs::write(&gtf, GTF).unwrap();
        (fa, gtf)
    }

    #[test]
    fn test_cdna() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (fa, gtf) = inputs(dir.path());
        let out = dir.path().join("cdna.fa");
        assert_eq!(generate_cdna_fasta(&fa, &gtf, &out)?, out);
        assert_eq!(
            std::fs::read_to_string(&out)?,
            "\
>T1 gene_id:G1.3 gene_name:ONE chr:chr1 start:1 end:28 strand:+
AAAAGGGGAAAA
>T2.1 gene_id:G2 gene_name: chr:chr1 start:21 end:24 strand:-
ACGT
"
        );
        Ok(())
    }

    #[test]
    fn test_intron() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (fa, gtf) = inputs(dir.path());
        let out = dir.path().join("intron.fa");
        generate_intron_fasta(&fa, &gtf, &out, 2)?;
        // Introns of T1 span [4, 24); with a flank of 2 that is [2, 26).
        assert_eq!(
            std::fs::read_to_string(&out)?,
            "\
>T1-I gene_id:G1.3 gene_name:ONE chr:chr1 start:3 end:26 strand:+
AACCCCGGGGTTTTACGTACGTAA
"
        );
        Ok(())
    }

    #[test]
    fn test_intron_reverse_strand_near_chrom_start() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fa = dir.path().join("genome.fa");
        let gtf = dir.path().join("genes.gtf");
        // chr1 positions 1-20: exons 1-2, 5-8, 17-20, introns [2, 4) and [8, 16).
        std::fs::write(&fa, ">chr1\nAACCGGTTACGTAAAATTTT\n")?;
        std::fs::write(
            &gtf,
            "\
chr1\tsrc\texon\t17\t20\t.\t-\t.\tgene_id \"G9\"; transcript_id \"T9\";
chr1\tsrc\texon\t1\t2\t.\t-\t.\tgene_id \"G9\"; transcript_id \"T9\";
chr1\tsrc\texon\t5\t8\t.\t-\t.\tgene_id \"G9\"; transcript_id \"T9\";
",
        )?;
        let out = dir.path().join("intron.fa");
        generate_intron_fasta(&fa, &gtf, &out, 3)?;
        // [2 - 3, 16 + 3) clamps to [0, 19): AACCGGTTACGTAAAATTT, reverse complemented.
        assert_eq!(
            std::fs::read_to_string(&out)?,
            "\
>T9-I gene_id:G9 gene_name: chr:chr1 start:1 end:19 strand:-
AAATTTTACGTAACCGGTT
"
        );
        Ok(())
    }

    #[test]
    fn test_past_chrom_end_skipped_by_both_classes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fa = dir.path().join("genome.fa");
        let gtf = dir.path().join("genes.gtf");
        std::fs::write(&fa, ">chr1\nAAAACCCCGGGG\n")?;
        std::fs::write(
            &gtf,
            "\
chr1\tsrc\texon\t1\t4\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
chr1\tsrc\texon\t9\t20\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1\";
",
        )?;
        let cdna = generate_cdna_fasta(&fa, &gtf, &dir.path().join("cdna.fa"))?;
        let intron = generate_intron_fasta(&fa, &gtf, &dir.path().join("intron.fa"), 2)?;
        assert!(read_ids(&cdna)?.is_empty());
        assert!(read_ids(&intron)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_classes_are_disjoint() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (fa, gtf) = inputs(dir.path());
        let cdna = generate_cdna_fasta(&fa, &gtf, &dir.path().join("cdna.fa"))?;
        let intron = generate_intron_fasta(&fa, &gtf, &dir.path().join("intron.fa"), 30)?;
        let cdna_ids: HashSet<_> = read_ids(&cdna)?.into_iter().collect();
        let intron_ids: HashSet<_> = read_ids(&intron)?.into_iter().collect();
        assert!(cdna_ids.is_disjoint(&intron_ids));
        assert_eq!(intron_ids.len(), 1);
        Ok(())
    }
}
