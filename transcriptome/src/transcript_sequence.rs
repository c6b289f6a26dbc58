// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

use crate::transcriptome::Exon;
use bio_types::strand::ReqStrand;

/// Splice the exons of a transcript out of its chromosome sequence.
/// The exons must be in genomic order. Returns None if any exon runs past the chromosome end.
pub(crate) fn spliced_sequence(
    chrom_seq: &[u8],
    exons: &[Exon],
    strand: ReqStrand,
) -> Option<Vec<u8>> {
    let size: usize = exons.iter().map(Exon::len).sum::<u64>() as usize;
    let mut seq = Vec::with_capacity(size);
    for exon in exons {
        seq.extend_from_slice(chrom_seq.get(exon.start as usize..exon.end as usize)?);
    }
    Some(oriented(seq, strand))
}

/// The sequence of `[start, end)` clamped to the chromosome, oriented by `strand`.
pub(crate) fn span_sequence(
    chrom_seq: &[u8],
    start: u64,
    end: u64,
    strand: ReqStrand,
) -> Option<Vec<u8>> {
    let end = (end as usize).min(chrom_seq.len());
    let start = start as usize;
    if start >= end {
        return None;
    }
    Some(oriented(chrom_seq[start..end].to_vec(), strand))
}

fn oriented(seq: Vec<u8>, strand: ReqStrand) -> Vec<u8> {
    match strand {
        ReqStrand::Forward => seq,
        ReqStrand::Reverse => revcomp_vec(seq),
    }
}

/// Reverse complement DNA in place.
fn revcomp_slice(dna: &mut [u8]) {
    dna.reverse();
    for base in dna.iter_mut() {
        *base = bio::alphabets::dna::complement(*base);
    }
}

fn revcomp_vec(mut dna: Vec<u8>) -> Vec<u8> {
    revcomp_slice(&mut dna[..]);
    dna
}

#[cfg(test)]
mod test {
    use super::*;

    fn check_rc(fwd: &[u8], rev: &[u8]) {
        assert_eq!(revcomp_vec(Vec::from(fwd)), rev);
    }

    #[test]
    fn test_rc() {
        check_rc(b"ACGT", b"ACGT");
        check_rc(b"A", b"T");
        check_rc(b"GCA", b"TGC");
        check_rc(b"GTGTT", b"AACAC");
        check_rc(b"acgN", b"Ncgt");
    }

    #[test]
    fn test_spliced() {
        let chrom = b"AAAACCCCGGGGTTTT";
        let exons = [Exon { start: 0, end: 2 }, Exon { start: 8, end: 10 }];
        assert_eq!(
            spliced_sequence(chrom, &exons, ReqStrand::Forward).unwrap(),
            b"AAGG"
        );
        assert_eq!(
            spliced_sequence(chrom, &exons, ReqStrand::Reverse).unwrap(),
            b"CCTT"
        );
        let past_end = [Exon { start: 10, end: 20 }];
        assert!(spliced_sequence(chrom, &past_end, ReqStrand::Forward).is_none());
    }

    #[test]
    fn test_span_clamped() {
        let chrom = b"AAAACCCC";
        assert_eq!(
            span_sequence(chrom, 2, 100, ReqStrand::Forward).unwrap(),
            b"AACCCC"
        );
        assert_eq!(
            span_sequence(chrom, 6, 8, ReqStrand::Reverse).unwrap(),
            b"GG"
        );
        assert!(span_sequence(chrom, 8, 10, ReqStrand::Forward).is_none());
    }
}
