// Copyright (c) 2024 10x Genomics, Inc. All rights reserved.

use anyhow::{anyhow, bail, ensure, Result};
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_until, take_while, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{all_consuming, map, map_res, opt, value};
use nom::multi::fold_many0;
use nom::number::complete::double;
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated, tuple};
use nom::IResult;
use smallvec::SmallVec;
use std::str::FromStr;

pub(crate) type AttrVec<'a> = SmallVec<[(&'a str, &'a str); 16]>;

/// One GTF line, borrowing every field from the line buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    pub seqname: &'a str,
    pub source: &'a str,
    pub feature_type: &'a str,
    pub start: u64,
    pub end: u64,
    pub score: Option<f64>,
    pub strand: &'a str,
    pub frame: &'a str,
    pub attributes: AttrVec<'a>,
}

impl<'a> Record<'a> {
    /// First value of `attribute`, if the line carries it.
    pub fn get_attr(&self, attribute: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == attribute)
            .map(|(_, v)| *v)
    }

    /// Genomic sort key: seqname, start, end, feature.
    pub fn sort_key(&self) -> (&'a str, u64, u64, &'a str) {
        (self.seqname, self.start, self.end, self.feature_type)
    }
}

fn field(input: &str) -> IResult<&str, &str> {
    is_not("\t\r\n ")(input)
}

fn parse_u64(input: &str) -> IResult<&str, u64> {
    map_res(digit1, u64::from_str)(input)
}

/// A '.' score is missing, anything else must be a number.
fn score(input: &str) -> IResult<&str, Option<f64>> {
    alt((value(None, tag(".")), map(double, Some)))(input)
}

#[inline]
fn is_token(c: char) -> bool {
    !(c.is_control()
        || !c.is_ascii()
        || matches!(
            c,
            ' ' | '"'
                | '('
                | ')'
                | ','
                | '/'
                | ':'
                | ';'
                | '<'
                | '='
                | '>'
                | '?'
                | '@'
                | '['
                | '\\'
                | ']'
                | '{'
                | '}'
        ))
}

fn spaces1(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c == ' ')(input)
}

fn spaces0(input: &str) -> IResult<&str, &str> {
    take_while(|c| c == ' ')(input)
}

/// `key "value"` or `key value`, followed by an optional `;` and padding.
fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    terminated(
        separated_pair(
            take_while1(is_token),
            spaces1,
            alt((
                delimited(char('"'), take_until("\""), char('"')),
                take_while1(is_token),
            )),
        ),
        pair(opt(char(';')), spaces0),
    )(input)
}

fn gtf_attributes(input: &str) -> IResult<&str, AttrVec<'_>> {
    fold_many0(attribute, AttrVec::new, |mut acc, kv| {
        acc.push(kv);
        acc
    })(input)
}

/// Parse one line of a GTF file into a `Record`.
pub fn parse_gtf_line(line: &str) -> IResult<&str, Record<'_>> {
    let columns = tuple((
        field,
        preceded(char('\t'), field),
        preceded(char('\t'), field),
        preceded(char('\t'), parse_u64),
        preceded(char('\t'), parse_u64),
        preceded(char('\t'), score),
        preceded(char('\t'), field),
        preceded(char('\t'), field),
        preceded(char('\t'), gtf_attributes),
    ));
    let record = map(
        columns,
        |(seqname, source, feature_type, start, end, score, strand, frame, attributes)| Record {
            seqname,
            source,
            feature_type,
            start,
            end,
            score,
            strand,
            frame,
            attributes,
        },
    );
    all_consuming(record)(line)
}

/// Explain why `line` is not a valid GTF line.
/// Only meant for lines that already failed `parse_gtf_line`; nom errors are not user readable.
pub fn validate_gtf_line(line: &str) -> Result<()> {
    let pieces: Vec<_> = line.split('\t').collect();
    ensure!(
        pieces.len() == 9,
        "expected 9 tab-separated elements but found {}",
        pieces.len()
    );
    #[allow(clippy::type_complexity)]
    let validators: [(&str, fn(&str) -> Result<()>); 9] = [
        ("seqname", validate_no_space),
        ("source", validate_no_space),
        ("feature", validate_no_space),
        ("start", validate_u64),
        ("end", validate_u64),
        ("score", validate_score),
        ("strand", validate_no_space),
        ("frame", validate_no_space),
        ("attributes", validate_gtf_attributes),
    ];
    for (piece, (item_name, validator)) in std::iter::zip(pieces, validators) {
        if let Err(err) = validator(piece) {
            bail!("{item_name}: {err}");
        }
    }
    Ok(())
}

fn validate_no_space(input: &str) -> Result<()> {
    ensure!(!input.is_empty(), "cannot be empty");
    ensure!(!input.contains(' '), "cannot contain spaces");
    Ok(())
}

fn validate_u64(input: &str) -> Result<()> {
    u64::from_str(input).map_err(|_| anyhow!("expected an integer, not \"{input}\""))?;
    Ok(())
}

fn validate_score(input: &str) -> Result<()> {
    all_consuming(score)(input).map_err(|_| anyhow!("expected \".\" or a number"))?;
    Ok(())
}

fn validate_gtf_attributes(input: &str) -> Result<()> {
    all_consuming(gtf_attributes)(input).map_err(|_| anyhow!("invalid attributes format"))?;
    Ok(())
}
