//! CIGAR and MD decoding
//!
//! Decodes the CIGAR string of a SAM record into operations, derives
//! reference/query lengths and per-base operation streams, and combines the
//! CIGAR with the MD tag to classify every aligned base as a match,
//! mismatch, insertion or deletion.
//!
//! # Per-base streams
//!
//! ```text
//! CIGAR 6S5M4D12M3I5M
//! bases SSSSSSMMMMMDDDDMMMMMMMMMMMMIIIMMMMM
//!             |<------ aligned range ----->|
//! ```

use crate::core::error::{CigarError, CigarResult};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// All CIGAR operation characters, in SAM specification order
pub const CIGAR_OPERATIONS: [char; 9] = ['M', 'I', 'D', 'N', 'S', 'H', 'P', '=', 'X'];

/// CIGAR operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOp {
    Match(u32),
    Insertion(u32),
    Deletion(u32),
    Skip(u32),
    SoftClip(u32),
    HardClip(u32),
    Padding(u32),
    Equal(u32),
    Diff(u32),
}

impl CigarOp {
    /// Build an operation from its SAM character
    pub fn from_char(op: char, len: u32) -> Option<Self> {
        match op {
            'M' => Some(CigarOp::Match(len)),
            'I' => Some(CigarOp::Insertion(len)),
            'D' => Some(CigarOp::Deletion(len)),
            'N' => Some(CigarOp::Skip(len)),
            'S' => Some(CigarOp::SoftClip(len)),
            'H' => Some(CigarOp::HardClip(len)),
            'P' => Some(CigarOp::Padding(len)),
            '=' => Some(CigarOp::Equal(len)),
            'X' => Some(CigarOp::Diff(len)),
            _ => None,
        }
    }

    pub fn len(&self) -> u32 {
        match self {
            CigarOp::Match(n) | CigarOp::Insertion(n) | CigarOp::Deletion(n) |
            CigarOp::Skip(n) | CigarOp::SoftClip(n) | CigarOp::HardClip(n) |
            CigarOp::Padding(n) | CigarOp::Equal(n) | CigarOp::Diff(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn op_char(&self) -> char {
        match self {
            CigarOp::Match(_) => 'M',
            CigarOp::Insertion(_) => 'I',
            CigarOp::Deletion(_) => 'D',
            CigarOp::Skip(_) => 'N',
            CigarOp::SoftClip(_) => 'S',
            CigarOp::HardClip(_) => 'H',
            CigarOp::Padding(_) => 'P',
            CigarOp::Equal(_) => '=',
            CigarOp::Diff(_) => 'X',
        }
    }

    /// Same operation with a different length
    pub fn with_len(&self, len: u32) -> Self {
        match self {
            CigarOp::Match(_) => CigarOp::Match(len),
            CigarOp::Insertion(_) => CigarOp::Insertion(len),
            CigarOp::Deletion(_) => CigarOp::Deletion(len),
            CigarOp::Skip(_) => CigarOp::Skip(len),
            CigarOp::SoftClip(_) => CigarOp::SoftClip(len),
            CigarOp::HardClip(_) => CigarOp::HardClip(len),
            CigarOp::Padding(_) => CigarOp::Padding(len),
            CigarOp::Equal(_) => CigarOp::Equal(len),
            CigarOp::Diff(_) => CigarOp::Diff(len),
        }
    }

    pub fn consumes_reference(&self) -> bool {
        matches!(self, CigarOp::Match(_) | CigarOp::Deletion(_) |
                 CigarOp::Skip(_) | CigarOp::Equal(_) | CigarOp::Diff(_))
    }

    pub fn consumes_query(&self) -> bool {
        matches!(self, CigarOp::Match(_) | CigarOp::Insertion(_) |
                 CigarOp::SoftClip(_) | CigarOp::Equal(_) | CigarOp::Diff(_))
    }

    /// Operations trimmed from the ends of the aligned range
    pub fn is_unaligned(&self) -> bool {
        matches!(self, CigarOp::Insertion(_) | CigarOp::SoftClip(_) |
                 CigarOp::HardClip(_) | CigarOp::Padding(_))
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len(), self.op_char())
    }
}

fn is_unaligned_char(c: u8) -> bool {
    matches!(c, b'I' | b'S' | b'H' | b'P')
}

/// A decoded CIGAR string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cigar {
    ops: Vec<CigarOp>,
}

impl Cigar {
    pub fn new(ops: Vec<CigarOp>) -> Self {
        Self { ops }
    }

    /// Decode a CIGAR string
    ///
    /// `*` (unavailable) decodes to an empty operation list.
    ///
    /// # Examples
    /// ```
    /// use biotable::core::{Cigar, CigarOp};
    ///
    /// let cigar = Cigar::parse("3S20M2S").unwrap();
    /// assert_eq!(cigar.ops(), &[CigarOp::SoftClip(3), CigarOp::Match(20), CigarOp::SoftClip(2)]);
    /// assert!(Cigar::parse("10Q").is_err());
    /// ```
    pub fn parse(cigar: &str) -> CigarResult<Self> {
        if cigar == "*" {
            return Ok(Self::default());
        }
        if cigar.is_empty() {
            return Err(invalid_cigar(cigar, "empty string"));
        }

        let mut ops = Vec::new();
        let mut len: Option<u32> = None;
        for c in cigar.chars() {
            if let Some(digit) = c.to_digit(10) {
                let current = len.unwrap_or(0);
                len = Some(
                    current
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                        .ok_or_else(|| invalid_cigar(cigar, "operation length overflows"))?,
                );
                continue;
            }
            let n = len
                .take()
                .ok_or_else(|| invalid_cigar(cigar, format!("operation '{}' has no length", c)))?;
            let op = CigarOp::from_char(c, n)
                .ok_or_else(|| invalid_cigar(cigar, format!("unknown operation '{}'", c)))?;
            ops.push(op);
        }
        if len.is_some() {
            return Err(invalid_cigar(cigar, "trailing length without an operation"));
        }

        Ok(Self { ops })
    }

    pub fn ops(&self) -> &[CigarOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Reference bases spanned (M, D, N, =, X)
    pub fn reference_length(&self) -> u64 {
        self.ops.iter().filter(|op| op.consumes_reference()).map(|op| u64::from(op.len())).sum()
    }

    /// Query bases consumed (M, I, S, =, X)
    pub fn query_length(&self) -> u64 {
        self.ops.iter().filter(|op| op.consumes_query()).map(|op| u64::from(op.len())).sum()
    }

    /// Total length per operation character, zero for absent operations
    pub fn op_lengths(&self) -> BTreeMap<char, u64> {
        let mut totals: BTreeMap<char, u64> = CIGAR_OPERATIONS.iter().map(|&c| (c, 0)).collect();
        for op in &self.ops {
            *totals.entry(op.op_char()).or_insert(0) += u64::from(op.len());
        }
        totals
    }

    /// One operation character per base
    pub fn per_base(&self) -> String {
        let mut out = String::with_capacity(self.ops.iter().map(|op| op.len() as usize).sum());
        for op in &self.ops {
            out.extend(std::iter::repeat(op.op_char()).take(op.len() as usize));
        }
        out
    }

    /// Index interval of [`Cigar::per_base`] left after trimming leading and
    /// trailing I, S, H and P bases
    pub fn aligned_range(&self) -> Range<usize> {
        let stream = self.per_base();
        let bytes = stream.as_bytes();
        let start = bytes.iter().position(|&c| !is_unaligned_char(c)).unwrap_or(bytes.len());
        let end = bytes.iter().rposition(|&c| !is_unaligned_char(c)).map_or(start, |i| i + 1);
        start..end
    }

    /// Per-base stream restricted to the aligned range
    pub fn aligned_per_base(&self) -> String {
        let stream = self.per_base();
        let range = self.aligned_range();
        stream[range].to_string()
    }

    /// Query sequence without its leading and trailing clipped bases
    ///
    /// Only query-consuming clips (S, I) remove bases; H and P are skipped.
    /// Returns `None` when the sequence is shorter than the clips.
    ///
    /// # Examples
    /// ```
    /// use biotable::core::Cigar;
    ///
    /// let cigar = Cigar::parse("3S20M2S").unwrap();
    /// assert_eq!(cigar.aligned_query_sequence("TACAGCAGACGGGACCTTTTTGGTA"), Some("AGCAGACGGGACCTTTTTGG"));
    /// ```
    pub fn aligned_query_sequence<'s>(&self, seq: &'s str) -> Option<&'s str> {
        let clipped = |ops: &mut dyn Iterator<Item = &CigarOp>| -> usize {
            ops.take_while(|op| op.is_unaligned())
                .filter(|op| op.consumes_query())
                .map(|op| op.len() as usize)
                .sum()
        };
        let leading = clipped(&mut self.ops.iter());
        let trailing = if self.ops.iter().all(|op| op.is_unaligned()) {
            0
        } else {
            clipped(&mut self.ops.iter().rev())
        };
        let end = seq.len().checked_sub(trailing)?;
        seq.get(leading..end)
    }

    /// Merge adjacent operations of the same kind
    pub fn merge_adjacent(&self) -> Cigar {
        let mut merged: Vec<CigarOp> = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            match merged.last_mut() {
                Some(last) if last.op_char() == op.op_char() => {
                    *last = last.with_len(last.len().saturating_add(op.len()));
                }
                _ => merged.push(*op),
            }
        }
        Cigar::new(merged)
    }

    /// Classify every aligned base using the MD tag
    ///
    /// Within the aligned range each `M` base takes the MD symbol at the
    /// current MD position (`=`, `X` or `D`); `D`, `N`, `=` and `X` bases
    /// advance the MD position and keep their own character; every other
    /// base is copied unchanged.
    pub fn match_annotation(&self, md: &str) -> CigarResult<String> {
        let md_stream = md_symbols(md)?;
        let aligned = self.aligned_per_base();

        let consumed = aligned
            .bytes()
            .filter(|c| matches!(c, b'M' | b'D' | b'N' | b'=' | b'X'))
            .count();
        if consumed != md_stream.len() {
            return Err(CigarError::MdMismatch {
                cigar: self.to_string(),
                md: md.to_string(),
                cigar_consumed: consumed,
                md_len: md_stream.len(),
            });
        }

        let mut out = String::with_capacity(aligned.len());
        let mut md_pos = 0;
        for c in aligned.bytes() {
            match c {
                b'M' => {
                    out.push(char::from(md_stream[md_pos]));
                    md_pos += 1;
                }
                b'D' | b'N' | b'=' | b'X' => {
                    out.push(char::from(c));
                    md_pos += 1;
                }
                _ => out.push(char::from(c)),
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return write!(f, "*");
        }
        for op in &self.ops {
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

impl FromStr for Cigar {
    type Err = CigarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cigar::parse(s)
    }
}

fn invalid_cigar(cigar: &str, message: impl Into<String>) -> CigarError {
    CigarError::InvalidCigar {
        cigar: cigar.to_string(),
        message: message.into(),
    }
}

fn invalid_md(md: &str, message: impl Into<String>) -> CigarError {
    CigarError::InvalidMd {
        md: md.to_string(),
        message: message.into(),
    }
}

/// Expand an MD tag into one symbol per reference base:
/// `=` match, `X` mismatch, `D` deleted
fn md_symbols(md: &str) -> CigarResult<Vec<u8>> {
    let bytes = md.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 4);
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let run: usize = md[start..i]
                .parse()
                .map_err(|_| invalid_md(md, "match run overflows"))?;
            out.resize(out.len() + run, b'=');
        } else if c == b'^' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            if i == start {
                return Err(invalid_md(md, format!("deletion marker at offset {} has no bases", start - 1)));
            }
            out.resize(out.len() + (i - start), b'D');
        } else if c.is_ascii_alphabetic() {
            out.push(b'X');
            i += 1;
        } else {
            return Err(invalid_md(md, format!("unexpected character '{}'", char::from(c))));
        }
    }
    Ok(out)
}

/// Per-reference-base MD stream as text
///
/// # Examples
/// ```
/// use biotable::core::md_chars;
///
/// assert_eq!(md_chars("5C5^T16").unwrap(), "=====X=====D================");
/// ```
pub fn md_chars(md: &str) -> CigarResult<String> {
    md_symbols(md).map(|symbols| symbols.into_iter().map(char::from).collect())
}

/// Reference-consuming length of a CIGAR string
pub fn cigar_ref_length(cigar: &str) -> CigarResult<u64> {
    Cigar::parse(cigar).map(|c| c.reference_length())
}

/// Query-consuming length of a CIGAR string
pub fn cigar_query_length(cigar: &str) -> CigarResult<u64> {
    Cigar::parse(cigar).map(|c| c.query_length())
}

/// Per-operation totals of a CIGAR string
pub fn cigar_op_lengths(cigar: &str) -> CigarResult<BTreeMap<char, u64>> {
    Cigar::parse(cigar).map(|c| c.op_lengths())
}

/// Per-base operation stream, optionally restricted to the aligned range
pub fn cigar_chars(cigar: &str, only_aligned: bool) -> CigarResult<String> {
    let cigar = Cigar::parse(cigar)?;
    Ok(if only_aligned { cigar.aligned_per_base() } else { cigar.per_base() })
}

/// Match/mismatch/indel stream of an alignment from its CIGAR and MD tag
///
/// # Examples
/// ```
/// use biotable::core::match_annotation;
///
/// assert_eq!(
///     match_annotation("11M1D16M", "5C5^T16").unwrap(),
///     "=====X=====D================"
/// );
/// ```
pub fn match_annotation(cigar: &str, md: &str) -> CigarResult<String> {
    Cigar::parse(cigar)?.match_annotation(md)
}
