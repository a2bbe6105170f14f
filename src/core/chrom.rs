//! Chromosome ordering
//!
//! Genome-aware sort keys for chromosome labels. Autosomes sort numerically,
//! followed by X, Y and the mitochondrial genome, followed by every other
//! contig in lexicographic order:
//!
//! ```text
//! chr1 < chr2 < ... < chr22 < chrX < chrY < chrM < chrUn_gl000220 < ...
//! ```

use std::cmp::Ordering;

/// Total-order sort key for a chromosome label
///
/// Variant order is significant: the derived `Ord` places every numeric
/// chromosome before the named sex/mitochondrial chromosomes, and those
/// before all remaining contigs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChromKey {
    /// Purely numeric label (after stripping `chr`)
    Numeric(u64),
    /// X = 0, Y = 1, M/MT = 2
    Named(u8),
    /// Anything else, ordered by the prefix-stripped label
    Other(String),
}

impl ChromKey {
    /// Key class: 0 for numeric labels, 1 for everything else
    pub fn class(&self) -> u8 {
        match self {
            ChromKey::Numeric(_) => 0,
            ChromKey::Named(_) | ChromKey::Other(_) => 1,
        }
    }
}

/// Strip a case-insensitive `chr` prefix
///
/// # Examples
/// ```
/// use biotable::core::strip_chr_prefix;
///
/// assert_eq!(strip_chr_prefix("chr1"), "1");
/// assert_eq!(strip_chr_prefix("CHRX"), "X");
/// assert_eq!(strip_chr_prefix("MT"), "MT");
/// ```
pub fn strip_chr_prefix(label: &str) -> &str {
    match label.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &label[3..],
        _ => label,
    }
}

/// Compute the sort key of a chromosome label
///
/// Never fails: every string has a defined key.
///
/// # Examples
/// ```
/// use biotable::core::{chrom_sort_key, ChromKey};
///
/// assert_eq!(chrom_sort_key("chr7"), ChromKey::Numeric(7));
/// assert_eq!(chrom_sort_key("x"), ChromKey::Named(0));
/// assert_eq!(chrom_sort_key("chrMT"), ChromKey::Named(2));
/// assert!(chrom_sort_key("chr22") < chrom_sort_key("chrX"));
/// assert!(chrom_sort_key("chrM") < chrom_sort_key("chrUn_gl000220"));
/// ```
pub fn chrom_sort_key(label: &str) -> ChromKey {
    let rest = strip_chr_prefix(label);

    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        // Absurdly long digit runs saturate rather than fail
        return ChromKey::Numeric(rest.parse().unwrap_or(u64::MAX));
    }

    match rest.to_ascii_uppercase().as_str() {
        "X" => ChromKey::Named(0),
        "Y" => ChromKey::Named(1),
        "M" | "MT" => ChromKey::Named(2),
        _ => ChromKey::Other(rest.to_string()),
    }
}

/// Compare two chromosome labels in genome order
pub fn compare_chroms(left: &str, right: &str) -> Ordering {
    chrom_sort_key(left).cmp(&chrom_sort_key(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_keys() {
        assert_eq!(chrom_sort_key("1"), ChromKey::Numeric(1));
        assert_eq!(chrom_sort_key("chr10"), ChromKey::Numeric(10));
        assert_eq!(chrom_sort_key("Chr2"), ChromKey::Numeric(2));
        assert!(chrom_sort_key("chr2") < chrom_sort_key("chr10"));
    }

    #[test]
    fn test_named_keys() {
        assert_eq!(chrom_sort_key("chrX"), ChromKey::Named(0));
        assert_eq!(chrom_sort_key("Y"), ChromKey::Named(1));
        assert_eq!(chrom_sort_key("chrM"), ChromKey::Named(2));
        assert_eq!(chrom_sort_key("mt"), ChromKey::Named(2));
    }

    #[test]
    fn test_other_keys_keep_label() {
        assert_eq!(
            chrom_sort_key("chrUn_KI270302v1"),
            ChromKey::Other("Un_KI270302v1".to_string())
        );
        assert_eq!(chrom_sort_key("*"), ChromKey::Other("*".to_string()));
        assert_eq!(chrom_sort_key(""), ChromKey::Other(String::new()));
        assert_eq!(chrom_sort_key("chr"), ChromKey::Other(String::new()));
    }

    #[test]
    fn test_genome_order() {
        let mut chroms = vec!["chrY", "chr10", "GL000192.1", "chrM", "chr1", "chrX", "chr2", "chr1_random"];
        chroms.sort_by(|a, b| compare_chroms(a, b));
        assert_eq!(
            chroms,
            vec!["chr1", "chr2", "chr10", "chrX", "chrY", "chrM", "chr1_random", "GL000192.1"]
        );
    }

    #[test]
    fn test_class() {
        assert_eq!(chrom_sort_key("3").class(), 0);
        assert_eq!(chrom_sort_key("X").class(), 1);
        assert_eq!(chrom_sort_key("scaffold_1").class(), 1);
    }

    #[test]
    fn test_overflowing_digits_saturate() {
        assert_eq!(
            chrom_sort_key("99999999999999999999999"),
            ChromKey::Numeric(u64::MAX)
        );
    }
}
