//! Chromosome ordering property tests

use biotable::core::{chrom_sort_key, compare_chroms, strip_chr_prefix, ChromKey};
use proptest::prelude::*;
use std::cmp::Ordering;

/// Labels without a `chr` prefix, covering numeric, named and other contigs
fn arb_bare_label() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u64..100).prop_map(|n| n.to_string()),
        Just("X".to_string()),
        Just("Y".to_string()),
        Just("M".to_string()),
        Just("MT".to_string()),
        "[A-Za-z0-9_.]{1,12}",
    ]
    .prop_filter("label must not carry a chr prefix", |l| strip_chr_prefix(l) == l.as_str())
}

fn arb_prefix() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("chr"), Just("Chr"), Just("CHR")]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Adding a chr prefix in any case never changes the key
    #[test]
    fn test_prefix_insensitive(label in arb_bare_label(), prefix in arb_prefix()) {
        let prefixed = format!("{}{}", prefix, label);
        prop_assert_eq!(chrom_sort_key(&label), chrom_sort_key(&prefixed));
    }

    /// Numeric chromosomes follow integer order
    #[test]
    fn test_numeric_order(a in 0u64..10_000, b in 0u64..10_000) {
        let ordering = compare_chroms(&format!("chr{}", a), &format!("chr{}", b));
        prop_assert_eq!(ordering, a.cmp(&b));
    }

    /// Every numeric chromosome sorts before X, Y and M, which sort before
    /// any other contig
    #[test]
    fn test_class_order(n in 0u64..1_000_000, other in "[A-Za-z_][A-Za-z0-9_.]{1,12}") {
        let numeric = chrom_sort_key(&format!("chr{}", n));
        let other_key = chrom_sort_key(&other);
        for named in ["chrX", "chrY", "chrM"] {
            prop_assert!(numeric < chrom_sort_key(named));
        }
        if let ChromKey::Other(_) = other_key {
            prop_assert!(chrom_sort_key("chrM") < other_key);
        }
    }

    /// The comparison is a total order consistent with itself
    #[test]
    fn test_antisymmetric(a in arb_bare_label(), b in arb_bare_label()) {
        prop_assert_eq!(compare_chroms(&a, &b), compare_chroms(&b, &a).reverse());
        prop_assert_eq!(compare_chroms(&a, &a), Ordering::Equal);
    }
}

#[test]
fn test_genome_order() {
    let mut labels = vec!["chrM", "chr10", "chrY", "GL000192.1", "chr2", "chrX", "chr1"];
    labels.sort_by(|a, b| compare_chroms(a, b));
    assert_eq!(labels, vec!["chr1", "chr2", "chr10", "chrX", "chrY", "chrM", "GL000192.1"]);
}
