//! Record table property tests
//!
//! Sorting and serialization invariants over generated BED and VCF tables.

use biotable::core::{RecordTable, Value, WriteOptions};
use biotable::{bed, vcf};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn arb_chrom() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..23).prop_map(|n| format!("chr{}", n)),
        Just("chrX".to_string()),
        Just("chrY".to_string()),
        Just("chrM".to_string()),
        Just("chrUn_gl000220".to_string()),
        (1u32..23).prop_map(|n| n.to_string()),
    ]
}

/// A BED6 line; names are unique per line index to observe stability
fn arb_bed_rows() -> impl Strategy<Value = Vec<(String, i64, i64, char)>> {
    prop::collection::vec(
        (arb_chrom(), 0i64..1000, 0i64..100, prop_oneof![Just('+'), Just('-')]),
        0..60,
    )
    .prop_map(|rows| rows.into_iter().map(|(c, s, len, strand)| (c, s, s + len, strand)).collect())
}

fn bed_text(rows: &[(String, i64, i64, char)]) -> String {
    let mut text = String::from("track name=generated\n");
    for (i, (chrom, start, end, strand)) in rows.iter().enumerate() {
        text.push_str(&format!("{}\t{}\t{}\tr{}\t0\t{}\n", chrom, start, end, i, strand));
    }
    text
}

fn vcf_text(rows: &[(String, i64)]) -> String {
    let mut text = String::from(
        "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n",
    );
    for (i, (chrom, pos)) in rows.iter().enumerate() {
        text.push_str(&format!("{}\t{}\tv{}\tA\tG\t.\tPASS\tDP={}\tGT\t0/1\n", chrom, pos, i, i));
    }
    text
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// sort(sort(T)) == sort(T)
    #[test]
    fn test_sort_idempotent(rows in arb_bed_rows()) {
        let once = RecordTable::from_text(bed::descriptor(), &bed_text(&rows)).unwrap().sorted().unwrap();
        let twice = once.clone().sorted().unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Sorting keeps every record and orders neighbours by chromosome then
    /// start then end, with insertion order among equal keys
    #[test]
    fn test_sort_order_and_stability(rows in arb_bed_rows()) {
        let table = RecordTable::from_text(bed::descriptor(), &bed_text(&rows)).unwrap().sorted().unwrap();
        prop_assert_eq!(table.len(), rows.len());

        let keys: Vec<_> = table
            .iter()
            .map(|r| {
                let chrom = biotable::chrom_sort_key(r.get_str("chrom").unwrap());
                let start = r.get("chromStart").and_then(Value::as_i64).unwrap();
                let end = r.get("chromEnd").and_then(Value::as_i64).unwrap();
                let index: usize = r.get_str("name").unwrap()[1..].parse().unwrap();
                (chrom, start, end, index)
            })
            .collect();
        for pair in keys.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    /// Native serialization re-parses to an equal table
    #[test]
    fn test_bed_native_round_trip(rows in arb_bed_rows()) {
        let text = bed_text(&rows);
        let table = RecordTable::from_text(bed::descriptor(), &text).unwrap();
        let written = table.to_native_text().unwrap();
        prop_assert_eq!(&written, &text);
        prop_assert_eq!(RecordTable::from_text(bed::descriptor(), &written).unwrap(), table);
    }

    /// Header lines, column header and rows survive a VCF round trip
    #[test]
    fn test_vcf_round_trip(rows in prop::collection::vec((arb_chrom(), 1i64..1_000_000), 1..40)) {
        let text = vcf_text(&rows);
        let table = RecordTable::from_text(vcf::descriptor(), &text).unwrap();
        let reparsed = RecordTable::from_text(vcf::descriptor(), &table.to_native_text().unwrap()).unwrap();
        prop_assert_eq!(reparsed, table);
    }

    /// CSV output has one line per record plus the column header
    #[test]
    fn test_csv_line_count(rows in arb_bed_rows()) {
        let table = RecordTable::from_text(bed::descriptor(), &bed_text(&rows)).unwrap();
        let csv = table.to_text(&WriteOptions::csv()).unwrap();
        let expected = if rows.is_empty() { 0 } else { rows.len() + 1 };
        prop_assert_eq!(csv.lines().count(), expected);
    }
}
