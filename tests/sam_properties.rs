//! SAM format property tests
//!
//! Short-row leniency, optional-tag expansion and per-row CIGAR/MD helpers.

use biotable::core::{BioTableError, ErrorClass, RecordTable, ScalarType, Value};
use biotable::sam;
use proptest::prelude::*;

fn fixed_fields(qname: &str, cigar: &str, seq_len: usize) -> String {
    format!(
        "{}\t0\tchr1\t100\t60\t{}\t*\t0\t0\t{}\t{}",
        qname,
        cigar,
        "A".repeat(seq_len),
        "I".repeat(seq_len)
    )
}

/// (NM, XS score, read group) per record
fn arb_tags() -> impl Strategy<Value = Vec<(i64, f64, String)>> {
    prop::collection::vec((0i64..50, -100.0f64..100.0, "[a-z]{1,5}"), 1..30)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Typed tags become typed columns with the same values
    #[test]
    fn test_expand_tags_typed(tags in arb_tags()) {
        let mut text = String::from("@HD\tVN:1.6\n");
        for (i, (nm, score, rg)) in tags.iter().enumerate() {
            text.push_str(&format!(
                "{}\tNM:i:{}\tXS:f:{}\tRG:Z:{}\n",
                fixed_fields(&format!("q{}", i), "10M", 10),
                nm,
                score,
                rg
            ));
        }
        let table = RecordTable::from_text(sam::descriptor(), &text).unwrap();
        let expanded = sam::expand_tags(&table).unwrap();

        let schema = expanded.schema().unwrap();
        prop_assert_eq!(schema.width(), 14);
        prop_assert_eq!(schema.column(11).unwrap().ty, ScalarType::Integer);
        prop_assert_eq!(schema.column(12).unwrap().ty, ScalarType::Float);
        prop_assert_eq!(schema.column(13).unwrap().ty, ScalarType::Text);

        for (row, (nm, score, rg)) in expanded.iter().zip(&tags) {
            prop_assert_eq!(row.get("NM").and_then(Value::as_i64), Some(*nm));
            prop_assert_eq!(row.get("XS").and_then(Value::as_f64), Some(*score));
            prop_assert_eq!(row.get_str("RG"), Some(rg.as_str()));
        }
    }

    /// A tag seen as both `i` and `f` becomes one Float column holding every
    /// value
    #[test]
    fn test_mixed_numeric_tag_widens(values in prop::collection::vec((any::<bool>(), -1000i64..1000), 2..20)) {
        let mut text = String::new();
        for (i, (as_int, n)) in values.iter().enumerate() {
            let field = if *as_int { format!("XS:i:{}", n) } else { format!("XS:f:{}.5", n) };
            text.push_str(&format!("{}\t{}\n", fixed_fields(&format!("q{}", i), "4M", 4), field));
        }
        let table = RecordTable::from_text(sam::descriptor(), &text).unwrap();
        let expanded = sam::expand_tags(&table).unwrap();

        let any_float = values.iter().any(|(as_int, _)| !as_int);
        let expected_ty = if any_float { ScalarType::Float } else { ScalarType::Integer };
        let ty = expanded.schema().unwrap().column(11).unwrap().ty;
        prop_assert_eq!(ty, expected_ty);
        for (row, (as_int, n)) in expanded.iter().zip(&values) {
            let expected = if *as_int { *n as f64 } else { format!("{}.5", n).parse::<f64>().unwrap() };
            prop_assert_eq!(row.get("XS").and_then(Value::as_f64), Some(expected));
        }
    }

    /// Rows more than one field short of the schema are rejected; exactly one
    /// short is padded
    #[test]
    fn test_short_rows(n_fields in 1usize..11) {
        let full = fixed_fields("q0", "4M", 4);
        let fields: Vec<&str> = full.split('\t').take(n_fields).collect();
        let text = format!("{}\n{}\n", full, fields.join("\t"));
        let result = RecordTable::from_text(sam::descriptor(), &text);

        if n_fields == 10 {
            let table = result.unwrap();
            let last = table.iter().nth(1).unwrap();
            prop_assert!(last.get("QUAL").unwrap().is_absent());
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(err.class(), ErrorClass::SchemaViolation);
        }
    }

    /// The match annotation of an all-match alignment is one '=' per
    /// aligned base, whatever the soft clipping
    #[test]
    fn test_annotation_of_perfect_alignment(left in 0usize..10, matched in 1usize..80, right in 0usize..10) {
        let mut cigar = String::new();
        if left > 0 {
            cigar.push_str(&format!("{}S", left));
        }
        cigar.push_str(&format!("{}M", matched));
        if right > 0 {
            cigar.push_str(&format!("{}S", right));
        }
        let line = format!("{}\tMD:Z:{}\n", fixed_fields("q0", &cigar, left + matched + right), matched);
        let table = RecordTable::from_text(sam::descriptor(), &line).unwrap();
        let row = table.iter().next().unwrap();

        prop_assert_eq!(sam::match_annotation(&row).unwrap(), "=".repeat(matched));
        let cigar = sam::decode_cigar(&row).unwrap();
        prop_assert_eq!(cigar.query_length() as usize, left + matched + right);
    }
}

#[test]
fn test_extract_tag_absent_everywhere() {
    let text = format!("{}\tNM:i:0\n", fixed_fields("q0", "4M", 4));
    let table = RecordTable::from_text(sam::descriptor(), &text).unwrap();
    let err = sam::extract_tag(&table, "MD").unwrap_err();
    assert!(matches!(err, BioTableError::MissingTag(ref tag) if tag == "MD"));
}

#[test]
fn test_annotate_after_expansion_keeps_match_column() {
    let text = format!(
        "{}\tMD:Z:2T1\n{}\n",
        fixed_fields("q0", "4M", 4),
        fixed_fields("q1", "*", 4)
    );
    // Second row is padded: no optional fields at all
    let table = RecordTable::from_text(sam::descriptor(), &text).unwrap();
    let annotated = sam::annotate_matches(&sam::expand_tags(&table).unwrap()).unwrap();
    let matches: Vec<String> = annotated.column(sam::MATCH_COLUMN).unwrap().map(|v| v.to_string()).collect();
    assert_eq!(matches, vec!["==X=", ""]);
}
