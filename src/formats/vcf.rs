//! VCF format
//!
//! Declared-header text format: `##` meta lines, one `#CHROM` column line
//! naming the samples, then tab-delimited records. Provides the format
//! descriptor and the INFO and per-sample FORMAT expanders.

use crate::core::{
    BioTableError, Column, DynamicColumns, FormatDescriptor, HeaderRule, Record, RecordTable,
    ScalarType, Schema, TableResult, Value,
};
use std::collections::HashMap;

/// Mandatory VCF columns, in order; sample columns follow FORMAT
pub const FIXED_COLUMNS: [&str; 9] = ["#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT"];

/// Column introducing the per-sample columns
pub const FORMAT_COLUMN: &str = "FORMAT";

/// Prefix of expanded INFO columns
pub const INFO_PREFIX: &str = "INFO_";

/// Descriptor of the VCF text format
pub fn descriptor() -> FormatDescriptor {
    FormatDescriptor {
        name: "VCF",
        fixed_columns: FIXED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        optional_columns: Vec::new(),
        column_types: vec![("POS".to_string(), ScalarType::Integer)],
        dynamic_columns: DynamicColumns::FromHeader,
        header_rule: HeaderRule::Declared {
            meta_prefix: "##".to_string(),
            schema_prefix: "#CHROM".to_string(),
        },
        chrom_column: "#CHROM".to_string(),
        position_columns: vec!["POS".to_string()],
        column_header: true,
        pad_short_rows: false,
    }
}

/// Sample names in column order
pub fn sample_names(table: &RecordTable) -> Vec<String> {
    let Some(schema) = table.schema() else {
        return Vec::new();
    };
    match schema.index_of(FORMAT_COLUMN) {
        Some(i) => schema.columns()[i + 1..].iter().map(|c| c.name.clone()).collect(),
        None => Vec::new(),
    }
}

/// Split an INFO value into `(key, value)` pairs
///
/// Flags (tokens without `=`) get an empty value; `.` yields nothing.
///
/// # Examples
/// ```
/// use biotable::formats::vcf::parse_info;
///
/// assert_eq!(parse_info("DP=10;AF=0.5;DB"), vec![("DP", "10"), ("AF", "0.5"), ("DB", "")]);
/// assert!(parse_info(".").is_empty());
/// ```
pub fn parse_info(info: &str) -> Vec<(&str, &str)> {
    if info == "." {
        return Vec::new();
    }
    info.split(';')
        .filter(|token| !token.is_empty())
        .map(|token| token.split_once('=').unwrap_or((token, "")))
        .collect()
}

/// Replace the INFO column by one `INFO_<key>` column per key
///
/// The new columns are the union of keys over all records in order of first
/// appearance; keys a record lacks are absent. When a record repeats a key
/// the last value wins.
pub fn expand_info(table: &RecordTable) -> TableResult<RecordTable> {
    let schema = table.schema().ok_or(BioTableError::SchemaNotLocked)?;
    let info_index = schema
        .index_of("INFO")
        .ok_or_else(|| BioTableError::MissingColumn("INFO".to_string()))?;

    let mut keys: Vec<String> = Vec::new();
    let mut key_index: HashMap<String, usize> = HashMap::new();
    let parsed: Vec<Vec<(usize, &str)>> = table
        .records()
        .iter()
        .map(|record| {
            let info = record.get(info_index).and_then(Value::as_str).unwrap_or(".");
            parse_info(info)
                .into_iter()
                .map(|(key, value)| {
                    let slot = *key_index.entry(key.to_string()).or_insert_with(|| {
                        keys.push(key.to_string());
                        keys.len() - 1
                    });
                    (slot, value)
                })
                .collect()
        })
        .collect();

    let columns: Vec<Column> = schema.columns()[..info_index]
        .iter()
        .cloned()
        .chain(keys.iter().map(|k| Column::text(format!("{}{}", INFO_PREFIX, k))))
        .chain(schema.columns()[info_index + 1..].iter().cloned())
        .collect();
    let n_fixed = (schema.n_fixed() + keys.len()).saturating_sub(1);

    let mut expanded = RecordTable::with_schema(table.descriptor().clone(), Schema::new(columns, n_fixed));
    expanded.set_header(table.header().to_vec());

    for (record, pairs) in table.records().iter().zip(parsed) {
        let mut info_values = vec![Value::Absent; keys.len()];
        for (slot, value) in pairs {
            info_values[slot] = Value::Text(value.to_string());
        }
        let values: Vec<Value> = record.values()[..info_index]
            .iter()
            .cloned()
            .chain(info_values)
            .chain(record.values()[info_index + 1..].iter().cloned())
            .collect();
        expanded.append(Record::new(values))?;
    }

    Ok(expanded)
}

/// Replace FORMAT and the sample columns by `<sample>_<key>` columns
///
/// Each sample value is split on `:` and zipped with that record's FORMAT
/// keys. Samples with fewer fields than keys leave the trailing columns
/// absent. Every column ahead of FORMAT is kept, including expanded INFO
/// columns; a table without FORMAT is returned with all its columns.
pub fn expand_samples(table: &RecordTable) -> TableResult<RecordTable> {
    let schema = table.schema().ok_or(BioTableError::SchemaNotLocked)?;
    let samples = sample_names(table);
    let format_index = schema.index_of(FORMAT_COLUMN);
    let kept = format_index.unwrap_or(schema.width());

    let mut keys: Vec<String> = Vec::new();
    let mut column_index: HashMap<String, usize> = HashMap::new();
    let mut parsed: Vec<Vec<(usize, &str)>> = Vec::with_capacity(table.len());

    for record in table.records() {
        let mut cells = Vec::new();
        if let Some(format_index) = format_index {
            let format = record.get(format_index).and_then(Value::as_str).unwrap_or("");
            let format_keys: Vec<&str> = if format.is_empty() { Vec::new() } else { format.split(':').collect() };

            for (offset, sample) in samples.iter().enumerate() {
                let raw = record
                    .get(format_index + 1 + offset)
                    .and_then(Value::as_str)
                    .unwrap_or("");
                for (key, value) in format_keys.iter().zip(raw.split(':')) {
                    let name = format!("{}_{}", sample, key);
                    let slot = *column_index.entry(name.clone()).or_insert_with(|| {
                        keys.push(name);
                        keys.len() - 1
                    });
                    cells.push((slot, value));
                }
            }
        }
        parsed.push(cells);
    }

    let columns: Vec<Column> = schema.columns()[..kept]
        .iter()
        .cloned()
        .chain(keys.iter().map(Column::text))
        .collect();

    let n_fixed = schema.n_fixed().min(kept);
    let mut expanded = RecordTable::with_schema(table.descriptor().clone(), Schema::new(columns, n_fixed));
    expanded.set_header(table.header().to_vec());

    for (record, cells) in table.records().iter().zip(parsed) {
        let mut sample_values = vec![Value::Absent; keys.len()];
        for (slot, value) in cells {
            sample_values[slot] = Value::coerce(value, ScalarType::Text).unwrap_or_default();
        }
        let values: Vec<Value> = record.values()[..kept].iter().cloned().chain(sample_values).collect();
        expanded.append(Record::new(values))?;
    }

    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VCF: &str = "##fileformat=VCFv4.2\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA1\tNA2\n\
chr1\t100\t.\tA\tG\t50\tPASS\tDP=10;AF=0.5;DB\tGT:AD:DP\t0/1:3,7:10\t1/1\n\
chr1\t200\t.\tC\tT\t.\tPASS\t.\tGT:DP\t0/0:12\t./.:0\n\
chr2\t300\t.\tG\tA\t20\tq10\tAF=1.0;MQ=60\tGT\t0/1\t1/1\n";

    fn load() -> RecordTable {
        RecordTable::from_text(descriptor(), VCF).unwrap()
    }

    fn names(table: &RecordTable) -> Vec<String> {
        table.schema().unwrap().names().map(str::to_string).collect()
    }

    #[test]
    fn test_sample_names() {
        assert_eq!(sample_names(&load()), vec!["NA1", "NA2"]);
    }

    #[test]
    fn test_parse_info_first_equals_only() {
        assert_eq!(parse_info("ANN=a=b;X"), vec![("ANN", "a=b"), ("X", "")]);
        assert!(parse_info("").is_empty());
    }

    #[test]
    fn test_expand_info() {
        let table = expand_info(&load()).unwrap();
        assert_eq!(
            names(&table)[..11],
            ["#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO_DP", "INFO_AF", "INFO_DB", "INFO_MQ"]
        );
        assert_eq!(names(&table)[11..], ["FORMAT", "NA1", "NA2"]);

        let rows: Vec<_> = table.iter().collect();
        assert_eq!(rows[0].get_str("INFO_DP"), Some("10"));
        assert_eq!(rows[0].get_str("INFO_AF"), Some("0.5"));
        assert_eq!(rows[0].get_str("INFO_DB"), Some(""));
        assert_eq!(rows[0].get("INFO_MQ"), Some(&Value::Absent));
        assert!(rows[1].fields().filter(|(n, _)| n.starts_with(INFO_PREFIX)).all(|(_, v)| v.is_absent()));
        assert_eq!(rows[2].get_str("INFO_MQ"), Some("60"));
        assert_eq!(table.header(), load().header());
    }

    #[test]
    fn test_expand_info_keeps_original_untouched() {
        let original = load();
        let _ = expand_info(&original).unwrap();
        assert_eq!(original, load());
    }

    #[test]
    fn test_expand_samples() {
        let table = expand_samples(&load()).unwrap();
        assert_eq!(
            names(&table)[8..],
            ["NA1_GT", "NA1_AD", "NA1_DP", "NA2_GT", "NA2_DP"]
        );

        let rows: Vec<_> = table.iter().collect();
        assert_eq!(rows[0].get_str("NA1_AD"), Some("3,7"));
        assert_eq!(rows[0].get_str("NA2_GT"), Some("1/1"));
        // NA2 carried fewer fields than FORMAT keys
        assert_eq!(rows[0].get("NA2_DP"), Some(&Value::Absent));
        assert_eq!(rows[1].get_str("NA2_DP"), Some("0"));
        assert_eq!(rows[2].get("NA1_DP"), Some(&Value::Absent));
    }

    #[test]
    fn test_expand_samples_after_info() {
        let table = expand_samples(&expand_info(&load()).unwrap()).unwrap();
        assert_eq!(
            names(&table),
            [
                "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO_DP", "INFO_AF", "INFO_DB", "INFO_MQ",
                "NA1_GT", "NA1_AD", "NA1_DP", "NA2_GT", "NA2_DP",
            ]
        );
        let row = table.iter().next().unwrap();
        assert_eq!(row.get_str("INFO_AF"), Some("0.5"));
        assert_eq!(row.get_str("INFO_DB"), Some(""));
        assert_eq!(row.get_str("NA1_AD"), Some("3,7"));
    }

    #[test]
    fn test_expand_info_after_samples() {
        let table = expand_info(&expand_samples(&load()).unwrap()).unwrap();
        let names = names(&table);
        assert_eq!(names[7..11], ["INFO_DP", "INFO_AF", "INFO_DB", "INFO_MQ"]);
        assert_eq!(names[11..], ["NA1_GT", "NA1_AD", "NA1_DP", "NA2_GT", "NA2_DP"]);
    }

    #[test]
    fn test_header_without_format_is_structural() {
        let sites = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\nchr1\t1\t.\tA\tC\t.\t.\t.\n";
        let err = RecordTable::from_text(descriptor(), sites).unwrap_err();
        assert!(matches!(err, BioTableError::Structural { line: 1, .. }));
    }

    #[test]
    fn test_expand_unlocked_table() {
        let table = RecordTable::new(descriptor());
        assert!(matches!(expand_info(&table), Err(BioTableError::SchemaNotLocked)));
    }

    #[test]
    fn test_expanded_table_sorts() {
        let mut table = expand_info(&load()).unwrap();
        table.sort().unwrap();
        assert_eq!(table.len(), 3);
    }
}
