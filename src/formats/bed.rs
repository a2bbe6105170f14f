//! BED format
//!
//! Headerless text format with 3 to 12 tab-delimited columns. The schema is
//! inferred from the field count of the first data line; `browser` and
//! `track` lines are kept as header lines.

use crate::core::{DynamicColumns, FormatDescriptor, HeaderRule, ScalarType};

/// Mandatory BED columns
pub const FIXED_COLUMNS: [&str; 3] = ["chrom", "chromStart", "chromEnd"];

/// Standard optional columns (BED4 through BED12)
pub const OPTIONAL_COLUMNS: [&str; 9] = [
    "name",
    "score",
    "strand",
    "thickStart",
    "thickEnd",
    "itemRgb",
    "blockCount",
    "blockSizes",
    "blockStarts",
];

/// Integer-typed columns. `blockSizes`/`blockStarts` hold comma lists and
/// stay text.
const INTEGER_COLUMNS: [&str; 6] = ["chromStart", "chromEnd", "score", "thickStart", "thickEnd", "blockCount"];

/// Descriptor of the BED format with the standard optional columns
pub fn descriptor() -> FormatDescriptor {
    descriptor_with_optional(OPTIONAL_COLUMNS)
}

/// Descriptor of the BED format with custom names for the optional columns
///
/// Type declarations follow the column name, so a renamed column is text.
///
/// # Examples
/// ```
/// use biotable::core::RecordTable;
/// use biotable::formats::bed;
///
/// let d = bed::descriptor_with_optional(["peak", "signal"]);
/// let table = RecordTable::from_text(d, "chr1\t10\t20\tp1\t3.5\n").unwrap();
/// let row = table.iter().next().unwrap();
/// assert_eq!(row.get_str("signal"), Some("3.5"));
/// ```
pub fn descriptor_with_optional<I, S>(optional: I) -> FormatDescriptor
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    FormatDescriptor {
        name: "BED",
        fixed_columns: FIXED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        optional_columns: optional.into_iter().map(Into::into).collect(),
        column_types: INTEGER_COLUMNS
            .iter()
            .map(|name| (name.to_string(), ScalarType::Integer))
            .collect(),
        dynamic_columns: DynamicColumns::Forbidden,
        header_rule: HeaderRule::Prefixes(vec!["browser".to_string(), "track".to_string()]),
        chrom_column: "chrom".to_string(),
        position_columns: vec!["chromStart".to_string(), "chromEnd".to_string()],
        column_header: false,
        pad_short_rows: false,
    }
}
