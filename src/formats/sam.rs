//! SAM format
//!
//! Text alignments: `@XX` header lines, 11 mandatory columns, then any number
//! of `TAG:TYPE:VALUE` optional fields held in positional `OPT<n>` columns
//! until expanded.

use crate::core::{
    BioTableError, Cigar, Column, DynamicColumns, FormatDescriptor, HeaderRule, Record, RecordTable,
    RowRef, ScalarType, Schema, TableResult, Value,
};
use std::collections::HashMap;

/// Mandatory SAM columns, in order
pub const FIXED_COLUMNS: [&str; 11] = [
    "QNAME", "FLAG", "RNAME", "POS", "MAPQ", "CIGAR", "RNEXT", "PNEXT", "TLEN", "SEQ", "QUAL",
];

/// Prefix of positional optional-field columns
pub const OPT_PREFIX: &str = "OPT";

/// Column added by [`annotate_matches`]
pub const MATCH_COLUMN: &str = "MATCH";

const INTEGER_COLUMNS: [&str; 5] = ["FLAG", "POS", "MAPQ", "PNEXT", "TLEN"];

/// Descriptor of the SAM text format
pub fn descriptor() -> FormatDescriptor {
    FormatDescriptor {
        name: "SAM",
        fixed_columns: FIXED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        optional_columns: Vec::new(),
        column_types: INTEGER_COLUMNS
            .iter()
            .map(|name| (name.to_string(), ScalarType::Integer))
            .collect(),
        dynamic_columns: DynamicColumns::Synthesized(OPT_PREFIX.to_string()),
        header_rule: HeaderRule::AtUppercase,
        chrom_column: "RNAME".to_string(),
        position_columns: vec!["POS".to_string()],
        column_header: false,
        pad_short_rows: true,
    }
}

/// Region argument understood by `samtools view`
///
/// # Examples
/// ```
/// use biotable::formats::sam::region_string;
///
/// assert_eq!(region_string("chr1", None, None), "chr1");
/// assert_eq!(region_string("chr1", Some(100), None), "chr1:100");
/// assert_eq!(region_string("chr1", Some(100), Some(200)), "chr1:100-200");
/// ```
pub fn region_string(rname: &str, start: Option<u64>, end: Option<u64>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format!("{}:{}-{}", rname, start, end),
        (Some(start), None) => format!("{}:{}", rname, start),
        _ => rname.to_string(),
    }
}

/// One parsed `TAG:TYPE:VALUE` optional field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalField<'a> {
    pub tag: &'a str,
    pub ty: &'a str,
    pub value: &'a str,
}

impl<'a> OptionalField<'a> {
    /// Split an optional field; `None` when it lacks the two separators
    pub fn parse(field: &'a str) -> Option<Self> {
        let mut parts = field.splitn(3, ':');
        let tag = parts.next().filter(|t| !t.is_empty())?;
        let ty = parts.next().filter(|t| !t.is_empty())?;
        let value = parts.next()?;
        Some(Self { tag, ty, value })
    }

    /// Column type implied by the TYPE code
    pub fn scalar_type(&self) -> ScalarType {
        match self.ty {
            "i" => ScalarType::Integer,
            "f" => ScalarType::Float,
            _ => ScalarType::Text,
        }
    }

    /// Typed value; `None` when an `i`/`f` value is not numeric
    pub fn typed_value(&self) -> Option<Value> {
        Value::coerce(self.value, self.scalar_type())
    }
}

fn parse_optional<'a>(field: &'a str, row: usize) -> TableResult<OptionalField<'a>> {
    OptionalField::parse(field).ok_or_else(|| {
        BioTableError::structural("SAM", row, format!("malformed optional field '{}'", field))
    })
}

fn typed_optional(field: &OptionalField<'_>, row: usize) -> TableResult<Value> {
    field.typed_value().ok_or_else(|| BioTableError::TypeCoercion {
        line: row,
        column: field.tag.to_string(),
        value: field.value.to_string(),
        expected: field.scalar_type(),
    })
}

fn is_opt_column(name: &str) -> bool {
    name.strip_prefix(OPT_PREFIX)
        .map_or(false, |n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Raw optional fields of a record, skipping absent trailing cells
///
/// Only positional `OPT<n>` columns are read, so expanded or appended
/// columns are never mistaken for `TAG:TYPE:VALUE` fields.
fn raw_optionals<'r>(schema: &'r Schema, record: &'r Record) -> impl Iterator<Item = &'r str> + 'r {
    schema
        .columns()
        .iter()
        .zip(record.values())
        .filter(|(column, _)| is_opt_column(&column.name))
        .filter_map(|(_, value)| value.as_str())
}

/// Coerce a validated optional field to its column type
fn conform(field: &OptionalField<'_>, ty: ScalarType, row: usize) -> TableResult<Value> {
    Value::coerce(field.value, ty).ok_or_else(|| BioTableError::TypeCoercion {
        line: row,
        column: field.tag.to_string(),
        value: field.value.to_string(),
        expected: ty,
    })
}

/// Replace the `OPT<n>` columns by one column per TAG
///
/// Other columns keep their place ahead of the tag columns. Tag columns
/// appear in order of first appearance across the table. A tag seen with
/// different TYPE codes gets the widened type of all its occurrences
/// (`i` with `f` is Float, anything with a text code is Text), and every
/// value is coerced to that column type. Records lacking a tag get an
/// absent value. Errors report the 1-based record number.
pub fn expand_tags(table: &RecordTable) -> TableResult<RecordTable> {
    let schema = table.schema().ok_or(BioTableError::SchemaNotLocked)?;
    let n_fixed = schema.n_fixed();

    let mut tags: Vec<Column> = Vec::new();
    let mut tag_index: HashMap<&str, usize> = HashMap::new();
    let mut parsed: Vec<Vec<(usize, OptionalField<'_>)>> = Vec::with_capacity(table.len());

    for (i, record) in table.records().iter().enumerate() {
        let row = i + 1;
        let mut cells = Vec::new();
        for raw in raw_optionals(schema, record) {
            let field = parse_optional(raw, row)?;
            typed_optional(&field, row)?;
            let slot = *tag_index.entry(field.tag).or_insert_with(|| {
                tags.push(Column::new(field.tag, field.scalar_type()));
                tags.len() - 1
            });
            let column = &mut tags[slot];
            column.ty = column.ty.widen(field.scalar_type());
            cells.push((slot, field));
        }
        parsed.push(cells);
    }

    let kept: Vec<usize> = (0..schema.width())
        .filter(|&i| !is_opt_column(&schema.columns()[i].name))
        .collect();
    let columns: Vec<Column> = kept
        .iter()
        .map(|&i| schema.columns()[i].clone())
        .chain(tags.iter().cloned())
        .collect();
    let mut expanded = RecordTable::with_schema(table.descriptor().clone(), Schema::new(columns, n_fixed));
    expanded.set_header(table.header().to_vec());

    for (i, (record, cells)) in table.records().iter().zip(parsed).enumerate() {
        let mut tag_values = vec![Value::Absent; tags.len()];
        for (slot, field) in cells {
            tag_values[slot] = conform(&field, tags[slot].ty, i + 1)?;
        }
        let values = kept
            .iter()
            .map(|&i| record.values()[i].clone())
            .chain(tag_values)
            .collect();
        expanded.append(Record::new(values))?;
    }

    Ok(expanded)
}

/// Append one column holding the value of `tag` for every record
///
/// Fails with [`BioTableError::MissingTag`] when no record carries the tag.
/// A table whose schema already has a column named `tag` is returned as is.
/// Mixed TYPE codes widen the column type as in [`expand_tags`].
pub fn extract_tag(table: &RecordTable, tag: &str) -> TableResult<RecordTable> {
    let schema = table.schema().ok_or(BioTableError::SchemaNotLocked)?;
    if schema.contains(tag) {
        return Ok(table.clone());
    }

    let mut ty: Option<ScalarType> = None;
    let mut fields = Vec::with_capacity(table.len());
    for (i, record) in table.records().iter().enumerate() {
        let mut found = None;
        for raw in raw_optionals(schema, record) {
            let field = parse_optional(raw, i + 1)?;
            if field.tag == tag {
                typed_optional(&field, i + 1)?;
                ty = Some(ty.map_or(field.scalar_type(), |t| t.widen(field.scalar_type())));
                found = Some(field);
            }
        }
        fields.push(found);
    }

    let ty = ty.ok_or_else(|| BioTableError::MissingTag(tag.to_string()))?;
    let values = fields
        .iter()
        .enumerate()
        .map(|(i, field)| match field {
            Some(field) => conform(field, ty, i + 1),
            None => Ok(Value::Absent),
        })
        .collect::<TableResult<Vec<Value>>>()?;
    append_column(table, Column::new(tag, ty), values)
}

fn append_column(table: &RecordTable, column: Column, values: Vec<Value>) -> TableResult<RecordTable> {
    let schema = table.schema().ok_or(BioTableError::SchemaNotLocked)?;
    let mut columns = schema.columns().to_vec();
    columns.push(column);

    let mut out = RecordTable::with_schema(table.descriptor().clone(), Schema::new(columns, schema.n_fixed()));
    out.set_header(table.header().to_vec());
    for (record, value) in table.records().iter().zip(values) {
        let mut row = record.values().to_vec();
        row.push(value);
        out.append(Record::new(row))?;
    }
    Ok(out)
}

/// Value of an optional tag on one row
///
/// Looks for an expanded column named `tag` first, then scans the raw
/// optional fields.
pub fn tag_value(row: &RowRef<'_>, tag: &str) -> TableResult<Option<Value>> {
    if let Some(value) = row.get(tag) {
        return Ok((!value.is_absent()).then(|| value.clone()));
    }
    for raw in raw_optionals(row.schema(), row.record()) {
        let field = parse_optional(raw, 0)?;
        if field.tag == tag {
            return typed_optional(&field, 0).map(Some);
        }
    }
    Ok(None)
}

/// Decode the CIGAR column of a row; an absent CIGAR decodes as `*`
pub fn decode_cigar(row: &RowRef<'_>) -> TableResult<Cigar> {
    let text = row.get_str("CIGAR").unwrap_or("*");
    Ok(Cigar::parse(text)?)
}

/// Match/mismatch/indel stream of a row from its CIGAR and MD tag
pub fn match_annotation(row: &RowRef<'_>) -> TableResult<String> {
    let cigar = decode_cigar(row)?;
    let md = tag_value(row, "MD")?.ok_or_else(|| BioTableError::MissingTag("MD".to_string()))?;
    Ok(cigar.match_annotation(&md.to_string())?)
}

/// Append a `MATCH` column with the match annotation of every row
///
/// Rows without an MD tag or with an unavailable CIGAR get an absent value.
pub fn annotate_matches(table: &RecordTable) -> TableResult<RecordTable> {
    let mut values = Vec::with_capacity(table.len());
    for row in table {
        let unavailable = matches!(row.get_str("CIGAR"), None | Some("*"));
        let value = if unavailable || tag_value(&row, "MD")?.is_none() {
            Value::Absent
        } else {
            Value::Text(match_annotation(&row)?)
        };
        values.push(value);
    }
    append_column(table, Column::text(MATCH_COLUMN), values)
}
