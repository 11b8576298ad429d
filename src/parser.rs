//! CSV import for equipment uploads
//!
//! Turns the raw bytes of an uploaded file into validated [`EquipmentRecord`]s.
//! The whole file is rejected on the first bad row, so callers never see a
//! partially parsed record set.

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::models::{EquipmentRecord, EquipmentType};
use crate::types::{AppError, AppResult};

pub const COLUMN_NAME: &str = "Equipment Name";
pub const COLUMN_TYPE: &str = "Type";
pub const COLUMN_FLOWRATE: &str = "Flowrate";
pub const COLUMN_PRESSURE: &str = "Pressure";
pub const COLUMN_TEMPERATURE: &str = "Temperature";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    COLUMN_NAME,
    COLUMN_TYPE,
    COLUMN_FLOWRATE,
    COLUMN_PRESSURE,
    COLUMN_TEMPERATURE,
];

const HEADER_ROW: u64 = 1;

/// Positions of the required columns within the header row
struct ColumnLayout {
    width: usize,
    name: usize,
    kind: usize,
    flowrate: usize,
    pressure: usize,
    temperature: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> AppResult<Self> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
                .ok_or_else(|| {
                    AppError::malformed(HEADER_ROW, format!("missing required column '{}'", column))
                })
        };

        Ok(Self {
            width: headers.len(),
            name: find(COLUMN_NAME)?,
            kind: find(COLUMN_TYPE)?,
            flowrate: find(COLUMN_FLOWRATE)?,
            pressure: find(COLUMN_PRESSURE)?,
            temperature: find(COLUMN_TEMPERATURE)?,
        })
    }
}

/// Parse an uploaded equipment CSV.
///
/// Header names are matched case-insensitively and may appear in any order;
/// extra columns are ignored. A header with no data rows yields an empty list.
pub fn parse_equipment_csv(content: &[u8]) -> AppResult<Vec<EquipmentRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content);

    let headers = rdr.headers().map_err(csv_error)?.clone();
    let layout = ColumnLayout::from_headers(&headers)?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(csv_error)?;
        let line = row.position().map(|p| p.line()).unwrap_or(HEADER_ROW);

        // A whitespace-only line arrives as a single empty field
        if row.len() == 1 && row.get(0).is_some_and(str::is_empty) {
            continue;
        }
        records.push(parse_row(&row, &layout, line)?);
    }

    debug!(rows = records.len(), "Parsed equipment CSV");
    Ok(records)
}

fn parse_row(row: &StringRecord, layout: &ColumnLayout, line: u64) -> AppResult<EquipmentRecord> {
    if row.len() != layout.width {
        return Err(AppError::malformed(
            line,
            format!("expected {} fields, found {}", layout.width, row.len()),
        ));
    }

    let field = |idx: usize| row.get(idx).unwrap_or_default();

    let equipment_name = field(layout.name);
    if equipment_name.is_empty() {
        return Err(AppError::malformed(
            line,
            format!("field '{}' is empty", COLUMN_NAME),
        ));
    }

    let equipment_type = field(layout.kind)
        .parse::<EquipmentType>()
        .map_err(|reason| AppError::malformed(line, reason))?;

    Ok(EquipmentRecord {
        equipment_name: equipment_name.to_string(),
        equipment_type,
        flowrate: parse_number(field(layout.flowrate), COLUMN_FLOWRATE, line)?,
        pressure: parse_number(field(layout.pressure), COLUMN_PRESSURE, line)?,
        temperature: parse_number(field(layout.temperature), COLUMN_TEMPERATURE, line)?,
    })
}

fn parse_number(raw: &str, column: &str, line: u64) -> AppResult<f64> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(AppError::malformed(
            line,
            format!("field '{}' must be a finite number, got \"{}\"", column, raw),
        )),
        Err(_) => Err(AppError::malformed(
            line,
            format!("field '{}' is not a number: \"{}\"", column, raw),
        )),
    }
}

fn csv_error(err: csv::Error) -> AppError {
    let line = err.position().map(|p| p.line()).unwrap_or(HEADER_ROW);
    AppError::malformed(line, err.to_string())
}
