//! Export assembly: serialize normalized records into the fixed 14-column
//! table as CSV or an Office Open XML spreadsheet.

#[cfg(test)]
use crate::country::CountryCode;
use crate::normalize::NormalizedRecord;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

/// Fixed column order of the export schema. The header row always carries
/// exactly these names, in this order.
pub const EXPORT_COLUMNS: [&str; 14] = [
    "ID",
    "Vto_ID",
    "NUMERO_DE_PAIS",
    "Apellido",
    "Nombre",
    "Dirección",
    "N°",
    "Localidad",
    "NUMERO_DE_PAIS_2",
    "Sexo",
    "Estado_Civil",
    "Fecha_de_Nacimiento",
    "Lugar_de_nacimiento",
    "Profesión",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("no completed scans to export")]
    Empty,
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet serialization failed: {0}")]
    Xlsx(#[from] XlsxError),
}

/// Download filename with an ISO date stamp, e.g. `passport_data_2026-08-06.csv`.
pub fn export_filename(extension: &str) -> String {
    format!(
        "passport_data_{}.{}",
        chrono::Local::now().format("%Y-%m-%d"),
        extension
    )
}

fn row_cells(record: &NormalizedRecord) -> [String; 14] {
    [
        record.id.clone(),
        record.expiry_id.clone(),
        record.country_code.to_string(),
        record.surname.clone(),
        record.given_name.clone(),
        record.street.clone(),
        record.street_number.clone(),
        record.locality.clone(),
        record.country_code_birth.to_string(),
        record.sex.clone(),
        record.marital_status.clone(),
        record.birth_date.clone(),
        record.birth_place.clone(),
        record.profession.clone(),
    ]
}

/// Serialize records as CSV: header row plus one row per record in input
/// order. Cells containing the delimiter are quoted, never split.
pub fn to_csv(records: &[NormalizedRecord]) -> Result<Vec<u8>, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(EXPORT_COLUMNS)?;
    for record in records {
        writer.write_record(row_cells(record))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))
}

/// Serialize records as an XLSX workbook. Numeric country codes become
/// numeric cells; everything else is text.
pub fn to_xlsx(records: &[NormalizedRecord]) -> Result<Vec<u8>, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    for (col, name) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header_format)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        let cells = row_cells(record);
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            // Columns 2 and 8 hold the country codes; keep them numeric
            // when the lookup produced a number.
            let numeric = match col {
                2 => record.country_code.as_number(),
                8 => record.country_code_birth.as_number(),
                _ => None,
            };
            match numeric {
                Some(n) => worksheet.write_number(row, col, n as f64)?,
                None => worksheet.write_string(row, col, cell.as_str())?,
            };
        }
    }

    Ok(workbook.save_to_buffer()?)
}
