//! Delimited-text export of the joined dataset

use csv::{QuoteStyle, WriterBuilder};
use thiserror::Error;

use crate::infrastructure::cooler_repository::{CoolerRepository, ExportRow};
use crate::infrastructure::parsing::field_parsers::format_float;

pub const EXPORT_COLUMNS: [&str; 21] = [
    "maker",
    "model",
    "width",
    "depth",
    "height",
    "heatsink_type",
    "weight",
    "price",
    "shop_count",
    "first_seen",
    "fan_size",
    "fan_thickness",
    "fan_count",
    "noise",
    "noise_actual_min",
    "noise_actual_max",
    "rpm_min",
    "rpm_max",
    "power",
    "cpu_temp_delta",
    "power_temp_delta",
];

const FIRST_SEEN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to read export rows: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Failed to write delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("Delimited text is not valid UTF-8")]
    Encoding,
}

/// Read the whole dataset and render it with `delimiter`
pub async fn export_data(repository: &CoolerRepository, delimiter: u8) -> Result<String, ExportError> {
    let rows = repository.export_rows().await?;
    render_delimited(&rows, delimiter)
}

/// Render rows under a header line. Values never contain the delimiter: it
/// is replaced with `_`, or with `-` when the delimiter itself is `_`.
pub fn render_delimited(rows: &[ExportRow], delimiter: u8) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());

    writer.write_record(EXPORT_COLUMNS)?;
    let delimiter = char::from(delimiter);
    let replacement = if delimiter == '_' { "-" } else { "_" };
    for row in rows {
        let fields = row_fields(row)
            .into_iter()
            .map(|field| field.replace(delimiter, replacement));
        writer.write_record(fields)?;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| ExportError::Encoding)
}

fn opt_float(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_default()
}

fn opt_int(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn row_fields(row: &ExportRow) -> [String; 21] {
    [
        row.maker.clone(),
        row.model.clone(),
        opt_float(row.width),
        opt_float(row.depth),
        opt_float(row.height),
        row.heatsink_type.clone(),
        opt_float(row.weight),
        opt_int(row.price),
        opt_int(row.shop_count),
        row.first_seen
            .map(|at| at.format(FIRST_SEEN_FORMAT).to_string())
            .unwrap_or_default(),
        row.fan_size.to_string(),
        row.fan_thickness.to_string(),
        row.fan_count.to_string(),
        row.noise.to_string(),
        opt_float(row.noise_actual_min),
        opt_float(row.noise_actual_max),
        opt_int(row.rpm_min),
        opt_int(row.rpm_max),
        row.power.to_string(),
        format_float(row.cpu_temp_delta),
        opt_float(row.power_temp_delta),
    ]
}
