//! Chart page parser
//!
//! Each data row of the results table describes one heatsink at the page's
//! `(noise, power)` grid cell. Cells hold two values separated by `<br>`:
//!
//! | cell | before `<br>`      | after `<br>`            |
//! |------|--------------------|-------------------------|
//! | 0    | maker              | model                   |
//! | 1    | dimensions         | heatsink type, weight   |
//! | 2    | fan size/thickness | rpm                     |
//!
//! On the maximum-noise page the next cell carries the measured noise, and
//! the cell after that holds the two temperature deltas in `<font>` tags.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error};

use super::config::ChartSelectors;
use super::context::ChartPageContext;
use super::error::{ParsingError, ParsingResult};
use super::field_parsers::{
    parse_dimension, parse_fan_info, parse_heatsink_type, parse_maker, parse_model,
    parse_noise_actual, parse_rpm, parse_temp_deltas, parse_weight,
};
use super::warnings::WarningLog;
use crate::domain::corrections::correct_record;
use crate::domain::CoolerRecord;

pub struct ChartTableParser {
    table_selector: Selector,
    row_selector: Selector,
    temperature_selector: Selector,
}

impl ChartTableParser {
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ChartSelectors::default())
    }

    pub fn with_config(selectors: &ChartSelectors) -> ParsingResult<Self> {
        Ok(Self {
            table_selector: compile_selector(&selectors.table)?,
            row_selector: compile_selector(&selectors.row)?,
            temperature_selector: compile_selector(&selectors.temperature)?,
        })
    }

    /// Parse every data row of a chart page.
    ///
    /// Any row that cannot be parsed fails the whole page, as does a page
    /// without a results table or without rows.
    pub fn parse_page(
        &self,
        html: &str,
        context: &ChartPageContext,
        warnings: &mut WarningLog,
    ) -> ParsingResult<Vec<CoolerRecord>> {
        let cell = context.cell;
        let document = Html::parse_document(html);
        let table = document
            .select(&self.table_selector)
            .next()
            .ok_or(ParsingError::TableNotFound {
                noise: cell.noise,
                power: cell.power,
            })?;

        let mut records = Vec::new();
        for (index, row) in table.select(&self.row_selector).enumerate() {
            match self.parse_row(row, context, warnings) {
                Ok(record) => records.push(record),
                Err(e) => {
                    error!("Failed to parse row {} of {}: {}", index, context.url, e);
                    return Err(e.in_row(cell.noise, cell.power, index));
                }
            }
        }

        if records.is_empty() {
            return Err(ParsingError::NoRows {
                noise: cell.noise,
                power: cell.power,
            });
        }
        debug!(
            "Parsed {} rows (noise={}, power={})",
            records.len(),
            cell.noise,
            cell.power
        );
        Ok(records)
    }

    fn parse_row(
        &self,
        row: ElementRef<'_>,
        context: &ChartPageContext,
        warnings: &mut WarningLog,
    ) -> ParsingResult<CoolerRecord> {
        let cell = context.cell;
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|td| td.value().name() == "td" && td.value().attr("width") != Some("1"))
            .collect();
        let temperature_index = if cell.is_noise_max() { 4 } else { 3 };
        if cells.len() <= temperature_index {
            return Err(ParsingError::unexpected_count(
                "data cells",
                temperature_index + 1,
                cells.len(),
            ));
        }

        let maker = parse_maker(&required(leading_text(cells[0]), "maker")?);
        let model = parse_model(&required(br_tail(cells[0]), "model")?);

        let dimensions = parse_dimension(leading_text(cells[1]).as_deref(), warnings)?;
        let type_and_weight = required(br_tail(cells[1]), "heatsink_type")?;
        let heatsink_type = parse_heatsink_type(&type_and_weight);
        let weight = parse_weight(&type_and_weight, warnings)?;

        let fan = parse_fan_info(leading_text(cells[2]).as_deref(), warnings)?;
        let rpm = parse_rpm(&required(br_tail(cells[2]), "rpm")?, warnings)?;

        let noise_actual = if cell.is_noise_max() {
            parse_noise_actual(leading_text(cells[3]).as_deref(), warnings)?
        } else {
            None
        };

        let temperature_texts: Vec<String> = cells[temperature_index]
            .select(&self.temperature_selector)
            .map(|font| font.text().collect::<String>())
            .collect();
        let (cpu_temp_delta, power_temp_delta) = parse_temp_deltas(&temperature_texts)?;

        let mut record = CoolerRecord {
            maker,
            model,
            width: dimensions.map(|d| d.width),
            depth: dimensions.map(|d| d.depth),
            height: dimensions.map(|d| d.height),
            heatsink_type,
            weight,
            fan_size: fan.map(|f| f.size),
            fan_thickness: fan.map(|f| f.thickness),
            fan_count: fan.map(|f| f.count),
            rpm_min: rpm.map(|r| r.min),
            rpm_max: rpm.map(|r| r.max),
            noise: cell.noise,
            power: cell.power,
            noise_actual_min: noise_actual.map(|n| n.min),
            noise_actual_max: noise_actual.map(|n| n.max),
            cpu_temp_delta,
            power_temp_delta,
        };
        correct_record(&mut record);
        Ok(record)
    }
}

fn compile_selector(selector: &str) -> ParsingResult<Selector> {
    Selector::parse(selector).map_err(|e| ParsingError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn required(value: Option<String>, field: &str) -> ParsingResult<String> {
    value.ok_or_else(|| ParsingError::required_field_missing(field, None))
}

/// Text directly inside `element` before its first child node that is not text
fn leading_text(element: ElementRef<'_>) -> Option<String> {
    let text: String = element
        .children()
        .map_while(|node| node.value().as_text().map(|t| t.text.to_string()))
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Text directly following the first `<br>` child of `element`
fn br_tail(element: ElementRef<'_>) -> Option<String> {
    let br = element
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "br")?;
    let text: String = br
        .next_siblings()
        .map_while(|node| node.value().as_text().map(|t| t.text.to_string()))
        .collect();
    (!text.is_empty()).then_some(text)
}
