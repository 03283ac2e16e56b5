//! Parsers for the individual text fields of a chart row
//!
//! Unrecognizable text is reported to the [`WarningLog`] and yields `None`.
//! A field that matches its pattern but holds a malformed number is an error.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ParsingError, ParsingResult};
use super::warnings::WarningLog;
use crate::domain::corrections::{canonical_maker, canonical_model};

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static DIMENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9.]+)\s*x\s*([0-9.]+)\s*x\s*([0-9.]+)").expect("valid regex")
});
static WEIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9.]+)\s*g").expect("valid regex"));
static FAN_INFO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+)(?:x([0-9]+))?/([0-9]+)T").expect("valid regex"));
static RPM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:([0-9]+)(?:\s*-\s*([0-9]+))?)?\s*rpm").expect("valid regex"));
static NOISE_ACTUAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9.]+)(?:\s*-\s*([0-9.]+))?").expect("valid regex"));
static NOISE_BASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2,}\.[0-9]$").expect("valid regex"));
static SINGLE_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]$").expect("valid regex"));
static DIGIT_DOT_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]\.[0-9]$").expect("valid regex"));
static FULL_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2,}(\.[0-9]+)?$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanInfo {
    pub size: i64,
    pub count: i64,
    pub thickness: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpmRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseRange {
    pub min: f64,
    pub max: f64,
}

fn parse_number<T: FromStr>(field: &str, text: &str) -> ParsingResult<T> {
    text.trim()
        .parse::<T>()
        .map_err(|_| ParsingError::invalid_number(field, text))
}

/// Collapse whitespace runs into single spaces and trim the ends
pub fn compress_spaces(s: &str) -> String {
    SPACES.replace_all(s, " ").trim().to_string()
}

/// Canonical maker name. `/` is replaced with `-` so names are path-safe.
pub fn parse_maker(s: &str) -> String {
    let maker = compress_spaces(s);
    canonical_maker(&maker)
        .map(str::to_string)
        .unwrap_or(maker)
        .replace('/', "-")
}

pub fn parse_model(s: &str) -> String {
    let model = compress_spaces(s);
    canonical_model(&model).map(str::to_string).unwrap_or(model)
}

/// `W x D x H` in millimetres. Blank text or `-` means the chart has no dimensions.
pub fn parse_dimension(
    s: Option<&str>,
    warnings: &mut WarningLog,
) -> ParsingResult<Option<Dimensions>> {
    let Some(s) = s.filter(|s| !s.trim().is_empty() && s.trim() != "-") else {
        return Ok(None);
    };
    let Some(caps) = DIMENSION.captures(s) else {
        warnings.warn(format!("unrecognizable dimension: {s}"));
        return Ok(None);
    };
    Ok(Some(Dimensions {
        width: parse_number("width", &caps[1])?,
        depth: parse_number("depth", &caps[2])?,
        height: parse_number("height", &caps[3])?,
    }))
}

/// Lowercased text before the first `/`
pub fn parse_heatsink_type(s: &str) -> String {
    let head = s.split('/').next().unwrap_or_default();
    compress_spaces(&head.to_lowercase())
}

/// Weight in grams; zero is treated as unknown
pub fn parse_weight(s: &str, warnings: &mut WarningLog) -> ParsingResult<Option<f64>> {
    let Some(caps) = WEIGHT.captures(s) else {
        warnings.warn(format!("unrecognizable weight: {s}"));
        return Ok(None);
    };
    let weight: f64 = parse_number("weight", &caps[1])?;
    Ok((weight > 0.0).then_some(weight))
}

/// `SIZE[xCOUNT]/THICKNESST`, e.g. `120x2/25T`
pub fn parse_fan_info(s: Option<&str>, warnings: &mut WarningLog) -> ParsingResult<Option<FanInfo>> {
    let text = s.unwrap_or_default();
    let Some(caps) = FAN_INFO.captures(text) else {
        warnings.warn(format!("unrecognizable fan_info: {text}"));
        return Ok(None);
    };
    let count = match caps.get(2) {
        Some(m) => parse_number("fan_count", m.as_str())?,
        None => 1,
    };
    Ok(Some(FanInfo {
        size: parse_number("fan_size", &caps[1])?,
        count,
        thickness: parse_number("fan_thickness", &caps[3])?,
    }))
}

/// Fan speed range.
///
/// The upper bound is often abbreviated to its trailing digits
/// (`1200-250 rpm` means 1200 to 1250); those are expanded against the
/// lower bound.
pub fn parse_rpm(s: &str, warnings: &mut WarningLog) -> ParsingResult<Option<RpmRange>> {
    let Some(caps) = RPM.captures(s) else {
        warnings.warn(format!("unrecognizable rpm: {s}"));
        return Ok(None);
    };
    let Some(base) = caps.get(1) else {
        return Ok(None);
    };
    let min: i64 = parse_number("rpm_min", base.as_str())?;
    let Some(extra) = caps.get(2).map(|m| m.as_str()) else {
        return Ok(Some(RpmRange { min, max: min }));
    };

    let extra_value: i64 = parse_number("rpm_max", extra)?;
    let max = if extra_value > min {
        extra_value
    } else {
        let unit = u32::try_from(extra.len())
            .ok()
            .and_then(|digits| 10_i64.checked_pow(digits))
            .ok_or_else(|| ParsingError::invalid_number("rpm_max", extra))?;
        let mut max = (min / unit) * unit + extra_value;
        if max < min {
            max += unit;
        }
        max
    };

    if min > max {
        return Err(ParsingError::range_inverted("rpm", min, max));
    }
    Ok(Some(RpmRange { min, max }))
}

/// Measured noise in dB, only published for the maximum noise bucket.
///
/// Like rpm, the upper bound may be abbreviated (`35.5-8` means 35.5 to 35.8).
/// An upper bound that cannot be expanded to something above the lower bound
/// is dropped with a warning and the range collapses to the lower bound.
pub fn parse_noise_actual(
    s: Option<&str>,
    warnings: &mut WarningLog,
) -> ParsingResult<Option<NoiseRange>> {
    let Some(s) = s.filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let Some(caps) = NOISE_ACTUAL.captures(s) else {
        warnings.warn(format!("unrecognizable noise_actual: {s}"));
        return Ok(None);
    };
    let base = &caps[1];
    let min: f64 = parse_number("noise_actual_min", base)?;
    let Some(extra) = caps.get(2).map(|m| m.as_str()) else {
        return Ok(Some(NoiseRange { min, max: min }));
    };

    if NOISE_BASE.is_match(base) {
        let int_part = base.split('.').next().unwrap_or_default();
        let expanded = if SINGLE_DIGIT.is_match(extra) {
            Some(format!("{int_part}.{extra}"))
        } else if DIGIT_DOT_DIGIT.is_match(extra) {
            let mut prefix = int_part.to_string();
            prefix.pop();
            Some(prefix + extra)
        } else if FULL_VALUE.is_match(extra) {
            Some(extra.to_string())
        } else {
            None
        };
        if let Some(expanded) = expanded {
            let max: f64 = parse_number("noise_actual_max", &expanded)?;
            if min < max {
                return Ok(Some(NoiseRange { min, max }));
            }
        }
    }

    warnings.warn(format!(
        "interpreted unrecognizable noise_actual {s} as {}",
        format_float(min)
    ));
    Ok(Some(NoiseRange { min, max: min }))
}

/// CPU temperature delta and optional power-supply temperature delta, read
/// from exactly two `<font>` texts.
pub fn parse_temp_deltas(texts: &[String]) -> ParsingResult<(f64, Option<f64>)> {
    if texts.len() != 2 {
        return Err(ParsingError::unexpected_count("temperature fonts", 2, texts.len()));
    }
    let cpu_temp_delta = parse_number("cpu_temp_delta", &texts[0])?;
    let power_temp_delta = match texts[1].trim() {
        "" => None,
        text => Some(parse_number("power_temp_delta", text)?),
    };
    Ok((cpu_temp_delta, power_temp_delta))
}

/// Render a float the way the chart data is usually written (`41.0`, `35.5`)
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{text}.0")
    } else {
        text
    }
}
