use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rust_decimal::Decimal;
use std::str::FromStr;

pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodings tried in order; the first that yields a parseable table wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encoding {
    Utf8,
    Utf8Sig,
    Latin1,
}

const FALLBACK_ORDER: [Encoding; 3] = [Encoding::Utf8, Encoding::Utf8Sig, Encoding::Latin1];

impl Encoding {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Sig => "utf-8-sig",
            Self::Latin1 => "latin-1",
        }
    }

    fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Self::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            // Every byte is a code point in U+0000..=U+00FF.
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Raw header row plus data rows, before any column mapping.
#[derive(Debug)]
pub(crate) struct Table {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<StringRecord>,
    pub(crate) encoding: Encoding,
}

pub(crate) fn read_table(bytes: &[u8]) -> Option<Table> {
    FALLBACK_ORDER.iter().find_map(|&encoding| {
        let text = encoding.decode(bytes)?;
        match parse_csv(&text) {
            Ok((headers, rows)) => Some(Table {
                headers,
                rows,
                encoding,
            }),
            Err(e) => {
                log::debug!("CSV parse as {} failed: {e}", encoding.label());
                None
            }
        }
    })
}

fn parse_csv(text: &str) -> csv::Result<(Vec<String>, Vec<StringRecord>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let rows = rdr.records().collect::<csv::Result<Vec<_>>>()?;
    Ok((headers, rows))
}

// ── Headers ───────────────────────────────────────────────────

/// Positions of the four canonical columns within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    pub(crate) id: usize,
    pub(crate) amount: usize,
    pub(crate) category: usize,
    pub(crate) date: usize,
}

/// Accepted header sets as (id, amount, category, date), tried in order.
const HEADER_SETS: [[&str; 4]; 2] = [
    ["id", "kwota", "kategoria", "data"],
    ["id", "amount", "category", "date"],
];

pub(crate) fn normalize_header(raw: &str) -> String {
    raw.replace('\u{feff}', "").trim().to_lowercase()
}

/// Expects already-normalized headers. Extra columns are ignored.
pub(crate) fn map_columns(headers: &[String]) -> Option<ColumnMap> {
    let position = |name: &str| headers.iter().position(|h| h == name);
    HEADER_SETS.iter().find_map(|[id, amount, category, date]| {
        Some(ColumnMap {
            id: position(id)?,
            amount: position(amount)?,
            category: position(category)?,
            date: position(date)?,
        })
    })
}

// ── Cells ─────────────────────────────────────────────────────

const NA_VALUES: &[&str] = &["NA", "N/A", "#N/A", "NaN", "nan", "null", "NULL"];

/// Cell text, or `None` when the cell is absent, blank or a missing-value marker.
pub(crate) fn cell(record: &StringRecord, index: usize) -> Option<&str> {
    record
        .get(index)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !NA_VALUES.contains(s))
}

pub(crate) fn parse_id(raw: &str) -> Result<i64> {
    let s = raw.trim();
    if let Ok(id) = s.parse::<i64>() {
        return Ok(id);
    }
    // Spreadsheets like to turn integer columns into "7.0".
    let float: f64 = s
        .parse()
        .with_context(|| format!("Invalid id '{raw}'"))?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        return Ok(float as i64);
    }
    anyhow::bail!("Invalid id '{raw}'")
}

pub(crate) fn parse_amount(raw: &str) -> Result<Decimal> {
    let s = raw.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .with_context(|| format!("Invalid amount '{raw}'"))
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%Y%m%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Accepts the usual ISO, European and US spellings; any time part is dropped.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    anyhow::bail!("Could not parse date: {raw}")
}

#[cfg(test)]
#[path = "decode_tests.rs"]
mod tests;
