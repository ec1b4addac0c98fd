#![allow(clippy::unwrap_used)]

use super::*;
use rust_decimal_macros::dec;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn headers(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|h| normalize_header(h)).collect()
}

// ── Dates ─────────────────────────────────────────────────────

#[test]
fn test_parse_date_common_spellings() {
    let expected = ymd(2024, 5, 2);
    for raw in [
        "2024-05-02",
        " 2024-05-02 ",
        "2024/05/02",
        "02.05.2024",
        "05/02/2024",
        "02-05-2024",
        "May 2, 2024",
        "May 02, 2024",
        "2 May 2024",
        "02 May 2024",
    ] {
        assert_eq!(parse_date(raw).unwrap(), expected, "input {raw:?}");
    }
}

#[test]
fn test_parse_date_drops_time_part() {
    let expected = ymd(2024, 5, 2);
    assert_eq!(parse_date("2024-05-02 13:45:00").unwrap(), expected);
    assert_eq!(parse_date("2024-05-02T13:45:00").unwrap(), expected);
    assert_eq!(parse_date("2024-05-02 13:45").unwrap(), expected);
    assert_eq!(parse_date("2024-05-02T13:45:00+02:00").unwrap(), expected);
}

#[test]
fn test_parse_date_rejects_impossible_dates() {
    assert!(parse_date("2024-13-01").is_err());
    assert!(parse_date("2023-02-30").is_err());
    assert!(parse_date("").is_err());
    assert!(parse_date("yesterday").is_err());
}

// ── Ids and amounts ───────────────────────────────────────────

#[test]
fn test_parse_id() {
    assert_eq!(parse_id("7").unwrap(), 7);
    assert_eq!(parse_id(" 42 ").unwrap(), 42);
    assert_eq!(parse_id("7.0").unwrap(), 7);
    assert!(parse_id("7.5").is_err());
    assert!(parse_id("abc").is_err());
    assert!(parse_id("").is_err());
    assert!(parse_id("inf").is_err());
}

#[test]
fn test_parse_amount() {
    assert_eq!(parse_amount("123.45").unwrap(), dec!(123.45));
    assert_eq!(parse_amount("-5").unwrap(), dec!(-5));
    assert_eq!(parse_amount("1e3").unwrap(), dec!(1000));
    assert_eq!(parse_amount("2.5e-1").unwrap(), dec!(0.25));
    assert!(parse_amount("12,50").is_err());
    assert!(parse_amount("ten").is_err());
}

// ── Cells ─────────────────────────────────────────────────────

#[test]
fn test_cell_treats_blank_and_markers_as_missing() {
    let record = StringRecord::from(vec!["1", "  ", "NaN", "N/A", "Jedzenie"]);
    assert_eq!(cell(&record, 0), Some("1"));
    assert_eq!(cell(&record, 1), None);
    assert_eq!(cell(&record, 2), None);
    assert_eq!(cell(&record, 3), None);
    assert_eq!(cell(&record, 4), Some("Jedzenie"));
    assert_eq!(cell(&record, 9), None);
}

// ── Headers ───────────────────────────────────────────────────

#[test]
fn test_normalize_header() {
    assert_eq!(normalize_header("\u{feff}ID"), "id");
    assert_eq!(normalize_header("  Kwota "), "kwota");
    assert_eq!(normalize_header("CATEGORY"), "category");
}

#[test]
fn test_map_columns_localized_set() {
    let map = map_columns(&headers(&["ID", "Kwota", "Kategoria", "Data"])).unwrap();
    assert_eq!(
        map,
        ColumnMap {
            id: 0,
            amount: 1,
            category: 2,
            date: 3
        }
    );
}

#[test]
fn test_map_columns_english_set_any_order() {
    let map = map_columns(&headers(&["Date", "category", " Amount", "id", "note"])).unwrap();
    assert_eq!(
        map,
        ColumnMap {
            id: 3,
            amount: 2,
            category: 1,
            date: 0
        }
    );
}

#[test]
fn test_map_columns_prefers_localized_set() {
    let map = map_columns(&headers(&["amount", "category", "date", "id", "kwota", "kategoria", "data"]))
        .unwrap();
    assert_eq!(map.amount, 4);
    assert_eq!(map.category, 5);
    assert_eq!(map.date, 6);
}

#[test]
fn test_map_columns_rejects_mixed_sets() {
    assert!(map_columns(&headers(&["id", "kwota", "category", "date"])).is_none());
    assert!(map_columns(&headers(&["id", "kwota", "data"])).is_none());
    assert!(map_columns(&[]).is_none());
}

// ── Decoding ──────────────────────────────────────────────────

#[test]
fn test_read_table_plain_utf8() {
    let table = read_table("ID,Kwota\n1,2\n".as_bytes()).unwrap();
    assert_eq!(table.encoding, Encoding::Utf8);
    assert_eq!(table.headers, vec!["ID", "Kwota"]);
    assert_eq!(table.rows.len(), 1);
}

#[test]
fn test_read_table_latin1_fallback() {
    let table = read_table(b"name\nCaf\xe9\n").unwrap();
    assert_eq!(table.encoding, Encoding::Latin1);
    assert_eq!(table.rows[0].get(0), Some("Café"));
}

#[test]
fn test_read_table_trims_and_tolerates_ragged_rows() {
    let table = read_table(b"a,b,c\n 1 , 2 ,3\n4,5\n").unwrap();
    assert_eq!(table.rows[0].get(1), Some("2"));
    assert_eq!(table.rows[1].len(), 2);
}

#[test]
fn test_bom_is_stripped_by_header_normalization() {
    let mut bytes = UTF8_BOM.to_vec();
    bytes.extend_from_slice(b"ID,Kwota,Kategoria,Data\n");
    let table = read_table(&bytes).unwrap();
    let names: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
    assert!(map_columns(&names).is_some());
}
