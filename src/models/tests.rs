#![allow(clippy::unwrap_used)]

use std::collections::HashSet;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal_macros::dec;

use super::palette::*;
use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ── Expense ───────────────────────────────────────────────────

#[test]
fn test_new_expense_has_no_id() {
    let e = Expense::new(dec!(12.50), "Jedzenie".into(), date(2024, 5, 1));
    assert!(e.id.is_none());
    assert_eq!(e.month(), "2024-05");
}

#[test]
fn test_update_apply_partial() {
    let mut e = Expense::new(dec!(10), "Jedzenie".into(), date(2024, 1, 1));
    let update = ExpenseUpdate {
        amount: Some(dec!(20)),
        ..ExpenseUpdate::default()
    };
    update.apply(&mut e);
    assert_eq!(e.amount, dec!(20));
    assert_eq!(e.category, "Jedzenie");
    assert_eq!(e.date, date(2024, 1, 1));
}

#[test]
fn test_update_is_empty() {
    assert!(ExpenseUpdate::default().is_empty());
    let update = ExpenseUpdate {
        date: Some(date(2024, 2, 2)),
        ..ExpenseUpdate::default()
    };
    assert!(!update.is_empty());
}

// ── Category ──────────────────────────────────────────────────

#[test]
fn test_new_category_is_active() {
    let c = Category::new("Books".into(), "#ABCDEF".into());
    assert!(c.is_active);
    assert!(c.id.is_none());
    assert_eq!(c.to_string(), "Books");
}

#[test]
fn test_find_by_name_is_exact() {
    let cats = vec![
        Category::new("Transport".into(), "#BAE1FF".into()),
        Category::new("Inne".into(), "#D3D3D3".into()),
    ];
    assert!(Category::find_by_name(&cats, "Inne").is_some());
    assert!(Category::find_by_name(&cats, "inne").is_none());
}

// ── Palette ───────────────────────────────────────────────────

#[test]
fn test_presets_are_unique_and_well_formed() {
    let mut seen = HashSet::new();
    for (name, color) in PRESET_COLORS {
        assert_eq!(normalize_color(color).as_deref(), Some(*color), "{name}");
        assert!(seen.insert(*color), "duplicate preset color {color}");
    }
}

#[test]
fn test_preset_lookup() {
    assert_eq!(preset_color("Transport"), Some("#BAE1FF"));
    assert_eq!(preset_color("Zakupy spożywcze"), Some("#E0BBE4"));
    assert_eq!(preset_color("Nonexistent"), None);
}

#[test]
fn test_normalize_color() {
    assert_eq!(normalize_color("#abcdef").as_deref(), Some("#ABCDEF"));
    assert_eq!(normalize_color(" #A1B2C3 ").as_deref(), Some("#A1B2C3"));
    assert!(normalize_color("ABCDEF").is_none());
    assert!(normalize_color("#ABCDE").is_none());
    assert!(normalize_color("#GGGGGG").is_none());
}

#[test]
fn test_random_pastel_channels_are_light() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let color = random_pastel(&mut rng);
        assert_eq!(color.len(), 7);
        for i in [1, 3, 5] {
            let channel = u8::from_str_radix(&color[i..i + 2], 16).unwrap();
            assert!(channel >= 128, "{color}");
        }
    }
}

#[test]
fn test_generated_colors_are_distinct() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut used: HashSet<String> = HashSet::new();
    for _ in 0..300 {
        let color = generate_unique_color(&used, &mut rng);
        assert!(normalize_color(&color).is_some());
        assert!(!is_preset_color(&color));
        assert!(used.insert(color));
    }
    assert_eq!(used.len(), 300);
}
