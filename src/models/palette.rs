use std::collections::HashSet;
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

/// Fixed colors for the default categories, seeded in this order on a fresh store.
pub(crate) const PRESET_COLORS: &[(&str, &str)] = &[
    ("Jedzenie", "#FFB3BA"),
    ("Transport", "#BAE1FF"),
    ("Rozrywka", "#FFDFBA"),
    ("Mieszkanie", "#BAFFC9"),
    ("Zdrowie", "#FFFFBA"),
    ("Zakupy spożywcze", "#E0BBE4"),
    ("Wakacje", "#C9B6E4"),
    ("Ubrania", "#FEC8D8"),
    ("Trening", "#D4F0F0"),
    ("Torebki", "#FFDAC1"),
    ("Taksówki", "#E2F0CB"),
    ("Słodycze", "#F8B195"),
    ("Samochód", "#B5EAD7"),
    ("Rzęsy", "#C7CEEA"),
    ("Restauracje", "#FF9AA2"),
    ("Prezenty", "#FFD1DC"),
    ("Pielęgnacja", "#DCD3FF"),
    ("Paznokcie", "#F3C6E8"),
    ("Odpoczynek", "#CDE7BE"),
    ("Nauka", "#A0CED9"),
    ("Makijaż", "#F6D6AD"),
    ("Komunikacja miejska", "#ADC4CE"),
    ("Inwestycje", "#C1E1C1"),
    ("Inne", "#D3D3D3"),
    ("Fastfoody", "#FFE5B4"),
    ("Elektronika", "#B0C4DE"),
    ("Czystość", "#E6E6FA"),
    ("Buty", "#DEB887"),
    ("Biżuteria", "#F0E68C"),
];

static HEX_COLOR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^#[0-9A-F]{6}$").ok());

pub(crate) fn preset_color(name: &str) -> Option<&'static str> {
    PRESET_COLORS
        .iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, color)| *color)
}

pub(crate) fn is_preset_color(color: &str) -> bool {
    PRESET_COLORS.iter().any(|(_, c)| *c == color)
}

/// Uppercase a user-supplied color and check it is `#RRGGBB`.
pub(crate) fn normalize_color(raw: &str) -> Option<String> {
    let color = raw.trim().to_uppercase();
    HEX_COLOR
        .as_ref()
        .is_some_and(|re| re.is_match(&color))
        .then_some(color)
}

pub(crate) fn random_pastel<R: Rng + ?Sized>(rng: &mut R) -> String {
    let r: u8 = rng.gen_range(128..=255);
    let g: u8 = rng.gen_range(128..=255);
    let b: u8 = rng.gen_range(128..=255);
    format!("#{r:02X}{g:02X}{b:02X}")
}

/// Roll pastel colors until one is neither in `used` nor reserved by a preset.
pub(crate) fn generate_unique_color<R: Rng + ?Sized>(used: &HashSet<String>, rng: &mut R) -> String {
    loop {
        let color = random_pastel(rng);
        if !used.contains(&color) && !is_preset_color(&color) {
            return color;
        }
    }
}
