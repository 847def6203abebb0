//! Marker colors by category.

use std::str::FromStr as _;

use residue_map_report_models::KnownCategory;

/// Color for categories outside the known set.
pub const UNKNOWN_COLOR: u32 = 0x00ff_ffff;

#[must_use]
pub const fn known_color(category: KnownCategory) -> u32 {
    match category {
        KnownCategory::PetBottles => 0x00ff_6b6b,
        KnownCategory::DisposablePlastics => 0x00ff_d166,
        KnownCategory::FishingNets => 0x006b_e58a,
        KnownCategory::VisibleMicroplastics => 0x006b_dfe5,
        KnownCategory::Other => 0x00c7_7dff,
    }
}

/// Returns the `0xRRGGBB` marker color for a category tag.
#[must_use]
pub fn category_color(category: &str) -> u32 {
    KnownCategory::from_str(category).map_or(UNKNOWN_COLOR, known_color)
}

/// Formats a color as a CSS hex string (`#rrggbb`).
#[must_use]
pub fn css_hex(color: u32) -> String {
    format!("#{:06x}", color & 0x00ff_ffff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories_have_distinct_colors() {
        let mut colors: Vec<u32> = KnownCategory::all().iter().map(|c| known_color(*c)).collect();
        colors.sort_unstable();
        colors.dedup();
        assert_eq!(colors.len(), KnownCategory::all().len());
        assert!(!colors.contains(&UNKNOWN_COLOR));
    }

    #[test]
    fn looks_up_by_tag() {
        assert_eq!(category_color("Garrafas PET"), 0x00ff_6b6b);
        assert_eq!(category_color("Redes de Pesca"), 0x006b_e58a);
        assert_eq!(category_color("pneus"), UNKNOWN_COLOR);
        assert_eq!(category_color(""), UNKNOWN_COLOR);
    }

    #[test]
    fn formats_css_hex() {
        assert_eq!(css_hex(0x00ff_d166), "#ffd166");
        assert_eq!(css_hex(UNKNOWN_COLOR), "#ffffff");
    }
}
