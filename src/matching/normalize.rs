//! Name normalization — canonical comparison keys for noisy name strings.
//!
//! Client names arrive in three flavors of noise: Turkish diacritics
//! (roster exported with them, email bodies usually without), mixed casing,
//! and transliteration variants of common given names. `normalize` folds all
//! three into one uppercase ASCII key so lookups are plain string equality.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Diacritic → ASCII base form, case-preserving.
const DIACRITIC_FOLD: &[(char, char)] = &[
    ('ç', 'c'),
    ('Ç', 'C'),
    ('ğ', 'g'),
    ('Ğ', 'G'),
    ('ı', 'i'),
    ('İ', 'I'),
    ('ö', 'o'),
    ('Ö', 'O'),
    ('ş', 's'),
    ('Ş', 'S'),
    ('ü', 'u'),
    ('Ü', 'U'),
];

/// Known transliteration classes: every member maps to the class canonical.
/// Membership is exact whole-string match after folding and uppercasing,
/// never fuzzy.
const VARIANT_CLASSES: &[(&str, &[&str])] = &[
    ("MUHAMMED", &["MUHAMMET", "MOHAMMED", "MOHAMET"]),
    ("MEHMET", &["MEHMED", "MEMET"]),
];

fn variant_table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut map = HashMap::new();
        for (canonical, variants) in VARIANT_CLASSES {
            map.insert(*canonical, *canonical);
            for v in *variants {
                map.insert(*v, *canonical);
            }
        }
        map
    })
}

/// Canonicalize a raw name string into a comparison key.
///
/// Folds diacritics, uppercases, then collapses known spelling variants.
/// Pure and total: empty input yields the empty string, and the function is
/// idempotent (`normalize(normalize(x)) == normalize(x)`).
pub fn normalize(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .map(|c| {
            DIACRITIC_FOLD
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect();

    let upper = folded.to_uppercase();

    match variant_table().get(upper.as_str()) {
        Some(canonical) => (*canonical).to_string(),
        None => upper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_turkish_diacritics() {
        assert_eq!(normalize("Çağrı"), "CAGRI");
        assert_eq!(normalize("gülşen"), "GULSEN");
        assert_eq!(normalize("İsmail"), "ISMAIL");
        assert_eq!(normalize("yılmaz"), "YILMAZ");
    }

    #[test]
    fn uppercases_plain_ascii() {
        assert_eq!(normalize("john smith"), "JOHN SMITH");
    }

    #[test]
    fn collapses_given_name_variants() {
        assert_eq!(normalize("Muhammet"), "MUHAMMED");
        assert_eq!(normalize("MOHAMMED"), "MUHAMMED");
        assert_eq!(normalize("mohamet"), "MUHAMMED");
        assert_eq!(normalize("Mehmed"), "MEHMET");
        assert_eq!(normalize("MEMET"), "MEHMET");
    }

    #[test]
    fn variant_collapse_is_whole_string_only() {
        // Embedded variants are left alone — the class test is exact match,
        // not substring.
        assert_eq!(normalize("Muhammet Yılmaz"), "MUHAMMET YILMAZ");
    }

    #[test]
    fn empty_input_yields_empty_key() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn idempotent_over_diacritic_input() {
        for raw in ["Çağrı Öztürk", "muhammet", "İlayda Şahin", "MEMET", ""] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn dotted_capital_i_folds_to_plain_i() {
        // 'İ'.to_uppercase() would otherwise leave a combining dot behind —
        // the fold table must run before uppercasing.
        let key = normalize("İREM");
        assert_eq!(key, "IREM");
        assert!(key.is_ascii());
    }
}
