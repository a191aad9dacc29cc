/*!
 * Language utilities for ISO language code handling
 *
 * YouTube labels caption tracks with ISO 639-1 codes, sometimes carrying a
 * region subtag ("pt-BR"), while translation requests may arrive as a code
 * or a plain language name. This module maps all of those onto [`Language`]
 * so the two can be compared and rendered.
 */

use isolang::Language;

/// ISO 639-2/B codes that differ from their 639-2/T equivalent
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"), // French
    ("ger", "deu"), // German
    ("dut", "nld"), // Dutch
    ("gre", "ell"), // Greek
    ("chi", "zho"), // Chinese
    ("cze", "ces"), // Czech
    ("ice", "isl"), // Icelandic
    ("alb", "sqi"), // Albanian
    ("arm", "hye"), // Armenian
    ("baq", "eus"), // Basque
    ("bur", "mya"), // Burmese
    ("per", "fas"), // Persian
    ("geo", "kat"), // Georgian
    ("may", "msa"), // Malay
    ("mac", "mkd"), // Macedonian
    ("rum", "ron"), // Romanian
    ("slo", "slk"), // Slovak
    ("wel", "cym"), // Welsh
];

/// Parse a language code into a [`Language`], ignoring case and any region
/// subtag ("en-US" resolves like "en")
pub fn parse_language_code(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    let primary = normalized.split(['-', '_']).next().unwrap_or(&normalized);

    match primary.len() {
        2 => Language::from_639_1(primary),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(part2b, _)| *part2b == primary)
                .map(|(_, part2t)| *part2t)
                .unwrap_or(primary);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Check if two language codes refer to the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (parse_language_code(code1), parse_language_code(code2)) {
        (Some(lang1), Some(lang2)) => lang1 == lang2,
        _ => false,
    }
}

/// Resolve a language code or name to the English language name used in
/// translation prompts. Values that are not recognized codes pass through
/// unchanged, so "Brazilian Portuguese" stays as written.
pub fn resolve_language_name(value: &str) -> String {
    match parse_language_code(value) {
        Some(lang) => lang.to_name().to_string(),
        None => value.trim().to_string(),
    }
}
