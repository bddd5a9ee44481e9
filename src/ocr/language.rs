//! Locale tag → Tesseract language code.

const BY_TAG: &[(&str, &str)] = &[
    ("zh-cn", "chi_sim"),
    ("zh-sg", "chi_sim"),
    ("zh-hans", "chi_sim"),
    ("zh-tw", "chi_tra"),
    ("zh-hk", "chi_tra"),
    ("zh-hant", "chi_tra"),
    ("pt-br", "por"),
];

const BY_LANGUAGE: &[(&str, &str)] = &[
    ("en", "eng"),
    ("de", "deu"),
    ("fr", "fra"),
    ("es", "spa"),
    ("it", "ita"),
    ("pt", "por"),
    ("nl", "nld"),
    ("pl", "pol"),
    ("ru", "rus"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("zh", "chi_sim"),
    ("sv", "swe"),
    ("da", "dan"),
    ("fi", "fin"),
    ("nb", "nor"),
    ("cs", "ces"),
    ("tr", "tur"),
    ("uk", "ukr"),
    ("ar", "ara"),
];

pub const DEFAULT_LANGUAGE: &str = "eng";

/// Maps a locale such as `de-DE` or `zh_TW` to a Tesseract language code.
///
/// Unknown locales fall back to English.
pub fn tesseract_language(locale: &str) -> &'static str {
    let tag = locale.trim().replace('_', "-").to_ascii_lowercase();
    if let Some((_, code)) = BY_TAG.iter().find(|(t, _)| *t == tag) {
        return *code;
    }
    let primary = tag.split('-').next().unwrap_or_default();
    BY_LANGUAGE
        .iter()
        .find(|(l, _)| *l == primary)
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Uses `override_code` when configured, otherwise derives the code from `locale`.
pub fn resolve(override_code: Option<&str>, locale: &str) -> String {
    match override_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => code.to_string(),
        None => tesseract_language(locale).to_string(),
    }
}
