pub const SUPPORTED_LOCALES: [&str; 2] = ["en", "fr"];

/// Map a platform tag ("fr-FR", "en_US") to a compiled locale.
pub fn normalize_locale(locale_str: &str) -> &'static str {
    let trimmed = locale_str.trim();
    if trimmed.is_empty() {
        return "en";
    }

    let lower = trimmed.to_ascii_lowercase().replace('_', "-");
    let lang = lower.split('-').next().unwrap_or("en");

    match lang {
        "fr" => "fr",
        _ => "en",
    }
}
