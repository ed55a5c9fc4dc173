//! Phone number normalization for the Cloud API `to` field.

/// Country calling code assumed for national-format numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "92";

/// Convert a local-format number into `+<country><national>` form.
///
/// Whitespace, hyphens and plus signs are dropped first. Digits already
/// carrying the country code only gain a `+`; a national trunk `0` is
/// replaced by the country code; anything else is treated as a bare national
/// number. No length or digit validation is done, so garbage in gives
/// best-effort garbage out.
///
/// ```
/// use whatsapp_client::normalize_phone_number;
///
/// assert_eq!(normalize_phone_number("0317-6227245", "92"), "+923176227245");
/// ```
pub fn normalize_phone_number(raw: &str, country_code: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '+')
        .collect();

    if cleaned.starts_with(country_code) {
        format!("+{}", cleaned)
    } else if let Some(national) = cleaned.strip_prefix('0') {
        format!("+{}{}", country_code, national)
    } else {
        format!("+{}{}", country_code, cleaned)
    }
}
