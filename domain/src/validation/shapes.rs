//! Shape detection for generic argument invariants.
//!
//! Field *names* decide the shape. Keys are split into words at `_`, `-`,
//! spaces and case changes (`UpdatedDateUTC` is `updated`, `date`, `utc`);
//! a key with a `date` word is date-shaped, one with an `amount`, `total` or
//! `price` word is amount-shaped. Words are never matched inside other
//! words, so `Updated` is not a date.
//! Quantities are not amount-shaped; stock adjustments may be negative.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const AMOUNT_MARKERS: [&str; 3] = ["amount", "total", "price"];

pub fn is_date_field(key: &str) -> bool {
    key_words(key).iter().any(|w| w == "date")
}

pub fn is_amount_field(key: &str) -> bool {
    key_words(key)
        .iter()
        .any(|w| AMOUNT_MARKERS.contains(&w.as_str()))
}

/// Lowercased words of a key, split at separators and case changes.
/// An acronym run stays one word: `InvoiceIDDate` is `invoice`, `id`, `date`.
pub fn key_words(key: &str) -> Vec<String> {
    let mut words = Vec::new();
    for part in key.split(|c: char| c == '_' || c == '-' || c.is_whitespace()) {
        let chars: Vec<char> = part.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = c.is_uppercase()
                && prev.is_some_and(|p| {
                    p.is_lowercase()
                        || p.is_ascii_digit()
                        || (p.is_uppercase() && next.is_some_and(char::is_lowercase))
                });
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.extend(c.to_lowercase());
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

/// Parse the date formats accepted on input: ISO (`2024-03-31`,
/// RFC 3339 timestamps, naive `T` timestamps), `DD/MM/YYYY`, and the
/// `/Date(1711843200000+0000)/` form some accounting APIs echo back.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%d/%m/%Y") {
        return Some(date);
    }

    let millis = value
        .strip_prefix("/Date(")?
        .strip_suffix(")/")?
        .split(['+', '-'])
        .next()?
        .parse::<i64>()
        .ok()?;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

/// Rewrite `DD/MM/YYYY` to ISO; other accepted formats are left untouched.
pub fn normalize_date(value: &str) -> Option<String> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_shapes() {
        assert!(is_date_field("DueDate"));
        assert!(is_date_field("date_from"));
        assert!(!is_date_field("Updated"));
        assert!(is_amount_field("Amount"));
        assert!(is_amount_field("UnitAmount"));
        assert!(is_amount_field("sub_total"));
        assert!(is_amount_field("UnitPrice"));
        assert!(!is_amount_field("Quantity"));
    }

    #[test]
    fn test_date_word_not_matched_inside_other_words() {
        assert!(is_date_field("Date"));
        assert!(is_date_field("UpdatedDateUTC"));
        assert!(is_date_field("dueDate"));
        assert!(!is_date_field("UpdatedBy"));
        assert!(!is_date_field("Validated"));
        assert!(!is_date_field("Candidate"));
    }

    #[test]
    fn test_key_words() {
        assert_eq!(key_words("UpdatedDateUTC"), ["updated", "date", "utc"]);
        assert_eq!(key_words("InvoiceIDDate"), ["invoice", "id", "date"]);
        assert_eq!(key_words("date_from"), ["date", "from"]);
        assert_eq!(key_words("LineAmountTypes"), ["line", "amount", "types"]);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(parse_date("2024-03-31"), Some(expected));
        assert_eq!(parse_date("31/03/2024"), Some(expected));
        assert_eq!(parse_date("2024-03-31T10:00:00"), Some(expected));
        assert_eq!(parse_date("2024-03-31T10:00:00+02:00"), Some(expected));
        assert_eq!(parse_date("/Date(1711843200000+0000)/"), Some(expected));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date("next tuesday"), None);
        assert_eq!(parse_date("31/13/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("01/04/2024"), Some("2024-04-01".to_string()));
        assert_eq!(normalize_date("2024-04-01"), None);
    }
}
