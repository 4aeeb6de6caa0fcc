/// Validates an Iranian mobile number as the backend expects it.
///
/// A valid number is:
/// - Exactly 11 digits
/// - Starts with the "09" prefix
/// - All characters are ASCII digits
#[must_use]
pub fn is_valid_phone_number(s: &str) -> bool {
    s.len() == 11 && s.starts_with("09") && s.chars().all(|c| c.is_ascii_digit())
}

/// Trims whitespace and converts Persian/Arabic-Indic digits to ASCII.
///
/// Mobile keyboards commonly emit `۰۹۱۲...`; the backend only accepts ASCII.
#[must_use]
pub fn normalize_phone_number(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_phone_number() {
        assert!(is_valid_phone_number("09121234567"));
        assert!(is_valid_phone_number("09350000000"));
    }

    #[test]
    fn test_invalid_phone_number_wrong_prefix() {
        assert!(!is_valid_phone_number("19121234567"));
        assert!(!is_valid_phone_number("00121234567"));
    }

    #[test]
    fn test_invalid_phone_number_wrong_length() {
        assert!(!is_valid_phone_number("0912123456")); // 10 chars
        assert!(!is_valid_phone_number("091212345678")); // 12 chars
        assert!(!is_valid_phone_number(""));
    }

    #[test]
    fn test_invalid_phone_number_non_digits() {
        assert!(!is_valid_phone_number("0912abcdefg"));
        assert!(!is_valid_phone_number("0912123456a"));
    }

    #[test]
    fn test_normalize_persian_digits() {
        assert_eq!(normalize_phone_number(" ۰۹۱۲۱۲۳۴۵۶۷ "), "09121234567");
        assert_eq!(normalize_phone_number("٠٩١٢١٢٣٤٥٦٧"), "09121234567");
        assert_eq!(normalize_phone_number("09121234567"), "09121234567");
    }
}
