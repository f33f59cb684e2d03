use std::sync::LazyLock;

use regex::Regex;

/// Minimum number of digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = 7;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is a valid literal")
});

/// Standard `local@domain.tld` address shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

/// Digits, spaces, parentheses, `+` and `-` only, with at least
/// [`MIN_PHONE_DIGITS`] digits.
pub fn is_valid_phone(phone: &str) -> bool {
    let phone = phone.trim();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '(' | ')' | '+' | '-'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    allowed && digits >= MIN_PHONE_DIGITS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_emails() {
        assert!(is_valid_email("jane.doe@example.com"));
        assert!(is_valid_email("j+tag@mail.example.co.uk"));
        assert!(is_valid_email("  padded@example.org "));
    }

    #[test]
    fn rejects_malformed_emails() {
        for bad in ["not-an-email", "", "a@b", "@example.com", "a b@example.com", "a@example.c"] {
            assert!(!is_valid_email(bad), "accepted {bad:?}");
        }
    }

    #[test]
    fn accepts_formatted_phones() {
        assert!(is_valid_phone("+1 (555) 123-4567"));
        assert!(is_valid_phone("5551234"));
    }

    #[test]
    fn rejects_bad_phones() {
        assert!(!is_valid_phone("123-45"));
        assert!(!is_valid_phone("555.123.4567"));
        assert!(!is_valid_phone("call me maybe"));
        assert!(!is_valid_phone(""));
    }
}
