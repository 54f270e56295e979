// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp address normalization.

/// Channel prefix the provider uses for WhatsApp addresses.
pub const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Normalize a phone number into the provider's WhatsApp addressing scheme.
///
/// Addresses that already carry the `whatsapp:` prefix are returned unchanged.
/// Otherwise spaces, dashes and parentheses are removed, a leading `+` is
/// added when missing, and the prefix is prepended.
pub fn whatsapp_address(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with(WHATSAPP_PREFIX) {
        return trimmed.to_string();
    }

    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if digits.starts_with('+') {
        format!("{WHATSAPP_PREFIX}{digits}")
    } else {
        format!("{WHATSAPP_PREFIX}+{digits}")
    }
}

/// Strip the channel prefix, leaving the bare E.164 number.
pub fn phone_number(address: &str) -> &str {
    let trimmed = address.trim();
    trimmed.strip_prefix(WHATSAPP_PREFIX).unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_address_is_unchanged() {
        assert_eq!(
            whatsapp_address("whatsapp:+14155238886"),
            "whatsapp:+14155238886"
        );
    }

    #[test]
    fn punctuation_is_stripped_and_plus_added() {
        assert_eq!(whatsapp_address("1 (415) 523-8886"), "whatsapp:+14155238886");
        assert_eq!(whatsapp_address("+55 11 9999-0000"), "whatsapp:+551199990000");
    }

    #[test]
    fn phone_number_strips_prefix() {
        assert_eq!(phone_number("whatsapp:+551199990000"), "+551199990000");
        assert_eq!(phone_number("+551199990000"), "+551199990000");
    }
}
