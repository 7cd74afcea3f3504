//! QR payload classification and manual-entry normalization.
//!
//! Classification is mode independent: routing an item or form code to the
//! right workflow is the mode controller's job.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

use crate::model::{FormNumber, SalId};

static FORM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^B?D?[DR]F-").expect("form id pattern"));
static ITEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SAL-[0-9]{3,}$").expect("item id pattern"));

pub const MIN_ITEM_DIGITS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanClass {
    Item(SalId),
    Form(FormNumber),
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Invalid format. Use SAL-001 or just the number.")]
    InvalidItemFormat,
    #[error("Invalid form number. Use DF-, RF-, BDF- or BRF- followed by the number.")]
    InvalidFormFormat,
}

/// Classifies decoded QR text. Form markers are checked before item ids.
#[must_use]
pub fn classify(raw: &str) -> ScanClass {
    if FORM_ID.is_match(raw) {
        ScanClass::Form(FormNumber::new(raw))
    } else if ITEM_ID.is_match(raw) {
        ScanClass::Item(SalId::new(raw))
    } else {
        ScanClass::Invalid(raw.to_string())
    }
}

/// Message shown when a camera scan is rejected outright.
#[must_use]
pub fn rejection_message(raw: &str) -> String {
    format!("Invalid QR code: {raw}")
}

/// Normalizes typed item input: `42`, `042`, `SAL042` and `sal-42` all become
/// `SAL-042`. Already canonical ids pass through unchanged.
pub fn normalize_manual_item(input: &str) -> Result<SalId, ScanError> {
    let upper = input.trim().to_uppercase();
    let digits = upper
        .strip_prefix("SAL-")
        .or_else(|| upper.strip_prefix("SAL"))
        .unwrap_or(&upper);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScanError::InvalidItemFormat);
    }

    let candidate = format!("SAL-{digits:0>MIN_ITEM_DIGITS$}");
    match classify(&candidate) {
        ScanClass::Item(id) => Ok(id),
        ScanClass::Form(_) | ScanClass::Invalid(_) => Err(ScanError::InvalidItemFormat),
    }
}

pub fn normalize_manual_form(input: &str) -> Result<FormNumber, ScanError> {
    let upper = input.trim().to_uppercase();
    match classify(&upper) {
        ScanClass::Form(form_no) if upper.len() > form_prefix_len(&upper) => Ok(form_no),
        _ => Err(ScanError::InvalidFormFormat),
    }
}

fn form_prefix_len(form_no: &str) -> usize {
    FORM_ID.find(form_no).map_or(0, |m| m.end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classifies_item_ids() {
        assert_eq!(classify("SAL-001"), ScanClass::Item(SalId::new("SAL-001")));
        assert_eq!(classify("SAL-123456"), ScanClass::Item(SalId::new("SAL-123456")));
    }

    #[test]
    fn classifies_form_prefixes() {
        for raw in ["DF-0001", "RF-0002", "BDF-0003", "BRF-0004", "DF-"] {
            assert_eq!(classify(raw), ScanClass::Form(FormNumber::new(raw)), "{raw}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for raw in ["SAL-01", "SAL-001 ", "sal-001", "XSAL-001", "", "https://x", "BF-1"] {
            assert_eq!(classify(raw), ScanClass::Invalid(raw.to_string()), "{raw:?}");
        }
    }

    #[test]
    fn non_ascii_digits_are_not_item_ids() {
        for raw in [
            "SAL-\u{661}\u{662}\u{663}",
            "SAL-\u{967}\u{968}\u{969}",
            "SAL-\u{ff11}\u{ff12}\u{ff13}",
        ] {
            assert_eq!(classify(raw), ScanClass::Invalid(raw.to_string()), "{raw:?}");
        }
        assert_eq!(
            normalize_manual_item("\u{661}\u{662}"),
            Err(ScanError::InvalidItemFormat)
        );
    }

    #[test]
    fn manual_normalization_examples() {
        for input in ["42", "042", "SAL042", "sal-42", "SAL-042", "  sal042 "] {
            assert_eq!(normalize_manual_item(input), Ok(SalId::new("SAL-042")), "{input}");
        }
        assert_eq!(normalize_manual_item("1234"), Ok(SalId::new("SAL-1234")));
    }

    #[test]
    fn manual_normalization_rejects_garbage() {
        for input in ["", "SAL-", "SAL-4a", "DF-001", "four", "-42"] {
            assert_eq!(
                normalize_manual_item(input),
                Err(ScanError::InvalidItemFormat),
                "{input}"
            );
        }
    }

    #[test]
    fn manual_and_scan_rejections_differ() {
        assert_ne!(
            ScanError::InvalidItemFormat.to_string(),
            rejection_message("garbage")
        );
    }

    #[test]
    fn manual_form_entry() {
        assert_eq!(normalize_manual_form(" bdf-0012 "), Ok(FormNumber::new("BDF-0012")));
        assert_eq!(normalize_manual_form("DF-"), Err(ScanError::InvalidFormFormat));
        assert_eq!(normalize_manual_form("SAL-001"), Err(ScanError::InvalidFormFormat));
    }

    proptest! {
        #[test]
        fn item_pattern_always_classifies_as_item(digits in "[0-9]{3,8}") {
            let raw = format!("SAL-{digits}");
            prop_assert_eq!(classify(&raw), ScanClass::Item(SalId::new(raw.clone())));
        }

        #[test]
        fn form_pattern_always_classifies_as_form(
            prefix in "(B?D?[DR])F-",
            rest in "[A-Z0-9-]{0,10}",
        ) {
            let raw = format!("{prefix}{rest}");
            prop_assert_eq!(classify(&raw), ScanClass::Form(FormNumber::new(raw.clone())));
        }

        #[test]
        fn normalization_is_idempotent(n in 0u32..100_000) {
            let first = normalize_manual_item(&n.to_string()).unwrap();
            let second = normalize_manual_item(first.as_str()).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn only_ascii_digit_ids_are_items(raw in "\\PC*") {
            let expected = raw.strip_prefix("SAL-").is_some_and(|digits| {
                digits.len() >= 3 && digits.bytes().all(|b| b.is_ascii_digit())
            });
            prop_assert_eq!(matches!(classify(&raw), ScanClass::Item(_)), expected);
        }

        #[test]
        fn arbitrary_digits_after_prefix_match_only_when_ascii(digits in "\\PC{3,6}") {
            let raw = format!("SAL-{digits}");
            let ascii = digits.bytes().all(|b| b.is_ascii_digit());
            prop_assert_eq!(matches!(classify(&raw), ScanClass::Item(_)), ascii);
        }
    }
}
