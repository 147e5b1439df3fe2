//! Document text normalization.
//!
//! Runs before chunking at index time: strips trailing signature blocks
//! and mail-client boilerplate, substitutes a small set of sensitive
//! patterns with a fixed placeholder, and collapses whitespace runs.
//!
//! The redaction pass is a best-effort precision aid for retrieval
//! quality, not a security control; callers that need real redaction
//! own that policy upstream.

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder substituted for redacted spans.
pub const REDACTED: &str = "[REDACTED]";

// Blank-line-delimited trailers appended by mail clients.
static SIG_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\n--\s*\n.*$").unwrap());
static SENT_FROM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\nSent from my \w+.*$").unwrap());
static GET_OUTLOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\nGet Outlook for \w+.*$").unwrap());

// Numeric codes resembling OTPs.
static OTP_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{6}\b").unwrap());
// Email addresses (as they appear in quoted signatures).
static EMAIL_ADDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});
// Card-like digit groups: four groups of four, space/dash separated.
static CARD_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{4}[\s-]?){3}\d{4}\b").unwrap());
// `secret:`/`secret=` prefixed tokens.
static SECRET_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsecret\s*[:=]\s*\S+").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip trailing signature blocks and client boilerplate.
///
/// Shared by document cleaning and query cleaning so that lexical
/// scoring sees the same text shape on both sides.
pub fn strip_signatures(text: &str) -> String {
    let text = SIG_DELIMITER.replace(text, "");
    let text = SENT_FROM.replace(&text, "");
    GET_OUTLOOK.replace(&text, "").into_owned()
}

/// Clean a document body for indexing.
///
/// Signature stripping, redaction substitutions, then whitespace
/// collapse. Returns an empty string for empty input.
pub fn clean_document(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = strip_signatures(text);

    let text = OTP_CODE.replace_all(&text, REDACTED);
    let text = EMAIL_ADDR.replace_all(&text, REDACTED);
    let text = CARD_NUMBER.replace_all(&text, REDACTED);
    let text = SECRET_TOKEN.replace_all(&text, REDACTED);

    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_document(""), "");
    }

    #[test]
    fn test_whitespace_collapse() {
        let cleaned = clean_document("hello   world\n\n\tagain");
        assert_eq!(cleaned, "hello world again");
    }

    #[test]
    fn test_signature_block_stripped() {
        let body = "Meeting moved to Thursday.\n-- \nAlice Smith\nVP Engineering";
        let cleaned = clean_document(body);
        assert_eq!(cleaned, "Meeting moved to Thursday.");
    }

    #[test]
    fn test_sent_from_trailer_stripped() {
        let body = "See attached draft.\nSent from my iPhone";
        assert_eq!(clean_document(body), "See attached draft.");
    }

    #[test]
    fn test_otp_redacted() {
        let cleaned = clean_document("Your code is 493817 for login");
        assert!(cleaned.contains(REDACTED));
        assert!(!cleaned.contains("493817"));
    }

    #[test]
    fn test_email_address_redacted() {
        let cleaned = clean_document("Contact bob.jones@example.co.uk for access");
        assert!(!cleaned.contains("example.co.uk"));
        assert!(cleaned.contains(REDACTED));
    }

    #[test]
    fn test_card_number_redacted() {
        for s in ["4111 1111 1111 1111", "4111-1111-1111-1111", "4111111111111111"] {
            let cleaned = clean_document(&format!("card {s} on file"));
            assert!(!cleaned.contains("1111"), "leaked digits in: {}", cleaned);
        }
    }

    #[test]
    fn test_secret_token_redacted() {
        let cleaned = clean_document("deploy with SECRET: hunter2 tonight");
        assert!(!cleaned.contains("hunter2"));
    }

    #[test]
    fn test_plain_prose_untouched() {
        let body = "The quarterly report covers revenue and churn.";
        assert_eq!(clean_document(body), body);
    }
}
