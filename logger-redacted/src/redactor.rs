use base64::{engine::general_purpose, Engine as _};
use regex::Regex;
use sha2::{Digest, Sha256};

#[allow(clippy::unwrap_used)]
mod patterns {
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        pub static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
        pub static ref PHONE_REGEX: Regex = Regex::new(r"\b(?:\+57[-.\s]?)?3\d{2}[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap();
        // Identity document written with its type prefix, e.g. "CC 1032456789" or "TI-99112233"
        pub static ref TYPED_DOCUMENT_REGEX: Regex = Regex::new(r"\b(CC|TI|RC|CE|PA|PE|PT|MS|AS|CN|CD|SC|DE)[-\s:]?(\d{4,15})\b").unwrap();
    }
}

/// Redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_documents: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_documents: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for free-text log messages (skip reasons, parser errors)
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// A redactor that returns its input untouched
    pub fn disabled() -> Self {
        Self::new(RedactionConfig {
            redact_emails: false,
            redact_phones: false,
            redact_documents: false,
            custom_patterns: Vec::new(),
        })
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_documents {
            result = patterns::TYPED_DOCUMENT_REGEX
                .replace_all(&result, |caps: &regex::Captures| {
                    let doc_type = caps.get(1).map_or("", |m| m.as_str());
                    let doc_number = caps.get(2).map_or("", |m| m.as_str());
                    redact_document(doc_type, doc_number)
                })
                .to_string();
        }

        if self.config.redact_emails {
            result = patterns::EMAIL_REGEX
                .replace_all(&result, |caps: &regex::Captures| {
                    format!("EMAIL[{}]", correlation_hash(caps.get(0).map_or("", |m| m.as_str())))
                })
                .to_string();
        }

        if self.config.redact_phones {
            result = patterns::PHONE_REGEX
                .replace_all(&result, |caps: &regex::Captures| {
                    format!("PHONE[{}]", correlation_hash(caps.get(0).map_or("", |m| m.as_str())))
                })
                .to_string();
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }
}

/// Stable token for a person document; equal documents give equal tokens so
/// log lines about the same person can still be correlated.
pub fn redact_document(doc_type: &str, doc_number: &str) -> String {
    format!(
        "DOC[{}]",
        correlation_hash(&format!("{}:{}", doc_type.trim(), doc_number.trim()))
    )
}

fn correlation_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    // First 6 bytes are plenty for correlation and keep lines short
    general_purpose::URL_SAFE_NO_PAD.encode(digest.get(..6).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_token_is_stable() {
        let first = redact_document("CC", "1032456789");
        let second = redact_document("CC", " 1032456789 ");
        let other = redact_document("TI", "1032456789");

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert!(first.starts_with("DOC["));
        assert!(!first.contains("1032456789"));
    }

    #[test]
    fn test_typed_document_redaction_in_text() {
        let redactor = PiiRedactor::default();

        let text = "person CC 1032456789 has no services";
        let redacted = redactor.redact(text);
        assert!(!redacted.contains("1032456789"));
        assert!(redacted.contains(&redact_document("CC", "1032456789")));
    }

    #[test]
    fn test_procedure_codes_are_not_redacted() {
        let redactor = PiiRedactor::default();

        let text = "procedure 890201 billed 45000";
        assert_eq!(redactor.redact(text), text);
    }

    #[test]
    fn test_phone_and_email_redaction() {
        let redactor = PiiRedactor::default();

        let redacted = redactor.redact("contact 310 555 1234 or auditor@example.com");
        assert!(redacted.contains("PHONE["));
        assert!(redacted.contains("EMAIL["));
        assert!(!redacted.contains("555"));
    }

    #[test]
    fn test_disabled_redactor_is_identity() {
        let redactor = PiiRedactor::disabled();
        let text = "CC 1032456789 auditor@example.com";
        assert_eq!(redactor.redact(text), text);
    }
}
