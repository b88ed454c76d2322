use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where a failure happened, detailed enough for an operator to act on it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub batch_id: Option<String>,
    pub record_index: Option<usize>,
    pub causal_code: Option<String>,
    pub additional: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn with_record_index(mut self, record_index: usize) -> Self {
        self.record_index = Some(record_index);
        self
    }

    pub fn with_causal_code(mut self, causal_code: impl Into<String>) -> Self {
        self.causal_code = Some(causal_code.into());
        self
    }

    pub fn add_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(batch_id) = &self.batch_id {
            parts.push(format!("batch={batch_id}"));
        }
        if let Some(index) = self.record_index {
            parts.push(format!("record={index}"));
        }
        if let Some(code) = &self.causal_code {
            parts.push(format!("code={code}"));
        }
        for (key, value) in &self.additional {
            parts.push(format!("{key}={value}"));
        }
        write!(f, "[{}]", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_populated_fields_only() {
        let context = ErrorContext::new()
            .with_batch_id("INV-001")
            .with_record_index(3)
            .add_context("kind", "procedure");

        assert_eq!(context.to_string(), "[batch=INV-001 record=3 kind=procedure]");
        assert_eq!(ErrorContext::new().to_string(), "[]");
    }
}
