//! Posting policy
//!
//! Company-independent knobs of the posting engine. Loaded from
//! configuration by the job runner; [`PostingPolicy::default`] matches the
//! values the system has always used.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Posting engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingPolicy {
    /// Share of sale revenue booked as cost of goods when a product has no
    /// cost price. An estimate, used only as a fallback.
    pub estimated_cogs_ratio: Decimal,
    /// Prefix of journal numbers
    pub journal_prefix: String,
    /// Zero-padded width of the numeric part of journal numbers
    pub journal_number_width: usize,
}

impl Default for PostingPolicy {
    fn default() -> Self {
        Self {
            estimated_cogs_ratio: dec!(0.6),
            journal_prefix: "JE".to_string(),
            journal_number_width: 6,
        }
    }
}

impl PostingPolicy {
    /// Sets the fallback cost-of-goods ratio
    pub fn with_estimated_cogs_ratio(mut self, ratio: Decimal) -> Self {
        self.estimated_cogs_ratio = ratio;
        self
    }

    /// Formats a sequence value as a journal number
    ///
    /// ```
    /// use domain_ledger::PostingPolicy;
    ///
    /// assert_eq!(PostingPolicy::default().format_journal_number(42), "JE-000042");
    /// ```
    pub fn format_journal_number(&self, sequence: u64) -> String {
        format!(
            "{}-{:0width$}",
            self.journal_prefix,
            sequence,
            width = self.journal_number_width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_wider_than_padding_are_kept() {
        assert_eq!(PostingPolicy::default().format_journal_number(1_234_567), "JE-1234567");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let policy: PostingPolicy = serde_json::from_str(r#"{"journal_prefix":"GL"}"#).unwrap();
        assert_eq!(policy.journal_prefix, "GL");
        assert_eq!(policy.estimated_cogs_ratio, dec!(0.6));
        assert_eq!(policy.format_journal_number(7), "GL-000007");
    }
}
