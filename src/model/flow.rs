//! Money-flow record between two actors.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActorId, FlowId};
use crate::{Error, Result};

/// Category of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Trade,
    Investment,
    Aid,
    Remittance,
    Salary,
    Tax,
    Dividend,
    Loan,
    Payment,
    Transfer,
}

impl FlowType {
    pub const ALL: [FlowType; 10] = [
        FlowType::Trade,
        FlowType::Investment,
        FlowType::Aid,
        FlowType::Remittance,
        FlowType::Salary,
        FlowType::Tax,
        FlowType::Dividend,
        FlowType::Loan,
        FlowType::Payment,
        FlowType::Transfer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FlowType::Trade => "trade",
            FlowType::Investment => "investment",
            FlowType::Aid => "aid",
            FlowType::Remittance => "remittance",
            FlowType::Salary => "salary",
            FlowType::Tax => "tax",
            FlowType::Dividend => "dividend",
            FlowType::Loan => "loan",
            FlowType::Payment => "payment",
            FlowType::Transfer => "transfer",
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        FlowType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| Error::InvalidInput(format!("unknown flow type '{s}'")))
    }
}

/// An immutable flow of money from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub id: FlowId,
    pub source: ActorId,
    pub target: ActorId,
    pub amount: f64,
    pub flow_type: FlowType,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    /// Provenance reference (document, feed, filing).
    pub source_ref: Option<String>,
    /// Confidence weight in `[0, 1]`.
    pub confidence: f64,
}

impl FlowRecord {
    pub fn new(
        id: impl Into<FlowId>,
        source: impl Into<ActorId>,
        target: impl Into<ActorId>,
        amount: f64,
        flow_type: FlowType,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            amount,
            flow_type,
            timestamp: Utc::now(),
            description: String::new(),
            source_ref: None,
            confidence: 1.0,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_source_ref(mut self, source_ref: impl Into<String>) -> Self {
        self.source_ref = Some(source_ref.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = super::psi::unit(confidence);
        self
    }

    /// Ingestion check: amounts must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(Error::InvalidInput(format!(
                "flow {} has invalid amount {}",
                self.id, self.amount
            )));
        }
        if self.source.as_str().is_empty() || self.target.as_str().is_empty() {
            return Err(Error::InvalidInput(format!("flow {} has an empty endpoint", self.id)));
        }
        Ok(())
    }

    /// The endpoint opposite to `node`, if `node` is one of them.
    pub fn counterpart(&self, node: &str) -> Option<&ActorId> {
        if self.source.as_str() == node {
            Some(&self.target)
        } else if self.target.as_str() == node {
            Some(&self.source)
        } else {
            None
        }
    }

    pub fn touches(&self, node: &str) -> bool {
        self.source.as_str() == node || self.target.as_str() == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_type_parse() {
        assert_eq!("Trade".parse::<FlowType>().unwrap(), FlowType::Trade);
        assert_eq!(" remittance ".parse::<FlowType>().unwrap(), FlowType::Remittance);
        assert!("barter".parse::<FlowType>().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        let ok = FlowRecord::new("f1", "a", "b", 0.0, FlowType::Payment);
        assert!(ok.validate().is_ok());

        let neg = FlowRecord::new("f2", "a", "b", -5.0, FlowType::Payment);
        assert!(matches!(neg.validate(), Err(Error::InvalidInput(_))));

        let nan = FlowRecord::new("f3", "a", "b", f64::NAN, FlowType::Payment);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_counterpart() {
        let f = FlowRecord::new("f1", "a", "b", 10.0, FlowType::Trade);
        assert_eq!(f.counterpart("a").map(|id| id.as_str()), Some("b"));
        assert_eq!(f.counterpart("b").map(|id| id.as_str()), Some("a"));
        assert!(f.counterpart("c").is_none());
    }

    #[test]
    fn test_confidence_clamped() {
        let f = FlowRecord::new("f1", "a", "b", 1.0, FlowType::Aid).with_confidence(3.0);
        assert_eq!(f.confidence, 1.0);
    }
}
