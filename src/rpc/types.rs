/// Ledger RPC value types
use std::fmt;

/// Commitment reached by a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(Commitment::Processed),
            "confirmed" => Some(Commitment::Confirmed),
            "finalized" => Some(Commitment::Finalized),
            _ => None,
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of getSignatureStatuses
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureStatus {
    pub commitment: Option<Commitment>,
    /// On-chain execution error, serialized as JSON
    pub err: Option<String>,
}

impl SignatureStatus {
    pub fn reached(&self, target: Commitment) -> bool {
        self.commitment.map(|c| c >= target).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_order() {
        let status = SignatureStatus {
            commitment: Some(Commitment::Finalized),
            err: None,
        };
        assert!(status.reached(Commitment::Confirmed));

        let status = SignatureStatus {
            commitment: Some(Commitment::Processed),
            err: None,
        };
        assert!(!status.reached(Commitment::Confirmed));
        assert_eq!(Commitment::parse("confirmed"), Some(Commitment::Confirmed));
    }
}
