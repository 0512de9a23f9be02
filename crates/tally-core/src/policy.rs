//! # Ledger Policy
//!
//! How strictly the ledger guards stock and credit balances.
//!
//! The policy is an explicit record handed to every ledger operation. It is
//! loaded once from configuration and never mutated while the store runs.
//!
//! ```text
//!                   ┌──────────── strict ────────────┐ ┌─────── permissive ───────┐
//! stock floor       │ sale fails with                 │ │ stock may go below zero  │
//!                   │ ConsistencyViolation            │ │ (oversell recorded)      │
//!                   ├─────────────────────────────────┤ ├──────────────────────────┤
//! overpayment       │ payment > remaining fails with  │ │ remaining may go below   │
//!                   │ ConsistencyViolation            │ │ zero                     │
//!                   └─────────────────────────────────┘ └──────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

/// Whether a balance is allowed to cross zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum FloorPolicy {
    /// Reject the whole operation before commit.
    Strict,
    /// Let the balance go negative.
    Permissive,
}

impl FloorPolicy {
    #[inline]
    pub const fn is_strict(&self) -> bool {
        matches!(self, FloorPolicy::Strict)
    }
}

impl Default for FloorPolicy {
    fn default() -> Self {
        FloorPolicy::Strict
    }
}

impl fmt::Display for FloorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloorPolicy::Strict => f.write_str("strict"),
            FloorPolicy::Permissive => f.write_str("permissive"),
        }
    }
}

impl FromStr for FloorPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(FloorPolicy::Strict),
            "permissive" => Ok(FloorPolicy::Permissive),
            _ => Err(ValidationError::NotAllowed {
                field: "policy".to_string(),
                allowed: vec!["strict".to_string(), "permissive".to_string()],
            }),
        }
    }
}

/// Guards applied by sale and payment transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerPolicy {
    /// Applies to stock decrements made by sales.
    pub stock_floor: FloorPolicy,
    /// Applies to credit payments against a sale's remaining balance.
    pub overpayment: FloorPolicy,
    /// When false, every cart line must carry the product's current sell price.
    pub allow_price_override: bool,
}

impl LedgerPolicy {
    /// Both floors enforced, no price overrides. Same as `default()`.
    pub const fn strict() -> Self {
        LedgerPolicy {
            stock_floor: FloorPolicy::Strict,
            overpayment: FloorPolicy::Strict,
            allow_price_override: false,
        }
    }

    /// Oversell and overpayment allowed, prices may be overridden.
    pub const fn permissive() -> Self {
        LedgerPolicy {
            stock_floor: FloorPolicy::Permissive,
            overpayment: FloorPolicy::Permissive,
            allow_price_override: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_strict() {
        let policy = LedgerPolicy::default();
        assert_eq!(policy, LedgerPolicy::strict());
        assert!(policy.stock_floor.is_strict());
        assert!(policy.overpayment.is_strict());
        assert!(!policy.allow_price_override);
    }

    #[test]
    fn test_floor_policy_parse() {
        assert_eq!("strict".parse::<FloorPolicy>().unwrap(), FloorPolicy::Strict);
        assert_eq!(
            " Permissive ".parse::<FloorPolicy>().unwrap(),
            FloorPolicy::Permissive
        );
        assert!("lenient".parse::<FloorPolicy>().is_err());
    }

    #[test]
    fn test_floor_policy_display_round_trips() {
        for policy in [FloorPolicy::Strict, FloorPolicy::Permissive] {
            assert_eq!(policy.to_string().parse::<FloorPolicy>().unwrap(), policy);
        }
    }
}
