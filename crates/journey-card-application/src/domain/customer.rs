//! Customer projection used when rendering actions.

use std::fmt;
use std::str::FromStr;

use journey_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Metadata key carrying the customer segment.
pub const SEGMENT_METADATA_KEY: &str = "segment";

/// Commercial segment of a customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Segment {
    NewCustomer,
    #[default]
    Regular,
    Vip,
}

impl Segment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewCustomer => "NEW_CUSTOMER",
            Self::Regular => "REGULAR",
            Self::Vip => "VIP",
        }
    }

    #[must_use]
    pub fn is_premium(self) -> bool {
        self == Self::Vip
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Segment {
    type Err = DomainError;

    /// Parses a segment name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW_CUSTOMER" => Ok(Self::NewCustomer),
            "REGULAR" => Ok(Self::Regular),
            "VIP" => Ok(Self::Vip),
            _ => Err(DomainError::Validation(format!("unknown segment: {s}"))),
        }
    }
}

/// Transient view of a customer, built per event from journey metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub customer_id: String,
    pub segment: Segment,
}

impl Customer {
    #[must_use]
    pub fn new(customer_id: impl Into<String>, segment: Segment) -> Self {
        Self {
            customer_id: customer_id.into(),
            segment,
        }
    }

    #[must_use]
    pub fn is_vip(&self) -> bool {
        self.segment.is_premium()
    }
}
