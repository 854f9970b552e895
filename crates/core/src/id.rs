//! Strongly-typed identifiers used across the domain.
//!
//! Allocation identifiers are business keys chosen by the caller (a SKU
//! printed on a box, a purchase reference, an order number), so they wrap
//! strings rather than generated UUIDs.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Stock-keeping unit: identifies a product.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Sku(String);

/// Reference of a purchased batch of stock.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BatchRef(String);

/// Identifier of a customer order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal, $prefix:literal) => {
        impl $t {
            /// Wrap a raw identifier. Use `FromStr` to validate untrusted input.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a short random identifier (`<prefix>-<hex>`).
            ///
            /// Handy for fixtures where the exact value does not matter.
            pub fn random() -> Self {
                let hex = Uuid::now_v7().simple().to_string();
                Self(format!("{}-{}", $prefix, &hex[hex.len() - 8..]))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        // Wire input goes through the same validation as `FromStr`.
        impl<'de> Deserialize<'de> for $t {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_string_newtype!(Sku, "Sku", "sku");
impl_string_newtype!(BatchRef, "BatchRef", "batch");
impl_string_newtype!(OrderId, "OrderId", "order");
