//! Infrastructure-backed brokers.
//!
//! The `Broker` abstraction lives in `stockroom-events` as pure mechanics.
//! This module provides networked implementations (Redis).

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBroker, RedisBrokerError};
