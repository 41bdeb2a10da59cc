//! Application Layer - Relay coordination and port definitions.
//!
//! This layer owns the relay broker that coordinates the domain state, and
//! the channel contracts the infrastructure adapters plug into.

/// Channel contracts between the relay and the upstream feed connector.
pub mod ports;

/// Relay broker, subscriber registry, and downstream wire messages.
pub mod relay;
