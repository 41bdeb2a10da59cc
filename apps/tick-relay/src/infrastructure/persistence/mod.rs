//! Persistence Adapters
//!
//! Store implementations of the ledger repository port.

pub mod in_memory;

pub use in_memory::InMemoryHoldingRepository;
