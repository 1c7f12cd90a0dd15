//! Application layer orchestrating the domain over the storage and
//! collaborator ports.
//!
//! Each engine owns references to the ports it needs; all shared state lives
//! behind the stores, so engines are cheap to clone across request flows.

pub mod cart;
pub mod orders;
pub mod payments;
