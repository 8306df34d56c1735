//! Concrete [`ClientWrapper`](crate::client_wrapper::ClientWrapper) implementations.
//!
//! Each submodule offers a client that speaks to a particular backend while conforming to
//! the uniform EssayForge contract.

pub mod common;
pub mod http_pool;

pub mod claude;
pub mod offline;
