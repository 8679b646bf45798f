//! Testing utilities for Foxweb applications.
//!
//! [`TestClient`] drives a built dispatcher entirely in memory, through the
//! same sink contract the real transport uses, so tests exercise the full
//! per-request state machine without opening a socket.

mod test_client;

pub use test_client::{TestClient, TestResponse};
