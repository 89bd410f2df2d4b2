// Library root: re-exports all modules so integration tests and the binary
// can reach the crate's public API.

pub mod config;
pub mod report;
pub mod retry;
pub mod sheet;
pub mod sync;
pub mod transport;
