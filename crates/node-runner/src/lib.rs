//! node process runner for the JavaScript tools template-check drives.
//!
//! The interface generator, the transpiler and the checker are all node
//! packages. Each adapter embeds a small helper script; this crate caches the
//! script on disk and runs it once per request, exchanging a single JSON line
//! in each direction.

mod runner;

pub use runner::{NodeError, NodeRunner, NodeScript};
