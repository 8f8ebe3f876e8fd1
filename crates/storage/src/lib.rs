//! JSON-file persistence for stbl-mcp.
//!
//! The [`Store`] keeps three record collections under the base directory
//! (default `~/.stbl-mcp`):
//!
//! - `contracts/deployed.json` — deployed-contract registry, plus one
//!   artifact file per contract under `contracts/artifacts/`
//! - `transactions/history.json` — transaction history, newest first,
//!   capped at [`MAX_TRANSACTIONS`]
//! - `addresses/known.json` — the address book
//!
//! Collections are loaded into memory on open and flushed to disk on every
//! mutation. Corrupted files degrade to empty collections with a warning
//! rather than failing open.

mod store;

pub use store::{CleanupOptions, CleanupReport, ExportData, MAX_TRANSACTIONS, Store, StoreCounts};
