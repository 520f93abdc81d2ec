//! # artifactrelay
//!
//! A pipeline stage that relays collected forensic artifacts to a remote
//! processing backend and republishes the derived output paths for the next
//! stage. Each input artifact is dispatched on its own pool worker, the
//! worker blocks until the backend reports a terminal state, and the
//! filtered results land in shared pipeline state.

pub mod aggregate;
pub mod backend;
pub mod cli;
pub mod config;
pub mod constants;
pub mod containers;
pub mod dispatch;
pub mod filter;
pub mod logging;
pub mod module;
pub mod pipeline;
pub mod registry;
pub mod reporting;
pub mod state;
pub mod util;
