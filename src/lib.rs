//! Task list library.
//!
//! A SQLite-backed task store with live filtered/sorted queries, durable
//! sort and filter preferences, and the controllers that turn list and
//! add/edit actions into store mutations and one-shot events.

pub mod cli;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod events;
pub mod format;
pub mod logging;
pub mod preferences;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod watcher;
