//! LINE Messaging API webhook bot.
//!
//! Verifies webhook deliveries, answers keyword-triggered text messages and
//! follow events, and records registered users in PostgreSQL.

pub mod api;
pub mod config;
pub mod error;
pub mod line;
pub mod responder;
pub mod store;
