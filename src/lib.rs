//! Mail relay — a JSON-over-HTTP front for sending one email through SMTP.

pub mod config;
pub mod error;
pub mod mail;
pub mod relay;
