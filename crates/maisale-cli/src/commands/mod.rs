//! CLI command handlers

pub mod chat;
pub mod conversation;
pub mod history;
pub mod index;
pub mod send;
pub mod status;
pub mod stream;
