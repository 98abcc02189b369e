//! tunegrab: a Telegram bot that searches YouTube by text query and
//! delivers the chosen item as audio or video, via yt-dlp.

/// Telegram-facing handlers, sessions, pagination, and delivery
pub mod bot;
/// Settings and operational constants
pub mod config;
/// Keep-alive HTTP server and self-ping
pub mod keep_alive;
/// Media provider boundary and the yt-dlp implementation
pub mod provider;
/// Shared text/retry helpers
pub mod utils;
