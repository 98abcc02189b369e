/// Typed callback payload codec
pub mod callbacks;
/// File delivery and cleanup guard
pub mod delivery;
/// Command and callback handlers
pub mod handlers;
/// Pure pagination/selection engine
pub mod pagination;
/// Retrying Telegram send/edit wrappers
pub mod resilient;
/// Per-user search sessions and their store
pub mod session;
/// Message texts and keyboards
pub mod views;
