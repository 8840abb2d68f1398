/// Bartargasht Tour Bot Library
///
/// This library provides the core functionality for the tour sales Telegram bot:
/// the tour catalog and its search, reply formatting, the lead log, the
/// language-model fallback, configuration, handlers, and bot setup.

pub mod bot;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod format;
pub mod handlers;
pub mod http_server;
pub mod leads;
