//! rawr-sdk: IRC client and plugin host.
//!
//! [`client`] owns the connection, [`bot::Bot`] routes chat lines to
//! [`plugin::Plugin`]s and sends their replies back within the line budget.

pub mod bot;
pub mod client;
pub mod event;
pub mod irc;
pub mod output;
pub mod plugin;
