//! Request handlers for the two sockets.
//!
//! - [`trigger`]: admission attempts and their privileged outcomes
//! - [`control`]: rule table administration and diagnostics

pub mod control;
pub mod trigger;

pub use control::handle_line;
pub use trigger::deliver;
