//! The text format of libraries and expressions.

mod command;
pub mod error;
mod formatter;

pub use command::*;
pub use formatter::*;
