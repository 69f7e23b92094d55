//! Parameter-specific SQL handlers.
//!
//! Each handler knows how to generate SQL conditions for its parameter type.

mod date;
mod reference;
mod string;
mod token;

pub use date::{DateHandler, format_timestamp};
pub use reference::ReferenceHandler;
pub use string::StringHandler;
pub use token::TokenHandler;
