//! The table command language: a line-oriented parser, a name → [`crate::Tree`]
//! registry, and a REPL loop built only on the public [`crate::Tree`] API.

mod parser;
mod registry;
mod repl;

pub use parser::{Command, ParseError};
pub use registry::Registry;
pub use repl::run;
