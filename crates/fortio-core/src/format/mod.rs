//! Format directives: shapes, the stream contract, and the literal parser.

pub mod directive;
pub mod parser;

pub use directive::{Directive, DirectiveStream, EditLetter, FieldSpec, Move};
pub use parser::{FormatCursor, FormatProgram};
