//! # fortio-core
//!
//! Formatted and unformatted record I/O for a legacy language's file model:
//! READ/WRITE statement engines driven by format directives, and the unit
//! lifecycle (OPEN, CLOSE, INQUIRE, BACKSPACE, REWIND, ENDFILE).
//!
//! No `unsafe` code is permitted in this crate.

#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod device;
pub mod engine;
pub mod format;
pub mod iostat;
pub mod runtime;
pub mod unit;
pub mod value;

pub use codec::{CodecError, StandardCodec, ValueCodec};
pub use config::RuntimeConfig;
pub use device::{Access, BlankMode, Device, Form};
pub use engine::{ReadEngine, StatementOptions, Transfer, WriteEngine};
pub use format::{Directive, DirectiveStream, FormatProgram};
pub use iostat::{Completion, Fault, FormatError, Handlers, IoStat};
pub use runtime::Runtime;
pub use unit::{InquireReport, OpenParams, UnitTable};
pub use value::{Value, ValueKind};
