//! Statement executors.
//!
//! An engine is built for one READ or WRITE statement, borrows the unit's
//! [`Device`](crate::device::Device) for that statement only, and is
//! dropped when the statement ends. Dropping an engine never closes the
//! unit.

pub mod line;
pub mod read;
pub mod write;

pub use line::LineBuffer;
pub use read::ReadEngine;
pub use write::WriteEngine;

use crate::codec::CodecError;
use crate::config::RuntimeConfig;
use crate::iostat::{Handlers, Interrupt, IoStat};

/// Per-statement control list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementOptions {
    pub handlers: Handlers,
    /// `REC=` for direct-access transfers.
    pub record: Option<usize>,
    /// Blank between list-directed output items.
    pub use_separators: bool,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            handlers: Handlers::NONE,
            record: None,
            use_separators: true,
        }
    }
}

impl StatementOptions {
    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            use_separators: config.list_separators,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_handlers(mut self, handlers: Handlers) -> Self {
        self.handlers = handlers;
        self
    }

    #[must_use]
    pub fn with_record(mut self, record: usize) -> Self {
        self.record = Some(record);
        self
    }
}

/// A value moved by one transfer call and the characters (or bytes) it
/// consumed. Values served from a repeat count consume nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer<T> {
    pub value: T,
    pub count: usize,
}

impl<T> Transfer<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Transfer<U> {
        Transfer {
            value: f(self.value),
            count: self.count,
        }
    }
}

/// Codec rejections are I/O statuses; descriptor mismatches stay fatal.
pub(crate) fn codec_interrupt(err: CodecError, status: IoStat) -> Interrupt {
    match err {
        CodecError::Invalid { .. } => Interrupt::Status(status),
        CodecError::Format(e) => e.into(),
    }
}
