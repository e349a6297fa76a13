//! Status codes, runtime faults, and handler-driven settlement.
//!
//! Every statement ends in one of three ways: it completes, it reports a
//! status code the caller asked to see, or it raises a fault that ends the
//! enclosing operation. Which of the last two a status becomes depends on
//! the handlers the caller declared (`IOSTAT=`, `ERR=`, `END=`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::ValueKind;

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// Processor-defined IOSTAT values. `0` (success) has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoStat {
    EndOfFile,
    FileNotFound,
    FileAlreadyExists,
    FilenameSpecified,
    IllegalStatus,
    CannotOpen,
    EndfileError,
    BackspaceError,
    IllegalAccess,
    IllegalForm,
    IllegalBlank,
    WriteError,
    ReadError,
}

impl IoStat {
    /// Integer value stored into the caller's status variable.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::EndOfFile => -1,
            Self::FileNotFound => 1,
            Self::FileAlreadyExists => 2,
            Self::FilenameSpecified => 3,
            Self::IllegalStatus => 5,
            Self::CannotOpen => 6,
            Self::EndfileError => 8,
            Self::BackspaceError => 9,
            Self::IllegalAccess => 10,
            Self::IllegalForm => 11,
            Self::IllegalBlank => 12,
            Self::WriteError => 13,
            Self::ReadError => 14,
        }
    }

    /// Inverse of [`IoStat::code`]. Returns `None` for `0` and unknown codes.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -1 => Self::EndOfFile,
            1 => Self::FileNotFound,
            2 => Self::FileAlreadyExists,
            3 => Self::FilenameSpecified,
            5 => Self::IllegalStatus,
            6 => Self::CannotOpen,
            8 => Self::EndfileError,
            9 => Self::BackspaceError,
            10 => Self::IllegalAccess,
            11 => Self::IllegalForm,
            12 => Self::IllegalBlank,
            13 => Self::WriteError,
            14 => Self::ReadError,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn is_end_of_file(self) -> bool {
        matches!(self, Self::EndOfFile)
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::EndOfFile => "end of file",
            Self::FileNotFound => "file not found",
            Self::FileAlreadyExists => "file already exists",
            Self::FilenameSpecified => "filename specified for scratch file",
            Self::IllegalStatus => "illegal STATUS specifier",
            Self::CannotOpen => "cannot open file",
            Self::EndfileError => "endfile or positioning error",
            Self::BackspaceError => "backspace on non-sequential unit",
            Self::IllegalAccess => "illegal ACCESS specifier",
            Self::IllegalForm => "illegal FORM specifier",
            Self::IllegalBlank => "illegal BLANK specifier",
            Self::WriteError => "write error",
            Self::ReadError => "read error",
        }
    }
}

impl std::fmt::Display for IoStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (iostat={})", self.message(), self.code())
    }
}

// ---------------------------------------------------------------------------
// Runtime faults
// ---------------------------------------------------------------------------

/// Static program errors in a format or an I/O list. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("{letter} edit descriptor cannot transfer a {kind} item")]
    Mismatch { letter: char, kind: ValueKind },
    #[error("second repeat specifier in one list item")]
    RepeatedRepeatCount,
    #[error("invalid repeat count `{0}`")]
    BadRepeatCount(String),
    #[error("format has no data edit descriptor for the remaining items")]
    NoDataDescriptor,
    #[error("malformed format at column {column}: {reason}")]
    Malformed { column: usize, reason: String },
}

/// Outcome that terminates the enclosing operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("unit {unit}: end of file and no END= or IOSTAT= handler")]
    EndOfFile { unit: i32 },
    #[error("unit {unit}: {status} and no ERR= or IOSTAT= handler")]
    Unhandled { unit: i32, status: IoStat },
    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

/// Anything that interrupts a statement before settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    Status(IoStat),
    Fatal(Fault),
}

impl From<IoStat> for Interrupt {
    fn from(stat: IoStat) -> Self {
        Self::Status(stat)
    }
}

impl From<FormatError> for Interrupt {
    fn from(err: FormatError) -> Self {
        Self::Fatal(Fault::Format(err))
    }
}

impl From<Fault> for Interrupt {
    fn from(fault: Fault) -> Self {
        Self::Fatal(fault)
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Non-fatal result of a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    Done(T),
    Status(IoStat),
}

impl<T> Completion<T> {
    /// The value if the statement completed.
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(v) => Some(v),
            Self::Status(_) => None,
        }
    }

    /// What the caller's IOSTAT variable receives.
    pub fn iostat(&self) -> i32 {
        match self {
            Self::Done(_) => 0,
            Self::Status(stat) => stat.code(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
        match self {
            Self::Done(v) => Completion::Done(f(v)),
            Self::Status(stat) => Completion::Status(stat),
        }
    }
}

/// Handlers a statement declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Handlers {
    /// `IOSTAT=` present: every status is returned.
    pub iostat: bool,
    /// `ERR=` present: error statuses are returned.
    pub err: bool,
    /// `END=` present: end of file is returned.
    pub end: bool,
}

impl Handlers {
    /// No handlers: every status is fatal.
    pub const NONE: Self = Self {
        iostat: false,
        err: false,
        end: false,
    };

    /// `IOSTAT=` only.
    pub const IOSTAT: Self = Self {
        iostat: true,
        err: false,
        end: false,
    };

    /// Decide whether a status is reported or promoted to a fault.
    pub fn settle<T, E>(&self, unit: i32, result: Result<T, E>) -> Result<Completion<T>, Fault>
    where
        E: Into<Interrupt>,
    {
        match result.map_err(Into::into) {
            Ok(v) => Ok(Completion::Done(v)),
            Err(Interrupt::Fatal(fault)) => Err(fault),
            Err(Interrupt::Status(stat)) => {
                if self.iostat {
                    return Ok(Completion::Status(stat));
                }
                if stat.is_end_of_file() {
                    if self.end {
                        Ok(Completion::Status(stat))
                    } else {
                        Err(Fault::EndOfFile { unit })
                    }
                } else if self.err {
                    Ok(Completion::Status(stat))
                } else {
                    Err(Fault::Unhandled { unit, status: stat })
                }
            }
        }
    }
}
