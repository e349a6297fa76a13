//! OPEN/CLOSE specifier parsing.
//!
//! Specifiers arrive as the caller wrote them; keywords are matched
//! case-insensitively with surrounding blanks ignored. An absent specifier
//! takes its default, an unrecognised one yields the matching status.

use std::path::PathBuf;

use serde::Deserialize;

use crate::device::{Access, BlankMode, Form};
use crate::iostat::IoStat;

/// Specifiers of one OPEN statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OpenParams {
    pub file: Option<PathBuf>,
    pub status: Option<String>,
    pub access: Option<String>,
    pub form: Option<String>,
    pub recl: Option<i64>,
    pub blank: Option<String>,
    /// Overrides the configured carriage-control default for this unit.
    pub carriage_control: Option<bool>,
}

impl OpenParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    #[must_use]
    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    #[must_use]
    pub fn access(mut self, access: &str) -> Self {
        self.access = Some(access.to_string());
        self
    }

    #[must_use]
    pub fn form(mut self, form: &str) -> Self {
        self.form = Some(form.to_string());
        self
    }

    #[must_use]
    pub fn recl(mut self, recl: i64) -> Self {
        self.recl = Some(recl);
        self
    }

    #[must_use]
    pub fn blank(mut self, blank: &str) -> Self {
        self.blank = Some(blank.to_string());
        self
    }

    #[must_use]
    pub fn carriage_control(mut self, on: bool) -> Self {
        self.carriage_control = Some(on);
        self
    }
}

fn keyword(s: &str) -> String {
    s.trim().to_ascii_uppercase()
}

/// `STATUS=` of OPEN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenStatus {
    /// The file must exist.
    Old,
    /// The file must not exist.
    New,
    /// `OLD` if the file exists, `NEW` otherwise.
    #[default]
    Unknown,
    /// Anonymous file removed on close.
    Scratch,
    /// Create, or truncate an existing file.
    Replace,
}

impl OpenStatus {
    pub fn parse(spec: Option<&str>) -> Result<Self, IoStat> {
        let Some(spec) = spec else {
            return Ok(Self::default());
        };
        match keyword(spec).as_str() {
            "OLD" => Ok(Self::Old),
            "NEW" => Ok(Self::New),
            "UNKNOWN" => Ok(Self::Unknown),
            "SCRATCH" => Ok(Self::Scratch),
            "REPLACE" => Ok(Self::Replace),
            _ => Err(IoStat::IllegalStatus),
        }
    }
}

pub fn parse_access(spec: Option<&str>) -> Result<Access, IoStat> {
    match spec.map(keyword).as_deref() {
        None | Some("SEQUENTIAL") => Ok(Access::Sequential),
        Some("DIRECT") => Ok(Access::Direct),
        Some(_) => Err(IoStat::IllegalAccess),
    }
}

/// Default form depends on the access mode.
pub fn parse_form(spec: Option<&str>, access: Access) -> Result<Form, IoStat> {
    match spec.map(keyword).as_deref() {
        None => Ok(match access {
            Access::Sequential => Form::Formatted,
            Access::Direct => Form::Unformatted,
        }),
        Some("FORMATTED") => Ok(Form::Formatted),
        Some("UNFORMATTED") => Ok(Form::Unformatted),
        Some(_) => Err(IoStat::IllegalForm),
    }
}

pub fn parse_blank(spec: Option<&str>) -> Result<BlankMode, IoStat> {
    match spec.map(keyword).as_deref() {
        None | Some("NULL") => Ok(BlankMode::Null),
        Some("ZERO") => Ok(BlankMode::Zero),
        Some(_) => Err(IoStat::IllegalBlank),
    }
}

/// `STATUS=` of CLOSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStatus {
    Keep,
    Delete,
}

impl CloseStatus {
    /// `None` when the specifier is absent (disposition by scratch flag).
    pub fn parse(spec: Option<&str>) -> Result<Option<Self>, IoStat> {
        match spec.map(keyword).as_deref() {
            None => Ok(None),
            Some("KEEP") => Ok(Some(Self::Keep)),
            Some("DELETE") => Ok(Some(Self::Delete)),
            Some(_) => Err(IoStat::IllegalStatus),
        }
    }

    /// Resolve the disposition of a unit.
    #[must_use]
    pub fn resolve(explicit: Option<Self>, scratch: bool) -> Self {
        explicit.unwrap_or(if scratch { Self::Delete } else { Self::Keep })
    }
}
