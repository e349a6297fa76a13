//! INQUIRE results.

use std::path::Path;

use serde::Serialize;

use crate::device::{Access, Device, Form};

const YES: &str = "YES";
const NO: &str = "NO";
const UNKNOWN: &str = "UNKNOWN";
const UNDEFINED: &str = "UNDEFINED";

/// Everything INQUIRE reports about a unit or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InquireReport {
    pub exists: bool,
    pub opened: bool,
    /// Connected unit number, `-1` when not connected.
    pub number: i32,
    pub named: bool,
    pub name: Option<String>,
    pub access: &'static str,
    pub sequential: &'static str,
    pub direct: &'static str,
    pub form: &'static str,
    pub formatted: &'static str,
    pub unformatted: &'static str,
    /// Direct access only.
    pub recl: Option<usize>,
    /// Direct access only.
    pub nextrec: Option<usize>,
    pub blank: &'static str,
}

fn yes_no(b: bool) -> &'static str {
    if b { YES } else { NO }
}

impl InquireReport {
    /// Report for something with no connection.
    #[must_use]
    pub fn unconnected(exists: bool, name: Option<&Path>) -> Self {
        Self {
            exists,
            opened: false,
            number: -1,
            named: name.is_some(),
            name: name.map(|p| p.display().to_string()),
            access: UNDEFINED,
            sequential: UNKNOWN,
            direct: UNKNOWN,
            form: UNDEFINED,
            formatted: UNKNOWN,
            unformatted: UNKNOWN,
            recl: None,
            nextrec: None,
            blank: UNDEFINED,
        }
    }

    #[must_use]
    pub fn connected(device: &Device) -> Self {
        let direct = device.access() == Access::Direct;
        let formatted = device.form() == Form::Formatted;
        Self {
            exists: device.path().is_none_or(Path::exists),
            opened: true,
            number: device.unit(),
            named: device.path().is_some() && !device.is_scratch(),
            name: device
                .path()
                .filter(|_| !device.is_scratch())
                .map(|p| p.display().to_string()),
            access: device.access().as_str(),
            sequential: yes_no(!direct),
            direct: yes_no(direct),
            form: device.form().as_str(),
            formatted: yes_no(formatted),
            unformatted: yes_no(!formatted),
            recl: if direct { device.recl() } else { None },
            nextrec: direct.then(|| device.record()),
            blank: if formatted {
                device.blank().as_str()
            } else {
                UNDEFINED
            },
        }
    }
}
