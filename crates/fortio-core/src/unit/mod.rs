//! Unit table and connection lifecycle (OPEN, CLOSE, INQUIRE, BACKSPACE,
//! REWIND, ENDFILE).
//!
//! Each operation either succeeds or yields a fixed [`IoStat`]; settling a
//! status against the statement's handlers is the caller's business.

pub mod inquire;
pub mod params;

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::RuntimeConfig;
use crate::device::store::{FileStore, RecordLayout};
use crate::device::{Access, Connection, Device, Form};
use crate::iostat::IoStat;
pub use inquire::InquireReport;
pub use params::{CloseStatus, OpenParams, OpenStatus};

/// Name of the file a unit connects to when OPEN gives none.
#[must_use]
pub fn default_file_name(unit: i32) -> PathBuf {
    PathBuf::from(format!("fort.{unit}"))
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn layout_for(access: Access, form: Form, recl: Option<usize>) -> RecordLayout {
    match (access, form, recl) {
        (Access::Direct, Form::Formatted, Some(recl)) => RecordLayout::FixedText { recl },
        (Access::Direct, Form::Unformatted, Some(recl)) => RecordLayout::Fixed { recl },
        (_, Form::Formatted, _) => RecordLayout::Text,
        (_, Form::Unformatted, _) => RecordLayout::Framed,
    }
}

/// Connected units by number.
#[derive(Debug, Default)]
pub struct UnitTable {
    units: BTreeMap<i32, Device>,
    config: RuntimeConfig,
}

impl UnitTable {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            units: BTreeMap::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn is_connected(&self, unit: i32) -> bool {
        self.units.contains_key(&unit)
    }

    /// Connected unit numbers in ascending order.
    pub fn units(&self) -> impl Iterator<Item = i32> + '_ {
        self.units.keys().copied()
    }

    #[must_use]
    pub fn device(&self, unit: i32) -> Option<&Device> {
        self.units.get(&unit)
    }

    pub fn device_mut(&mut self, unit: i32) -> Option<&mut Device> {
        self.units.get_mut(&unit)
    }

    /// The unit's device, connecting it with default specifiers first if
    /// needed.
    pub fn connect_default(&mut self, unit: i32) -> Result<&mut Device, IoStat> {
        if !self.units.contains_key(&unit) {
            debug!(unit, "implicit open");
            self.open(unit, &OpenParams::default())?;
        }
        self.units.get_mut(&unit).ok_or(IoStat::CannotOpen)
    }

    pub fn open(&mut self, unit: i32, params: &OpenParams) -> Result<(), IoStat> {
        let blank = params::parse_blank(params.blank.as_deref())?;

        if let Some(device) = self.units.get_mut(&unit) {
            let same = match (&params.file, device.path()) {
                (None, _) => true,
                (Some(wanted), Some(current)) => same_file(wanted, current),
                (Some(_), None) => false,
            };
            if same {
                device.set_blank(blank);
                debug!(unit, blank = blank.as_str(), "reopen on same file");
                return Ok(());
            }
            self.disconnect(unit, None);
        }

        let status = OpenStatus::parse(params.status.as_deref())?;
        if status == OpenStatus::Scratch && params.file.is_some() {
            return Err(IoStat::FilenameSpecified);
        }
        let access = params::parse_access(params.access.as_deref())?;
        let form = params::parse_form(params.form.as_deref(), access)?;
        let recl = match access {
            Access::Direct => match params.recl {
                Some(n) if n > 0 => Some(usize::try_from(n).map_err(|_| IoStat::CannotOpen)?),
                _ => return Err(IoStat::CannotOpen),
            },
            Access::Sequential => None,
        };

        let (file, path, is_new) = if status == OpenStatus::Scratch {
            let (file, path) = tempfile::Builder::new()
                .prefix("fortio-")
                .suffix(".scratch")
                .tempfile_in(&self.config.scratch_dir)
                .and_then(|f| f.keep().map_err(|e| e.error))
                .map_err(|_| IoStat::CannotOpen)?;
            (file, path, true)
        } else {
            let path = params.file.clone().unwrap_or_else(|| default_file_name(unit));
            let (file, is_new) = open_named(&path, status)?;
            (file, path, is_new)
        };

        let conn = Connection {
            unit,
            path: Some(path),
            access,
            form,
            blank,
            scratch: status == OpenStatus::Scratch,
            is_new,
            recl,
            carriage_control: form == Form::Formatted
                && params.carriage_control.unwrap_or(self.config.carriage_control),
        };
        debug!(
            unit,
            path = ?conn.path,
            access = access.as_str(),
            form = form.as_str(),
            recl = ?recl,
            "unit connected"
        );
        let store = FileStore::new(file, layout_for(access, form, recl));
        self.units.insert(unit, Device::new(conn, Box::new(store)));
        Ok(())
    }

    pub fn close(&mut self, unit: i32, status: Option<&str>) -> Result<(), IoStat> {
        if !self.units.contains_key(&unit) {
            return Ok(());
        }
        let explicit = CloseStatus::parse(status)?;
        self.disconnect(unit, explicit);
        Ok(())
    }

    /// Release a unit, deleting its file when the disposition says so.
    fn disconnect(&mut self, unit: i32, explicit: Option<CloseStatus>) {
        let Some(device) = self.units.remove(&unit) else {
            return;
        };
        let conn = device.disconnect();
        let disposition = CloseStatus::resolve(explicit, conn.scratch);
        if let (CloseStatus::Delete, Some(path)) = (disposition, conn.path.as_deref()) {
            if let Err(err) = std::fs::remove_file(path) {
                warn!(unit, path = %path.display(), error = %err, "could not delete file on close");
            }
        }
        debug!(unit, ?disposition, "unit closed");
    }

    pub fn backspace(&mut self, unit: i32) -> Result<(), IoStat> {
        match self.units.get_mut(&unit) {
            Some(device) => device.backspace(),
            None => Ok(()),
        }
    }

    pub fn rewind(&mut self, unit: i32) -> Result<(), IoStat> {
        if let Some(device) = self.units.get_mut(&unit) {
            device.rewind();
        }
        Ok(())
    }

    pub fn endfile(&mut self, unit: i32) -> Result<(), IoStat> {
        self.connect_default(unit)
            .map_err(|_| IoStat::EndfileError)?
            .truncate()
    }

    #[must_use]
    pub fn inquire_unit(&self, unit: i32) -> InquireReport {
        match self.units.get(&unit) {
            Some(device) => InquireReport::connected(device),
            None => InquireReport::unconnected(unit >= 0, None),
        }
    }

    #[must_use]
    pub fn inquire_file(&self, path: &Path) -> InquireReport {
        let connected = self
            .units
            .values()
            .find(|d| d.path().is_some_and(|p| same_file(p, path)));
        match connected {
            Some(device) => InquireReport::connected(device),
            None => InquireReport::unconnected(path.exists(), Some(path)),
        }
    }

    /// Close every unit with its default disposition.
    pub fn close_all(&mut self) {
        let units: Vec<i32> = self.units.keys().copied().collect();
        for unit in units {
            self.disconnect(unit, None);
        }
    }
}

/// Open a named file per `status`; reports whether it was created.
fn open_named(path: &Path, status: OpenStatus) -> Result<(File, bool), IoStat> {
    let exists = path.exists();
    let mut options = OpenOptions::new();
    options.read(true).write(true);
    match status {
        OpenStatus::Old if !exists => return Err(IoStat::FileNotFound),
        OpenStatus::New if exists => return Err(IoStat::FileAlreadyExists),
        OpenStatus::New => {
            options.create_new(true);
        }
        OpenStatus::Replace => {
            options.create(true).truncate(true);
        }
        OpenStatus::Unknown | OpenStatus::Scratch => {
            options.create(true);
        }
        OpenStatus::Old => {}
    }
    let file = options.open(path).map_err(|_| IoStat::CannotOpen)?;
    Ok((file, !exists))
}
