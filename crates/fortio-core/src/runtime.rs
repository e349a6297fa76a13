//! Program-level I/O context.
//!
//! [`Runtime`] owns the unit table for the life of a program and closes
//! every unit still connected when it is dropped. Each method runs one
//! statement with the table locked, then settles the outcome against the
//! statement's handlers.

use std::path::Path;

use parking_lot::Mutex;

use crate::codec::{StandardCodec, ValueCodec};
use crate::config::{RuntimeConfig, runtime_config};
use crate::engine::{ReadEngine, StatementOptions, WriteEngine};
use crate::format::{DirectiveStream, FormatProgram};
use crate::iostat::{Completion, Fault, Handlers};
use crate::unit::{InquireReport, OpenParams, UnitTable};

#[derive(Debug)]
pub struct Runtime {
    table: Mutex<UnitTable>,
    codec: StandardCodec,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(runtime_config().clone())
    }
}

impl Runtime {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            table: Mutex::new(UnitTable::new(config)),
            codec: StandardCodec,
        }
    }

    /// Options for a statement on this runtime: configured separators and
    /// the given handlers.
    #[must_use]
    pub fn statement(&self, handlers: Handlers) -> StatementOptions {
        StatementOptions::from_config(self.table.lock().config()).with_handlers(handlers)
    }

    pub fn open(&self, unit: i32, params: &OpenParams, handlers: Handlers) -> Result<Completion<()>, Fault> {
        handlers.settle(unit, self.table.lock().open(unit, params))
    }

    pub fn close(&self, unit: i32, status: Option<&str>, handlers: Handlers) -> Result<Completion<()>, Fault> {
        handlers.settle(unit, self.table.lock().close(unit, status))
    }

    pub fn backspace(&self, unit: i32, handlers: Handlers) -> Result<Completion<()>, Fault> {
        handlers.settle(unit, self.table.lock().backspace(unit))
    }

    pub fn rewind(&self, unit: i32, handlers: Handlers) -> Result<Completion<()>, Fault> {
        handlers.settle(unit, self.table.lock().rewind(unit))
    }

    pub fn endfile(&self, unit: i32, handlers: Handlers) -> Result<Completion<()>, Fault> {
        handlers.settle(unit, self.table.lock().endfile(unit))
    }

    #[must_use]
    pub fn inquire_unit(&self, unit: i32) -> InquireReport {
        self.table.lock().inquire_unit(unit)
    }

    #[must_use]
    pub fn inquire_file(&self, path: &Path) -> InquireReport {
        self.table.lock().inquire_file(path)
    }

    /// Run one READ statement on `unit`, connecting it first if needed.
    /// The record position is advanced past the statement when `body`
    /// returns.
    pub fn read<R>(
        &self,
        unit: i32,
        format: Option<&FormatProgram>,
        options: StatementOptions,
        body: impl FnOnce(&mut ReadEngine<'_>) -> R,
    ) -> Result<Completion<R>, Fault> {
        let mut table = self.table.lock();
        let device = match options.handlers.settle(unit, table.connect_default(unit))? {
            Completion::Done(device) => device,
            Completion::Status(stat) => return Ok(Completion::Status(stat)),
        };
        let mut cursor = format.map(FormatProgram::cursor);
        let stream = cursor.as_mut().map(|c| c as &mut dyn DirectiveStream);
        let mut engine = ReadEngine::new(device, stream, &self.codec as &dyn ValueCodec, options);
        let out = body(&mut engine);
        engine.end_record();
        Ok(Completion::Done(out))
    }

    /// Run one WRITE statement on `unit`; the statement's last record is
    /// flushed when `body` returns.
    pub fn write<R>(
        &self,
        unit: i32,
        format: Option<&FormatProgram>,
        options: StatementOptions,
        body: impl FnOnce(&mut WriteEngine<'_>) -> R,
    ) -> Result<Completion<R>, Fault> {
        let mut table = self.table.lock();
        let device = match options.handlers.settle(unit, table.connect_default(unit))? {
            Completion::Done(device) => device,
            Completion::Status(stat) => return Ok(Completion::Status(stat)),
        };
        let mut cursor = format.map(FormatProgram::cursor);
        let stream = cursor.as_mut().map(|c| c as &mut dyn DirectiveStream);
        let mut engine = WriteEngine::new(device, stream, &self.codec as &dyn ValueCodec, options);
        let out = body(&mut engine);
        Ok(engine.end_record()?.map(|_| out))
    }

    /// Close every connected unit now.
    pub fn shutdown(&self) {
        self.table.lock().close_all();
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.table.get_mut().close_all();
    }
}
