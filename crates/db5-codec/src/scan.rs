//! Sequential walk over a whole database stream.

use std::io::Read;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ReadConfig;
use crate::crack::CrackedObject;
use crate::error::{Db5Error, Db5Result};
use crate::header::{is_identity_header, Dli};
use crate::stream::crack_stream_with;

/// Reads objects one after another, tracking each one's file offset.
#[derive(Debug)]
pub struct ObjectReader<R> {
    inner: R,
    offset: u64,
    config: ReadConfig,
    ident_checked: bool,
    done: bool,
}

impl<R: Read> ObjectReader<R> {
    pub fn new(inner: R, config: ReadConfig) -> Self {
        Self {
            inner,
            offset: 0,
            config,
            ident_checked: false,
            done: false,
        }
    }

    /// Offset of the next object to be read.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Consume the identity header at the start of the stream.
    ///
    /// Called automatically by [`Self::read_next`] when the config requires
    /// an identity header.
    pub fn read_identity(&mut self) -> Db5Result<()> {
        let obj = match crack_stream_with(&mut self.inner, &self.config) {
            Err(Db5Error::Eof) => {
                return Err(Db5Error::malformed(0, "empty stream has no identity header"))
            }
            other => other?,
        };
        if !is_identity_header(obj.as_bytes()) {
            return Err(Db5Error::malformed(
                self.offset,
                "stream does not start with the database identity header",
            ));
        }
        self.offset += obj.object_len() as u64;
        self.ident_checked = true;
        Ok(())
    }

    /// Read the next object of any kind. `Ok(None)` at clean end of stream.
    pub fn read_next(&mut self) -> Db5Result<Option<(u64, CrackedObject)>> {
        if self.config.require_identity && !self.ident_checked {
            self.read_identity()?;
        }
        let offset = self.offset;
        match crack_stream_with(&mut self.inner, &self.config) {
            Ok(obj) => {
                self.offset += obj.object_len() as u64;
                Ok(Some((offset, obj)))
            }
            Err(Db5Error::Eof) => Ok(None),
            Err(e) => {
                warn!(offset, error = %e, "object read failed");
                Err(e)
            }
        }
    }

    /// Read the next application object, skipping header objects and,
    /// unless the config includes them, free storage.
    pub fn next_object(&mut self) -> Db5Result<Option<(u64, CrackedObject)>> {
        while let Some((offset, obj)) = self.read_next()? {
            if wanted(&self.config, &obj) {
                return Ok(Some((offset, obj)));
            }
            debug!(offset, dli = ?obj.header().dli, "skipping object");
        }
        Ok(None)
    }
}

impl<R: Read> Iterator for ObjectReader<R> {
    type Item = Db5Result<(u64, CrackedObject)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_object() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Totals gathered by [`scan`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Objects after the identity header, of every kind.
    pub objects: u64,
    pub application_objects: u64,
    pub header_objects: u64,
    pub free_objects: u64,
    pub free_bytes: u64,
    /// Bytes consumed, identity header included.
    pub total_bytes: u64,
}

impl ScanSummary {
    fn record(&mut self, obj: &CrackedObject) {
        self.objects += 1;
        match obj.header().dli {
            Dli::ApplicationData => self.application_objects += 1,
            Dli::HeaderObject => self.header_objects += 1,
            Dli::FreeStorage => {
                self.free_objects += 1;
                self.free_bytes += obj.object_len() as u64;
            }
        }
    }
}

/// Read every object in `reader`, counting all of them and passing the
/// ones [`ObjectReader::next_object`] would yield to `handler`.
///
/// Stops at the first read or handler error.
pub fn scan<R, F>(reader: R, config: ReadConfig, mut handler: F) -> Db5Result<ScanSummary>
where
    R: Read,
    F: FnMut(u64, &CrackedObject) -> Db5Result<()>,
{
    let mut objects = ObjectReader::new(reader, config);
    let mut summary = ScanSummary::default();
    while let Some((offset, obj)) = objects.read_next()? {
        summary.record(&obj);
        if wanted(&objects.config, &obj) {
            handler(offset, &obj)?;
        }
    }
    summary.total_bytes = objects.offset();
    debug!(
        objects = summary.objects,
        free = summary.free_objects,
        bytes = summary.total_bytes,
        "scan complete"
    );
    Ok(summary)
}

fn wanted(config: &ReadConfig, obj: &CrackedObject) -> bool {
    match obj.header().dli {
        Dli::ApplicationData => true,
        Dli::HeaderObject => false,
        Dli::FreeStorage => config.include_free,
    }
}
