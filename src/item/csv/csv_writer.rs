use std::{io::Write, path::Path, rc::Rc};

use log::debug;

use super::{
    csv_format::{CsvFormat, SharedFormat},
    handle::Sink,
    record::{HeaderKey, Headers, NamedRecord},
    tokenizer::RowTokenizer,
};
use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    error::{CsvError, Result},
};

pub use super::csv_reader::{WITH_HEADERS, WITHOUT_HEADERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Unbound,
    Bound,
    /// Header row (if any) written.
    Initialized,
}

/// Writes named records as CSV lines, in header order.
///
/// Every record must carry exactly the writer's column keys, in any order.
/// Without explicit headers the first record fixes positional keys
/// `0..n-1`. A row is either written whole or rejected; a rejected row
/// leaves the output untouched.
///
/// # Examples
///
/// ```
/// use csv_rw::item::csv::{
///     csv_format::CsvFormat,
///     csv_writer::{CsvItemWriter, WITH_HEADERS},
///     handle::Sink,
///     record::{Headers, NamedRecord},
/// };
///
/// let mut buffer = Vec::new();
/// {
///     let mut writer = CsvItemWriter::new(CsvFormat::standard().shared());
///     writer.assign(
///         Sink::new(&mut buffer),
///         WITH_HEADERS,
///         Some(Headers::from_iter(["id", "name"])),
///     );
///
///     let row: NamedRecord = [("name", "Alice"), ("id", "1")].into_iter().collect();
///     writer.write_row(&row).unwrap();
/// } // writer is dropped here, releasing the borrow
///
/// assert_eq!(String::from_utf8(buffer).unwrap(), "id,name\n1,Alice\n");
/// ```
pub struct CsvItemWriter<'a> {
    format: SharedFormat,
    sink: Option<Sink<'a>>,
    state: WriterState,
    with_headers: bool,
    headers: Option<Headers>,
    tokenizer: RowTokenizer,
    line_number: usize,
    poisoned: bool,
}

impl<'a> CsvItemWriter<'a> {
    pub fn new(format: SharedFormat) -> Self {
        CsvItemWriter {
            format,
            sink: None,
            state: WriterState::Unbound,
            with_headers: false,
            headers: None,
            tokenizer: RowTokenizer::new(),
            line_number: 0,
            poisoned: false,
        }
    }

    /// Creates (or truncates) the file at `path` and binds the writer to it.
    pub fn open<P: AsRef<Path>>(
        &mut self,
        path: P,
        with_headers: bool,
        headers: Option<Headers>,
    ) -> Result<&mut Self> {
        let sink = Sink::create(path.as_ref())?;
        debug!("Opened CSV file {} for writing", path.as_ref().display());
        Ok(self.assign(sink, with_headers, headers))
    }

    /// Binds the writer to an already opened sink such as stdout.
    pub fn assign(
        &mut self,
        sink: Sink<'a>,
        with_headers: bool,
        headers: Option<Headers>,
    ) -> &mut Self {
        debug!("Assigned CSV sink (with headers: {})", with_headers);
        self.sink = Some(sink);
        self.state = WriterState::Bound;
        self.with_headers = with_headers;
        self.headers = headers;
        self.line_number = 0;
        self.poisoned = false;
        self
    }

    /// Flushes and releases the bound sink.
    pub fn close(&mut self) -> Result<()> {
        let mut sink = self.unassign().ok_or(CsvError::UnboundSource)?;
        sink.flush()?;
        debug!("Closed CSV sink");
        Ok(())
    }

    /// Unbinds the writer and hands the sink back without flushing or
    /// closing it.
    pub fn unassign(&mut self) -> Option<Sink<'a>> {
        self.state = WriterState::Unbound;
        self.with_headers = false;
        self.headers = None;
        self.line_number = 0;
        self.poisoned = false;
        self.sink.take()
    }

    /// Writes one record, reordered to match the headers.
    pub fn write_row(&mut self, record: &NamedRecord) -> Result<()> {
        self.ensure_initialized()?;

        if record.is_empty() {
            return Err(CsvError::EmptyRow);
        }

        let headers = self
            .headers
            .get_or_insert_with(|| Headers::positional(record.len()));

        let unexpected: Vec<HeaderKey> = record
            .keys()
            .filter(|key| !headers.contains(key))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(CsvError::UnexpectedFields {
                fields: unexpected,
                expected: headers.as_slice().to_vec(),
            });
        }

        let mut fields = Vec::with_capacity(headers.len());
        let mut missing = Vec::new();
        for key in headers.iter() {
            match record.value_of(key) {
                Some(value) => fields.push(value),
                None => missing.push(key.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(CsvError::MissingFields { fields: missing });
        }

        self.write_fields(fields)
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    /// Sets the column keys. Takes effect for rows written afterwards; a
    /// header row already written is not rewritten.
    pub fn set_headers(&mut self, headers: Headers) -> &mut Self {
        self.headers = Some(headers);
        self
    }

    /// Number of lines written since binding, header row included.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn format(&self) -> SharedFormat {
        Rc::clone(&self.format)
    }

    pub fn set_format(&mut self, format: SharedFormat) -> &mut Self {
        self.format = format;
        self
    }

    pub fn sink(&self) -> Option<&Sink<'a>> {
        self.sink.as_ref()
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        match self.state {
            WriterState::Unbound => Err(CsvError::UnboundSource),
            WriterState::Initialized => Ok(()),
            WriterState::Bound => {
                self.line_number = 0;
                if self.with_headers {
                    let names: Vec<String> = match &self.headers {
                        Some(headers) if !headers.is_empty() => {
                            headers.iter().map(HeaderKey::to_string).collect()
                        }
                        _ => return Err(CsvError::MissingHeaderDefinition),
                    };
                    self.write_fields(names.iter().map(|name| Some(name.as_str())).collect())?;
                }
                self.state = WriterState::Initialized;
                debug!("CSV writer initialized with headers {:?}", self.headers);
                Ok(())
            }
        }
    }

    fn write_fields(&mut self, fields: Vec<Option<&str>>) -> Result<()> {
        if self.poisoned {
            return Err(CsvError::InvalidHandle);
        }
        let dialect = self.format.borrow().dialect()?;
        let sink = self.sink.as_mut().ok_or(CsvError::UnboundSource)?;

        match self.tokenizer.write_record(sink.writer(), &dialect, fields) {
            Ok(()) => {
                self.line_number += 1;
                Ok(())
            }
            Err(source) => {
                self.poisoned = true;
                Err(CsvError::Write {
                    line: self.line_number + 1,
                    source,
                })
            }
        }
    }
}

impl ItemWriter<NamedRecord> for CsvItemWriter<'_> {
    fn write(&mut self, items: &[NamedRecord]) -> ItemWriterResult {
        for item in items {
            self.write_row(item)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> ItemWriterResult {
        let sink = self.sink.as_mut().ok_or(CsvError::UnboundSource)?;
        sink.flush()?;
        Ok(())
    }
}

/// A builder for configuring a [`CsvItemWriter`].
///
/// # Default Configuration
///
/// - Format: [`CsvFormat::standard`] (`,` `"` `\`)
/// - Headers: disabled
#[derive(Default)]
pub struct CsvItemWriterBuilder {
    format: Option<SharedFormat>,
    has_headers: bool,
    headers: Option<Headers>,
}

impl CsvItemWriterBuilder {
    pub fn new() -> CsvItemWriterBuilder {
        Self::default()
    }

    pub fn format(mut self, format: SharedFormat) -> CsvItemWriterBuilder {
        self.format = Some(format);
        self
    }

    pub fn has_headers(mut self, yes: bool) -> CsvItemWriterBuilder {
        self.has_headers = yes;
        self
    }

    pub fn headers(mut self, headers: Headers) -> CsvItemWriterBuilder {
        self.headers = Some(headers);
        self
    }

    /// An unbound writer carrying this format.
    pub fn build<'a>(&self) -> CsvItemWriter<'a> {
        let format = self
            .format
            .clone()
            .unwrap_or_else(|| CsvFormat::standard().shared());
        CsvItemWriter::new(format)
    }

    pub fn from_writer<'a, W: Write + 'a>(self, wtr: W) -> CsvItemWriter<'a> {
        let mut writer = self.build();
        writer.assign(Sink::new(wtr), self.has_headers, self.headers);
        writer
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemWriter<'static>> {
        let mut writer = self.build();
        writer.open(path, self.has_headers, self.headers)?;
        Ok(writer)
    }
}
