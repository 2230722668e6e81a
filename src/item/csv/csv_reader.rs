use std::{cmp::Ordering, path::Path, rc::Rc};

use log::{debug, warn};

use super::{
    csv_format::{CsvFormat, SharedFormat},
    handle::Source,
    header::HeaderResolver,
    record::{Headers, NamedRecord, RawRecord},
    tokenizer::RowTokenizer,
};
use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::{ColumnCountKind, CsvError, ErrorCategory, Result},
};

/// Pass to `open`/`assign` when the first record holds column names.
pub const WITH_HEADERS: bool = true;

/// Pass to `open`/`assign` when every record is data.
pub const WITHOUT_HEADERS: bool = false;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Unbound,
    /// Bound to a source, headers not resolved yet.
    Bound,
    Initialized,
}

/// A cursor over the records of a CSV source, keyed by column.
///
/// The reader is bound to a [`Source`] with [`open`](Self::open) or
/// [`assign`](Self::assign) and initializes lazily: the first call to
/// `current`, `key`, `valid`, `next` or `headers` resolves the headers and
/// moves onto the first data record.
///
/// # Counting
///
/// - `line_number` counts every raw record consumed, the header row and
///   skipped blank lines included.
/// - `key` counts every raw record examined by the cursor, including blank
///   lines later dropped by `ignore_empty_data_lines`, so skipped lines show
///   up as gaps in the key sequence.
///
/// # Examples
///
/// ```
/// use csv_rw::item::csv::{
///     csv_format::CsvFormat,
///     csv_reader::{CsvItemReader, WITH_HEADERS},
///     handle::Source,
/// };
///
/// let mut reader = CsvItemReader::new(CsvFormat::standard().shared());
/// reader.assign(Source::stream("id,name\n1,Alice\n2,Bob\n".as_bytes()), WITH_HEADERS, None);
///
/// while reader.valid().unwrap() {
///     let key = reader.key().unwrap();
///     let row = reader.current().unwrap().unwrap();
///     println!("{:?}: {:?}", key, row.get("name"));
///     reader.next().unwrap();
/// }
/// assert_eq!(reader.key().unwrap(), Some(1));
/// ```
pub struct CsvItemReader<'a> {
    format: SharedFormat,
    source: Option<Source<'a>>,
    state: ReaderState,
    with_headers: bool,
    explicit_headers: Option<Headers>,
    headers: Option<Headers>,
    tokenizer: RowTokenizer,
    line_number: usize,
    examined: usize,
    current: Option<NamedRecord>,
    exhausted: bool,
    deferred: Option<CsvError>,
    poisoned: bool,
    ignore_less_data_columns: bool,
    ignore_more_data_columns: bool,
    ignore_empty_data_lines: bool,
}

impl<'a> CsvItemReader<'a> {
    pub fn new(format: SharedFormat) -> Self {
        CsvItemReader {
            format,
            source: None,
            state: ReaderState::Unbound,
            with_headers: false,
            explicit_headers: None,
            headers: None,
            tokenizer: RowTokenizer::new(),
            line_number: 0,
            examined: 0,
            current: None,
            exhausted: false,
            deferred: None,
            poisoned: false,
            ignore_less_data_columns: false,
            ignore_more_data_columns: false,
            ignore_empty_data_lines: false,
        }
    }

    /// Opens the file at `path` and binds the reader to it.
    ///
    /// `headers`, when given, names the columns; in header mode it replaces
    /// the names found on the first line, which is still skipped.
    pub fn open<P: AsRef<Path>>(
        &mut self,
        path: P,
        with_headers: bool,
        headers: Option<Headers>,
    ) -> Result<&mut Self> {
        let source = Source::from_path(path.as_ref())?;
        debug!("Opened CSV file {} for reading", path.as_ref().display());
        Ok(self.assign(source, with_headers, headers))
    }

    /// Binds the reader to an already opened source such as stdin.
    ///
    /// Any previous binding is dropped along with its cursor and resolved
    /// headers. The format and the tolerance toggles are kept.
    pub fn assign(
        &mut self,
        source: Source<'a>,
        with_headers: bool,
        headers: Option<Headers>,
    ) -> &mut Self {
        debug!(
            "Assigned CSV source (seekable: {}, with headers: {})",
            source.is_seekable(),
            with_headers
        );
        self.source = Some(source);
        self.state = ReaderState::Bound;
        self.with_headers = with_headers;
        self.explicit_headers = headers;
        self.headers = None;
        self.reset_cursor();
        self.poisoned = false;
        self
    }

    /// Releases the bound source.
    pub fn close(&mut self) -> Result<()> {
        let source = self.unassign().ok_or(CsvError::UnboundSource)?;
        drop(source);
        debug!("Closed CSV source");
        Ok(())
    }

    /// Unbinds the reader and hands the source back to the caller without
    /// closing it.
    pub fn unassign(&mut self) -> Option<Source<'a>> {
        self.state = ReaderState::Unbound;
        self.with_headers = false;
        self.explicit_headers = None;
        self.headers = None;
        self.reset_cursor();
        self.poisoned = false;
        self.source.take()
    }

    /// The record under the cursor, `None` once the source is exhausted.
    pub fn current(&mut self) -> Result<Option<&NamedRecord>> {
        self.ensure_initialized()?;
        Ok(self.current.as_ref())
    }

    /// Zero-based index of the last raw record examined, `None` if no data
    /// record has been examined yet.
    pub fn key(&mut self) -> Result<Option<usize>> {
        self.ensure_initialized()?;
        Ok(self.examined.checked_sub(1))
    }

    pub fn valid(&mut self) -> Result<bool> {
        self.ensure_initialized()?;
        Ok(self.current.is_some())
    }

    /// Moves the cursor to the next data record.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        self.deferred = None;
        self.advance()
    }

    /// Restarts reading from the beginning of the source.
    ///
    /// Once the reader has consumed anything this needs a seekable source;
    /// on a stream it fails with [`CsvError::NotSeekable`] and leaves the
    /// cursor where it was.
    pub fn rewind(&mut self) -> Result<()> {
        match self.state {
            ReaderState::Unbound => Err(CsvError::UnboundSource),
            ReaderState::Bound => self.initialize(),
            ReaderState::Initialized => {
                let source = self.source.as_mut().ok_or(CsvError::UnboundSource)?;
                source.rewind()?;
                debug!("Rewound CSV source");
                self.poisoned = false;
                self.initialize()
            }
        }
    }

    /// Collects every record from the cursor position to the end. Does not
    /// rewind first.
    pub fn get_all_rows(&mut self) -> Result<Vec<NamedRecord>> {
        let mut rows = Vec::new();
        while let Some((_, row)) = self.take_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Iterates `(key, record)` pairs from the cursor position on.
    pub fn rows(&mut self) -> Rows<'_, 'a> {
        Rows {
            reader: self,
            done: false,
        }
    }

    /// Column keys in use, resolving them first if needed. `None` while the
    /// reader waits for a first data record to size positional keys.
    pub fn headers(&mut self) -> Result<Option<&Headers>> {
        self.ensure_initialized()?;
        Ok(self.headers.as_ref())
    }

    /// Overrides the column keys. The override survives `rewind` but not a
    /// new `open`/`assign`.
    pub fn set_headers(&mut self, headers: Headers) -> &mut Self {
        self.explicit_headers = Some(headers.clone());
        self.headers = Some(headers);
        self
    }

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

    pub fn source(&self) -> Option<&Source<'a>> {
        self.source.as_ref()
    }

    pub fn ignore_less_data_columns(&self) -> bool {
        self.ignore_less_data_columns
    }

    /// Pads short records with null fields instead of failing.
    pub fn set_ignore_less_data_columns(&mut self, yes: bool) -> &mut Self {
        self.ignore_less_data_columns = yes;
        self
    }

    pub fn ignore_more_data_columns(&self) -> bool {
        self.ignore_more_data_columns
    }

    /// Keeps the surplus fields of long records under positional keys
    /// instead of failing. The stored headers are not widened.
    pub fn set_ignore_more_data_columns(&mut self, yes: bool) -> &mut Self {
        self.ignore_more_data_columns = yes;
        self
    }

    pub fn ignore_empty_data_lines(&self) -> bool {
        self.ignore_empty_data_lines
    }

    /// Skips blank lines instead of treating them as one-field records.
    pub fn set_ignore_empty_data_lines(&mut self, yes: bool) -> &mut Self {
        self.ignore_empty_data_lines = yes;
        self
    }

    fn reset_cursor(&mut self) {
        self.line_number = 0;
        self.examined = 0;
        self.current = None;
        self.exhausted = false;
        self.deferred = None;
    }

    fn ensure_initialized(&mut self) -> Result<()> {
        match self.state {
            ReaderState::Unbound => Err(CsvError::UnboundSource),
            ReaderState::Bound => self.initialize(),
            ReaderState::Initialized => Ok(()),
        }
    }

    fn initialize(&mut self) -> Result<()> {
        self.reset_cursor();

        let explicit = self.explicit_headers.clone();
        let resolved = HeaderResolver::new(self.with_headers, explicit.as_ref())
            .resolve(|| self.read_raw())?;
        self.headers = resolved.into_option();
        self.state = ReaderState::Initialized;
        debug!("CSV reader initialized with headers {:?}", self.headers);

        self.advance()
    }

    fn read_raw(&mut self) -> Result<Option<RawRecord>> {
        if self.poisoned {
            return Err(CsvError::InvalidHandle);
        }
        let dialect = self.format.borrow().dialect()?;
        let source = self.source.as_mut().ok_or(CsvError::UnboundSource)?;

        match self
            .tokenizer
            .read_record(source.reader(), &dialect, self.line_number + 1)
        {
            Ok(Some(record)) => {
                self.line_number += 1;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(CsvError::Io(error)) => {
                self.poisoned = true;
                Err(CsvError::Io(error))
            }
            Err(error) => {
                self.line_number += 1;
                Err(error)
            }
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.current = None;

        loop {
            let Some(mut raw) = self.read_raw()? else {
                self.exhausted = true;
                return Ok(());
            };
            self.examined += 1;

            if self.ignore_empty_data_lines && raw.len() == 1 && raw[0].is_none() {
                debug!("Skipping empty line {}", self.line_number);
                continue;
            }

            let headers = self
                .headers
                .get_or_insert_with(|| Headers::positional(raw.len()));
            let expected = headers.len();
            let actual = raw.len();

            let record = match actual.cmp(&expected) {
                Ordering::Equal => NamedRecord::zip(headers, raw),
                Ordering::Less if self.ignore_less_data_columns => {
                    warn!(
                        "Padding line {} from {} to {} fields",
                        self.line_number, actual, expected
                    );
                    raw.resize(expected, None);
                    NamedRecord::zip(headers, raw)
                }
                Ordering::Greater if self.ignore_more_data_columns => {
                    warn!(
                        "Extending line {} headers from {} to {} fields",
                        self.line_number, expected, actual
                    );
                    NamedRecord::zip(&headers.extended_to(actual), raw)
                }
                ordering => {
                    let kind = if ordering == Ordering::Less {
                        ColumnCountKind::TooFew
                    } else {
                        ColumnCountKind::TooMany
                    };
                    return Err(CsvError::ColumnCount {
                        kind,
                        line: self.line_number,
                        expected,
                        actual,
                    });
                }
            };

            self.current = Some(record);
            return Ok(());
        }
    }

    /// Hands out the current record and moves on. An error hit while moving
    /// on is held back until the next call, so the record is not lost; after
    /// a failed record the cursor resumes with the one that follows.
    fn take_row(&mut self) -> Result<Option<(usize, NamedRecord)>> {
        self.ensure_initialized()?;

        loop {
            if let Some(error) = self.deferred.take() {
                return Err(error);
            }
            if let Some(record) = self.current.take() {
                let key = self.examined.saturating_sub(1);
                if let Err(error) = self.advance() {
                    self.deferred = Some(error);
                }
                return Ok(Some((key, record)));
            }
            if self.exhausted || self.poisoned {
                return Ok(None);
            }
            self.advance()?;
        }
    }
}

impl ItemReader<NamedRecord> for CsvItemReader<'_> {
    fn read(&mut self) -> ItemReaderResult<NamedRecord> {
        Ok(self.take_row()?.map(|(_, record)| record))
    }
}

/// Iterator over `(key, record)` pairs returned by [`CsvItemReader::rows`].
///
/// A ragged or unparsable record yields one `Err` and iteration goes on with
/// the next record. Errors that would repeat on every call (the reader
/// cannot initialize, the format is incomplete, the handle is gone) are
/// yielded once and end the iteration.
pub struct Rows<'r, 'a> {
    reader: &'r mut CsvItemReader<'a>,
    done: bool,
}

impl Iterator for Rows<'_, '_> {
    type Item = Result<(usize, NamedRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let row = self.reader.take_row();
        if let Err(error) = &row {
            self.done = self.reader.state != ReaderState::Initialized
                || matches!(
                    error.category(),
                    ErrorCategory::Config | ErrorCategory::Binding
                );
        }
        row.transpose()
    }
}

/// A builder for configuring a [`CsvItemReader`].
///
/// # Default Configuration
///
/// - Format: [`CsvFormat::standard`] (`,` `"` `\`)
/// - Headers: disabled
/// - Ragged rows and blank lines: rejected
///
/// # Examples
///
/// ```
/// use csv_rw::item::csv::csv_reader::CsvItemReaderBuilder;
///
/// let mut reader = CsvItemReaderBuilder::new()
///     .has_headers(true)
///     .ignore_empty_data_lines(true)
///     .from_reader("a,b,c\n\n1,2,3\n".as_bytes());
///
/// let rows = reader.get_all_rows().unwrap();
/// assert_eq!(rows.len(), 1);
/// ```
#[derive(Default)]
pub struct CsvItemReaderBuilder {
    format: Option<SharedFormat>,
    has_headers: bool,
    headers: Option<Headers>,
    ignore_less_data_columns: bool,
    ignore_more_data_columns: bool,
    ignore_empty_data_lines: bool,
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares `format` with the reader instead of using a private standard
    /// one.
    pub fn format(mut self, format: SharedFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn ignore_less_data_columns(mut self, yes: bool) -> Self {
        self.ignore_less_data_columns = yes;
        self
    }

    pub fn ignore_more_data_columns(mut self, yes: bool) -> Self {
        self.ignore_more_data_columns = yes;
        self
    }

    pub fn ignore_empty_data_lines(mut self, yes: bool) -> Self {
        self.ignore_empty_data_lines = yes;
        self
    }

    /// An unbound reader carrying this configuration.
    pub fn build<'a>(&self) -> CsvItemReader<'a> {
        let format = self
            .format
            .clone()
            .unwrap_or_else(|| CsvFormat::standard().shared());
        let mut reader = CsvItemReader::new(format);
        reader
            .set_ignore_less_data_columns(self.ignore_less_data_columns)
            .set_ignore_more_data_columns(self.ignore_more_data_columns)
            .set_ignore_empty_data_lines(self.ignore_empty_data_lines);
        reader
    }

    /// Reader bound to a non-seekable stream.
    pub fn from_reader<'a, R: std::io::Read + 'a>(self, rdr: R) -> CsvItemReader<'a> {
        self.from_source(Source::stream(rdr))
    }

    pub fn from_source(self, source: Source<'_>) -> CsvItemReader<'_> {
        let mut reader = self.build();
        reader.assign(source, self.has_headers, self.headers);
        reader
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemReader<'static>> {
        let mut reader = self.build();
        reader.open(path, self.has_headers, self.headers)?;
        Ok(reader)
    }
}
