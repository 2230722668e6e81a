use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::error::{CsvError, Result};

trait SeekBufRead: BufRead + Seek {
    fn as_buf_read(&mut self) -> &mut dyn BufRead;
}

impl<T: BufRead + Seek> SeekBufRead for T {
    fn as_buf_read(&mut self) -> &mut dyn BufRead {
        self
    }
}

enum Input<'a> {
    Seekable(Box<dyn SeekBufRead + 'a>),
    Stream(Box<dyn BufRead + 'a>),
}

/// A readable handle a [`CsvItemReader`](super::csv_reader::CsvItemReader)
/// can be bound to.
///
/// Sources built with [`Source::seekable`] (files, cursors) support
/// `rewind`; [`Source::stream`] sources (pipes, stdin) do not.
pub struct Source<'a> {
    input: Input<'a>,
}

impl<'a> Source<'a> {
    pub fn seekable<R: Read + Seek + 'a>(inner: R) -> Self {
        Source {
            input: Input::Seekable(Box::new(BufReader::new(inner))),
        }
    }

    pub fn stream<R: Read + 'a>(inner: R) -> Self {
        Source {
            input: Input::Stream(Box::new(BufReader::new(inner))),
        }
    }

    /// Standard input, which is never seekable.
    pub fn stdin() -> Source<'static> {
        Source::stream(io::stdin())
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Source<'static>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CsvError::Open {
            path: path.to_path_buf(),
            mode: "reading",
            source,
        })?;
        Ok(Source::seekable(file))
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self.input, Input::Seekable(_))
    }

    /// Moves the read position back to the start of the input.
    pub fn rewind(&mut self) -> Result<()> {
        match &mut self.input {
            Input::Seekable(inner) => {
                inner.seek(SeekFrom::Start(0))?;
                Ok(())
            }
            Input::Stream(_) => Err(CsvError::NotSeekable),
        }
    }

    pub(crate) fn reader(&mut self) -> &mut dyn BufRead {
        match &mut self.input {
            Input::Seekable(inner) => inner.as_buf_read(),
            Input::Stream(inner) => inner.as_mut(),
        }
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("seekable", &self.is_seekable())
            .finish()
    }
}

/// A writable handle a [`CsvItemWriter`](super::csv_writer::CsvItemWriter)
/// can be bound to.
pub struct Sink<'a> {
    inner: Box<dyn Write + 'a>,
}

impl<'a> Sink<'a> {
    pub fn new<W: Write + 'a>(inner: W) -> Self {
        Sink {
            inner: Box::new(inner),
        }
    }

    pub fn stdout() -> Sink<'static> {
        Sink::new(io::stdout())
    }

    /// Creates (or truncates) the file at `path`.
    ///
    /// The file is not buffered: every row reaches the file in one write, so
    /// a rejected row is reported by the `write_row` call that produced it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Sink<'static>> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| CsvError::Open {
            path: path.to_path_buf(),
            mode: "writing",
            source,
        })?;
        Ok(Sink::new(file))
    }

    pub(crate) fn writer(&mut self) -> &mut dyn Write {
        self.inner.as_mut()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl fmt::Debug for Sink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}
