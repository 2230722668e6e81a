use crate::error::CsvError;

/// `Ok(None)` once the reader is exhausted.
pub type ItemReaderResult<I> = Result<Option<I>, CsvError>;

pub type ItemWriterResult = Result<(), CsvError>;

/// A source of items pulled one at a time.
pub trait ItemReader<I> {
    fn read(&mut self) -> ItemReaderResult<I>;
}

/// A destination that accepts items a chunk at a time.
pub trait ItemWriter<O> {
    fn write(&mut self, items: &[O]) -> ItemWriterResult;

    fn flush(&mut self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&mut self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&mut self) -> ItemWriterResult {
        Ok(())
    }
}
