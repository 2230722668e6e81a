use log::{debug, error};

use super::item::{ItemReader, ItemWriter};

#[derive(Debug, PartialEq, Eq)]
enum ChunkStatus {
    Error,
    Finished,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Error,
    Success,
    Started,
}

/// Outcome and counters of one [`Step::execute`] run.
#[derive(Debug)]
pub struct StepExecution {
    pub status: StepStatus,
    pub read_count: usize,
    pub write_count: usize,
    pub read_error_count: usize,
    pub write_error_count: usize,
}

/// Copies records from a reader to a writer, `chunk_size` records at a time.
///
/// Failed records are skipped and counted. Once more than `skip_limit`
/// records have failed the step stops with [`StepStatus::Error`].
///
/// # Examples
///
/// ```
/// use csv_rw::core::step::{StepBuilder, StepStatus};
/// use csv_rw::item::csv::{
///     csv_reader::CsvItemReaderBuilder,
///     csv_writer::CsvItemWriterBuilder,
/// };
///
/// let mut output = Vec::new();
/// {
///     let mut reader = CsvItemReaderBuilder::new()
///         .has_headers(true)
///         .from_reader("id,name\n1,Alice\n2,Bob\n".as_bytes());
///     let mut writer = CsvItemWriterBuilder::new().from_writer(&mut output);
///
///     let mut step = StepBuilder::new(&mut reader, &mut writer).chunk(10).build();
///     let execution = step.execute();
///
///     assert_eq!(execution.status, StepStatus::Success);
///     assert_eq!(execution.write_count, 2);
/// }
///
/// assert_eq!(String::from_utf8(output).unwrap(), "1,Alice\n2,Bob\n");
/// ```
pub struct Step<'a, T> {
    reader: &'a mut dyn ItemReader<T>,
    writer: &'a mut dyn ItemWriter<T>,
    chunk_size: usize,
    skip_limit: usize,
    read_count: usize,
    write_count: usize,
    read_error_count: usize,
    write_error_count: usize,
}

impl<T> Step<'_, T> {
    pub fn execute(&mut self) -> StepExecution {
        debug!("Start of step");

        let mut status = match self.writer.open() {
            Ok(()) => StepStatus::Started,
            Err(err) => {
                error!("ItemWriter open error: {}", err);
                StepStatus::Error
            }
        };

        let mut items: Vec<T> = Vec::with_capacity(self.chunk_size);

        while status == StepStatus::Started {
            let read_status = self.read_chunk(&mut items);
            if read_status == ChunkStatus::Error {
                status = StepStatus::Error;
                break;
            }

            let write_status = self.write_chunk(&items);

            status = match (read_status, write_status) {
                (_, ChunkStatus::Error) => StepStatus::Error,
                (ChunkStatus::Finished, _) => StepStatus::Success,
                _ => StepStatus::Started,
            };
        }

        if let Err(err) = self.writer.close() {
            error!("ItemWriter close error: {}", err);
            status = StepStatus::Error;
        }

        debug!("End of step: {:?}", status);

        StepExecution {
            status,
            read_count: self.read_count,
            write_count: self.write_count,
            read_error_count: self.read_error_count,
            write_error_count: self.write_error_count,
        }
    }

    fn is_skip_limit_reached(&self) -> bool {
        self.read_error_count + self.write_error_count > self.skip_limit
    }

    fn read_chunk(&mut self, items: &mut Vec<T>) -> ChunkStatus {
        debug!("Start reading chunk");
        items.clear();

        loop {
            match self.reader.read() {
                Ok(Some(item)) => {
                    items.push(item);
                    self.read_count += 1;
                }
                Ok(None) => {
                    debug!("End reading chunk: FINISHED");
                    return ChunkStatus::Finished;
                }
                Err(err) => {
                    self.read_error_count += 1;
                    error!("Error occurred during read item: {}", err);
                }
            }

            if self.is_skip_limit_reached() {
                return ChunkStatus::Error;
            }

            if items.len() == self.chunk_size {
                debug!("End reading chunk: FULL");
                return ChunkStatus::Full;
            }
        }
    }

    fn write_chunk(&mut self, items: &[T]) -> ChunkStatus {
        debug!("Start writing chunk");

        let result = self
            .writer
            .write(items)
            .and_then(|()| self.writer.flush());

        match result {
            Ok(()) => {
                self.write_count += items.len();
                debug!("End writing chunk");
                ChunkStatus::Full
            }
            Err(err) => {
                self.write_error_count += items.len();
                error!("ItemWriter error: {}", err);
                if self.is_skip_limit_reached() {
                    ChunkStatus::Error
                } else {
                    ChunkStatus::Full
                }
            }
        }
    }
}

pub struct StepBuilder<'a, T> {
    reader: &'a mut dyn ItemReader<T>,
    writer: &'a mut dyn ItemWriter<T>,
    chunk_size: usize,
    skip_limit: usize,
}

impl<'a, T> StepBuilder<'a, T> {
    pub fn new(
        reader: &'a mut impl ItemReader<T>,
        writer: &'a mut impl ItemWriter<T>,
    ) -> StepBuilder<'a, T> {
        Self {
            reader,
            writer,
            chunk_size: 1,
            skip_limit: 0,
        }
    }

    /// Records per chunk; zero is treated as one.
    pub fn chunk(mut self, chunk_size: usize) -> StepBuilder<'a, T> {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn skip_limit(mut self, skip_limit: usize) -> StepBuilder<'a, T> {
        self.skip_limit = skip_limit;
        self
    }

    pub fn build(self) -> Step<'a, T> {
        Step {
            reader: self.reader,
            writer: self.writer,
            chunk_size: self.chunk_size,
            skip_limit: self.skip_limit,
            read_count: 0,
            write_count: 0,
            read_error_count: 0,
            write_error_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::item::{ItemReaderResult, ItemWriterResult},
        error::CsvError,
    };

    struct VecReader {
        items: Vec<Result<u32, CsvError>>,
    }

    impl ItemReader<u32> for VecReader {
        fn read(&mut self) -> ItemReaderResult<u32> {
            if self.items.is_empty() {
                return Ok(None);
            }
            self.items.remove(0).map(Some)
        }
    }

    #[derive(Default)]
    struct VecWriter {
        items: Vec<u32>,
        flushes: usize,
    }

    impl ItemWriter<u32> for VecWriter {
        fn write(&mut self, items: &[u32]) -> ItemWriterResult {
            self.items.extend_from_slice(items);
            Ok(())
        }

        fn flush(&mut self) -> ItemWriterResult {
            self.flushes += 1;
            Ok(())
        }
    }

    fn reader(items: Vec<Result<u32, CsvError>>) -> VecReader {
        VecReader { items }
    }

    #[test]
    fn copies_all_items_in_chunks() {
        let mut reader = reader((1..=5).map(Ok).collect());
        let mut writer = VecWriter::default();

        let execution = StepBuilder::new(&mut reader, &mut writer)
            .chunk(2)
            .build()
            .execute();

        assert_eq!(execution.status, StepStatus::Success);
        assert_eq!(execution.read_count, 5);
        assert_eq!(execution.write_count, 5);
        assert_eq!(writer.items, vec![1, 2, 3, 4, 5]);
        assert_eq!(writer.flushes, 3);
    }

    #[test]
    fn read_errors_within_skip_limit_are_skipped() {
        let mut reader = reader(vec![Ok(1), Err(CsvError::EmptyRow), Ok(3)]);
        let mut writer = VecWriter::default();

        let execution = StepBuilder::new(&mut reader, &mut writer)
            .chunk(10)
            .skip_limit(1)
            .build()
            .execute();

        assert_eq!(execution.status, StepStatus::Success);
        assert_eq!(execution.read_error_count, 1);
        assert_eq!(writer.items, vec![1, 3]);
    }

    #[test]
    fn read_error_past_skip_limit_fails_the_step() {
        let mut reader = reader(vec![Ok(1), Err(CsvError::EmptyRow), Ok(3)]);
        let mut writer = VecWriter::default();

        let execution = StepBuilder::new(&mut reader, &mut writer)
            .chunk(10)
            .build()
            .execute();

        assert_eq!(execution.status, StepStatus::Error);
        assert_eq!(execution.read_count, 1);
        assert!(writer.items.is_empty());
    }
}
