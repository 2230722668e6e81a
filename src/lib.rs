#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # csv-rw

 Streaming CSV reader and writer over named records.

 Records are read from files, streams or in-memory buffers, exposed as
 ordered maps keyed by column name (or by position when a file has no header
 row), and written back with the same column contract enforced.

 ## Core Concepts

- **CsvFormat:** delimiter, enclosure and escape characters. One format can
  be shared by any number of readers and writers; changes apply to the next
  row each of them touches.
- **CsvItemReader:** a cursor over a bound source. It resolves headers from
  the first row, explicit keys or positions, and applies policies for short,
  long and blank rows.
- **CsvItemWriter:** checks each record against its column keys, reorders
  it and writes one line per record.
- **Step:** copies items from an `ItemReader` to an `ItemWriter` in chunks,
  skipping failed items up to a limit.

 ## Getting Started

 ```toml
 [dependencies]
 csv-rw = "0.1"
 ```

 ## Example

 ```rust
 use csv_rw::item::csv::{
     csv_format::CsvFormat,
     csv_reader::{CsvItemReader, WITH_HEADERS},
     csv_writer::{CsvItemWriter, WITHOUT_HEADERS},
     handle::{Sink, Source},
 };

 # fn main() -> Result<(), csv_rw::CsvError> {
 let format = CsvFormat::standard().shared();

 let mut reader = CsvItemReader::new(format.clone());
 reader.assign(
     Source::stream("name,age\nAlice,30\nBob,\n".as_bytes()),
     WITH_HEADERS,
     None,
 );

 let mut output = Vec::new();
 {
     let mut writer = CsvItemWriter::new(format);
     writer.assign(Sink::new(&mut output), WITHOUT_HEADERS, reader.headers()?.cloned());

     while let Some(row) = reader.current()?.cloned() {
         writer.write_row(&row)?;
         reader.next()?;
     }
 }

 assert_eq!(String::from_utf8_lossy(&output), "Alice,30\nBob,\n");
 # Ok(())
 # }
 ```

 ## Logging

 The crate logs through the `log` facade at `debug` level (binding, header
 resolution, skipped and padded rows). Install any logger, for example
 `env_logger`, to see it.

 */

/// Item traits and the chunked step
pub mod core;

/// Error types for CSV reading and writing
pub mod error;

#[doc(inline)]
pub use error::*;

/// Item readers / writers (csv reader and writer)
pub mod item;
