/// CSV support for reading and writing named records.
///
/// # Module Architecture
///
/// - [`csv_format::CsvFormat`]: delimiter, enclosure and escape characters,
///   shared between a reader and a writer through an `Rc<RefCell<_>>` so a
///   change made through one is seen by the other on its next row.
/// - [`tokenizer::RowTokenizer`]: turns raw lines into records and records
///   into lines, backed by the `csv` crate.
/// - [`csv_reader::CsvItemReader`]: a cursor over [`record::NamedRecord`]s
///   with policies for short, long and blank rows.
/// - [`csv_writer::CsvItemWriter`]: validates named records against its
///   column keys and writes them in column order.
/// - [`handle::Source`] / [`handle::Sink`]: the handles readers and writers
///   are bound to with `open`/`assign` and released with `close`/`unassign`.
///
/// Both sides implement the [`ItemReader`](crate::core::item::ItemReader) /
/// [`ItemWriter`](crate::core::item::ItemWriter) traits and can be wired into
/// a [`Step`](crate::core::step::Step).
///
/// # Ownership and Borrowing Considerations
///
/// A writer assigned to `&mut Vec<u8>` holds that borrow until it is dropped
/// or `unassign`ed. Read the buffer after the writer goes out of scope.
///
/// # Examples
///
/// ## Reading with a header row
///
/// ```
/// use csv_rw::item::csv::{
///     csv_format::CsvFormat,
///     csv_reader::{CsvItemReader, WITH_HEADERS},
///     handle::Source,
/// };
///
/// let mut reader = CsvItemReader::new(CsvFormat::standard().shared());
/// reader.assign(Source::stream("city,pop\nParis,2100000\n".as_bytes()), WITH_HEADERS, None);
///
/// let rows = reader.get_all_rows().unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].get("city"), Some(Some("Paris")));
/// ```
///
/// ## Sharing one format between reader and writer
///
/// ```
/// use csv_rw::item::csv::{
///     csv_format::CsvFormat,
///     csv_reader::CsvItemReaderBuilder,
///     csv_writer::CsvItemWriterBuilder,
/// };
///
/// let format = CsvFormat::from_options([("delimiter", ";"), ("enclosure", "'"), ("escape", "\\")])
///     .unwrap()
///     .shared();
///
/// let mut output = Vec::new();
/// {
///     let mut reader = CsvItemReaderBuilder::new()
///         .format(format.clone())
///         .from_reader("a;'b;c'\n".as_bytes());
///     let mut writer = CsvItemWriterBuilder::new()
///         .format(format)
///         .from_writer(&mut output);
///
///     for row in reader.get_all_rows().unwrap() {
///         writer.write_row(&row).unwrap();
///     }
/// }
///
/// assert_eq!(String::from_utf8(output).unwrap(), "a;'b;c'\n");
/// ```
pub mod csv_format;

pub mod csv_reader;

pub mod csv_writer;

pub mod handle;

pub mod header;

pub mod record;

pub mod tokenizer;
