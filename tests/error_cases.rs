mod common;

use std::io::{self, Cursor, ErrorKind};

use common::MockFile;
use csv_rw::{
    CsvError, ErrorCategory,
    core::step::{StepBuilder, StepStatus},
    item::csv::{
        csv_format::CsvFormat,
        csv_reader::{CsvItemReader, CsvItemReaderBuilder, WITH_HEADERS, WITHOUT_HEADERS},
        csv_writer::{CsvItemWriter, CsvItemWriterBuilder},
        handle::{Sink, Source},
        record::{HeaderKey, Headers, NamedRecord},
    },
};

#[test]
fn failing_sink_reports_line_then_invalid_handle() {
    common::init_logger();
    let mut file = MockFile::default();
    file.expect_write().times(1).returning(|_buf| {
        let err = io::Error::from(ErrorKind::PermissionDenied);
        Result::Err(err)
    });

    let mut writer = CsvItemWriter::new(CsvFormat::standard().shared());
    writer.assign(Sink::new(file), WITHOUT_HEADERS, None);

    let row = NamedRecord::positional(["a", "b"]);
    match writer.write_row(&row) {
        Err(CsvError::Write { line, source }) => {
            assert_eq!(line, 1);
            assert_eq!(source.kind(), ErrorKind::PermissionDenied);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(writer.line_number(), 0);

    let error = writer.write_row(&row).unwrap_err();
    assert!(matches!(error, CsvError::InvalidHandle));
    assert_eq!(error.category(), ErrorCategory::Binding);
}

#[cfg(target_os = "linux")]
#[test]
fn full_file_rejects_the_row_being_written() {
    let mut writer = CsvItemWriterBuilder::new()
        .from_path("/dev/full")
        .unwrap();

    let error = writer
        .write_row(&NamedRecord::positional(["a", "b"]))
        .unwrap_err();
    assert!(matches!(error, CsvError::Write { line: 1, .. }));
    assert_eq!(writer.line_number(), 0);
}

#[test]
fn failing_header_row_is_reported_on_first_write() {
    let mut file = MockFile::default();
    file.expect_write()
        .returning(|_buf| Err(io::Error::from(ErrorKind::BrokenPipe)));

    let mut writer = CsvItemWriterBuilder::new()
        .has_headers(true)
        .headers(Headers::from_iter(["id"]))
        .from_writer(file);

    let error = writer
        .write_row(&[("id", "1")].into_iter().collect())
        .unwrap_err();
    assert!(matches!(error, CsvError::Write { line: 1, .. }));
    assert_eq!(error.category(), ErrorCategory::Io);
}

#[test]
fn step_fails_when_writer_cannot_write() {
    let mut file = MockFile::default();
    file.expect_write()
        .returning(|_buf| Err(io::Error::from(ErrorKind::PermissionDenied)));

    let mut reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_reader("id\n1\n2\n".as_bytes());
    let mut writer = CsvItemWriterBuilder::new()
        .headers(Headers::from_iter(["id"]))
        .from_writer(file);

    let execution = StepBuilder::new(&mut reader, &mut writer)
        .chunk(1)
        .build()
        .execute();

    assert_eq!(execution.status, StepStatus::Error);
    assert_eq!(execution.write_count, 0);
    assert_eq!(execution.write_error_count, 1);
}

#[test]
fn stream_source_cannot_rewind_once_read() {
    let mut reader = CsvItemReaderBuilder::new().from_reader("1\n2\n".as_bytes());
    assert!(reader.valid().unwrap());

    let error = reader.rewind().unwrap_err();
    assert!(matches!(error, CsvError::NotSeekable));

    let key = reader.key().unwrap();
    assert_eq!(key, Some(0));
}

#[test]
fn header_mode_on_empty_input_fails() {
    let mut reader = CsvItemReader::new(CsvFormat::standard().shared());
    reader.assign(Source::seekable(Cursor::new("")), WITH_HEADERS, None);

    let error = reader.current().unwrap_err();
    assert!(matches!(error, CsvError::MissingHeaderRow));
    assert_eq!(error.category(), ErrorCategory::Header);
}

#[test]
fn ragged_rows_fail_with_line_and_counts() {
    let mut reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_reader("a,b\n1,2,3\n4\n5,6\n".as_bytes());

    let results: Vec<_> = reader.rows().collect();
    assert_eq!(results.len(), 3);

    assert_eq!(
        results[0].as_ref().unwrap_err().to_string(),
        "Invalid amount of columns in line 2 (too many: expected 2, got 3)"
    );
    assert_eq!(
        results[1].as_ref().unwrap_err().to_string(),
        "Invalid amount of columns in line 3 (too few: expected 2, got 1)"
    );
    let (key, record) = results[2].as_ref().unwrap();
    assert_eq!(*key, 2);
    assert_eq!(record.get("b"), Some(Some("6")));
}

#[test]
fn blank_line_is_a_one_field_row_unless_ignored() {
    let text = "a,b\n\n1,2\n";

    let mut strict = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    assert!(matches!(
        strict.current(),
        Err(CsvError::ColumnCount { line: 2, expected: 2, actual: 1, .. })
    ));

    let mut padded = CsvItemReaderBuilder::new()
        .has_headers(true)
        .ignore_less_data_columns(true)
        .from_reader(text.as_bytes());
    let rows = padded.get_all_rows().unwrap();
    assert_eq!(rows[0].values().collect::<Vec<_>>(), vec![None, None]);

    let mut skipping = CsvItemReaderBuilder::new()
        .has_headers(true)
        .ignore_empty_data_lines(true)
        .from_reader(text.as_bytes());
    assert_eq!(skipping.get_all_rows().unwrap().len(), 1);
}

#[test]
fn writer_field_mapping_errors_name_the_fields() {
    let mut output = Vec::new();
    let mut writer = CsvItemWriterBuilder::new()
        .headers(Headers::from_iter(["id", "name"]))
        .from_writer(&mut output);

    let extra: NamedRecord = [("id", "1"), ("name", "x"), ("age", "3")]
        .into_iter()
        .collect();
    let error = writer.write_row(&extra).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Passed data for CSV contains unexpected field(s): \"age\" (expected: \"id\", \"name\")"
    );
    assert_eq!(error.category(), ErrorCategory::FieldMapping);

    let short: NamedRecord = [("id", "1")].into_iter().collect();
    match writer.write_row(&short) {
        Err(CsvError::MissingFields { fields }) => {
            assert_eq!(fields, vec![HeaderKey::from("name")])
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert!(matches!(
        writer.write_row(&NamedRecord::new()),
        Err(CsvError::EmptyRow)
    ));
    drop(writer);
    assert!(output.is_empty());
}

#[test]
fn unset_format_option_blocks_reading() {
    let mut format = CsvFormat::default();
    format.set_delimiter(';').unwrap();

    let mut reader = CsvItemReader::new(format.shared());
    reader.assign(Source::stream("a;b\n".as_bytes()), WITHOUT_HEADERS, None);

    let error = reader.current().unwrap_err();
    assert_eq!(error.to_string(), "The `enclosure' option not set");
    assert_eq!(error.category(), ErrorCategory::Config);
}

#[test]
fn opening_a_missing_file_fails() {
    let result = CsvItemReaderBuilder::new().from_path("/nonexistent/dir/in.csv");
    assert!(matches!(result, Err(CsvError::Open { mode: "reading", .. })));

    let result = CsvItemWriterBuilder::new().from_path("/nonexistent/dir/out.csv");
    assert!(matches!(result, Err(CsvError::Open { mode: "writing", .. })));
}
