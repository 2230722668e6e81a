//! Glue between the record cursor and the `csv` crate.
//!
//! `csv::Reader` silently drops blank lines and offers no way to pull one
//! record at a time out of a shared handle, so lines are assembled here and
//! each logical record is handed to a throwaway `csv` reader for splitting.

use std::{
    borrow::Cow,
    io::{BufRead, Write},
};

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

use super::{csv_format::Dialect, record::RawRecord};
use crate::error::{CsvError, Result};

/// Reads and writes one physical CSV record at a time.
#[derive(Debug, Default)]
pub struct RowTokenizer {
    buffer: String,
}

impl RowTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the next record from `input`, following enclosed fields across
    /// line breaks. Returns `Ok(None)` at end of input. A blank line comes
    /// back as `[None]`.
    ///
    /// `line` is only used to locate parse errors.
    pub fn read_record(
        &mut self,
        input: &mut dyn BufRead,
        dialect: &Dialect,
        line: usize,
    ) -> Result<Option<RawRecord>> {
        self.buffer.clear();

        if input.read_line(&mut self.buffer)? == 0 {
            return Ok(None);
        }

        if strip_terminator(&self.buffer).is_empty() {
            return Ok(Some(vec![None]));
        }

        while has_open_enclosure(&self.buffer, dialect) {
            if input.read_line(&mut self.buffer)? == 0 {
                break;
            }
        }

        parse_record(&self.buffer, dialect, line).map(Some)
    }

    /// Writes `fields` as one record terminated by `\n`. Null fields are
    /// written empty. Inside enclosed fields the escape character is written
    /// doubled so it reads back as itself. The record is rendered in full
    /// before touching `output`, so a formatting failure never leaves a
    /// partial line.
    pub fn write_record<'f, I>(
        &mut self,
        output: &mut dyn Write,
        dialect: &Dialect,
        fields: I,
    ) -> std::io::Result<()>
    where
        I: IntoIterator<Item = Option<&'f str>>,
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(dialect.delimiter)
            .quote(dialect.enclosure)
            .escape(dialect.escape)
            .double_quote(true)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        let fields: Vec<Cow<'f, str>> = fields
            .into_iter()
            .map(|field| escape_enclosed(field.unwrap_or_default(), dialect))
            .collect();
        writer.write_record(fields.iter().map(|field| field.as_bytes()))?;
        let line = writer
            .into_inner()
            .map_err(|error| error.into_error())?;

        output.write_all(&line)
    }
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Splits one assembled record. Anything the `csv` reader finds past the
/// first record is an error rather than silently dropped.
fn parse_record(text: &str, dialect: &Dialect, line: usize) -> Result<RawRecord> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(dialect.delimiter)
        .quote(dialect.enclosure)
        .escape(escape_byte(dialect))
        .terminator(Terminator::CRLF)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let record = match records.next() {
        Some(Ok(record)) => record.iter().map(|field| Some(field.to_string())).collect(),
        Some(Err(error)) => {
            return Err(CsvError::Parse {
                line,
                message: error.to_string(),
            });
        }
        None => vec![None],
    };

    if records.next().is_some() {
        return Err(CsvError::Parse {
            line,
            message: "unexpected data after the end of the record".to_string(),
        });
    }
    Ok(record)
}

/// The escape byte as the `csv` crate sees it. An escape equal to the
/// enclosure means plain doubling.
fn escape_byte(dialect: &Dialect) -> Option<u8> {
    (dialect.escape != dialect.enclosure).then_some(dialect.escape)
}

/// Doubles escape characters in a field the writer is going to enclose.
/// Unenclosed fields are read verbatim and stay as they are.
fn escape_enclosed<'f>(field: &'f str, dialect: &Dialect) -> Cow<'f, str> {
    let Some(escape) = escape_byte(dialect) else {
        return Cow::Borrowed(field);
    };
    let enclosed = field.bytes().any(|byte| {
        byte == dialect.delimiter || byte == dialect.enclosure || byte == b'\r' || byte == b'\n'
    });
    if !enclosed || !field.bytes().any(|byte| byte == escape) {
        return Cow::Borrowed(field);
    }

    let escape = char::from(escape);
    let mut doubled = String::with_capacity(field.len() + 1);
    for c in field.chars() {
        if c == escape {
            doubled.push(escape);
        }
        doubled.push(c);
    }
    Cow::Owned(doubled)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quoting {
    FieldStart,
    Unquoted,
    Enclosed,
    /// Escape byte seen inside an enclosed field.
    Escaped,
    /// Enclosure seen inside an enclosed field: closes it unless doubled.
    Closing,
}

/// Whether `text` ends inside an enclosed field, meaning the record goes on
/// past the line break. An enclosure only opens a field at its first byte;
/// anywhere else it is data.
fn has_open_enclosure(text: &str, dialect: &Dialect) -> bool {
    let escape = escape_byte(dialect);
    let mut state = Quoting::FieldStart;

    for byte in text.bytes() {
        let separator = byte == dialect.delimiter || byte == b'\n' || byte == b'\r';
        state = match state {
            Quoting::FieldStart if byte == dialect.enclosure => Quoting::Enclosed,
            Quoting::FieldStart | Quoting::Unquoted | Quoting::Closing if separator => {
                Quoting::FieldStart
            }
            Quoting::FieldStart | Quoting::Unquoted => Quoting::Unquoted,
            Quoting::Enclosed if byte == dialect.enclosure => Quoting::Closing,
            Quoting::Enclosed if Some(byte) == escape => Quoting::Escaped,
            Quoting::Enclosed | Quoting::Escaped => Quoting::Enclosed,
            Quoting::Closing if byte == dialect.enclosure => Quoting::Enclosed,
            Quoting::Closing => Quoting::Unquoted,
        };
    }

    matches!(state, Quoting::Enclosed | Quoting::Escaped)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn standard() -> Dialect {
        Dialect {
            delimiter: b',',
            enclosure: b'"',
            escape: b'\\',
        }
    }

    fn read_all(text: &str, dialect: &Dialect) -> Result<Vec<RawRecord>> {
        let mut input = Cursor::new(text);
        let mut tokenizer = RowTokenizer::new();
        let mut records = Vec::new();
        while let Some(record) = tokenizer.read_record(&mut input, dialect, records.len() + 1)? {
            records.push(record);
        }
        Ok(records)
    }

    fn fields(values: &[&str]) -> RawRecord {
        values.iter().map(|value| Some(value.to_string())).collect()
    }

    #[test]
    fn blank_lines_are_kept_as_single_null_field() -> Result<()> {
        let records = read_all("a,b\n\n1,2\r\n\r\n", &standard())?;
        assert_eq!(
            records,
            vec![fields(&["a", "b"]), vec![None], fields(&["1", "2"]), vec![None]]
        );
        Ok(())
    }

    #[test]
    fn enclosed_newlines_stay_in_one_record() -> Result<()> {
        let records = read_all("id,note\n1,\"first\nsecond\"\n2,plain\n", &standard())?;
        assert_eq!(
            records,
            vec![
                fields(&["id", "note"]),
                fields(&["1", "first\nsecond"]),
                fields(&["2", "plain"]),
            ]
        );
        Ok(())
    }

    #[test]
    fn escaped_and_doubled_enclosures_are_unquoted() -> Result<()> {
        let records = read_all("\"say \\\"hi\\\"\",\"a \"\"b\"\"\"\n", &standard())?;
        assert_eq!(records, vec![fields(&["say \"hi\"", "a \"b\""])]);
        Ok(())
    }

    #[test]
    fn last_line_without_terminator_is_read() -> Result<()> {
        let records = read_all("x;y\n1;2", &Dialect { delimiter: b';', ..standard() })?;
        assert_eq!(records, vec![fields(&["x", "y"]), fields(&["1", "2"])]);
        Ok(())
    }

    #[test]
    fn writer_quotes_only_when_needed() -> std::io::Result<()> {
        let mut tokenizer = RowTokenizer::new();
        let mut output = Vec::new();
        tokenizer.write_record(
            &mut output,
            &standard(),
            [Some("plain"), None, Some("a,b"), Some("say \"hi\"")],
        )?;

        assert_eq!(
            String::from_utf8_lossy(&output),
            "plain,,\"a,b\",\"say \"\"hi\"\"\"\n"
        );
        Ok(())
    }

    #[test]
    fn enclosure_inside_unquoted_field_is_data() -> Result<()> {
        let records = read_all("a,b\n5\"x,y\n1,2\n3,4\n", &standard())?;
        assert_eq!(
            records,
            vec![
                fields(&["a", "b"]),
                fields(&["5\"x", "y"]),
                fields(&["1", "2"]),
                fields(&["3", "4"]),
            ]
        );
        Ok(())
    }

    #[test]
    fn data_past_the_first_record_is_an_error() {
        let result = parse_record("a,b\nc,d\n", &standard(), 7);
        assert!(matches!(result, Err(CsvError::Parse { line: 7, .. })));
    }

    #[test]
    fn escape_characters_survive_write_then_read() -> Result<()> {
        let rows = [
            ["C:\\dir,x", "1"],
            ["a,b\\", "2"],
            ["C:\\plain", "3"],
        ];

        let mut tokenizer = RowTokenizer::new();
        let mut output = Vec::new();
        for row in &rows {
            tokenizer.write_record(&mut output, &standard(), row.iter().map(|field| Some(*field)))?;
        }
        let text = String::from_utf8_lossy(&output).into_owned();
        assert_eq!(text, "\"C:\\\\dir,x\",1\n\"a,b\\\\\",2\nC:\\plain,3\n");

        let records = read_all(&text, &standard())?;
        let expected: Vec<RawRecord> = rows.iter().map(|row| fields(row)).collect();
        assert_eq!(records, expected);
        Ok(())
    }

    #[test]
    fn escape_equal_to_enclosure_means_doubling_only() -> Result<()> {
        let dialect = Dialect {
            escape: b'"',
            ..standard()
        };
        let records = read_all("\"a\"\"b\",\"c\\\"\n", &dialect)?;
        assert_eq!(records, vec![fields(&["a\"b", "c\\"])]);
        Ok(())
    }
}
