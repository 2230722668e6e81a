use std::{cell::RefCell, rc::Rc};

use crate::error::{CsvError, Result};

/// A `CsvFormat` shared by several readers and writers.
///
/// Mutating it through one holder is seen by every other holder from their
/// next operation on.
pub type SharedFormat = Rc<RefCell<CsvFormat>>;

/// CSV dialect options: the characters the tokenizer needs to split and
/// compose lines.
///
/// Every option starts unset and must be set before the format is used.
///
/// # Examples
///
/// ```
/// use csv_rw::item::csv::csv_format::CsvFormat;
///
/// let format = CsvFormat::from_options([
///     ("delimiter", ";"),
///     ("enclosure", "'"),
///     ("escape", "\\"),
/// ])
/// .unwrap();
///
/// assert_eq!(format.delimiter().unwrap(), ';');
/// assert!(CsvFormat::default().delimiter().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvFormat {
    delimiter: Option<char>,
    enclosure: Option<char>,
    escape: Option<char>,
}

/// Byte snapshot of a fully configured [`CsvFormat`], taken once per
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: u8,
    pub enclosure: u8,
    pub escape: u8,
}

impl CsvFormat {
    /// `,` delimiter, `"` enclosure and `\` escape.
    pub fn standard() -> Self {
        CsvFormat {
            delimiter: Some(','),
            enclosure: Some('"'),
            escape: Some('\\'),
        }
    }

    pub fn from_options<I, K, V>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut format = CsvFormat::default();
        format.configure(options)?;
        Ok(format)
    }

    /// Wraps this format for sharing between readers and writers.
    pub fn shared(self) -> SharedFormat {
        Rc::new(RefCell::new(self))
    }

    /// Sets options from `(name, value)` pairs. Known names are `delimiter`,
    /// `enclosure` and `escape`; each value must be a single character.
    pub fn configure<I, K, V>(&mut self, options: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (option, value) in options {
            let value = value.as_ref();
            match option.as_ref() {
                "delimiter" => self.set_delimiter(single_char("delimiter", value)?)?,
                "enclosure" => self.set_enclosure(single_char("enclosure", value)?)?,
                "escape" => self.set_escape(single_char("escape", value)?)?,
                other => return Err(CsvError::UnknownOption(other.to_string())),
            };
        }
        Ok(self)
    }

    pub fn delimiter(&self) -> Result<char> {
        self.delimiter.ok_or(CsvError::OptionNotSet("delimiter"))
    }

    pub fn set_delimiter(&mut self, delimiter: char) -> Result<&mut Self> {
        self.delimiter = Some(checked("delimiter", delimiter)?);
        Ok(self)
    }

    pub fn enclosure(&self) -> Result<char> {
        self.enclosure.ok_or(CsvError::OptionNotSet("enclosure"))
    }

    pub fn set_enclosure(&mut self, enclosure: char) -> Result<&mut Self> {
        self.enclosure = Some(checked("enclosure", enclosure)?);
        Ok(self)
    }

    pub fn escape(&self) -> Result<char> {
        self.escape.ok_or(CsvError::OptionNotSet("escape"))
    }

    pub fn set_escape(&mut self, escape: char) -> Result<&mut Self> {
        self.escape = Some(checked("escape", escape)?);
        Ok(self)
    }

    /// Validates that every option is set and returns them as bytes.
    pub fn dialect(&self) -> Result<Dialect> {
        // setters only accept ASCII, so the casts are lossless
        Ok(Dialect {
            delimiter: self.delimiter()? as u8,
            enclosure: self.enclosure()? as u8,
            escape: self.escape()? as u8,
        })
    }
}

fn checked(option: &'static str, value: char) -> Result<char> {
    if value.is_ascii() {
        Ok(value)
    } else {
        Err(CsvError::InvalidOption {
            option,
            value: value.to_string(),
        })
    }
}

fn single_char(option: &'static str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(CsvError::InvalidOption {
            option,
            value: value.to_string(),
        }),
    }
}
