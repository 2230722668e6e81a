use log::debug;

use super::record::{Headers, RawRecord};
use crate::error::{CsvError, Result};

/// Outcome of header resolution for a freshly bound source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedHeaders {
    Known(Headers),
    /// Positional keys, sized by the first data record.
    Deferred,
}

impl ResolvedHeaders {
    pub fn into_option(self) -> Option<Headers> {
        match self {
            ResolvedHeaders::Known(headers) => Some(headers),
            ResolvedHeaders::Deferred => None,
        }
    }
}

/// Decides which column names a reader session uses.
///
/// In header mode the first record is always consumed, even when explicit
/// headers override it; otherwise nothing is read.
#[derive(Debug, Clone, Copy)]
pub struct HeaderResolver<'h> {
    with_headers: bool,
    explicit: Option<&'h Headers>,
}

impl<'h> HeaderResolver<'h> {
    pub fn new(with_headers: bool, explicit: Option<&'h Headers>) -> Self {
        HeaderResolver {
            with_headers,
            explicit,
        }
    }

    pub fn resolve<F>(self, read_row: F) -> Result<ResolvedHeaders>
    where
        F: FnOnce() -> Result<Option<RawRecord>>,
    {
        if self.with_headers {
            let row = read_row()?.ok_or(CsvError::MissingHeaderRow)?;
            return Ok(match self.explicit {
                Some(headers) => {
                    debug!("Header row skipped in favour of explicit headers");
                    ResolvedHeaders::Known(headers.clone())
                }
                None => ResolvedHeaders::Known(Headers::from_raw(row)),
            });
        }

        Ok(match self.explicit {
            Some(headers) => ResolvedHeaders::Known(headers.clone()),
            None => ResolvedHeaders::Deferred,
        })
    }
}
