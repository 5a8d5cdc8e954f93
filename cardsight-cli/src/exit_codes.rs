//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts to tell "no match" apart from a broken catalog.

use cardsight_core::CardsightError;

/// Successful execution (for `identify`: a card was matched).
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// The query was processed but no catalog card scored below the cutoff.
pub const NO_MATCH: i32 = 2;

/// Command line usage error (invalid arguments or configuration).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Persisted catalog files are malformed or disagree with each other.
/// Maps to EX_DATAERR from sysexits.h.
pub const CATALOG_CORRUPT: i32 = 65;

/// Cannot open or decode an input image, or no reference images exist.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// No catalog exists and none can be built.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const CATALOG_UNAVAILABLE: i32 = 69;

/// I/O error (cannot read or write catalog files).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
#[derive(Debug, PartialEq, Eq)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub const fn no_match() -> Self {
        Self {
            code: NO_MATCH,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        // Classify by the first library error in the chain
        let code = match err.chain().find_map(|e| e.downcast_ref::<CardsightError>()) {
            Some(CardsightError::CatalogNotInitialized(_)) => CATALOG_UNAVAILABLE,
            Some(CardsightError::CatalogCorrupt(_)) => CATALOG_CORRUPT,
            Some(CardsightError::ImageDecode { .. } | CardsightError::EmptyReferenceSet { .. }) => {
                INPUT_ERROR
            }
            Some(CardsightError::Io { .. } | CardsightError::Serialization(_)) => IO_ERROR,
            Some(CardsightError::InvalidConfig(_) | CardsightError::InvalidHash(_)) => USAGE_ERROR,
            None => GENERAL_ERROR,
        };

        Self {
            code,
            message: Some(format!("{err:#}")),
        }
    }
}
