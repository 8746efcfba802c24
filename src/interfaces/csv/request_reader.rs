use crate::domain::account::{AccountId, BankAccount};
use serde::Deserialize;
use std::io::Read;

/// One row of a batch registration file.
///
/// `kind` and `key` are kept raw so that malformed values are reported as a
/// per-request `invalid_descriptor` outcome instead of a read error.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct CreateKeyRequest {
    pub account: AccountId,
    pub kind: String,
    pub key: String,
}

/// Reads create-key requests from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<CreateKeyRequest, csv::Error>`. It handles whitespace trimming and
/// flexible record lengths automatically.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: trimmed_reader(source),
        }
    }

    /// Returns an iterator that lazily reads and deserializes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<CreateKeyRequest, csv::Error>> {
        self.reader.into_deserialize()
    }
}

/// Reads the `account,status` seed file for bank accounts.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: trimmed_reader(source),
        }
    }

    pub fn accounts(self) -> impl Iterator<Item = Result<BankAccount, csv::Error>> {
        self.reader.into_deserialize()
    }
}

fn trimmed_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source)
}
