use super::request_reader::CreateKeyRequest;
use crate::domain::account::AccountId;
use crate::domain::pix_key::PixKey;
use crate::error::RegistrationError;
use serde::Serialize;
use std::io::Write;

pub const CREATED: &str = "created";

#[derive(Debug, Serialize)]
struct OutcomeRow<'a> {
    account: AccountId,
    kind: &'a str,
    key: &'a str,
    outcome: &'a str,
}

/// Writes one `account,kind,key,outcome` row per processed request.
///
/// The outcome is `created` or the stable error code, never an error message.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_outcome(
        &mut self,
        request: &CreateKeyRequest,
        outcome: &Result<PixKey, RegistrationError>,
    ) -> Result<(), csv::Error> {
        let row = match outcome {
            Ok(pix_key) => OutcomeRow {
                account: pix_key.account_id,
                kind: pix_key.kind.as_str(),
                key: &pix_key.key,
                outcome: CREATED,
            },
            Err(e) => OutcomeRow {
                account: request.account,
                kind: request.kind.trim(),
                key: request.key.trim(),
                outcome: e.code(),
            },
        };
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }
}
