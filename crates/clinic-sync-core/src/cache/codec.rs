//! Conversion between typed records and store rows.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::store::{Collection, Row};

pub(crate) fn decode_row<T: DeserializeOwned>(collection: Collection, row: Row) -> SyncResult<T> {
    serde_json::from_value(Value::Object(row)).map_err(|source| SyncError::Decode { collection, source })
}

pub(crate) fn encode_row<S: Serialize + ?Sized>(collection: Collection, value: &S) -> SyncResult<Row> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(SyncError::InvalidInput(format!(
            "{collection} write must be an object, got {other}"
        ))),
        Err(err) => Err(SyncError::InvalidInput(err.to_string())),
    }
}
