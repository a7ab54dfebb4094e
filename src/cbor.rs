//! Thin wrapper over [ciborium] used as the envelope codec for every structure the
//! crate reads or writes.
use std::io::Cursor;

use coset::CoseError;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CborError {
    /// CBOR decoding failure.
    #[error("CBOR decoding failure: {0}")]
    DecodeFailed(String),
    /// CBOR encoding failure.
    #[error("CBOR encoding failure: {0}")]
    EncodeFailed(String),
    /// CBOR input had extra data after the first item.
    #[error("extraneous data: {0} trailing bytes")]
    ExtraneousData(usize),
    /// Decoded item did not have the expected shape.
    #[error("unexpected item: {0}")]
    UnexpectedItem(String),
    /// Failure converting to or from a COSE structure.
    #[error("COSE conversion failure: {0}")]
    Cose(String),
}

impl From<CoseError> for CborError {
    fn from(e: CoseError) -> Self {
        match e {
            CoseError::DecodeFailed(e) => CborError::DecodeFailed(e.to_string()),
            CoseError::ExtraneousData => CborError::ExtraneousData(0),
            CoseError::UnexpectedItem(got, want) => {
                CborError::UnexpectedItem(format!("got {got}, want {want}"))
            }
            other => CborError::Cose(format!("{other:?}")),
        }
    }
}

pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, CborError>
where
    T: Serialize,
{
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CborError::EncodeFailed(e.to_string()))?;
    Ok(buf)
}

/// Decode exactly one CBOR item from `slice`.
pub fn from_slice<T>(slice: &[u8]) -> Result<T, CborError>
where
    T: DeserializeOwned,
{
    let mut cursor = Cursor::new(slice);
    let value = ciborium::from_reader(&mut cursor)
        .map_err(|e| CborError::DecodeFailed(e.to_string()))?;
    let trailing = slice.len() - cursor.position() as usize;
    if trailing != 0 {
        return Err(CborError::ExtraneousData(trailing));
    }
    Ok(value)
}

/// Convert a [ciborium::Value] into a type `T`.
pub fn from_value<T>(value: &ciborium::Value) -> Result<T, CborError>
where
    T: DeserializeOwned,
{
    value
        .deserialized()
        .map_err(|e| CborError::UnexpectedItem(e.to_string()))
}

pub fn into_value<S>(v: &S) -> Result<ciborium::Value, CborError>
where
    S: Serialize,
{
    ciborium::Value::serialized(v).map_err(|e| CborError::EncodeFailed(e.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truncated_input_fails() {
        let bytes = to_vec(&vec!["a".to_string(), "b".to_string()]).unwrap();
        let err = from_slice::<ciborium::Value>(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CborError::DecodeFailed(_)), "{err:?}");
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = to_vec(&true).unwrap();
        bytes.push(0xf5);
        let err = from_slice::<ciborium::Value>(&bytes).unwrap_err();
        assert!(matches!(err, CborError::ExtraneousData(1)), "{err:?}");
    }
}
