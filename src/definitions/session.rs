//! `SessionTranscript = [DeviceEngagementBytes, EReaderKeyBytes, Handover]`
use ciborium::Value;

use crate::cbor::{self, CborError};

/// Handover used to establish the session.
#[derive(Clone, Debug, PartialEq)]
pub enum Handover {
    /// QR code engagement, encoded as CBOR `null`.
    Qr,
    /// NFC negotiated or static handover.
    Nfc {
        handover_select: Vec<u8>,
        handover_request: Option<Vec<u8>>,
    },
    /// Any other handover structure, kept as received.
    Other(Value),
}

/// Session transcript shared by the holder and the reader.
///
/// The engagement and reader key fields hold the encoded items that get wrapped in tag 24.
/// They are `None` for transports that do not use them, and encode as `null`.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionTranscript {
    pub device_engagement_bytes: Option<Vec<u8>>,
    pub e_reader_key_bytes: Option<Vec<u8>>,
    pub handover: Handover,
}

impl SessionTranscript {
    pub fn qr(device_engagement_bytes: Vec<u8>, e_reader_key_bytes: Vec<u8>) -> Self {
        Self {
            device_engagement_bytes: Some(device_engagement_bytes),
            e_reader_key_bytes: Some(e_reader_key_bytes),
            handover: Handover::Qr,
        }
    }

    pub fn to_value(&self) -> Value {
        let handover = match &self.handover {
            Handover::Qr => Value::Null,
            Handover::Nfc {
                handover_select,
                handover_request,
            } => Value::Array(vec![
                Value::Bytes(handover_select.clone()),
                handover_request
                    .clone()
                    .map(Value::Bytes)
                    .unwrap_or(Value::Null),
            ]),
            Handover::Other(value) => value.clone(),
        };
        Value::Array(vec![
            tagged_or_null(&self.device_engagement_bytes),
            tagged_or_null(&self.e_reader_key_bytes),
            handover,
        ])
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CborError> {
        cbor::to_vec(&self.to_value())
    }

    pub fn from_value(value: Value) -> Result<Self, CborError> {
        let Value::Array(items) = value else {
            return Err(CborError::UnexpectedItem(
                "session transcript is not an array".to_string(),
            ));
        };
        let [device_engagement, e_reader_key, handover]: [Value; 3] =
            items.try_into().map_err(|items: Vec<Value>| {
                CborError::UnexpectedItem(format!(
                    "session transcript has {} elements, expected 3",
                    items.len()
                ))
            })?;

        let handover = match handover {
            Value::Null => Handover::Qr,
            Value::Array(parts) => {
                nfc_handover(&parts).unwrap_or(Handover::Other(Value::Array(parts)))
            }
            other => Handover::Other(other),
        };

        Ok(Self {
            device_engagement_bytes: untag_or_null(device_engagement)?,
            e_reader_key_bytes: untag_or_null(e_reader_key)?,
            handover,
        })
    }
}

fn nfc_handover(parts: &[Value]) -> Option<Handover> {
    match parts {
        [Value::Bytes(select), Value::Bytes(request)] => Some(Handover::Nfc {
            handover_select: select.clone(),
            handover_request: Some(request.clone()),
        }),
        [Value::Bytes(select), Value::Null] => Some(Handover::Nfc {
            handover_select: select.clone(),
            handover_request: None,
        }),
        _ => None,
    }
}

fn tagged_or_null(bytes: &Option<Vec<u8>>) -> Value {
    match bytes {
        Some(bytes) => Value::Tag(24, Box::new(Value::Bytes(bytes.clone()))),
        None => Value::Null,
    }
}

fn untag_or_null(value: Value) -> Result<Option<Vec<u8>>, CborError> {
    match value {
        Value::Null => Ok(None),
        Value::Tag(24, inner) => match *inner {
            Value::Bytes(bytes) => Ok(Some(bytes)),
            other => Err(CborError::UnexpectedItem(format!(
                "expected a byte string in tag 24, found {other:?}"
            ))),
        },
        other => Err(CborError::UnexpectedItem(format!(
            "expected a tag 24 item or null, found {other:?}"
        ))),
    }
}
