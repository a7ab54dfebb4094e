use ciborium::Value;
use coset::{iana, AsCborValue, CborSerializable, Label, RegisteredLabelWithPrivate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::X5CHAIN_COSE_HEADER_LABEL;
use crate::cbor::CborError;

/// COSE_Sign1 structure that can be embedded in serde-derived CBOR types.
///
/// Both the tagged (tag 18) and the untagged encodings are accepted when decoding; encoding is
/// always untagged, which is what ISO/IEC 18013-5 uses for `ReaderAuth`.
#[derive(Clone, Debug, PartialEq)]
pub struct CoseSign1(pub coset::CoseSign1);

impl CoseSign1 {
    pub fn new(cose_sign1: coset::CoseSign1) -> Self {
        Self(cose_sign1)
    }

    /// Canonical untagged encoding of the structure.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CborError> {
        self.0.clone().to_vec().map_err(CborError::from)
    }

    /// Signature algorithm from the protected header, if it is an IANA registered one.
    pub fn algorithm(&self) -> Option<iana::Algorithm> {
        match self.0.protected.header.alg {
            Some(RegisteredLabelWithPrivate::Assigned(alg)) => Some(alg),
            _ => None,
        }
    }

    /// The `x5chain` header parameter, looked up in the protected header first and in the
    /// unprotected header otherwise.
    pub fn x5chain(&self) -> Option<&Value> {
        let label = Label::Int(X5CHAIN_COSE_HEADER_LABEL);
        self.0
            .protected
            .header
            .rest
            .iter()
            .chain(self.0.unprotected.rest.iter())
            .find(|(l, _)| *l == label)
            .map(|(_, value)| value)
    }
}

impl Serialize for CoseSign1 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0
            .clone()
            .to_cbor_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CoseSign1 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Value::deserialize(deserializer)? {
            Value::Tag(tag, inner) if tag == iana::CborTag::CoseSign1 as u64 => *inner,
            value => value,
        };

        coset::CoseSign1::from_cbor_value(value)
            .map(CoseSign1)
            .map_err(serde::de::Error::custom)
    }
}
