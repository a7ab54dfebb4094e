//! Device key material for the engagement phase of a session.
use std::sync::OnceLock;

use ciborium::Value;
use coset::{iana, CborSerializable, CoseKey, CoseKeyBuilder};
use elliptic_curve::sec1::ToEncodedPoint;
use hkdf::Hkdf;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use sha2::Sha256;

use crate::cbor::{self, CborError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to encode the device key: {0}")]
    Encoding(#[from] CborError),
    #[error("public key is missing a coordinate")]
    MissingCoordinate,
    #[error("unable to perform HKDF: {0}")]
    Hkdf(String),
}

/// The ephemeral P-256 device key (`EDeviceKey`) of a session.
///
/// The key is generated on first use and kept for the lifetime of the value.
#[derive(Debug, Default)]
pub struct EphemeralDeviceKey {
    secret: OnceLock<SecretKey>,
}

impl EphemeralDeviceKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_generated(&self) -> bool {
        self.secret.get().is_some()
    }

    pub fn secret_key(&self) -> &SecretKey {
        self.secret.get_or_init(|| SecretKey::random(&mut OsRng))
    }

    pub fn public_key(&self) -> PublicKey {
        self.secret_key().public_key()
    }

    /// The public key as a COSE_Key.
    pub fn cose_key(&self) -> Result<CoseKey, Error> {
        let point = self.public_key().to_encoded_point(false);
        let x = point.x().ok_or(Error::MissingCoordinate)?.to_vec();
        let y = point.y().ok_or(Error::MissingCoordinate)?.to_vec();
        Ok(CoseKeyBuilder::new_ec2_pub_key(iana::EllipticCurve::P_256, x, y).build())
    }

    /// `EDeviceKeyBytes`: the COSE_Key embedded with tag 24.
    pub fn cose_key_bytes(&self) -> Result<Vec<u8>, Error> {
        let inner = self.cose_key()?.to_vec().map_err(CborError::from)?;
        Ok(cbor::to_vec(&Value::Tag(24, Box::new(Value::Bytes(inner))))?)
    }

    /// BLE ident used to identify the peripheral in BLE central client mode.
    pub fn ble_ident(&self) -> Result<[u8; 16], Error> {
        let e_device_key_bytes = self.cose_key_bytes()?;
        let mut ble_ident = [0u8; 16];

        Hkdf::<Sha256>::new(None, &e_device_key_bytes)
            .expand("BLEIdent".as_bytes(), &mut ble_ident)
            .map_err(|e| Error::Hkdf(e.to_string()))?;

        Ok(ble_ident)
    }
}
