use der::DecodePem;
use serde::{Deserialize, Serialize};
use x509_cert::Certificate;

use super::Error;

/// What a trust anchor is trusted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustPurpose {
    /// Issuing authority certificate authority, for document signer chains.
    Iaca,
    /// Certificate authority for mdoc reader certificates.
    ReaderCa,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    pub certificate: Certificate,
    pub purpose: TrustPurpose,
}

/// Serializable form of a [TrustAnchor], for loading trust anchors from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PemTrustAnchor {
    pub certificate_pem: String,
    pub purpose: TrustPurpose,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchorRegistry {
    pub anchors: Vec<TrustAnchor>,
}

impl TrustAnchor {
    pub fn from_pem(pem: &str, purpose: TrustPurpose) -> Result<Self, Error> {
        let certificate =
            Certificate::from_pem(pem).map_err(|e| Error::CertificateDecoding(e.to_string()))?;
        Ok(Self {
            certificate,
            purpose,
        })
    }
}

impl TryFrom<PemTrustAnchor> for TrustAnchor {
    type Error = Error;

    fn try_from(value: PemTrustAnchor) -> Result<Self, Self::Error> {
        Self::from_pem(&value.certificate_pem, value.purpose)
    }
}

impl TrustAnchorRegistry {
    /// Build a registry from configured PEM trust anchors.
    ///
    /// Fails on the first certificate that cannot be decoded.
    pub fn from_pem_anchors(anchors: Vec<PemTrustAnchor>) -> Result<Self, Error> {
        let anchors = anchors
            .into_iter()
            .map(TrustAnchor::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { anchors })
    }

    pub fn anchors_for(&self, purpose: TrustPurpose) -> impl Iterator<Item = &Certificate> + '_ {
        self.anchors
            .iter()
            .filter(move |anchor| anchor.purpose == purpose)
            .map(|anchor| &anchor.certificate)
    }
}
