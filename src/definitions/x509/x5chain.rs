use anyhow::{bail, Context, Error, Result};
use ciborium::Value as CborValue;
use const_oid::AssociatedOid;
use ecdsa::{PrimeCurve, VerifyingKey};
use elliptic_curve::{
    sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint},
    AffinePoint, CurveArithmetic, FieldBytesSize,
};
use x509_cert::der::Encode;
use x509_cert::{certificate::Certificate, der::Decode};

use super::util::{common_name_or_unknown, public_key};
use crate::definitions::helpers::NonEmptyVec;

/// X.509 certificate with the DER representation held in memory for ease of serialization.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CertificateWithDer {
    pub inner: Certificate,
    der: Vec<u8>,
}

impl CertificateWithDer {
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = Certificate::from_der(bytes)
            .context("unable to parse certificate from DER encoding")?;
        Ok(Self {
            inner,
            der: bytes.to_vec(),
        })
    }

    pub fn from_cert(certificate: Certificate) -> Result<Self> {
        let der = certificate.to_der()?;
        Ok(Self {
            inner: certificate,
            der,
        })
    }
}

/// Certificate chain carried in the `x5chain` COSE header, end-entity first.
///
/// The order is the one the peer presented; nothing here checks that consecutive entries
/// actually form a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X5Chain(NonEmptyVec<CertificateWithDer>);

impl From<NonEmptyVec<CertificateWithDer>> for X5Chain {
    fn from(v: NonEmptyVec<CertificateWithDer>) -> Self {
        Self(v)
    }
}

impl X5Chain {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn into_cbor(&self) -> CborValue {
        match &self.0.as_ref() {
            &[cert] => CborValue::Bytes(cert.der.clone()),
            certs => CborValue::Array(
                certs
                    .iter()
                    .map(|x509| x509.der.clone())
                    .map(CborValue::Bytes)
                    .collect::<Vec<CborValue>>(),
            ),
        }
    }

    pub fn from_cbor(cbor: &CborValue) -> Result<Self, Error> {
        match cbor {
            CborValue::Bytes(bytes) => {
                Self::builder().with_der_certificate(bytes)?.build()
            },
            CborValue::Array(x509s) => {
                x509s.iter()
                    .try_fold(Self::builder(), |builder, x509| match x509 {
                        CborValue::Bytes(bytes) => builder.with_der_certificate(bytes),
                        _ => bail!("expected x509 certificate in the x5chain to be a cbor encoded bytestring, but received: {x509:?}")
                    })?
                    .build()
            },
            _ => bail!("expected x5chain to be a cbor encoded bytestring or array, but received: {cbor:?}")
        }
    }

    /// Retrieve the end-entity certificate.
    pub fn end_entity_certificate(&self) -> &Certificate {
        &self.0.first().inner
    }

    /// Retrieve the public key of the end-entity certificate.
    pub fn end_entity_public_key<C>(&self) -> Result<VerifyingKey<C>, Error>
    where
        C: AssociatedOid + CurveArithmetic + PrimeCurve,
        AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
        FieldBytesSize<C>: ModulusSize,
    {
        public_key(self.end_entity_certificate())
    }

    /// Retrieve the common name of the end-entity certificate.
    pub fn end_entity_common_name(&self) -> &str {
        common_name_or_unknown(self.end_entity_certificate())
    }

    /// Retrieve the last certificate of the chain as presented.
    pub fn root_entity_certificate(&self) -> &Certificate {
        &self.0.last().inner
    }

    /// Iterate over the certificates in the chain.
    pub fn iter(&self) -> impl Iterator<Item = &CertificateWithDer> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; an `X5Chain` cannot be built without a certificate.
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[derive(Default, Debug, Clone)]
pub struct Builder {
    certs: Vec<CertificateWithDer>,
}

impl Builder {
    pub fn with_certificate(mut self, cert: Certificate) -> Result<Builder> {
        let x509 = CertificateWithDer::from_cert(cert)?;
        self.certs.push(x509);
        Ok(self)
    }
    pub fn with_der_certificate(mut self, data: &[u8]) -> Result<Builder> {
        let x509 = CertificateWithDer::from_der(data)?;
        self.certs.push(x509);
        Ok(self)
    }
    pub fn build(self) -> Result<X5Chain> {
        Ok(X5Chain(self.certs.try_into().context(
            "at least one certificate must be given to the builder",
        )?))
    }
}
