use std::{collections::BTreeMap, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use ciborium::Value;
use const_oid::ObjectIdentifier;
use coset::{iana, CoseSign1Builder, HeaderBuilder};
use der::asn1::OctetString;
use rand::random;
use sha1::{Digest, Sha1};
use signature::{Keypair, Signer};
use time::macros::datetime;
use x509_cert::{
    builder::{Builder, CertificateBuilder, Profile},
    ext::pkix::{
        AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages,
        SubjectKeyIdentifier,
    },
    spki::{
        DynSignatureAlgorithmIdentifier, EncodePublicKey, SignatureBitStringEncoding,
        SubjectPublicKeyInfoOwned,
    },
    time::Validity,
    Certificate,
};

use mdoc_transfer::{
    cbor,
    cose::{CoseSign1, X5CHAIN_COSE_HEADER_LABEL},
    definitions::{
        device_request::{DataElements, ZK_REQUEST_KEY},
        helpers::{OrderedMap, Tag24},
        x509::{
            trust_anchor::{TrustAnchor, TrustAnchorRegistry, TrustPurpose},
            validation::extensions::mdoc_reader_extended_key_usage_oid,
            X5Chain,
        },
        DeviceRequest, DocRequest, ItemsRequest, SessionTranscript, ZkRequest,
    },
    presentation::{
        self, document_store::DocumentState, InMemoryDocumentStore, Request, StoredDocument,
        X509ReaderTrustStore,
    },
};

#[allow(dead_code)]
pub const MDL: &str = "org.iso.18013.5.1.mDL";
#[allow(dead_code)]
pub const MDL_NAMESPACE: &str = "org.iso.18013.5.1";
#[allow(dead_code)]
pub const PID: &str = "eu.europa.ec.eudi.pid.1";

#[allow(dead_code)]
fn main() {}

/// The key a reader signs its requests with.
#[allow(dead_code)]
pub enum ReaderKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
}

#[allow(dead_code)]
impl ReaderKey {
    /// The COSE algorithm matching the curve of the key.
    pub fn algorithm(&self) -> iana::Algorithm {
        match self {
            Self::P256(_) => iana::Algorithm::ES256,
            Self::P384(_) => iana::Algorithm::ES384,
        }
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::P256(key) => {
                let signature: p256::ecdsa::Signature = key.sign(data);
                signature.to_bytes().to_vec()
            }
            Self::P384(key) => {
                let signature: p384::ecdsa::Signature = key.sign(data);
                signature.to_bytes().to_vec()
            }
        }
    }
}

/// A reader CA and a reader certificate issued by it.
#[allow(dead_code)]
pub struct Reader {
    pub ca: Certificate,
    pub certificate: Certificate,
    pub key: ReaderKey,
}

#[allow(dead_code)]
impl Reader {
    /// P-256 reader issued by a P-256 CA.
    pub fn new(common_name: &str) -> Result<Self> {
        let ca_key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let ca = issue::<_, p256::ecdsa::DerSignature>(
            "CN=Reader CA",
            "CN=Reader CA",
            SubjectPublicKeyInfoOwned::from_key(*ca_key.verifying_key())?,
            &ca_key,
            CertificateExtensions::ReaderCa,
        )?;
        let certificate = issue::<_, p256::ecdsa::DerSignature>(
            &format!("CN={common_name}"),
            "CN=Reader CA",
            SubjectPublicKeyInfoOwned::from_key(*key.verifying_key())?,
            &ca_key,
            CertificateExtensions::Reader(mdoc_reader_extended_key_usage_oid()),
        )?;
        Ok(Self {
            ca,
            certificate,
            key: ReaderKey::P256(key),
        })
    }

    /// P-384 reader issued by a P-384 CA.
    pub fn p384(common_name: &str) -> Result<Self> {
        let ca_key = p384::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let key = p384::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let ca = issue::<_, p384::ecdsa::DerSignature>(
            "CN=Reader CA",
            "CN=Reader CA",
            SubjectPublicKeyInfoOwned::from_key(*ca_key.verifying_key())?,
            &ca_key,
            CertificateExtensions::ReaderCa,
        )?;
        let certificate = issue::<_, p384::ecdsa::DerSignature>(
            &format!("CN={common_name}"),
            "CN=Reader CA",
            SubjectPublicKeyInfoOwned::from_key(*key.verifying_key())?,
            &ca_key,
            CertificateExtensions::Reader(mdoc_reader_extended_key_usage_oid()),
        )?;
        Ok(Self {
            ca,
            certificate,
            key: ReaderKey::P384(key),
        })
    }

    /// Signs with the CA key and presents the CA certificate as its own.
    pub fn ca_only() -> Result<Self> {
        let ca_key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let ca = issue::<_, p256::ecdsa::DerSignature>(
            "CN=Reader CA",
            "CN=Reader CA",
            SubjectPublicKeyInfoOwned::from_key(*ca_key.verifying_key())?,
            &ca_key,
            CertificateExtensions::ReaderCa,
        )?;
        Ok(Self {
            certificate: ca.clone(),
            ca,
            key: ReaderKey::P256(ca_key),
        })
    }

    pub fn x5chain(&self) -> Result<X5Chain> {
        X5Chain::builder()
            .with_certificate(self.certificate.clone())?
            .build()
    }

    /// Trust store holding this reader's CA.
    pub fn trust_store(&self) -> Arc<X509ReaderTrustStore> {
        let registry = TrustAnchorRegistry {
            anchors: vec![TrustAnchor {
                certificate: self.ca.clone(),
                purpose: TrustPurpose::ReaderCa,
            }],
        };
        Arc::new(X509ReaderTrustStore::new(registry))
    }
}

/// Extensions added on top of the key identifiers.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum CertificateExtensions {
    ReaderCa,
    Reader(ObjectIdentifier),
}

fn key_identifier(spki: &SubjectPublicKeyInfoOwned) -> Result<OctetString> {
    Ok(OctetString::new(
        Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec(),
    )?)
}

/// Issue a certificate valid for ten minutes, signed by `issuer_key`.
#[allow(dead_code)]
pub fn issue<S, Signature>(
    subject: &str,
    issuer: &str,
    subject_public_key: SubjectPublicKeyInfoOwned,
    issuer_key: &S,
    extensions: CertificateExtensions,
) -> Result<Certificate>
where
    S: Keypair + DynSignatureAlgorithmIdentifier + Signer<Signature>,
    S::VerifyingKey: EncodePublicKey,
    Signature: SignatureBitStringEncoding,
{
    let issuer_public_key = SubjectPublicKeyInfoOwned::from_key(issuer_key.verifying_key())?;
    let mut builder = CertificateBuilder::new(
        Profile::Manual {
            issuer: Some(issuer.parse()?),
        },
        random::<u64>().into(),
        Validity::from_now(Duration::from_secs(600))?,
        subject.parse()?,
        subject_public_key.clone(),
        issuer_key,
    )?;

    builder.add_extension(&SubjectKeyIdentifier(key_identifier(&subject_public_key)?))?;
    builder.add_extension(&AuthorityKeyIdentifier {
        key_identifier: Some(key_identifier(&issuer_public_key)?),
        ..Default::default()
    })?;
    match extensions {
        CertificateExtensions::ReaderCa => {
            builder.add_extension(&KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign))?;
            builder.add_extension(&BasicConstraints {
                ca: true,
                path_len_constraint: Some(0),
            })?;
        }
        CertificateExtensions::Reader(extended_key_usage) => {
            builder.add_extension(&KeyUsage(KeyUsages::DigitalSignature.into()))?;
            builder.add_extension(&ExtendedKeyUsage(vec![extended_key_usage]))?;
        }
    }

    Ok(builder.build::<Signature>()?)
}

/// Where the reader puts its certificate chain in the COSE headers.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum ChainPlacement {
    Protected,
    Unprotected,
    Absent,
}

#[allow(dead_code)]
pub fn transcript() -> Value {
    SessionTranscript::qr(vec![0xa0], vec![0xa1, 0x01, 0x02]).to_value()
}

#[allow(dead_code)]
pub fn items_request(
    doc_type: &str,
    elements: &[(&str, bool)],
    zk_request: Option<ZkRequest>,
) -> Result<Tag24<ItemsRequest>> {
    let elements: DataElements = OrderedMap::try_from(
        elements
            .iter()
            .map(|(element, retain)| (element.to_string(), *retain))
            .collect::<Vec<_>>(),
    )?;
    let request_info = zk_request
        .map(|zk_request| -> Result<_> {
            Ok(BTreeMap::from([(
                ZK_REQUEST_KEY.to_string(),
                cbor::into_value(&zk_request)?,
            )]))
        })
        .transpose()?;
    let namespace = if doc_type == PID { PID } else { MDL_NAMESPACE };
    Ok(Tag24::new(ItemsRequest {
        doc_type: doc_type.to_string(),
        namespaces: OrderedMap::try_from(vec![(namespace.to_string(), elements)])?,
        request_info,
    })?)
}

#[allow(dead_code)]
pub fn unsigned_doc_request(items_request: Tag24<ItemsRequest>) -> DocRequest {
    DocRequest {
        items_request,
        reader_auth: None,
    }
}

/// Sign the request over `transcript` with a detached signature in the reader key's algorithm.
#[allow(dead_code)]
pub fn signed_doc_request(
    items_request: Tag24<ItemsRequest>,
    reader: &Reader,
    transcript: &Value,
    placement: ChainPlacement,
) -> Result<DocRequest> {
    let algorithm = reader.key.algorithm();
    signed_doc_request_with_algorithm(items_request, reader, transcript, placement, algorithm)
}

/// Sign the request, declaring `algorithm` in the protected header whatever the key is.
#[allow(dead_code)]
pub fn signed_doc_request_with_algorithm(
    items_request: Tag24<ItemsRequest>,
    reader: &Reader,
    transcript: &Value,
    placement: ChainPlacement,
    algorithm: iana::Algorithm,
) -> Result<DocRequest> {
    let mut doc_request = unsigned_doc_request(items_request);
    let payload = doc_request
        .reader_authentication_bytes(transcript)
        .context("unable to encode ReaderAuthentication")?;

    let x5chain = reader.x5chain()?.into_cbor();
    let mut protected = HeaderBuilder::new().algorithm(algorithm);
    let mut unprotected = HeaderBuilder::new();
    match placement {
        ChainPlacement::Protected => {
            protected = protected.value(X5CHAIN_COSE_HEADER_LABEL, x5chain);
        }
        ChainPlacement::Unprotected => {
            unprotected = unprotected.value(X5CHAIN_COSE_HEADER_LABEL, x5chain);
        }
        ChainPlacement::Absent => {}
    }

    let sign1 = CoseSign1Builder::new()
        .protected(protected.build())
        .unprotected(unprotected.build())
        .create_detached_signature(&payload, &[], |data| reader.key.sign(data))
        .build();
    doc_request.reader_auth = Some(CoseSign1::new(sign1));
    Ok(doc_request)
}

#[allow(dead_code)]
pub fn device_request(doc_requests: Vec<DocRequest>, transcript: &Value) -> Result<Request> {
    let device_request = DeviceRequest {
        version: DeviceRequest::VERSION.to_string(),
        doc_requests,
    };
    Ok(presentation::DeviceRequest::new(
        cbor::to_vec(&device_request)?,
        cbor::to_vec(transcript)?,
    )
    .into())
}

#[allow(dead_code)]
pub fn stored(id: &str, doc_type: &str) -> StoredDocument {
    StoredDocument {
        id: id.into(),
        doc_type: doc_type.to_string(),
        state: DocumentState::Issued,
        valid_from: datetime!(2024-01-01 0:00 UTC),
        valid_until: datetime!(2030-01-01 0:00 UTC),
    }
}

#[allow(dead_code)]
pub fn store(documents: Vec<StoredDocument>) -> Arc<InMemoryDocumentStore> {
    Arc::new(
        InMemoryDocumentStore::new(documents).with_validation_time(datetime!(2025-06-01 0:00 UTC)),
    )
}
