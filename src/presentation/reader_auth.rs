use super::reader_trust_store::ReaderTrustStore;
use crate::definitions::{
    device_request::{DocRequest, ParsedDeviceRequest},
    x509::X5Chain,
};

/// What is known about the reader that signed a document request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderAuth {
    /// Canonical encoding of the reader's COSE_Sign1.
    pub reader_auth: Vec<u8>,
    pub reader_sign_is_valid: bool,
    /// The chain as presented by the reader, end-entity first.
    pub reader_certificate_chain: X5Chain,
    pub reader_certificate_is_trusted: bool,
    pub reader_common_name: String,
}

/// Reader authentication material that is present but unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("document request {index}: unable to encode the reader authentication: {reason}")]
    Encoding { index: usize, reason: String },
    #[error("document request {index}: unable to decode the reader certificate chain: {reason}")]
    CertificateChain { index: usize, reason: String },
}

/// Build the [ReaderAuth] record of the document request at `index`.
///
/// Returns `None` when the request carries no reader authentication or no `x5chain` header. A
/// bad signature or an untrusted chain still produce a record, with the corresponding flags
/// unset. A chain that does not decode is an error.
pub fn authenticate(
    doc_request: &DocRequest,
    index: usize,
    parsed: &ParsedDeviceRequest,
    trust_store: &dyn ReaderTrustStore,
) -> Result<Option<ReaderAuth>, Error> {
    let reader_sign_is_valid = match parsed.reader_auth_outcome(index) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("reader signature of document request {index} is not valid: {e}");
            false
        }
    };

    let Some(cose_sign1) = doc_request.reader_auth.as_ref() else {
        return Ok(None);
    };
    let Some(x5chain) = cose_sign1.x5chain() else {
        tracing::debug!("document request {index} carries no reader certificate chain");
        return Ok(None);
    };

    let reader_auth = cose_sign1.to_bytes().map_err(|e| Error::Encoding {
        index,
        reason: e.to_string(),
    })?;
    let reader_certificate_chain =
        X5Chain::from_cbor(x5chain).map_err(|e| Error::CertificateChain {
            index,
            reason: e.to_string(),
        })?;

    Ok(Some(ReaderAuth {
        reader_auth,
        reader_sign_is_valid,
        reader_certificate_is_trusted: trust_store
            .validate_certification_trust_path(&reader_certificate_chain),
        reader_common_name: reader_certificate_chain.end_entity_common_name().to_string(),
        reader_certificate_chain,
    }))
}
