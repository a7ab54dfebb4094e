use const_oid::{AssociatedOid, ObjectIdentifier};
use der::Decode;
use sha1::{Digest, Sha1};
use x509_cert::{
    ext::{pkix::SubjectKeyIdentifier, Extension},
    Certificate,
};

use super::Error;
use super::ExtensionValidator;

/// Checks that the key identifier is the SHA-1 digest of the subject public key.
pub struct SubjectKeyIdentifierValidator {
    subject_public_key_bitstring_raw_bytes: Vec<u8>,
}

impl SubjectKeyIdentifierValidator {
    pub fn from_certificate(certificate: &Certificate) -> Self {
        Self {
            subject_public_key_bitstring_raw_bytes: certificate
                .tbs_certificate
                .subject_public_key_info
                .subject_public_key
                .raw_bytes()
                .to_owned(),
        }
    }

    fn check(&self, ski: SubjectKeyIdentifier) -> Option<Error> {
        let expected_digest = ski.0.as_bytes();
        let digest = Sha1::digest(&self.subject_public_key_bitstring_raw_bytes);

        if digest.as_slice() != expected_digest {
            Some("public key digest did not match the expected value".into())
        } else {
            None
        }
    }
}

impl ExtensionValidator for SubjectKeyIdentifierValidator {
    fn oid(&self) -> ObjectIdentifier {
        SubjectKeyIdentifier::OID
    }

    fn ext_name(&self) -> &'static str {
        "SubjectKeyIdentifier"
    }

    fn validate(&self, extension: &Extension) -> Vec<Error> {
        let bytes = extension.extn_value.as_bytes();
        match SubjectKeyIdentifier::from_der(bytes) {
            Ok(ski) => self.check(ski).into_iter().collect(),
            Err(e) => vec![format!("failed to decode: {e}")],
        }
    }
}
