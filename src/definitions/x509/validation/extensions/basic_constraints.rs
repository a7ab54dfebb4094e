use const_oid::AssociatedOid;
use der::Decode;
use x509_cert::ext::{pkix::BasicConstraints, Extension};

use super::{Error, ExtensionValidator};

/// BasicConstraints validation for the certificates of a reader chain.
pub enum BasicConstraintsValidator {
    /// An issuing certificate, with this many CA certificates between it and the reader.
    Ca { ca_certificates_below: usize },
    /// The reader certificate.
    EndEntity,
}

impl BasicConstraintsValidator {
    fn check(&self, constraints: BasicConstraints) -> Option<Error> {
        match self {
            Self::Ca {
                ca_certificates_below,
            } => {
                if !constraints.ca {
                    Some(format!("expected to be CA:true, but found: {constraints:?}"))
                } else if constraints
                    .path_len_constraint
                    .is_some_and(|path_len| usize::from(path_len) < *ca_certificates_below)
                {
                    Some(format!(
                        "path length does not allow {ca_certificates_below} CA certificate(s) \
                         below, found: {constraints:?}"
                    ))
                } else {
                    None
                }
            }
            Self::EndEntity => constraints
                .ca
                .then(|| format!("expected to be CA:false, but found: {constraints:?}")),
        }
    }
}

impl ExtensionValidator for BasicConstraintsValidator {
    fn oid(&self) -> const_oid::ObjectIdentifier {
        BasicConstraints::OID
    }

    fn ext_name(&self) -> &'static str {
        "BasicConstraints"
    }

    fn validate(&self, extension: &Extension) -> Vec<Error> {
        let mut errors = vec![];

        if matches!(self, Self::Ca { .. }) && !extension.critical {
            tracing::warn!("expected BasicConstraints extension to be critical",)
        }

        let bytes = extension.extn_value.as_bytes();
        let basic_constraints = BasicConstraints::from_der(bytes);
        match basic_constraints {
            Ok(bc) => {
                if let Some(e) = self.check(bc) {
                    errors.push(e);
                }
            }
            Err(e) => errors.push(format!("failed to decode: {e}")),
        }

        errors
    }
}
