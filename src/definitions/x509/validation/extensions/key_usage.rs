use const_oid::AssociatedOid;
use der::{flagset::FlagSet, Decode};
use x509_cert::ext::{
    pkix::{KeyUsage, KeyUsages},
    Extension,
};

use super::{Error, ExtensionValidator};

/// KeyUsage validation for the certificates of a reader chain.
pub struct KeyUsageValidator {
    expected_flagset: FlagSet<KeyUsages>,
    allow_other_usages: bool,
}

impl KeyUsageValidator {
    /// Exactly digitalSignature.
    pub fn mdoc_reader() -> Self {
        Self {
            expected_flagset: KeyUsages::DigitalSignature.into(),
            allow_other_usages: false,
        }
    }

    /// At least keyCertSign.
    pub fn reader_ca() -> Self {
        Self {
            expected_flagset: KeyUsages::KeyCertSign.into(),
            allow_other_usages: true,
        }
    }

    fn check(&self, ku: KeyUsage) -> Option<Error> {
        let matches = if self.allow_other_usages {
            ku.0.contains(self.expected_flagset)
        } else {
            ku.0 == self.expected_flagset
        };
        if !matches {
            Some(format!(
                "unexpected usage: {:?}",
                ku.0.into_iter().collect::<Vec<KeyUsages>>()
            ))
        } else {
            None
        }
    }
}

impl ExtensionValidator for KeyUsageValidator {
    fn oid(&self) -> const_oid::ObjectIdentifier {
        KeyUsage::OID
    }

    fn ext_name(&self) -> &'static str {
        "KeyUsage"
    }

    fn validate(&self, extension: &Extension) -> Vec<Error> {
        let bytes = extension.extn_value.as_bytes();
        let key_usage = KeyUsage::from_der(bytes);

        if !extension.critical {
            tracing::warn!("expected KeyUsage extension to be critical",)
        }

        match key_usage {
            Ok(ku) => self.check(ku).into_iter().collect(),
            Err(e) => vec![format!("failed to decode: {e}")],
        }
    }
}
