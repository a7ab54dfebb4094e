//! Extension profiles for certificates in a reader authentication chain, after Annex B of
//! ISO18013-5. The mdoc reader profile is table B.8; the certificates above the reader only need
//! to be usable as certificate authorities.

mod basic_constraints;
mod crl_distribution_points;
mod extended_key_usage;
mod issuer_alternative_name;
mod key_usage;
mod subject_key_identifier;

use std::ops::Deref;

use basic_constraints::BasicConstraintsValidator;
use const_oid::db;
use const_oid::AssociatedOid;
use const_oid::ObjectIdentifier;
use crl_distribution_points::CrlDistributionPointsValidator;
use extended_key_usage::ExtendedKeyUsageValidator;
use issuer_alternative_name::IssuerAlternativeNameValidator;
use key_usage::KeyUsageValidator;
use subject_key_identifier::SubjectKeyIdentifierValidator;
use x509_cert::ext::{
    pkix::{FreshestCrl, InhibitAnyPolicy, NameConstraints, PolicyConstraints, PolicyMappings},
    Extension,
};
use x509_cert::Certificate;

pub use extended_key_usage::mdoc_reader_extended_key_usage_oid;

type Error = String;

/// Validate mdoc reader extensions according to 18013-5 Annex B.
pub fn validate_mdoc_reader_certificate_extensions(certificate: &Certificate) -> Vec<Error> {
    tracing::debug!("validating mdoc_reader certificate extensions...");

    let extensions = certificate.tbs_certificate.extensions.iter().flatten();

    let mut errors: Vec<Error> = check_for_disallowed_x509_extensions(extensions.clone());

    errors.extend(
        ExtensionValidators::default()
            .with(SubjectKeyIdentifierValidator::from_certificate(certificate))
            .with(ExtendedKeyUsageValidator {
                expected_oid: mdoc_reader_extended_key_usage_oid(),
            })
            .with(KeyUsageValidator::mdoc_reader())
            .with_optional(BasicConstraintsValidator::EndEntity)
            .with_optional(CrlDistributionPointsValidator)
            .with_optional(IssuerAlternativeNameValidator)
            .validate_extensions(extensions),
    );

    errors
}

/// Validate the extensions of a certificate that issues certificates in a reader chain.
///
/// `ca_certificates_below` is the number of CA certificates between this one and the reader
/// certificate, which its path length constraint must allow.
pub fn validate_reader_ca_certificate_extensions(
    certificate: &Certificate,
    ca_certificates_below: usize,
) -> Vec<Error> {
    tracing::debug!("validating reader CA certificate extensions...");

    let extensions = certificate.tbs_certificate.extensions.iter().flatten();

    let mut errors: Vec<Error> = check_for_disallowed_x509_extensions(extensions.clone());

    errors.extend(
        ExtensionValidators::default()
            .with(BasicConstraintsValidator::Ca {
                ca_certificates_below,
            })
            .with_optional(KeyUsageValidator::reader_ca())
            .with_optional(SubjectKeyIdentifierValidator::from_certificate(certificate))
            .with_optional(CrlDistributionPointsValidator)
            .with_optional(IssuerAlternativeNameValidator)
            .validate_extensions(extensions),
    );

    errors
}

#[derive(Default)]
struct ExtensionValidators(Vec<ExpectedExtension>);

struct ExpectedExtension {
    found: bool,
    required: bool,
    validator: Box<dyn ExtensionValidator>,
}

impl Deref for ExpectedExtension {
    type Target = Box<dyn ExtensionValidator>;

    fn deref(&self) -> &Self::Target {
        &self.validator
    }
}

trait ExtensionValidator {
    fn oid(&self) -> ObjectIdentifier;
    fn ext_name(&self) -> &'static str;
    fn validate(&self, extension: &Extension) -> Vec<Error>;
}

impl ExtensionValidators {
    fn with<V: ExtensionValidator + 'static>(self, validator: V) -> Self {
        self.push(validator, true)
    }

    /// Validate the extension if the certificate has it.
    fn with_optional<V: ExtensionValidator + 'static>(self, validator: V) -> Self {
        self.push(validator, false)
    }

    fn push<V: ExtensionValidator + 'static>(mut self, validator: V, required: bool) -> Self {
        self.0.push(ExpectedExtension {
            found: false,
            required,
            validator: Box::new(validator),
        });
        self
    }

    fn validate_extensions<'a, Extensions>(self, extensions: Extensions) -> Vec<Error>
    where
        Extensions: IntoIterator<Item = &'a Extension>,
    {
        let mut validation_errors = vec![];

        let mut validators = self.0;

        for ext in extensions {
            if let Some(validator) = validators
                .iter_mut()
                .find(|validator| validator.oid() == ext.extn_id)
            {
                tracing::debug!("validating extension: {}", ext.extn_id);
                validation_errors.extend(
                    validator
                        .validate(ext)
                        .into_iter()
                        .map(|e| format!("{}: {e}", validator.ext_name())),
                );
                validator.found = true;
            } else if ext.critical {
                tracing::debug!("unknown critical extension causing an error: {}", ext.extn_id);
                validation_errors.push(format!(
                    "contains unknown critical extension: {}",
                    ext.extn_id
                ));
            } else {
                tracing::debug!("non-critical, unknown extension ignored: {}", ext.extn_id)
            }
        }

        validation_errors.extend(
            validators
                .iter()
                .filter(|v| v.required && !v.found)
                .map(|v| format!("{}: required extension not found", v.ext_name())),
        );

        validation_errors
    }
}

/// As identified in 18013-5 Annex B, section B.1.1.
fn check_for_disallowed_x509_extensions<'a, E>(extensions: E) -> Vec<Error>
where
    E: Iterator<Item = &'a Extension> + Clone,
{
    let disallowed_extensions = [
        PolicyMappings::OID,
        NameConstraints::OID,
        PolicyConstraints::OID,
        InhibitAnyPolicy::OID,
        FreshestCrl::OID,
    ];

    extensions
        .map(|e| e.extn_id)
        .filter(|id| disallowed_extensions.contains(id))
        .map(|id| {
            format!(
                "extension is not allowed: {}",
                db::DB
                    .by_oid(&id)
                    .map(|s| s.to_string())
                    .unwrap_or(id.to_string())
            )
        })
        .collect()
}

#[cfg(test)]
mod test {
    use der::asn1::OctetString;
    use x509_cert::ext::pkix::BasicConstraints;

    use super::*;
    use crate::definitions::x509::test::{
        certificate, issue, issue_ca, key, self_signed, spki, CertificateExtensions,
    };

    #[test]
    fn reader_certificate_passes_reader_profile() {
        let ca_key = key();
        let reader = issue("CN=Reader", "CN=Reader CA", &key(), &ca_key);
        let errors = validate_mdoc_reader_certificate_extensions(&reader);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn ca_certificate_fails_reader_profile() {
        let ca = self_signed("CN=Reader CA", &key());
        let errors = validate_mdoc_reader_certificate_extensions(&ca);
        assert!(
            errors.iter().any(|e| e.starts_with("ExtendedKeyUsage")),
            "{errors:?}"
        );
        assert!(errors.iter().any(|e| e.starts_with("KeyUsage")), "{errors:?}");
        assert!(
            errors.iter().any(|e| e.starts_with("BasicConstraints")),
            "{errors:?}"
        );
    }

    #[test]
    fn reader_with_other_extended_key_usage_fails_reader_profile() {
        let ca_key = key();
        let reader_key = key();
        let document_signer = certificate::<_, p256::ecdsa::DerSignature>(
            "CN=Reader",
            "CN=Reader CA",
            spki(*reader_key.verifying_key()),
            &ca_key,
            CertificateExtensions::Reader {
                extended_key_usage: ObjectIdentifier::new_unwrap("1.0.18013.5.1.2"),
            },
        );
        let errors = validate_mdoc_reader_certificate_extensions(&document_signer);
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].starts_with("ExtendedKeyUsage"), "{errors:?}");
    }

    #[test]
    fn ca_certificates_pass_ca_profile() {
        let root_key = key();
        let root = self_signed("CN=Reader Root", &root_key);
        let intermediate = issue_ca("CN=Reader CA", "CN=Reader Root", &key(), &root_key);
        assert!(validate_reader_ca_certificate_extensions(&root, 1).is_empty());
        assert!(validate_reader_ca_certificate_extensions(&intermediate, 0).is_empty());
    }

    #[test]
    fn path_length_constraint_is_enforced() {
        let root_key = key();
        let intermediate = issue_ca("CN=Reader CA", "CN=Reader Root", &key(), &root_key);
        let errors = validate_reader_ca_certificate_extensions(&intermediate, 1);
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert!(errors[0].starts_with("BasicConstraints"), "{errors:?}");
    }

    #[test]
    fn reader_certificate_fails_ca_profile() {
        let reader = issue("CN=Reader", "CN=Reader CA", &key(), &key());
        let errors = validate_reader_ca_certificate_extensions(&reader, 0);
        assert!(
            errors.contains(&"BasicConstraints: required extension not found".to_string()),
            "{errors:?}"
        );
    }

    #[test]
    fn missing_and_unknown_critical_extensions_are_reported() {
        let bc = Extension {
            extn_id: BasicConstraints::OID,
            critical: true,
            extn_value: OctetString::new(vec![0x30, 0x03, 0x01, 0x01, 0xff]).unwrap(),
        };
        let unknown = Extension {
            extn_id: ObjectIdentifier::new_unwrap("1.2.3.4"),
            critical: true,
            extn_value: OctetString::new(vec![0x05, 0x00]).unwrap(),
        };
        let ignored = Extension {
            critical: false,
            ..unknown.clone()
        };

        let errors = ExtensionValidators::default()
            .with(BasicConstraintsValidator::Ca {
                ca_certificates_below: 0,
            })
            .with(KeyUsageValidator::reader_ca())
            .with_optional(IssuerAlternativeNameValidator)
            .validate_extensions([&bc, &unknown, &ignored]);
        assert_eq!(
            errors,
            vec![
                "contains unknown critical extension: 1.2.3.4".to_string(),
                "KeyUsage: required extension not found".to_string(),
            ]
        );
    }

    #[test]
    fn disallowed_extensions_are_named() {
        let inhibit = Extension {
            extn_id: InhibitAnyPolicy::OID,
            critical: true,
            extn_value: OctetString::new(vec![0x02, 0x01, 0x00]).unwrap(),
        };
        let errors = check_for_disallowed_x509_extensions([&inhibit].into_iter());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("extension is not allowed: "));
    }
}
