use const_oid::AssociatedOid;
use der::Decode;
use x509_cert::ext::{
    pkix::{
        name::{DistributionPointName, GeneralName},
        CrlDistributionPoints,
    },
    Extension,
};

use super::{Error, ExtensionValidator};

/// CRLDistributionPoints validation: every point is a full name with a URI, and sets neither
/// reasons nor a CRL issuer.
pub struct CrlDistributionPointsValidator;

impl CrlDistributionPointsValidator {
    fn check(crl_distribution_points: CrlDistributionPoints) -> Vec<Error> {
        if crl_distribution_points.0.is_empty() {
            return vec!["expected one or more distribution points".into()];
        }
        let mut errors = vec![];
        for point in crl_distribution_points.0.into_iter() {
            if point.crl_issuer.is_some() {
                errors.push(format!(
                    "crl_issuer cannot be set, but is set for: {point:?}"
                ))
            }

            if point.reasons.is_some() {
                errors.push(format!("reasons cannot be set, but is set for: {point:?}",))
            }

            let has_uri = point
                .distribution_point
                .as_ref()
                .is_some_and(|dpn| match dpn {
                    DistributionPointName::FullName(names) => names
                        .iter()
                        .any(|gn| matches!(gn, GeneralName::UniformResourceIdentifier(_))),
                    DistributionPointName::NameRelativeToCRLIssuer(_) => false,
                });
            if !has_uri {
                errors.push(format!("point is invalid: {point:?}",))
            }
        }
        errors
    }
}

impl ExtensionValidator for CrlDistributionPointsValidator {
    fn oid(&self) -> const_oid::ObjectIdentifier {
        CrlDistributionPoints::OID
    }

    fn ext_name(&self) -> &'static str {
        "CrlDistributionPoints"
    }

    fn validate(&self, extension: &Extension) -> Vec<Error> {
        let bytes = extension.extn_value.as_bytes();
        match CrlDistributionPoints::from_der(bytes) {
            Ok(crl_dps) => Self::check(crl_dps),
            Err(e) => vec![format!("failed to decode: {e}")],
        }
    }
}
