use const_oid::AssociatedOid;
use const_oid::ObjectIdentifier;
use der::Decode;
use x509_cert::ext::{
    pkix::{name::GeneralName, IssuerAltName},
    Extension,
};

use super::Error;
use super::ExtensionValidator;

/// IssuerAlternativeName may only hold email addresses and URIs.
pub struct IssuerAlternativeNameValidator;

impl IssuerAlternativeNameValidator {
    fn check(ian: IssuerAltName) -> Option<Error> {
        if !ian.0.iter().all(|gn| {
            matches!(
                gn,
                GeneralName::Rfc822Name(_) | GeneralName::UniformResourceIdentifier(_)
            )
        }) {
            Some(format!("invalid type found in general names: {:?}", ian.0))
        } else {
            None
        }
    }
}

impl ExtensionValidator for IssuerAlternativeNameValidator {
    fn oid(&self) -> ObjectIdentifier {
        IssuerAltName::OID
    }

    fn ext_name(&self) -> &'static str {
        "IssuerAlternativeName"
    }

    fn validate(&self, extension: &Extension) -> Vec<Error> {
        let bytes = extension.extn_value.as_bytes();
        match IssuerAltName::from_der(bytes) {
            Ok(ian) => Self::check(ian).into_iter().collect(),
            Err(e) => vec![format!("failed to decode: {e}")],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names() {
        let email = GeneralName::Rfc822Name("ca@example.com".to_string().try_into().unwrap());
        let dns = GeneralName::DnsName("example.com".to_string().try_into().unwrap());

        let only_email = IssuerAltName(vec![email.clone()]);
        assert!(IssuerAlternativeNameValidator::check(only_email).is_none());
        let with_dns = IssuerAltName(vec![email, dns]);
        assert!(IssuerAlternativeNameValidator::check(with_dns).is_some());
    }
}
