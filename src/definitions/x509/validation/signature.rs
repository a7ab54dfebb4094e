use der::Encode;
use ecdsa::signature::Verifier;
use p256::NistP256;
use p384::NistP384;
use x509_cert::Certificate;

use crate::definitions::x509::util::{public_key, SupportedCurve};

/// Check that the issuer certificate signed the subject certificate.
pub fn issuer_signed_subject(subject: &Certificate, issuer: &Certificate) -> bool {
    let tbs = match subject.tbs_certificate.to_der() {
        Ok(tbs) => tbs,
        Err(e) => {
            tracing::error!("failed to encode subject tbs: {e:?}");
            return false;
        }
    };
    let signature = subject.signature.raw_bytes();

    let result = match SupportedCurve::from_certificate(issuer) {
        Some(SupportedCurve::P256) => public_key::<NistP256>(issuer).and_then(|key| {
            let sig = p256::ecdsa::Signature::from_der(signature)?;
            Ok(key.verify(&tbs, &sig)?)
        }),
        Some(SupportedCurve::P384) => public_key::<NistP384>(issuer).and_then(|key| {
            let sig = p384::ecdsa::Signature::from_der(signature)?;
            Ok(key.verify(&tbs, &sig)?)
        }),
        None => {
            tracing::warn!("issuer public key uses an unsupported curve");
            return false;
        }
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::info!("subject certificate signature could not be validated: {e:?}");
            false
        }
    }
}
