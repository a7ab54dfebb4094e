//! Path validation of reader certificate chains against a [TrustAnchorRegistry].
use serde::Serialize;
use time::OffsetDateTime;
use x509_cert::Certificate;

use super::{
    trust_anchor::{TrustAnchorRegistry, TrustPurpose},
    util::common_name_or_unknown,
    X5Chain,
};

pub mod extensions;
pub(super) mod signature;
mod validity;

pub use extensions::{
    validate_mdoc_reader_certificate_extensions, validate_reader_ca_certificate_extensions,
};
pub use signature::issuer_signed_subject;
pub use validity::check_validity_period_at;

/// Options for certificate chain validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// The time to use for validity period checks.
    /// If `None`, the current system time is used.
    pub validation_time: Option<OffsetDateTime>,
}

impl ValidationOptions {
    /// Get the validation time, defaulting to current time if not set.
    fn validation_time(&self) -> OffsetDateTime {
        self.validation_time.unwrap_or_else(OffsetDateTime::now_utc)
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ValidationOutcome {
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a reader certificate chain.
///
/// Every certificate in the chain must be within its validity period, each certificate must be
/// signed by the one following it, and the last certificate must either be a
/// [TrustPurpose::ReaderCa] anchor itself or be issued by one. The end-entity certificate must
/// carry the mdoc reader extension profile, and every certificate after it must be a CA whose
/// path length constraint allows the CA certificates below it.
pub fn validate_reader_chain(
    x5chain: &X5Chain,
    trust_anchors: &TrustAnchorRegistry,
    options: &ValidationOptions,
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    let validation_time = options.validation_time();

    for certificate in x5chain.iter().map(|c| &c.inner) {
        let validity_errors = check_validity_period_at(certificate, validation_time)
            .into_iter()
            .map(|e| {
                format!(
                    "certificate '{}' is {e}",
                    common_name_or_unknown(certificate)
                )
            });
        outcome.errors.extend(validity_errors);
    }

    let certificates: Vec<&Certificate> = x5chain.iter().map(|c| &c.inner).collect();

    let reader = x5chain.end_entity_certificate();
    let reader_extension_errors = validate_mdoc_reader_certificate_extensions(reader)
        .into_iter()
        .map(|e| format!("reader '{}': {e}", common_name_or_unknown(reader)));
    outcome.errors.extend(reader_extension_errors);

    for (position, ca) in certificates.iter().enumerate().skip(1) {
        let ca_extension_errors = validate_reader_ca_certificate_extensions(ca, position - 1)
            .into_iter()
            .map(|e| format!("reader CA '{}': {e}", common_name_or_unknown(ca)));
        outcome.errors.extend(ca_extension_errors);
    }

    for window in certificates.windows(2) {
        let (subject, issuer) = (window[0], window[1]);
        if subject.tbs_certificate.issuer != issuer.tbs_certificate.subject
            || !issuer_signed_subject(subject, issuer)
        {
            outcome.errors.push(format!(
                "certificate '{}' was not issued by '{}'",
                common_name_or_unknown(subject),
                common_name_or_unknown(issuer)
            ));
        }
    }

    let last = x5chain.root_entity_certificate();
    let is_anchor = trust_anchors
        .anchors_for(TrustPurpose::ReaderCa)
        .any(|anchor| anchor == last);

    if !is_anchor {
        let mut candidates = find_trust_anchor_candidates(
            last,
            trust_anchors,
            TrustPurpose::ReaderCa,
            validation_time,
        );
        if candidates.next().is_none() {
            outcome.errors.push(format!(
                "no valid trust anchor found for '{}'",
                common_name_or_unknown(last)
            ));
        } else if candidates.next().is_some() {
            tracing::warn!("more than one trust anchor candidate found, using the first one");
        }
    }

    outcome
}

fn find_trust_anchor_candidates<'a>(
    subject: &'a Certificate,
    trust_anchors: &'a TrustAnchorRegistry,
    trust_purpose: TrustPurpose,
    validation_time: OffsetDateTime,
) -> impl Iterator<Item = &'a Certificate> + 'a {
    trust_anchors
        .anchors_for(trust_purpose)
        .filter(move |candidate| {
            candidate.tbs_certificate.subject == subject.tbs_certificate.issuer
        })
        .filter(move |candidate| {
            let valid = issuer_signed_subject(subject, candidate);
            if !valid {
                tracing::warn!("issuer did not sign subject");
            }
            valid
        })
        .filter(move |candidate| {
            let errors = check_validity_period_at(candidate, validation_time);
            if !errors.is_empty() {
                tracing::warn!("certificate is not valid: {errors:?}");
            }
            errors.is_empty()
        })
}
