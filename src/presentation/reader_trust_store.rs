use crate::definitions::x509::{
    trust_anchor::TrustAnchorRegistry,
    validation::{validate_reader_chain, ValidationOptions},
    X5Chain,
};

/// Decides whether a reader certificate chain leads to a trusted reader CA.
pub trait ReaderTrustStore: Send + Sync {
    /// `true` only if the chain validates; failures are logged, never returned.
    fn validate_certification_trust_path(&self, chain: &X5Chain) -> bool;
}

/// [ReaderTrustStore] backed by the reader CA certificates of a [TrustAnchorRegistry].
#[derive(Debug, Clone)]
pub struct X509ReaderTrustStore {
    trust_anchors: TrustAnchorRegistry,
    options: ValidationOptions,
}

impl X509ReaderTrustStore {
    pub fn new(trust_anchors: TrustAnchorRegistry) -> Self {
        Self {
            trust_anchors,
            options: ValidationOptions::default(),
        }
    }

    pub fn with_validation_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }
}

impl ReaderTrustStore for X509ReaderTrustStore {
    fn validate_certification_trust_path(&self, chain: &X5Chain) -> bool {
        let outcome = validate_reader_chain(chain, &self.trust_anchors, &self.options);
        if !outcome.success() {
            tracing::warn!(
                "reader certificate chain for '{}' is not trusted: {:?}",
                chain.end_entity_common_name(),
                outcome.errors
            );
        }
        outcome.success()
    }
}
