pub mod trust_anchor;
mod util;
pub mod validation;
pub mod x5chain;

pub use util::{common_name_or_unknown, SupportedCurve};
pub use x5chain::{Builder, X5Chain};

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("unable to decode certificate: {0}")]
    CertificateDecoding(String),
}
