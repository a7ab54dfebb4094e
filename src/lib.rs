//! Holder-side processing of ISO/IEC 18013-5 device requests.
//!
//! A reader sends a [DeviceRequest](definitions::DeviceRequest) asking for data elements of one
//! or more document types. The [DeviceRequestProcessor](presentation::DeviceRequestProcessor)
//! decodes it, authenticates the reader of each document request, matches the request against
//! the documents held in a [DocumentStore](presentation::DocumentStore) and picks a
//! zero-knowledge proof system when the reader offers any.
//!
//! ```ignore
//! let processor = DeviceRequestProcessor::new(store)
//!     .with_reader_trust_store(trust_store)
//!     .with_zk_system_repository(zk_systems);
//! let requested = processor.process(request.into()).await.into_result()?;
//! ```
pub mod cbor;
pub mod cose;
pub mod definitions;
pub mod engagement;
pub mod presentation;
