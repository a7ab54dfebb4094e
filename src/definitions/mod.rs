pub mod device_request;
pub mod helpers;
pub mod session;
pub mod x509;

pub use device_request::{
    DeviceRequest, DocRequest, ItemsRequest, ParsedDeviceRequest, ReaderAuthError, ZkRequest,
    ZkSystemSpec,
};
pub use session::{Handover, SessionTranscript};
