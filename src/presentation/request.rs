/// An encoded ISO/IEC 18013-5 device request, as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub device_request_bytes: Vec<u8>,
    pub session_transcript_bytes: Vec<u8>,
}

impl DeviceRequest {
    pub fn new(device_request_bytes: Vec<u8>, session_transcript_bytes: Vec<u8>) -> Self {
        Self {
            device_request_bytes,
            session_transcript_bytes,
        }
    }
}

/// A request handed over by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Device(DeviceRequest),
    /// A request from a presentation protocol this crate does not process, such as OpenID4VP.
    Other { kind: String, payload: Vec<u8> },
}

impl Request {
    pub fn kind(&self) -> &str {
        match self {
            Request::Device(_) => "device",
            Request::Other { kind, .. } => kind,
        }
    }
}

impl From<DeviceRequest> for Request {
    fn from(request: DeviceRequest) -> Self {
        Request::Device(request)
    }
}
