//! HTTP transport used by the suite runner

pub mod http;

pub use http::{
    format_status_line, HttpTransport, ReqwestTransport, ResolvedRequest, TransportError,
    TransportResponse, USER_AGENT_STRING,
};
