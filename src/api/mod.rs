//! Transport for the lecture question-answering API: request, record framing
//! and event decoding.

pub mod client;
pub mod http;
pub mod records;
pub mod types;

pub use client::{ApiError, QueryClient};
pub use http::HttpQueryClient;
pub use records::{RecordSplitter, RecordStream};
pub use types::{RecordError, Source, StreamEvent, parse_record};
