pub mod http_client;

pub use http_client::{build_client, fetch_bytes_limited, send_json};
