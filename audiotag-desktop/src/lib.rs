//! # Audiotag Desktop
//!
//! Desktop implementations of the `audiotag-traits` capabilities:
//! [`HttpTransport`] streams sources over HTTP with reqwest, and
//! [`SymphoniaDecoder`] decodes the fetched payload with Symphonia.
//!
//! No audio graph is provided here; output is owned by the embedding
//! application, which supplies its own
//! [`AudioGraph`](audiotag_traits::AudioGraph) over whatever device layer
//! it uses.

pub mod decoder;
pub mod transport;

pub use decoder::SymphoniaDecoder;
pub use transport::HttpTransport;
