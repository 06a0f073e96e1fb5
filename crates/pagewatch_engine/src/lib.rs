//! Pagewatch engine: network, parsing, persistence and the poll loop.
mod decode;
mod extract;
mod fetch;
mod persist;
mod scheduler;
mod sink;
mod types;

pub use decode::{decode_text, DecodedText};
pub use extract::{BlockExtractor, ExtractError, Extractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, DEFAULT_USER_AGENT};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError, SnapshotFile};
pub use scheduler::{PollSettings, Poller, TickReport};
pub use sink::{DeliveryError, LogSink, NotificationSink, WebhookSink};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
