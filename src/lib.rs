pub mod cache;
pub mod config;
pub mod error;
pub mod fragment_parser;
pub mod ingest;
pub mod logging;
pub mod merge;
pub mod pagination;
pub mod query;
pub mod session;
pub mod sources;
pub mod tweet_record;

pub use cache::{PersistenceCache, WriteTicket};
pub use config::Config;
pub use error::{ConfigError, IngestError, ParseError, SourceError, StoreError};
pub use query::{DateRange, SortDirection};
pub use session::{IngestOutcome, Session, ViewState};
pub use sources::{FileFragment, FragmentSource, IngestSlot, InlineFragment};
pub use tweet_record::{MediaAttachment, MediaKind, TweetRecord};
