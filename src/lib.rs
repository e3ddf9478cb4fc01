pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod parser;
pub mod record;
pub mod search;
pub mod trace;

pub use config::EngineConfig;
pub use corpus::{CorpusStatus, FreshnessState, Generation};
pub use engine::{DocEngine, IngestReport};
pub use error::{EngineError, Result};
pub use parser::{MarkdownParser, ParseOutcome, ParseWarning, ParserAdapter, ParserRegistry};
pub use record::{DocRecord, ExampleSnippet, RecordKind, SourceRef};
pub use search::{Query, QueryHit, QueryMode, QueryResult, Suggestion};
