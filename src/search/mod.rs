//! Research-topic search.
//!
//! - [`supervisor::QuerySupervisor`] - bounded-time source fetches with progress events
//! - [`source::SearchSource`] - the narrow interface every source implements
//! - [`arxiv::ArxivSource`] - default source, scraping the ArXiv search page
//! - [`relevance`] - pure query relevance scoring

pub mod arxiv;
pub mod normalize;
pub mod relevance;
pub mod source;
pub mod supervisor;

pub use arxiv::ArxivSource;
pub use source::{RawArticle, SearchSource};
pub use supervisor::{EventSink, QuerySupervisor, SearchOutcome};
