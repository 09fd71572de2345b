//! Document summarization through the upstream generative service.
//!
//! - [`dispatcher::Summarizer`] - accepts requests and picks background or direct streaming
//! - [`relay`] - forwards upstream tokens to a session channel from any context
//! - [`frame`] - upstream line protocol decoding
//! - [`extract`] - structured result recovery from the final text
//! - [`documents`] - document text loading

pub mod dispatcher;
pub mod documents;
pub mod extract;
pub mod frame;
pub mod relay;

pub use dispatcher::{DEFAULT_SYSTEM_PROMPT, Dispatch, SummarizeRequest, Summarizer};
pub use documents::{DocumentRef, DocumentStore, HttpDocumentStore};
pub use extract::extract;
pub use relay::{RESULT_SENTINEL, RelayOutcome};
