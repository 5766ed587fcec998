mod preprocess;
mod writer;

pub use preprocess::{preprocess, strip_mentions, strip_urls};
pub use writer::{ingest_batch, upsert_twitter_users, ContentStore, UserUpsert};

use crate::db::{ContentFields, NewConspLabels, NewLiwcLabels, PlatformDetail};

/// One source item: its detail row, the shared content fields and any
/// classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRecord {
    pub detail: PlatformDetail,
    pub content: ContentFields,
    pub liwc: Option<NewLiwcLabels>,
    pub consp: Option<NewConspLabels>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub staged: usize,
    pub skipped: usize,
    pub content_written: usize,
    pub content_failed: usize,
}
