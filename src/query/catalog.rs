//! Fixed table layout the query builder joins against.

use super::criteria::{Label, Platform};

#[derive(Debug, Clone, Copy)]
pub struct TableInfo {
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

pub const CONTENT_TABLE: &str = "content";

pub const TWITTER_USER: TableInfo = TableInfo {
    table: "twitter_user",
    columns: &["username"],
};

const ALT_NEWS: TableInfo = TableInfo {
    table: "alt_news",
    columns: &["url", "author"],
};

const LEGACY_NEWS: TableInfo = TableInfo {
    table: "legacy_news",
    columns: &["meta", "terms", "author", "url", "section", "article_id"],
};

const FOURCHAN: TableInfo = TableInfo {
    table: "fourchan",
    columns: &[
        "media_link",
        "author",
        "nreplies",
        "num",
        "doc_id",
        "op",
        "poster_country",
        "referencing_comment",
        "searchterm",
        "subnum",
        "thread_id",
        "comments",
    ],
};

const REDDIT: TableInfo = TableInfo {
    table: "reddit",
    columns: &[
        "author",
        "post_id",
        "link_id",
        "parent_id",
        "searchterm",
        "selftext",
        "terms",
        "type",
        "url",
    ],
};

const TWITTER: TableInfo = TableInfo {
    table: "twitter",
    columns: &["tweet_id", "ref", "refid", "author_id", "sampled"],
};

const LABELS_CONSP: TableInfo = TableInfo {
    table: "labels_consp",
    columns: &[
        "v1_bin",
        "v1_prob",
        "v2_gr_bin",
        "v2_gr_prob",
        "v2_nwo_bin",
        "v2_nwo_prob",
    ],
};

const LABELS_LIWC: TableInfo = TableInfo {
    table: "labels_liwc",
    columns: &[
        "bigwords",
        "segment",
        "wc",
        "allnone",
        "cause",
        "certitude",
        "cogproc",
        "differ",
        "discrep",
        "emo_anger",
        "emo_anx",
        "emo_neg",
        "emo_pos",
        "emo_sad",
        "emotion",
        "insight",
        "prep",
        "tentat",
    ],
};

pub fn detail_table(platform: Platform) -> TableInfo {
    match platform {
        Platform::AltNews => ALT_NEWS,
        Platform::LegacyNews => LEGACY_NEWS,
        Platform::FourChan => FOURCHAN,
        Platform::Reddit => REDDIT,
        Platform::Twitter => TWITTER,
    }
}

pub fn label_table(label: Label) -> TableInfo {
    match label {
        Label::Liwc => LABELS_LIWC,
        Label::Consp => LABELS_CONSP,
    }
}
