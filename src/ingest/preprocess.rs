use crate::query::Platform;
use regex::Regex;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[a-zA-Z0-9][^\s]*\.[^\s]{2,}|www\.[a-zA-Z0-9][a-zA-Z0-9-]*\.[^\s]{2,}")
        .unwrap()
});
static MENTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^@\w])@(\w{1,15})\b").unwrap());

pub fn strip_urls(text: &str) -> String {
    URL_PATTERN.replace_all(text, "").into_owned()
}

pub fn strip_mentions(text: &str) -> String {
    MENTION_PATTERN.replace_all(text, "").into_owned()
}

fn strip_quotes(text: &str) -> String {
    text.replace("&gt;", "").replace('>', "")
}

/// Produces the `text_prep` column for a content row.
pub fn preprocess(platform: Platform, text: &str, title: Option<&str>) -> String {
    match platform {
        Platform::Twitter => strip_mentions(&strip_urls(text)).trim().to_string(),
        Platform::FourChan | Platform::Reddit => strip_urls(&strip_quotes(text)),
        Platform::LegacyNews => strip_urls(text),
        Platform::AltNews => match title {
            Some(title) if !title.is_empty() => format!("{text}\n{title}"),
            _ => text.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twitter_strips_urls_and_mentions() {
        let prepped = preprocess(
            Platform::Twitter,
            "@someone look at https://t.co/abc123 this, cc @other_user ",
            None,
        );
        assert_eq!(prepped, "look at  this, cc");
    }

    #[test]
    fn test_mentions_keep_emails() {
        assert_eq!(strip_mentions("mail me at a@b.de"), "mail me at a@b.de");
    }

    #[test]
    fn test_quote_markers_removed() {
        assert_eq!(
            preprocess(Platform::FourChan, ">>1234 &gt;implying www.example.com/x", None),
            "1234 implying "
        );
        assert_eq!(
            preprocess(Platform::Reddit, "> quoted\nreply", None),
            " quoted\nreply"
        );
    }

    #[test]
    fn test_legacy_news_keeps_quotes() {
        assert_eq!(
            preprocess(Platform::LegacyNews, "a > b, see http://news.example.org/a", None),
            "a > b, see "
        );
    }

    #[test]
    fn test_alt_news_appends_title() {
        assert_eq!(
            preprocess(Platform::AltNews, "body", Some("Headline")),
            "body\nHeadline"
        );
        assert_eq!(preprocess(Platform::AltNews, "body", None), "body");
        assert_eq!(preprocess(Platform::AltNews, "body", Some("")), "body");
    }
}
