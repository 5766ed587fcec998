use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Platform {
    #[strum(to_string = "alt_news", serialize = "altnews")]
    AltNews,
    #[strum(to_string = "legacy_news", serialize = "legacynews")]
    LegacyNews,
    #[strum(to_string = "4chan", serialize = "fourchan")]
    FourChan,
    #[strum(to_string = "reddit")]
    Reddit,
    #[strum(to_string = "twitter")]
    Twitter,
}

impl Platform {
    /// Value stored in `content.platform`.
    pub fn db_label(self) -> &'static str {
        match self {
            Platform::AltNews => "alt_news",
            Platform::LegacyNews => "legacy_news",
            Platform::FourChan => "4chan",
            Platform::Reddit => "reddit",
            Platform::Twitter => "twitter",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Label {
    Liwc,
    Consp,
}

impl Label {
    /// Foreign-key column on `content`.
    pub fn content_column(self) -> &'static str {
        match self {
            Label::Liwc => "label_liwc",
            Label::Consp => "label_consp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    Eng,
    Ger,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SearchScope {
    #[default]
    All,
    Text,
    Title,
}

/// Validated research criteria. Only obtainable through [`CriteriaBuilder`],
/// so a store in hand has already passed [`CriteriaStore::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaStore {
    platforms: BTreeSet<Platform>,
    subplatforms: BTreeSet<String>,
    label_inclusion: BTreeSet<Label>,
    label_exclusion: BTreeSet<Label>,
    search_scope: SearchScope,
    string_match: Option<String>,
    case_sensitive: bool,
    language: Option<Language>,
    date_range: Option<(NaiveDate, NaiveDate)>,
    author: Option<String>,
    merge_platform_data: bool,
    merge_label_data: bool,
}

impl CriteriaStore {
    pub fn builder() -> CriteriaBuilder {
        CriteriaBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(label) = self
            .label_inclusion
            .intersection(&self.label_exclusion)
            .next()
        {
            return Err(Error::InvalidCriteria(format!(
                "label `{label}` is both included and excluded"
            )));
        }
        if let Some((start, end)) = self.date_range {
            if start > end {
                return Err(Error::InvalidCriteria(format!(
                    "date range starts {start} after it ends {end}"
                )));
            }
        }
        Ok(())
    }

    pub fn platforms(&self) -> &BTreeSet<Platform> {
        &self.platforms
    }

    pub fn subplatforms(&self) -> &BTreeSet<String> {
        &self.subplatforms
    }

    pub fn label_inclusion(&self) -> &BTreeSet<Label> {
        &self.label_inclusion
    }

    pub fn label_exclusion(&self) -> &BTreeSet<Label> {
        &self.label_exclusion
    }

    pub fn search_scope(&self) -> SearchScope {
        self.search_scope
    }

    pub fn string_match(&self) -> Option<&str> {
        self.string_match.as_deref()
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn language(&self) -> Option<Language> {
        self.language
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.date_range
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn merge_platform_data(&self) -> bool {
        self.merge_platform_data
    }

    pub fn merge_label_data(&self) -> bool {
        self.merge_label_data
    }

    /// Platforms the author predicate has to cover: the filter, or every
    /// platform when no filter is set.
    pub fn author_platforms(&self) -> Vec<Platform> {
        if self.platforms.is_empty() {
            Platform::iter().collect()
        } else {
            self.platforms.iter().copied().collect()
        }
    }
}

impl fmt::Display for CriteriaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
            items
                .into_iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(",")
        }

        let mut parts = Vec::new();
        if !self.platforms.is_empty() {
            parts.push(format!("platform=[{}]", join(&self.platforms)));
        }
        if !self.subplatforms.is_empty() {
            parts.push(format!("subplatform=[{}]", join(&self.subplatforms)));
        }
        if !self.label_inclusion.is_empty() {
            parts.push(format!("with=[{}]", join(&self.label_inclusion)));
        }
        if !self.label_exclusion.is_empty() {
            parts.push(format!("without=[{}]", join(&self.label_exclusion)));
        }
        if let Some(ref s) = self.string_match {
            let case = if self.case_sensitive { "case" } else { "nocase" };
            parts.push(format!("match={s:?} in {} ({case})", self.search_scope));
        }
        if let Some(lang) = self.language {
            parts.push(format!("language={lang}"));
        }
        if let Some((start, end)) = self.date_range {
            parts.push(format!("date={start}..={end}"));
        }
        if let Some(ref a) = self.author {
            parts.push(format!("author={a:?}"));
        }
        if self.merge_platform_data {
            parts.push("merge=platform".into());
        }
        if self.merge_label_data {
            parts.push("merge=label".into());
        }
        if parts.is_empty() {
            write!(f, "<all content>")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

/// Collects raw criteria; nothing is checked until [`CriteriaBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct CriteriaBuilder {
    platforms: Vec<String>,
    subplatforms: Vec<String>,
    label_inclusion: Vec<String>,
    label_exclusion: Vec<String>,
    search_scope: Option<String>,
    string_match: Option<String>,
    case_sensitive: bool,
    language: Option<String>,
    date_range: Option<(String, String)>,
    author: Option<String>,
    merge_platform_data: bool,
    merge_label_data: bool,
}

impl CriteriaBuilder {
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platforms.push(platform.into());
        self
    }

    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms.extend(platforms.into_iter().map(Into::into));
        self
    }

    pub fn subplatforms<I, S>(mut self, subplatforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subplatforms
            .extend(subplatforms.into_iter().map(Into::into));
        self
    }

    pub fn include_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_inclusion.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn exclude_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_exclusion.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn search_scope(mut self, scope: impl Into<String>) -> Self {
        self.search_scope = Some(scope.into());
        self
    }

    pub fn string_match(mut self, needle: impl Into<String>) -> Self {
        self.string_match = Some(needle.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Inclusive bounds in `YYYY-MM-DD` form.
    pub fn date_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.date_range = Some((start.into(), end.into()));
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn merge_platform_data(mut self, merge: bool) -> Self {
        self.merge_platform_data = merge;
        self
    }

    pub fn merge_label_data(mut self, merge: bool) -> Self {
        self.merge_label_data = merge;
        self
    }

    pub fn build(self) -> Result<CriteriaStore> {
        let platforms = parse_all::<Platform>(&self.platforms, "platform")?;
        let label_inclusion = parse_all::<Label>(&self.label_inclusion, "label")?;
        let label_exclusion = parse_all::<Label>(&self.label_exclusion, "label")?;

        let search_scope = match self.search_scope {
            Some(ref raw) => parse_one::<SearchScope>(raw, "search scope")?,
            None => SearchScope::default(),
        };
        let language = match self.language {
            Some(ref raw) => Some(parse_one::<Language>(raw, "language")?),
            None => None,
        };
        let date_range = match self.date_range {
            Some((ref start, ref end)) => Some((parse_date(start)?, parse_date(end)?)),
            None => None,
        };

        let store = CriteriaStore {
            platforms,
            subplatforms: self.subplatforms.into_iter().collect(),
            label_inclusion,
            label_exclusion,
            search_scope,
            string_match: self.string_match.filter(|s| !s.is_empty()),
            case_sensitive: self.case_sensitive,
            language,
            date_range,
            author: self.author.filter(|a| !a.is_empty()),
            merge_platform_data: self.merge_platform_data,
            merge_label_data: self.merge_label_data,
        };
        store.validate()?;
        Ok(store)
    }
}

fn parse_one<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidCriteria(format!("unknown {what} `{raw}`")))
}

fn parse_all<T: std::str::FromStr + Ord>(raw: &[String], what: &str) -> Result<BTreeSet<T>> {
    raw.iter().map(|r| parse_one(r, what)).collect()
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidCriteria(format!("bad date `{raw}`: {e}")))
}

/// On-disk criteria, as written in a RON file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CriteriaFile {
    pub platform: Vec<String>,
    pub subplatform: Vec<String>,
    pub label_inclusion: Vec<String>,
    pub label_exclusion: Vec<String>,
    pub search_scope: Option<String>,
    pub string_match: Option<String>,
    pub case_sensitive: bool,
    pub language: Option<String>,
    pub date_range: Option<(String, String)>,
    pub author: Option<String>,
    pub merge_platform_data: bool,
    pub merge_label_data: bool,
}

impl CriteriaFile {
    pub fn from_ron(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| Error::InvalidCriteria(e.to_string()))
    }

    pub fn into_criteria(self) -> Result<CriteriaStore> {
        let mut builder = CriteriaStore::builder()
            .platforms(self.platform)
            .subplatforms(self.subplatform)
            .include_labels(self.label_inclusion)
            .exclude_labels(self.label_exclusion)
            .case_sensitive(self.case_sensitive)
            .merge_platform_data(self.merge_platform_data)
            .merge_label_data(self.merge_label_data);
        if let Some(scope) = self.search_scope {
            builder = builder.search_scope(scope);
        }
        if let Some(needle) = self.string_match {
            builder = builder.string_match(needle);
        }
        if let Some(language) = self.language {
            builder = builder.language(language);
        }
        if let Some((start, end)) = self.date_range {
            builder = builder.date_range(start, end);
        }
        if let Some(author) = self.author {
            builder = builder.author(author);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_aliases() {
        assert_eq!("alt_news".parse::<Platform>().unwrap(), Platform::AltNews);
        assert_eq!("altnews".parse::<Platform>().unwrap(), Platform::AltNews);
        assert_eq!("4chan".parse::<Platform>().unwrap(), Platform::FourChan);
        assert_eq!("FourChan".parse::<Platform>().unwrap(), Platform::FourChan);
        assert_eq!(Platform::FourChan.to_string(), "4chan");
        assert_eq!(Platform::LegacyNews.db_label(), "legacy_news");
    }

    #[test]
    fn test_defaults() {
        let criteria = CriteriaStore::builder().build().unwrap();
        assert_eq!(criteria.search_scope(), SearchScope::All);
        assert!(!criteria.case_sensitive());
        assert!(!criteria.merge_platform_data());
        assert!(!criteria.merge_label_data());
        assert_eq!(criteria.to_string(), "<all content>");
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let result = CriteriaStore::builder().platforms(["reddit", "myspace"]).build();
        assert!(matches!(result, Err(Error::InvalidCriteria(m)) if m.contains("myspace")));
    }

    #[test]
    fn test_unknown_label_rejected() {
        let result = CriteriaStore::builder().include_labels(["sentiment"]).build();
        assert!(matches!(result, Err(Error::InvalidCriteria(_))));
    }

    #[test]
    fn test_unknown_scope_rejected() {
        let result = CriteriaStore::builder()
            .string_match("foo")
            .search_scope("body")
            .build();
        assert!(matches!(result, Err(Error::InvalidCriteria(_))));
    }

    #[test]
    fn test_label_overlap_rejected() {
        let result = CriteriaStore::builder()
            .include_labels(["liwc"])
            .exclude_labels(["liwc", "consp"])
            .build();
        assert!(matches!(result, Err(Error::InvalidCriteria(m)) if m.contains("liwc")));
    }

    #[test]
    fn test_date_range_order() {
        let ok = CriteriaStore::builder()
            .date_range("2020-01-01", "2020-01-01")
            .build();
        assert!(ok.is_ok());

        let reversed = CriteriaStore::builder()
            .date_range("2020-12-31", "2020-01-01")
            .build();
        assert!(matches!(reversed, Err(Error::InvalidCriteria(_))));

        let garbled = CriteriaStore::builder()
            .date_range("2020-13-01", "2020-12-31")
            .build();
        assert!(matches!(garbled, Err(Error::InvalidCriteria(_))));
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let criteria = CriteriaStore::builder()
            .string_match("")
            .author("")
            .build()
            .unwrap();
        assert_eq!(criteria.string_match(), None);
        assert_eq!(criteria.author(), None);
    }

    #[test]
    fn test_sets_are_canonical() {
        let a = CriteriaStore::builder()
            .platforms(["twitter", "reddit", "twitter"])
            .build()
            .unwrap();
        let b = CriteriaStore::builder()
            .platforms(["reddit", "twitter"])
            .build()
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.platforms().len(), 2);
    }

    #[test]
    fn test_author_platforms_default_to_all() {
        let criteria = CriteriaStore::builder().build().unwrap();
        assert_eq!(criteria.author_platforms().len(), 5);

        let criteria = CriteriaStore::builder().platform("reddit").build().unwrap();
        assert_eq!(criteria.author_platforms(), vec![Platform::Reddit]);
    }

    #[test]
    fn test_criteria_file() {
        let source = r#"(
            platform: ["reddit"],
            language: Some("eng"),
            date_range: Some(("2020-01-01", "2020-12-31")),
            string_match: Some("vaccine"),
        )"#;
        let criteria = CriteriaFile::from_ron(source)
            .unwrap()
            .into_criteria()
            .unwrap();
        assert_eq!(criteria.language(), Some(Language::Eng));
        assert_eq!(criteria.string_match(), Some("vaccine"));
        assert!(criteria.platforms().contains(&Platform::Reddit));
    }

    #[test]
    fn test_demo_criteria_parse() {
        let criteria = CriteriaFile::from_ron(include_str!("../../demos/reddit_vaccine.ron"))
            .unwrap()
            .into_criteria()
            .unwrap();
        assert!(criteria.label_inclusion().contains(&Label::Consp));
        assert!(criteria.merge_label_data());
    }
}
