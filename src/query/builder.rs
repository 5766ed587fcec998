use super::catalog::{self, TWITTER_USER};
use super::criteria::{CriteriaStore, Label, Platform, SearchScope};
use super::dialect::{Dialect, TimeUnit};
use crate::error::Result;
use chrono::NaiveDate;
use std::fmt;
use tracing::debug;

/// A literal bound to a placeholder. Never spliced into query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Date(NaiveDate),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Text(s) => write!(f, "{s:?}"),
            Param::Date(d) => write!(f, "{d}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    dialect: Dialect,
    text: String,
    params: Vec<Param>,
}

impl Query {
    /// Caller-authored SQL with nothing bound.
    pub fn raw(dialect: Dialect, text: impl Into<String>) -> Self {
        Self {
            dialect,
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QueryMode {
    #[default]
    Select,
    Count,
    CountGrouped(Vec<String>),
    CountByPeriod(TimeUnit),
}

impl QueryMode {
    pub fn count_grouped<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueryMode::CountGrouped(columns.into_iter().map(Into::into).collect())
    }

    pub fn count_by_period(unit: &str) -> Result<Self> {
        TimeUnit::parse(unit).map(QueryMode::CountByPeriod)
    }
}

/// Accumulates SQL text and its bound parameters in lockstep, so the n-th
/// placeholder always refers to the n-th parameter.
struct SqlWriter {
    dialect: Dialect,
    text: String,
    params: Vec<Param>,
}

impl SqlWriter {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            text: String::with_capacity(256),
            params: Vec::new(),
        }
    }

    fn push(&mut self, sql: &str) -> &mut Self {
        self.text.push_str(sql);
        self
    }

    fn push_bind(&mut self, param: Param) -> &mut Self {
        self.params.push(param);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.text.push_str(&placeholder);
        self
    }

    fn push_bind_list(&mut self, params: impl IntoIterator<Item = Param>) -> &mut Self {
        for (i, param) in params.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_bind(param);
        }
        self
    }

    /// `column = v` for one value, `column IN (v, ...)` for several.
    fn push_membership(&mut self, column: &str, values: Vec<Param>) -> &mut Self {
        self.push(" AND ").push(column);
        if values.len() == 1 {
            self.push(" = ").push_bind_list(values)
        } else {
            self.push(" IN (").push_bind_list(values).push(")")
        }
    }

    fn finish(self) -> Query {
        Query {
            dialect: self.dialect,
            text: self.text,
            params: self.params,
        }
    }
}

fn platform_param(platform: Platform) -> Param {
    Param::Text(platform.db_label().to_string())
}

#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    dialect: Dialect,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(Dialect::Postgres)
    }
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn build(&self, criteria: &CriteriaStore, mode: &QueryMode) -> Result<Query> {
        criteria.validate()?;

        let merged_platforms: Vec<Platform> = if criteria.merge_platform_data() {
            criteria.platforms().iter().copied().collect()
        } else {
            Vec::new()
        };
        let merged_labels: Vec<Label> = if criteria.merge_label_data() {
            criteria.label_inclusion().iter().copied().collect()
        } else {
            Vec::new()
        };

        let mut sql = SqlWriter::new(self.dialect);
        sql.push("SELECT ");
        match mode {
            QueryMode::Select => self.push_columns(&mut sql, &merged_platforms, &merged_labels),
            QueryMode::Count => {
                sql.push("COUNT(*) AS count");
            }
            QueryMode::CountGrouped(columns) => {
                if !columns.is_empty() {
                    sql.push(&self.group_list(columns)).push(", ");
                }
                sql.push("COUNT(*) AS count");
            }
            QueryMode::CountByPeriod(unit) => {
                sql.push(self.dialect.period_expression(*unit))
                    .push(" AS period, COUNT(*) AS count");
            }
        }
        sql.push(" FROM ").push(catalog::CONTENT_TABLE);

        self.push_joins(&mut sql, &merged_platforms, &merged_labels);

        sql.push(" WHERE 1=1");
        self.push_predicates(&mut sql, criteria);

        match mode {
            QueryMode::CountGrouped(columns) if !columns.is_empty() => {
                sql.push(" GROUP BY ").push(&self.group_list(columns));
            }
            QueryMode::CountByPeriod(unit) => {
                sql.push(" GROUP BY ")
                    .push(self.dialect.period_expression(*unit))
                    .push(" ORDER BY period");
            }
            _ => {}
        }

        let query = sql.finish();
        debug!(
            dialect = %query.dialect(),
            params = query.params().len(),
            sql = %query.text(),
            "built query"
        );
        Ok(query)
    }

    fn push_columns(&self, sql: &mut SqlWriter, platforms: &[Platform], labels: &[Label]) {
        let mut columns = vec!["content.*".to_string()];
        for &platform in platforms {
            let info = catalog::detail_table(platform);
            columns.extend(info.columns.iter().map(|c| format!("{}.{c}", info.table)));
            if platform == Platform::Twitter {
                columns.extend(
                    TWITTER_USER
                        .columns
                        .iter()
                        .map(|c| format!("{}.{c}", TWITTER_USER.table)),
                );
            }
        }
        for &label in labels {
            let info = catalog::label_table(label);
            columns.extend(info.columns.iter().map(|c| format!("{}.{c}", info.table)));
        }
        sql.push(&columns.join(", "));
    }

    fn push_joins(&self, sql: &mut SqlWriter, platforms: &[Platform], labels: &[Label]) {
        for &platform in platforms {
            let table = catalog::detail_table(platform).table;
            sql.push(" LEFT JOIN ")
                .push(table)
                .push(" ON ")
                .push(table)
                .push(".id = content.content_id AND content.platform = ")
                .push_bind(platform_param(platform));
        }
        if platforms.contains(&Platform::Twitter) {
            sql.push(" LEFT JOIN twitter_user ON twitter_user.author_id = twitter.author_id");
        }
        for &label in labels {
            let table = catalog::label_table(label).table;
            sql.push(" LEFT JOIN ")
                .push(table)
                .push(" ON ")
                .push(table)
                .push(".id = content.")
                .push(label.content_column());
        }
    }

    fn push_predicates(&self, sql: &mut SqlWriter, criteria: &CriteriaStore) {
        for label in criteria.label_inclusion() {
            sql.push(" AND content.")
                .push(label.content_column())
                .push(" IS NOT NULL");
        }
        for label in criteria.label_exclusion() {
            sql.push(" AND content.")
                .push(label.content_column())
                .push(" IS NULL");
        }

        if !criteria.platforms().is_empty() {
            let values = criteria
                .platforms()
                .iter()
                .map(|&p| platform_param(p))
                .collect();
            sql.push_membership("content.platform", values);
        }
        if !criteria.subplatforms().is_empty() {
            let values = criteria
                .subplatforms()
                .iter()
                .map(|s| Param::Text(s.clone()))
                .collect();
            sql.push_membership("content.subplatform", values);
        }

        if let Some(needle) = criteria.string_match() {
            self.push_string_match(sql, criteria, needle);
        }

        if let Some(language) = criteria.language() {
            sql.push(" AND content.language = ")
                .push_bind(Param::Text(language.to_string()));
        }

        if let Some((start, end)) = criteria.date_range() {
            sql.push(" AND content.date BETWEEN ")
                .push_bind(Param::Date(start))
                .push(" AND ")
                .push_bind(Param::Date(end));
        }

        if let Some(author) = criteria.author() {
            self.push_author(sql, criteria, author);
        }
    }

    fn push_string_match(&self, sql: &mut SqlWriter, criteria: &CriteriaStore, needle: &str) {
        let case_sensitive = criteria.case_sensitive();
        let operator = self.dialect.match_operator(case_sensitive);
        let suffix = self.dialect.match_suffix(case_sensitive);
        let pattern = self.dialect.contains_pattern(needle, case_sensitive);

        let columns: &[&str] = match criteria.search_scope() {
            SearchScope::All => &["content.text", "content.text_prep", "content.title"],
            SearchScope::Text => &["content.text", "content.text_prep"],
            SearchScope::Title => &["content.title"],
        };

        let grouped = columns.len() > 1;
        sql.push(if grouped { " AND (" } else { " AND " });
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                sql.push(" OR ");
            }
            sql.push(column)
                .push(" ")
                .push(operator)
                .push(" ")
                .push_bind(Param::Text(pattern.clone()))
                .push(suffix);
        }
        if grouped {
            sql.push(")");
        }
    }

    /// One existence branch per candidate platform, ORed together. Twitter
    /// authors live in `twitter_user`; every other platform keeps an
    /// `author` column on its detail row.
    fn push_author(&self, sql: &mut SqlWriter, criteria: &CriteriaStore, author: &str) {
        let mut platforms = criteria.author_platforms();
        platforms.sort_by_key(|p| *p != Platform::Twitter);

        sql.push(" AND (");
        for (i, platform) in platforms.into_iter().enumerate() {
            if i > 0 {
                sql.push(" OR ");
            }
            sql.push("(content.platform = ")
                .push_bind(platform_param(platform))
                .push(" AND EXISTS (");
            if platform == Platform::Twitter {
                sql.push(
                    "SELECT 1 FROM twitter t JOIN twitter_user tu ON t.author_id = tu.author_id \
                     WHERE t.id = content.content_id AND tu.username = ",
                );
            } else {
                sql.push("SELECT 1 FROM ")
                    .push(catalog::detail_table(platform).table)
                    .push(" p WHERE p.id = content.content_id AND p.author = ");
            }
            sql.push_bind(Param::Text(author.to_string())).push("))");
        }
        sql.push(")");
    }

    fn group_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|column| {
                column
                    .split('.')
                    .map(|part| self.dialect.quote_identifier(part.trim()))
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builds against the Postgres dialect.
pub fn build(criteria: &CriteriaStore, mode: &QueryMode) -> Result<Query> {
    QueryBuilder::default().build(criteria, mode)
}
