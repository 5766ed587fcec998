use crate::error::{Error, Result};
use crate::query::{Language, Platform};
use crate::schema::{
    alt_news, content, fourchan, labels_consp, labels_liwc, legacy_news, reddit, twitter,
    twitter_user,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[cfg(feature = "sqlite")]
use diesel::connection::SimpleConnection;
#[cfg(feature = "sqlite")]
use diesel::sqlite::SqliteConnection;

#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;

#[cfg(feature = "sqlite")]
pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");
#[cfg(feature = "postgres")]
pub const POSTGRES_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");

pub const DEFAULT_PORT: u16 = 5432;

/// Credentials for the research database. Passed explicitly to whatever
/// opens a connection.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectionConfig {
    /// Reads `REMOTE_HOST`, `PORT`, `DB_NAME`, `UNAME` and `PASSWORD` from
    /// the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same keys as [`ConnectionConfig::from_env`], read from a dotenv file
    /// without exporting anything into the process environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let vars = iter
            .collect::<std::result::Result<HashMap<String, String>, _>>()
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("missing {key}")))
        };
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a port number: {raw}")))?,
            None => DEFAULT_PORT,
        };
        Ok(Self {
            host: require("REMOTE_HOST")?,
            port,
            database: require("DB_NAME")?,
            user: require("UNAME")?,
            password: require("PASSWORD")?,
        })
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.user),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            urlencoding::encode(&self.database),
        )
    }
}

#[cfg(feature = "sqlite")]
pub fn establish_sqlite(database_url: &str) -> Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;
    configure_connection(&mut conn)?;
    Ok(conn)
}

#[cfg(feature = "sqlite")]
pub fn configure_connection(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA busy_timeout = 2000;")?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")?;
    conn.batch_execute("PRAGMA synchronous = NORMAL;")?;
    conn.batch_execute("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

#[cfg(feature = "sqlite")]
pub fn migrate_sqlite(conn: &mut SqliteConnection) -> Result<usize> {
    conn.run_pending_migrations(SQLITE_MIGRATIONS)
        .map(|applied| applied.len())
        .map_err(|e| Error::Migration(e.to_string()))
}

#[cfg(feature = "postgres")]
pub fn establish_postgres(config: &ConnectionConfig) -> Result<PgConnection> {
    Ok(PgConnection::establish(&config.database_url())?)
}

#[cfg(feature = "postgres")]
pub fn migrate_postgres(conn: &mut PgConnection) -> Result<usize> {
    conn.run_pending_migrations(POSTGRES_MIGRATIONS)
        .map(|applied| applied.len())
        .map_err(|e| Error::Migration(e.to_string()))
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = alt_news, treat_none_as_default_value = false)]
pub struct NewAltNews {
    pub url: String,
    pub author: Option<String>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = legacy_news, treat_none_as_default_value = false)]
pub struct NewLegacyNews {
    pub meta: Option<String>,
    pub terms: Option<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub section: Option<String>,
    pub article_id: String,
}

#[derive(Insertable, Debug, Clone, PartialEq, Default)]
#[diesel(table_name = fourchan, treat_none_as_default_value = false)]
pub struct NewFourChan {
    pub media_link: Option<String>,
    pub author: Option<String>,
    pub nreplies: Option<f64>,
    pub num: Option<i64>,
    pub doc_id: Option<i64>,
    pub op: Option<f64>,
    pub poster_country: Option<String>,
    pub referencing_comment: Option<f64>,
    pub searchterm: Option<String>,
    pub subnum: Option<i64>,
    pub thread_id: Option<i64>,
    pub comments: Option<String>,
}

#[derive(Insertable, Debug, Clone, PartialEq, Default)]
#[diesel(table_name = reddit, treat_none_as_default_value = false)]
pub struct NewReddit {
    pub author: Option<String>,
    pub post_id: Option<String>,
    pub link_id: Option<String>,
    pub parent_id: Option<String>,
    pub searchterm: Option<String>,
    pub selftext: Option<String>,
    pub terms: Option<String>,
    pub post_type: Option<String>,
    pub url: String,
    pub coded: Option<bool>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = twitter_user, treat_none_as_default_value = false)]
pub struct NewTwitterUser {
    pub author_id: i64,
    pub username: Option<String>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = twitter, treat_none_as_default_value = false)]
pub struct NewTwitter {
    pub tweet_id: i64,
    pub ref_: Option<String>,
    pub refid: Option<String>,
    pub author_id: i64,
    pub sampled: Option<bool>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = labels_consp)]
pub struct NewConspLabels {
    pub v1_bin: bool,
    pub v1_prob: f64,
    pub v2_gr_bin: bool,
    pub v2_gr_prob: f64,
    pub v2_nwo_bin: bool,
    pub v2_nwo_prob: f64,
}

#[derive(Insertable, Debug, Clone, PartialEq, Default)]
#[diesel(table_name = labels_liwc)]
pub struct NewLiwcLabels {
    pub bigwords: f64,
    pub segment: i32,
    pub wc: i32,
    pub allnone: f64,
    pub cause: f64,
    pub certitude: f64,
    pub cogproc: f64,
    pub differ: f64,
    pub discrep: f64,
    pub emo_anger: f64,
    pub emo_anx: f64,
    pub emo_neg: f64,
    pub emo_pos: f64,
    pub emo_sad: f64,
    pub emotion: f64,
    pub insight: f64,
    pub prep: f64,
    pub tentat: f64,
}

/// Source-specific detail row; decides the `platform` of its content row.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformDetail {
    AltNews(NewAltNews),
    LegacyNews(NewLegacyNews),
    FourChan(NewFourChan),
    Reddit(NewReddit),
    Twitter(NewTwitter),
}

impl PlatformDetail {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformDetail::AltNews(_) => Platform::AltNews,
            PlatformDetail::LegacyNews(_) => Platform::LegacyNews,
            PlatformDetail::FourChan(_) => Platform::FourChan,
            PlatformDetail::Reddit(_) => Platform::Reddit,
            PlatformDetail::Twitter(_) => Platform::Twitter,
        }
    }
}

/// Platform-independent part of a content row, as produced by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFields {
    pub date: NaiveDate,
    pub timestamp: Option<NaiveDateTime>,
    pub text: String,
    pub text_prep: Option<String>,
    pub title: Option<String>,
    pub subplatform: Option<String>,
    pub language: Language,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = content, treat_none_as_default_value = false)]
pub struct NewContent {
    pub date: NaiveDate,
    pub timestamp: Option<NaiveDateTime>,
    pub text: String,
    pub text_prep: Option<String>,
    pub title: Option<String>,
    pub platform: String,
    pub subplatform: Option<String>,
    pub language: String,
    pub content_id: i64,
    pub label_liwc: Option<i64>,
    pub label_consp: Option<i64>,
}

impl NewContent {
    pub fn new(
        fields: ContentFields,
        platform: Platform,
        content_id: i64,
        label_liwc: Option<i64>,
        label_consp: Option<i64>,
    ) -> Self {
        Self {
            date: fields.date,
            timestamp: fields.timestamp,
            text: fields.text,
            text_prep: fields.text_prep,
            title: fields.title,
            platform: platform.db_label().to_string(),
            subplatform: fields.subplatform,
            language: fields.language.to_string(),
            content_id,
            label_liwc,
            label_consp,
        }
    }
}
