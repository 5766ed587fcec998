use super::{preprocess, IngestRecord, IngestReport};
use crate::db::{NewConspLabels, NewContent, NewLiwcLabels, NewTwitterUser, PlatformDetail};
use crate::schema::{
    alt_news, content, fourchan, labels_consp, labels_liwc, legacy_news, reddit, twitter,
    twitter_user,
};
use diesel::prelude::*;
use tracing::{info, warn};

#[cfg(feature = "postgres")]
use diesel::pg::PgConnection;
#[cfg(feature = "sqlite")]
use diesel::sqlite::SqliteConnection;

/// Write side of the research store.
pub trait ContentStore {
    /// Inserts the detail row and returns its id, which becomes the
    /// `content_id` of the content row.
    fn insert_detail(&mut self, detail: &PlatformDetail) -> QueryResult<i64>;

    fn insert_consp(&mut self, labels: &NewConspLabels) -> QueryResult<i64>;

    fn insert_liwc(&mut self, labels: &NewLiwcLabels) -> QueryResult<i64>;

    /// Returns 0 when the user already exists.
    fn insert_twitter_user(&mut self, user: &NewTwitterUser) -> QueryResult<usize>;

    fn insert_content(&mut self, rows: &[NewContent]) -> QueryResult<usize>;

    fn atomically<T, F>(&mut self, f: F) -> QueryResult<T>
    where
        F: FnOnce(&mut Self) -> QueryResult<T>;
}

macro_rules! impl_content_store {
    ($conn:ty) => {
        impl ContentStore for $conn {
            fn insert_detail(&mut self, detail: &PlatformDetail) -> QueryResult<i64> {
                match detail {
                    PlatformDetail::AltNews(row) => diesel::insert_into(alt_news::table)
                        .values(row)
                        .returning(alt_news::id)
                        .get_result(self),
                    PlatformDetail::LegacyNews(row) => diesel::insert_into(legacy_news::table)
                        .values(row)
                        .returning(legacy_news::id)
                        .get_result(self),
                    PlatformDetail::FourChan(row) => diesel::insert_into(fourchan::table)
                        .values(row)
                        .returning(fourchan::id)
                        .get_result(self),
                    PlatformDetail::Reddit(row) => diesel::insert_into(reddit::table)
                        .values(row)
                        .returning(reddit::id)
                        .get_result(self),
                    PlatformDetail::Twitter(row) => diesel::insert_into(twitter::table)
                        .values(row)
                        .returning(twitter::id)
                        .get_result(self),
                }
            }

            fn insert_consp(&mut self, labels: &NewConspLabels) -> QueryResult<i64> {
                diesel::insert_into(labels_consp::table)
                    .values(labels)
                    .returning(labels_consp::id)
                    .get_result(self)
            }

            fn insert_liwc(&mut self, labels: &NewLiwcLabels) -> QueryResult<i64> {
                diesel::insert_into(labels_liwc::table)
                    .values(labels)
                    .returning(labels_liwc::id)
                    .get_result(self)
            }

            fn insert_twitter_user(&mut self, user: &NewTwitterUser) -> QueryResult<usize> {
                diesel::insert_into(twitter_user::table)
                    .values(user)
                    .on_conflict_do_nothing()
                    .execute(self)
            }

            fn insert_content(&mut self, rows: &[NewContent]) -> QueryResult<usize> {
                diesel::insert_into(content::table).values(rows).execute(self)
            }

            fn atomically<T, F>(&mut self, f: F) -> QueryResult<T>
            where
                F: FnOnce(&mut Self) -> QueryResult<T>,
            {
                self.transaction(f)
            }
        }
    };
}

#[cfg(feature = "sqlite")]
impl_content_store!(SqliteConnection);
#[cfg(feature = "postgres")]
impl_content_store!(PgConnection);

struct Staged {
    content_id: i64,
    consp: Option<i64>,
    liwc: Option<i64>,
}

fn stage<C: ContentStore>(conn: &mut C, record: &IngestRecord) -> QueryResult<Staged> {
    let content_id = conn.insert_detail(&record.detail)?;
    let consp = record
        .consp
        .as_ref()
        .map(|labels| conn.insert_consp(labels))
        .transpose()?;
    let liwc = record
        .liwc
        .as_ref()
        .map(|labels| conn.insert_liwc(labels))
        .transpose()?;
    Ok(Staged {
        content_id,
        consp,
        liwc,
    })
}

/// Stages every record in its own transaction, then writes the content rows
/// for all staged records in a single transaction. A record that fails to
/// stage is skipped. A failed content write leaves the staged detail and
/// label rows in place.
pub fn ingest_batch<C: ContentStore>(conn: &mut C, records: Vec<IngestRecord>) -> IngestReport {
    let mut report = IngestReport::default();
    let mut rows = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let platform = record.detail.platform();
        match conn.atomically(|conn| stage(conn, &record)) {
            Ok(staged) => {
                let mut fields = record.content;
                if fields.text_prep.is_none() {
                    fields.text_prep =
                        Some(preprocess(platform, &fields.text, fields.title.as_deref()));
                }
                rows.push(NewContent::new(
                    fields,
                    platform,
                    staged.content_id,
                    staged.liwc,
                    staged.consp,
                ));
                report.staged += 1;
            }
            Err(e) => {
                warn!(index, %platform, error = %e, "skipping record");
                report.skipped += 1;
            }
        }
    }

    if !rows.is_empty() {
        match conn.atomically(|conn| conn.insert_content(&rows)) {
            Ok(written) => report.content_written = written,
            Err(e) => {
                warn!(rows = rows.len(), error = %e, "content batch failed");
                report.content_failed = rows.len();
            }
        }
    }

    info!(
        staged = report.staged,
        skipped = report.skipped,
        written = report.content_written,
        failed = report.content_failed,
        "ingested batch"
    );
    report
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserUpsert {
    pub inserted: usize,
    pub existing: usize,
    pub failed: usize,
}

pub fn upsert_twitter_users<C: ContentStore>(conn: &mut C, users: &[NewTwitterUser]) -> UserUpsert {
    let mut outcome = UserUpsert::default();
    for user in users {
        match conn.insert_twitter_user(user) {
            Ok(0) => outcome.existing += 1,
            Ok(_) => outcome.inserted += 1,
            Err(e) => {
                warn!(author_id = user.author_id, error = %e, "twitter user not written");
                outcome.failed += 1;
            }
        }
    }
    info!(
        inserted = outcome.inserted,
        existing = outcome.existing,
        failed = outcome.failed,
        "upserted twitter users"
    );
    outcome
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::db::{
        establish_sqlite, migrate_sqlite, ContentFields, NewAltNews, NewReddit, NewTwitter,
    };
    use crate::executor::{execute, SqlValue};
    use crate::query::{CriteriaStore, Dialect, Language, QueryBuilder, QueryMode};
    use chrono::NaiveDate;

    fn connection() -> SqliteConnection {
        let mut conn = establish_sqlite(":memory:").unwrap();
        migrate_sqlite(&mut conn).unwrap();
        conn
    }

    fn fields(text: &str) -> ContentFields {
        ContentFields {
            date: NaiveDate::from_ymd_opt(2021, 3, 14).unwrap(),
            timestamp: None,
            text: text.to_string(),
            text_prep: None,
            title: None,
            subplatform: Some("politics".to_string()),
            language: Language::Eng,
        }
    }

    fn reddit_record(url: &str, text: &str) -> IngestRecord {
        IngestRecord {
            detail: PlatformDetail::Reddit(NewReddit {
                author: Some("anna".to_string()),
                url: url.to_string(),
                ..Default::default()
            }),
            content: fields(text),
            liwc: None,
            consp: None,
        }
    }

    fn content_count(conn: &mut SqliteConnection) -> i64 {
        content::table.count().get_result(conn).unwrap()
    }

    #[test]
    fn test_ingest_writes_detail_labels_and_content() {
        let mut conn = connection();
        let mut record = reddit_record("reddit.com/a", "> quoted https://example.com/x");
        record.consp = Some(NewConspLabels {
            v1_bin: true,
            v1_prob: 0.8,
            v2_gr_bin: false,
            v2_gr_prob: 0.3,
            v2_nwo_bin: false,
            v2_nwo_prob: 0.1,
        });
        record.liwc = Some(NewLiwcLabels {
            wc: 3,
            ..Default::default()
        });

        let report = ingest_batch(&mut conn, vec![record]);
        assert_eq!(
            report,
            IngestReport {
                staged: 1,
                skipped: 0,
                content_written: 1,
                content_failed: 0,
            }
        );

        let (prep, consp, liwc): (Option<String>, Option<i64>, Option<i64>) = content::table
            .select((content::text_prep, content::label_consp, content::label_liwc))
            .first(&mut conn)
            .unwrap();
        assert_eq!(prep.as_deref(), Some(" quoted "));
        assert!(consp.is_some());
        assert!(liwc.is_some());
    }

    #[test]
    fn test_failing_record_is_skipped() {
        let mut conn = connection();
        let report = ingest_batch(
            &mut conn,
            vec![
                reddit_record("reddit.com/dup", "first"),
                reddit_record("reddit.com/dup", "second"),
                reddit_record("reddit.com/other", "third"),
            ],
        );
        assert_eq!(report.staged, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.content_written, 2);
        assert_eq!(content_count(&mut conn), 2);
    }

    #[test]
    fn test_unknown_twitter_author_is_skipped() {
        let mut conn = connection();
        let record = IngestRecord {
            detail: PlatformDetail::Twitter(NewTwitter {
                tweet_id: 42,
                ref_: None,
                refid: None,
                author_id: 7,
                sampled: None,
            }),
            content: fields("no author row yet"),
            liwc: Some(NewLiwcLabels::default()),
            consp: None,
        };

        let report = ingest_batch(&mut conn, vec![record]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.content_written, 0);
        let labels: i64 = labels_liwc::table.count().get_result(&mut conn).unwrap();
        assert_eq!(labels, 0);
        assert_eq!(content_count(&mut conn), 0);
    }

    #[test]
    fn test_twitter_users_upsert_ignores_duplicates() {
        let mut conn = connection();
        let users = vec![
            NewTwitterUser {
                author_id: 7,
                username: Some("sam".to_string()),
            },
            NewTwitterUser {
                author_id: 7,
                username: Some("sam_again".to_string()),
            },
        ];
        let outcome = upsert_twitter_users(&mut conn, &users);
        assert_eq!(
            outcome,
            UserUpsert {
                inserted: 1,
                existing: 1,
                failed: 0,
            }
        );

        let record = IngestRecord {
            detail: PlatformDetail::Twitter(NewTwitter {
                tweet_id: 42,
                ref_: None,
                refid: None,
                author_id: 7,
                sampled: Some(true),
            }),
            content: fields("@friend vaccines https://t.co/x1"),
            liwc: None,
            consp: None,
        };
        assert_eq!(ingest_batch(&mut conn, vec![record]).content_written, 1);

        let criteria = CriteriaStore::builder().author("sam").build().unwrap();
        let query = QueryBuilder::new(Dialect::Sqlite)
            .build(&criteria, &QueryMode::Select)
            .unwrap();
        let table = execute(&mut conn, &query).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get(0, "text_prep"),
            Some(&SqlValue::Text("vaccines".to_string()))
        );
    }

    #[test]
    fn test_deleting_detail_removes_content() {
        let mut conn = connection();
        let record = IngestRecord {
            detail: PlatformDetail::AltNews(NewAltNews {
                url: "altnews.example/1".to_string(),
                author: None,
            }),
            content: fields("story"),
            liwc: None,
            consp: None,
        };
        ingest_batch(&mut conn, vec![record, reddit_record("reddit.com/keep", "kept")]);
        assert_eq!(content_count(&mut conn), 2);

        diesel::delete(alt_news::table).execute(&mut conn).unwrap();
        let remaining: Vec<String> = content::table
            .select(content::platform)
            .load(&mut conn)
            .unwrap();
        assert_eq!(remaining, vec!["reddit".to_string()]);
    }

    struct RejectingContent(SqliteConnection);

    impl ContentStore for RejectingContent {
        fn insert_detail(&mut self, detail: &PlatformDetail) -> QueryResult<i64> {
            self.0.insert_detail(detail)
        }

        fn insert_consp(&mut self, labels: &NewConspLabels) -> QueryResult<i64> {
            self.0.insert_consp(labels)
        }

        fn insert_liwc(&mut self, labels: &NewLiwcLabels) -> QueryResult<i64> {
            self.0.insert_liwc(labels)
        }

        fn insert_twitter_user(&mut self, user: &NewTwitterUser) -> QueryResult<usize> {
            self.0.insert_twitter_user(user)
        }

        fn insert_content(&mut self, _rows: &[NewContent]) -> QueryResult<usize> {
            Err(diesel::result::Error::RollbackTransaction)
        }

        fn atomically<T, F>(&mut self, f: F) -> QueryResult<T>
        where
            F: FnOnce(&mut Self) -> QueryResult<T>,
        {
            f(self)
        }
    }

    #[test]
    fn test_failed_content_batch_keeps_details() {
        let mut store = RejectingContent(connection());
        let report = ingest_batch(
            &mut store,
            vec![
                reddit_record("reddit.com/1", "one"),
                reddit_record("reddit.com/2", "two"),
            ],
        );
        assert_eq!(report.staged, 2);
        assert_eq!(report.content_written, 0);
        assert_eq!(report.content_failed, 2);

        let details: i64 = reddit::table.count().get_result(&mut store.0).unwrap();
        assert_eq!(details, 2);
        assert_eq!(content_count(&mut store.0), 0);
    }
}
