use std::{collections::BTreeMap, path::{Path, PathBuf}};

use anyhow::{ensure, Result};
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    FromRow, QueryBuilder, Row, Sqlite,
};

use crate::{
    config::{MISINFO_THRESHOLD_HIGH, MISINFO_THRESHOLD_MEDIUM},
    domain::{Post, PostStatus, PostUpdate},
};

#[derive(Clone)]
pub struct PostRepository {
    pool: SqlitePool,
    screenshots_dir: PathBuf,
}

/// Insert-time fields. Everything optional may be filled in later via
/// `update_post`; `status` always starts as `queued`.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub target_name: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub post_timestamp: Option<String>,
    pub text_content: String,
    pub screenshot_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub status: Option<PostStatus>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub target_name: Option<String>,
    pub search_term: Option<String>,
    pub limit: Option<i64>,
    pub offset: i64,
    pub order_by: OrderBy,
    pub order_dir: OrderDir,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderBy {
    #[default]
    CollectedAt,
    MisinfoScore,
    Id,
    TargetName,
}

impl OrderBy {
    fn as_sql(&self) -> &'static str {
        match self {
            OrderBy::CollectedAt => "collected_at",
            OrderBy::MisinfoScore => "misinfo_score",
            OrderBy::Id => "id",
            OrderBy::TargetName => "target_name",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    #[default]
    Desc,
}

impl OrderDir {
    fn as_sql(&self) -> &'static str {
        match self {
            OrderDir::Asc => "ASC",
            OrderDir::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total: i64,
    pub by_status: BTreeMap<PostStatus, i64>,
    pub score_distribution: ScoreDistribution,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreDistribution {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub unscored: i64,
}

impl PostRepository {
    pub fn new(pool: SqlitePool, screenshots_dir: PathBuf) -> Self {
        Self {
            pool,
            screenshots_dir,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn add_post(&self, post: NewPost) -> Result<i64> {
        let result = sqlx::query(
            r#"INSERT INTO posts (
                target_name, url, author, post_timestamp,
                text_content, screenshot_path, status
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'queued')"#,
        )
        .bind(post.target_name)
        .bind(post.url)
        .bind(post.author)
        .bind(post.post_timestamp)
        .bind(post.text_content)
        .bind(post.screenshot_path)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Applies a partial update. Returns `false` when the update carries
    /// no fields or the id does not exist. Score range and draft arity
    /// are enforced here; nothing else about the store's shape is.
    pub async fn update_post(&self, id: i64, update: &PostUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        if let Some(score) = update.misinfo_score {
            ensure!(
                (0..=100).contains(&score),
                "misinfo_score out of range: {score}"
            );
        }
        if let Some(drafts) = &update.drafts {
            ensure!(
                drafts.len() == 3,
                "drafts must hold exactly 3 entries, got {}",
                drafts.len()
            );
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE posts SET ");
        {
            let mut sets = qb.separated(", ");
            if let Some(status) = &update.status {
                sets.push("status = ").push_bind_unseparated(status.as_str());
            }
            if let Some(score) = update.misinfo_score {
                sets.push("misinfo_score = ").push_bind_unseparated(score);
            }
            if let Some(tags) = &update.tags {
                sets.push("tags = ")
                    .push_bind_unseparated(serde_json::to_string(tags)?);
            }
            if let Some(rationale) = &update.rationale {
                sets.push("rationale = ")
                    .push_bind_unseparated(rationale.clone());
            }
            if let Some(questions) = &update.fact_check_questions {
                sets.push("fact_check_questions = ")
                    .push_bind_unseparated(serde_json::to_string(questions)?);
            }
            if let Some(drafts) = &update.drafts {
                sets.push("drafts = ")
                    .push_bind_unseparated(serde_json::to_string(drafts)?);
            }
            if let Some(url) = &update.url {
                sets.push("url = ").push_bind_unseparated(url.clone());
            }
            if let Some(author) = &update.author {
                sets.push("author = ").push_bind_unseparated(author.clone());
            }
            if let Some(ts) = &update.post_timestamp {
                sets.push("post_timestamp = ").push_bind_unseparated(ts.clone());
            }
            if let Some(text) = &update.text_content {
                sets.push("text_content = ").push_bind_unseparated(text.clone());
            }
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let affected = qb.build().execute(&self.pool).await?.rows_affected();
        Ok(affected > 0)
    }

    pub async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(r#"SELECT * FROM posts WHERE id = ?1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    pub async fn get_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM posts WHERE 1=1");
        if let Some(status) = &query.status {
            qb.push(" AND status = ");
            qb.push_bind(status.as_str());
        }
        if let Some(min_score) = query.min_score {
            qb.push(" AND misinfo_score >= ");
            qb.push_bind(min_score);
        }
        if let Some(max_score) = query.max_score {
            qb.push(" AND misinfo_score <= ");
            qb.push_bind(max_score);
        }
        if let Some(target_name) = &query.target_name {
            qb.push(" AND target_name = ");
            qb.push_bind(target_name.clone());
        }
        if let Some(term) = &query.search_term {
            let pattern = format!("%{}%", term);
            qb.push(" AND (text_content LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR author LIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        qb.push(" ORDER BY ");
        qb.push(query.order_by.as_sql());
        qb.push(" ");
        qb.push(query.order_dir.as_sql());

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
            qb.push(" OFFSET ");
            qb.push_bind(query.offset);
        }

        let posts = qb
            .build_query_as::<Post>()
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    pub async fn get_posts_count(
        &self,
        status: Option<PostStatus>,
        min_score: Option<i64>,
        max_score: Option<i64>,
    ) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts WHERE 1=1");
        if let Some(status) = status {
            qb.push(" AND status = ");
            qb.push_bind(status.as_str());
        }
        if let Some(min_score) = min_score {
            qb.push(" AND misinfo_score >= ");
            qb.push_bind(min_score);
        }
        if let Some(max_score) = max_score {
            qb.push(" AND misinfo_score <= ");
            qb.push_bind(max_score);
        }
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Removes the post and its screenshot artifact. A missing id or an
    /// already-deleted screenshot is a no-op.
    pub async fn delete_post(&self, id: i64) -> Result<()> {
        if let Some(post) = self.get_post(id).await? {
            if let Some(name) = post
                .screenshot_path
                .as_deref()
                .and_then(|p| Path::new(p).file_name())
            {
                let screenshot_file = self.screenshots_dir.join(name);
                match tokio::fs::remove_file(&screenshot_file).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => {
                        tracing::warn!(
                            target: "db",
                            error = %err,
                            path = %screenshot_file.display(),
                            "failed to remove screenshot"
                        );
                    }
                }
            }
        }

        sqlx::query(r#"DELETE FROM posts WHERE id = ?1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<StoreStats> {
        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM posts"#)
            .fetch_one(&self.pool)
            .await?;

        let status_rows: Vec<(String, i64)> =
            sqlx::query_as(r#"SELECT status, COUNT(*) FROM posts GROUP BY status"#)
                .fetch_all(&self.pool)
                .await?;
        let by_status = status_rows
            .into_iter()
            .filter_map(|(status, count)| Some((status.parse::<PostStatus>().ok()?, count)))
            .collect();

        // Bucket boundaries come from the same constants the scorer
        // interprets, so the two can never disagree.
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            r#"SELECT
                COUNT(CASE WHEN misinfo_score >= ?1 THEN 1 END),
                COUNT(CASE WHEN misinfo_score >= ?2 AND misinfo_score < ?1 THEN 1 END),
                COUNT(CASE WHEN misinfo_score < ?2 THEN 1 END),
                COUNT(CASE WHEN misinfo_score IS NULL THEN 1 END)
            FROM posts"#,
        )
        .bind(MISINFO_THRESHOLD_HIGH)
        .bind(MISINFO_THRESHOLD_MEDIUM)
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            total,
            by_status,
            score_distribution: ScoreDistribution {
                high: row.0,
                medium: row.1,
                low: row.2,
                unscored: row.3,
            },
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Post {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let status_raw: String = row.try_get("status")?;
        let status = status_raw
            .parse::<PostStatus>()
            .map_err(|err| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(err),
            })?;
        Ok(Self {
            id: row.try_get("id")?,
            target_name: row.try_get("target_name")?,
            url: row.try_get("url")?,
            author: row.try_get("author")?,
            post_timestamp: row.try_get("post_timestamp")?,
            text_content: row.try_get("text_content")?,
            screenshot_path: row.try_get("screenshot_path")?,
            status,
            misinfo_score: row.try_get("misinfo_score")?,
            tags: decode_string_list(row.try_get("tags")?),
            rationale: row.try_get("rationale")?,
            fact_check_questions: decode_string_list(row.try_get("fact_check_questions")?),
            drafts: decode_opt_string_list(row.try_get("drafts")?),
            collected_at: row.try_get("collected_at")?,
        })
    }
}

fn decode_string_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|value| serde_json::from_str(&value).ok())
        .unwrap_or_default()
}

fn decode_opt_string_list(raw: Option<String>) -> Option<Vec<String>> {
    raw.and_then(|value| serde_json::from_str(&value).ok())
}

/// Flat tabular export of a filtered post list. Tags collapse to a
/// comma-joined cell.
pub fn render_csv(posts: &[Post]) -> String {
    const COLUMNS: &str = "id,target_name,url,author,post_timestamp,\
text_content,status,misinfo_score,tags,rationale,collected_at";

    let mut out = String::from(COLUMNS);
    out.push('\n');
    for post in posts {
        let fields = [
            post.id.to_string(),
            post.target_name.clone(),
            post.url.clone().unwrap_or_default(),
            post.author.clone().unwrap_or_default(),
            post.post_timestamp.clone().unwrap_or_default(),
            post.text_content.clone(),
            post.status.as_str().to_string(),
            post.misinfo_score.map(|s| s.to_string()).unwrap_or_default(),
            post.tags.join(", "),
            post.rationale.clone().unwrap_or_default(),
            post.collected_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ];
        let row = fields
            .iter()
            .map(|field| csv_escape(field))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&row);
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        let mut escaped = String::with_capacity(field.len() + 2);
        escaped.push('"');
        for ch in field.chars() {
            if ch == '"' {
                escaped.push('"');
            }
            escaped.push(ch);
        }
        escaped.push('"');
        escaped
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn repo() -> PostRepository {
        PostRepository::new(test_pool().await, std::env::temp_dir())
    }

    fn sample_post(target: &str, text: &str) -> NewPost {
        NewPost {
            target_name: target.to_string(),
            text_content: text.to_string(),
            ..NewPost::default()
        }
    }

    async fn add_scored(
        repo: &PostRepository,
        target: &str,
        text: &str,
        score: Option<i64>,
    ) -> i64 {
        let id = repo.add_post(sample_post(target, text)).await.unwrap();
        if let Some(score) = score {
            let update = PostUpdate {
                misinfo_score: Some(score),
                ..PostUpdate::default()
            };
            repo.update_post(id, &update).await.unwrap();
        }
        id
    }

    #[tokio::test]
    async fn add_post_starts_queued_and_unscored() {
        let repo = repo().await;
        let id = repo
            .add_post(NewPost {
                target_name: "Community Board".to_string(),
                url: Some("https://www.facebook.com/posts/1".to_string()),
                author: Some("Jamie".to_string()),
                text_content: "A long enough piece of text content.".to_string(),
                ..NewPost::default()
            })
            .await
            .unwrap();

        let post = repo.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::Queued);
        assert_eq!(post.misinfo_score, None);
        assert!(post.tags.is_empty());
        assert_eq!(post.drafts, None);
        assert_eq!(post.author.as_deref(), Some("Jamie"));
    }

    #[tokio::test]
    async fn update_round_trips_list_fields() {
        let repo = repo().await;
        let id = add_scored(&repo, "t", "text content that is long enough", None).await;

        let update = PostUpdate {
            misinfo_score: Some(55),
            tags: Some(vec![
                "sensational_language".to_string(),
                "vague_sources".to_string(),
            ]),
            rationale: Some("Uses sensational or clickbait language.".to_string()),
            fact_check_questions: Some(vec!["What are the named sources?".to_string()]),
            drafts: Some(vec![
                "Short and punchy rebuttal.".to_string(),
                "Calm and factual rebuttal.".to_string(),
                "Snarky but appropriate rebuttal.".to_string(),
            ]),
            ..PostUpdate::default()
        };
        assert!(repo.update_post(id, &update).await.unwrap());

        let post = repo.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.misinfo_score, Some(55));
        let mut tags = post.tags.clone();
        tags.sort();
        assert_eq!(tags, vec!["sensational_language", "vague_sources"]);
        // Draft slots are semantically distinct, so order must hold.
        assert_eq!(
            post.drafts.unwrap()[2],
            "Snarky but appropriate rebuttal."
        );
    }

    #[tokio::test]
    async fn update_validates_score_and_draft_arity() {
        let repo = repo().await;
        let id = add_scored(&repo, "t", "text content that is long enough", None).await;

        let bad_score = PostUpdate {
            misinfo_score: Some(101),
            ..PostUpdate::default()
        };
        assert!(repo.update_post(id, &bad_score).await.is_err());

        let bad_drafts = PostUpdate {
            drafts: Some(vec!["one".to_string(), "two".to_string()]),
            ..PostUpdate::default()
        };
        assert!(repo.update_post(id, &bad_drafts).await.is_err());
    }

    #[tokio::test]
    async fn empty_or_unknown_update_is_a_quiet_false() {
        let repo = repo().await;
        let id = add_scored(&repo, "t", "text content that is long enough", None).await;
        assert!(!repo.update_post(id, &PostUpdate::default()).await.unwrap());
        let update = PostUpdate::default().status(PostStatus::Done);
        assert!(!repo.update_post(id + 100, &update).await.unwrap());
    }

    #[tokio::test]
    async fn filters_combine_and_skip_unscored() {
        let repo = repo().await;
        add_scored(&repo, "a", "queued high scoring post body text", Some(85)).await;
        add_scored(&repo, "a", "queued low scoring post body text", Some(10)).await;
        add_scored(&repo, "a", "queued unscored post body text here", None).await;
        let done = add_scored(&repo, "b", "done high scoring post body text", Some(90)).await;
        repo.update_post(done, &PostUpdate::default().status(PostStatus::Done))
            .await
            .unwrap();

        let queued_high = repo
            .get_posts(&PostQuery {
                status: Some(PostStatus::Queued),
                min_score: Some(70),
                ..PostQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(queued_high.len(), 1);
        assert_eq!(queued_high[0].misinfo_score, Some(85));
        assert!(queued_high.iter().all(|p| p.misinfo_score.is_some()));
    }

    #[tokio::test]
    async fn search_matches_text_or_author_case_insensitively() {
        let repo = repo().await;
        let with_author = repo
            .add_post(NewPost {
                target_name: "t".to_string(),
                author: Some("Dana Miller".to_string()),
                text_content: "nothing remarkable in this body".to_string(),
                ..NewPost::default()
            })
            .await
            .unwrap();
        add_scored(&repo, "t", "the MILLER flour conspiracy text", None).await;
        add_scored(&repo, "t", "unrelated post body text entirely", None).await;

        let hits = repo
            .get_posts(&PostQuery {
                search_term: Some("miller".to_string()),
                order_by: OrderBy::Id,
                order_dir: OrderDir::Asc,
                ..PostQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, with_author);
    }

    #[tokio::test]
    async fn ordering_limit_and_offset() {
        let repo = repo().await;
        for i in 0..5 {
            add_scored(&repo, "t", &format!("post body number {i} padded out"), Some(i * 20)).await;
        }
        let page = repo
            .get_posts(&PostQuery {
                order_by: OrderBy::MisinfoScore,
                order_dir: OrderDir::Desc,
                limit: Some(2),
                offset: 1,
                ..PostQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].misinfo_score, Some(60));
        assert_eq!(page[1].misinfo_score, Some(40));
    }

    #[tokio::test]
    async fn count_honors_filters() {
        let repo = repo().await;
        add_scored(&repo, "t", "high scoring post body text here", Some(80)).await;
        add_scored(&repo, "t", "low scoring post body text here", Some(20)).await;
        assert_eq!(repo.get_posts_count(None, None, None).await.unwrap(), 2);
        assert_eq!(
            repo.get_posts_count(Some(PostStatus::Queued), Some(70), None)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_removes_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PostRepository::new(test_pool().await, dir.path().to_path_buf());
        let shot = dir.path().join("target_20240101_000000_000000.png");
        std::fs::write(&shot, b"png").unwrap();

        let id = repo
            .add_post(NewPost {
                target_name: "target".to_string(),
                text_content: "text content that is long enough".to_string(),
                screenshot_path: Some("target_20240101_000000_000000.png".to_string()),
                ..NewPost::default()
            })
            .await
            .unwrap();

        repo.delete_post(id).await.unwrap();
        assert!(!shot.exists());
        assert!(repo.get_post(id).await.unwrap().is_none());
        // Second delete of the same id, and a delete of a never-existing
        // id, are both quiet no-ops.
        repo.delete_post(id).await.unwrap();
        repo.delete_post(9_999).await.unwrap();
    }

    #[tokio::test]
    async fn stats_buckets_partition_all_posts() {
        let repo = repo().await;
        add_scored(&repo, "t", "very high risk post body text one", Some(95)).await;
        add_scored(&repo, "t", "boundary high risk post body text", Some(70)).await;
        add_scored(&repo, "t", "medium risk post body text number", Some(40)).await;
        add_scored(&repo, "t", "low risk post body text number one", Some(39)).await;
        add_scored(&repo, "t", "unscored post body text number one", None).await;

        let stats = repo.get_stats().await.unwrap();
        assert_eq!(stats.total, 5);
        let dist = stats.score_distribution;
        assert_eq!(dist.high, 2);
        assert_eq!(dist.medium, 1);
        assert_eq!(dist.low, 1);
        assert_eq!(dist.unscored, 1);
        assert_eq!(dist.high + dist.medium + dist.low + dist.unscored, stats.total);
        assert_eq!(stats.by_status.get(&PostStatus::Queued), Some(&5));
    }

    #[tokio::test]
    async fn csv_renders_fixed_columns_and_escapes() {
        let repo = repo().await;
        let id = add_scored(&repo, "t", "body with, a comma and \"quotes\" in it", Some(50)).await;
        repo.update_post(
            id,
            &PostUpdate {
                tags: Some(vec!["vague_sources".to_string(), "urgency_manipulation".to_string()]),
                ..PostUpdate::default()
            },
        )
        .await
        .unwrap();

        let posts = repo.get_posts(&PostQuery::default()).await.unwrap();
        let csv = render_csv(&posts);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,target_name,url,author,post_timestamp,text_content,status,misinfo_score,tags,rationale,collected_at"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"body with, a comma and \"\"quotes\"\" in it\""));
        assert!(row.contains("vague_sources, urgency_manipulation"));
    }
}
