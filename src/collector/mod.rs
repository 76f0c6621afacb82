use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use tokio::time::sleep;

use crate::{
    browser::PageFetcher,
    config::CollectionConfig,
    db::{NewPost, PostRepository},
    domain::{CollectionStats, PostUpdate, Target},
    infrastructure::stop::StopListener,
    scoring::MisinfoScorer,
};

pub mod extract;

pub use extract::ExtractedPost;

/// Human-readable status lines go here as the run progresses. This is a
/// notification side channel, not part of the result.
pub type ProgressSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub max_posts_per_target: usize,
    pub max_targets_per_run: usize,
    pub scroll_passes: u32,
    pub scroll_delay: Duration,
}

impl CollectorSettings {
    pub fn from_config(config: &CollectionConfig) -> Self {
        Self {
            max_posts_per_target: config.max_posts_per_target,
            max_targets_per_run: config.max_targets_per_run,
            scroll_passes: config.scroll_passes,
            scroll_delay: config.scroll_delay,
        }
    }
}

/// Drives collection across targets, one at a time (the page fetcher
/// owns a single browser session). A failing target is recorded and the
/// run moves on; already-collected posts are never affected.
pub struct PostCollector {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<PostRepository>,
    scorer: MisinfoScorer,
    progress: ProgressSink,
    screenshots_dir: PathBuf,
}

impl PostCollector {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<PostRepository>,
        scorer: MisinfoScorer,
        progress: ProgressSink,
        screenshots_dir: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            store,
            scorer,
            progress,
            screenshots_dir,
        }
    }

    pub async fn collect_from_targets(
        &self,
        targets: &[Target],
        settings: &CollectorSettings,
        stop: &StopListener,
    ) -> CollectionStats {
        let mut stats = CollectionStats::default();

        let capped = targets.len().min(settings.max_targets_per_run);
        if capped < targets.len() {
            tracing::info!(
                target: "collector",
                requested = targets.len(),
                capped,
                "per-run target cap applied"
            );
        }

        for target in &targets[..capped] {
            if stop.is_stopped() {
                tracing::info!(
                    target: "collector",
                    "stop requested; ending run at target boundary"
                );
                break;
            }

            self.report(&format!("Processing target: {}", target.name));
            match self.collect_from_target(target, settings).await {
                Ok(collected) => {
                    stats.posts_collected += collected;
                    stats.targets_processed += 1;
                }
                Err(err) => {
                    let message = format!("Error processing {}: {err:#}", target.name);
                    tracing::error!(
                        target: "collector",
                        name = %target.name,
                        error = %err,
                        "target failed"
                    );
                    self.report(&message);
                    stats.errors.push(message);
                }
            }
        }

        tracing::info!(
            target: "collector",
            targets_processed = stats.targets_processed,
            posts_collected = stats.posts_collected,
            errors = stats.errors.len(),
            "collection run finished"
        );
        stats
    }

    async fn collect_from_target(
        &self,
        target: &Target,
        settings: &CollectorSettings,
    ) -> Result<usize> {
        self.report(&format!("Navigating to {}", target.url));
        let page = self.fetcher.fetch(&target.url).await?;

        self.report(&format!(
            "Scrolling to load posts (passes: {})",
            settings.scroll_passes
        ));
        for pass in 0..settings.scroll_passes {
            page.scroll_to_bottom().await?;
            sleep(settings.scroll_delay).await;
            self.report(&format!("Scroll pass {}/{}", pass + 1, settings.scroll_passes));
        }
        page.scroll_to_top().await?;

        self.report("Extracting posts...");
        let extracted = extract::extract_posts(
            page.as_ref(),
            &target.name,
            settings.max_posts_per_target,
            &self.screenshots_dir,
        )
        .await;

        let mut persisted = 0;
        for item in extracted {
            // Analysis may degrade silently; a post that cannot be
            // persisted is a real failure for this target.
            let post_id = self
                .store
                .add_post(NewPost {
                    target_name: target.name.clone(),
                    url: item.post.url,
                    author: item.post.author,
                    post_timestamp: None,
                    text_content: item.post.text_content.clone(),
                    screenshot_path: item.screenshot_path,
                })
                .await
                .context("failed to persist post")?;

            let score = self.scorer.score_post(&item.post.text_content).await;
            self.store
                .update_post(
                    post_id,
                    &PostUpdate {
                        misinfo_score: Some(score.score),
                        tags: Some(score.tags),
                        rationale: Some(score.rationale),
                        fact_check_questions: Some(score.fact_check_questions),
                        ..PostUpdate::default()
                    },
                )
                .await
                .with_context(|| format!("failed to store score for post {post_id}"))?;

            persisted += 1;
        }

        self.report(&format!(
            "Collected {} posts from {}",
            persisted, target.name
        ));
        Ok(persisted)
    }

    fn report(&self, message: &str) {
        (self.progress)(message);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        ai::MockProvider,
        browser::fake::{FakeElement, FakeFetcher, FakePage},
        db::{test_pool, PostQuery},
        infrastructure::stop::StopFlag,
    };

    fn target(name: &str, url: &str) -> Target {
        Target {
            name: name.to_string(),
            url: url.to_string(),
            kind: "page".to_string(),
        }
    }

    fn settings() -> CollectorSettings {
        CollectorSettings {
            max_posts_per_target: 10,
            max_targets_per_run: 5,
            scroll_passes: 1,
            scroll_delay: Duration::ZERO,
        }
    }

    fn page_with_posts(texts: &[&str]) -> FakePage {
        FakePage::default().with(
            extract::POST_SELECTORS[0],
            texts.iter().map(|t| FakeElement::with_text(t)).collect(),
        )
    }

    struct Harness {
        collector: PostCollector,
        store: Arc<PostRepository>,
        progress: Arc<Mutex<Vec<String>>>,
        _screenshots: tempfile::TempDir,
    }

    async fn harness(fetcher: FakeFetcher) -> Harness {
        let screenshots = tempfile::tempdir().unwrap();
        let store = Arc::new(PostRepository::new(
            test_pool().await,
            screenshots.path().to_path_buf(),
        ));
        let progress: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink: ProgressSink = {
            let progress = progress.clone();
            Arc::new(move |line: &str| progress.lock().unwrap().push(line.to_string()))
        };
        let collector = PostCollector::new(
            Arc::new(fetcher),
            store.clone(),
            MisinfoScorer::new(Arc::new(MockProvider)),
            sink,
            screenshots.path().to_path_buf(),
        );
        Harness {
            collector,
            store,
            progress,
            _screenshots: screenshots,
        }
    }

    #[tokio::test]
    async fn failing_target_is_isolated_and_recorded() {
        let fetcher = FakeFetcher::default()
            .with_page(
                "https://site/one",
                page_with_posts(&["Post from target one with plenty of text."]),
            )
            .with_timeout("https://site/two")
            .with_page(
                "https://site/three",
                page_with_posts(&["Post from target three with plenty of text."]),
            );
        let h = harness(fetcher).await;
        let (_, stop) = StopFlag::new();

        let targets = [
            target("Target One", "https://site/one"),
            target("Target Two", "https://site/two"),
            target("Target Three", "https://site/three"),
        ];
        let stats = h
            .collector
            .collect_from_targets(&targets, &settings(), &stop)
            .await;

        assert_eq!(stats.targets_processed, 2);
        assert_eq!(stats.posts_collected, 2);
        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].contains("Target Two"));

        let stored = h.store.get_posts(&PostQuery::default()).await.unwrap();
        let mut names: Vec<&str> = stored.iter().map(|p| p.target_name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Target One", "Target Three"]);
    }

    #[tokio::test]
    async fn collected_posts_are_scored_synchronously() {
        let fetcher = FakeFetcher::default().with_page(
            "https://site/one",
            page_with_posts(&["SHOCKING!!! They don't want you to know this! Wake up sheeple!"]),
        );
        let h = harness(fetcher).await;
        let (_, stop) = StopFlag::new();

        let stats = h
            .collector
            .collect_from_targets(&[target("T", "https://site/one")], &settings(), &stop)
            .await;
        assert_eq!(stats.posts_collected, 1);

        let posts = h.store.get_posts(&PostQuery::default()).await.unwrap();
        let post = &posts[0];
        assert!(post.misinfo_score.unwrap() > 40);
        assert!(post.tags.iter().any(|t| t == "conspiracy_theory"));
        assert!(!post.fact_check_questions.is_empty() || post.rationale.is_some());
    }

    #[tokio::test]
    async fn per_run_target_cap_truncates_the_list() {
        let fetcher = FakeFetcher::default()
            .with_page("https://site/one", page_with_posts(&[]))
            .with_page("https://site/two", page_with_posts(&[]));
        let h = harness(fetcher).await;
        let (_, stop) = StopFlag::new();

        let mut settings = settings();
        settings.max_targets_per_run = 1;
        let stats = h
            .collector
            .collect_from_targets(
                &[
                    target("One", "https://site/one"),
                    target("Two", "https://site/two"),
                ],
                &settings,
                &stop,
            )
            .await;
        assert_eq!(stats.targets_processed, 1);
    }

    #[tokio::test]
    async fn stop_request_ends_the_run_at_a_target_boundary() {
        let fetcher = FakeFetcher::default()
            .with_page("https://site/one", page_with_posts(&[]));
        let h = harness(fetcher).await;
        let (flag, stop) = StopFlag::new();
        flag.request_stop();

        let stats = h
            .collector
            .collect_from_targets(&[target("One", "https://site/one")], &settings(), &stop)
            .await;
        assert_eq!(stats.targets_processed, 0);
        assert!(stats.errors.is_empty());
    }

    #[tokio::test]
    async fn progress_reports_named_checkpoints() {
        let fetcher = FakeFetcher::default().with_page(
            "https://site/one",
            page_with_posts(&["A long enough post body for the checkpoint test."]),
        );
        let h = harness(fetcher).await;
        let (_, stop) = StopFlag::new();

        h.collector
            .collect_from_targets(&[target("One", "https://site/one")], &settings(), &stop)
            .await;

        let lines = h.progress.lock().unwrap().clone();
        assert!(lines.iter().any(|l| l == "Processing target: One"));
        assert!(lines.iter().any(|l| l == "Scroll pass 1/1"));
        assert!(lines.iter().any(|l| l == "Collected 1 posts from One"));
    }
}
