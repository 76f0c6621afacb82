use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::{
    ai::{build_provider, TextAnalysisProvider},
    browser::PageFetcher,
    collector::{CollectorSettings, PostCollector, ProgressSink},
    config::AppConfig,
    db::{self, PostRepository},
    domain::{PostStatus, PostUpdate},
    drafting::RebuttalDrafter,
    infrastructure::{directories::ResolvedPaths, instance_guard::InstanceGuard},
    scoring::MisinfoScorer,
};

/// Explicitly wired application core. Every surface (dashboard, CLI,
/// collector runs) receives its dependencies from here; nothing is
/// reached through globals.
pub struct CopilotApp {
    config: Arc<AppConfig>,
    paths: ResolvedPaths,
    store: Arc<PostRepository>,
    provider: Arc<dyn TextAnalysisProvider>,
    _guard: InstanceGuard,
}

impl CopilotApp {
    pub async fn initialize(config: AppConfig, paths: ResolvedPaths) -> Result<Self> {
        let config = Arc::new(config);
        let guard = InstanceGuard::acquire(&paths)?;

        let pool = db::init_pool(&paths.db_path).await?;
        let store = Arc::new(PostRepository::new(pool, paths.screenshots_dir.clone()));

        let http_client = Client::builder()
            .user_agent(format!("misinfo-copilot/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let provider = build_provider(http_client, &config.llm);
        tracing::info!(
            target: "app",
            provider = provider.name(),
            enabled = provider.is_enabled(),
            "text analysis provider selected"
        );

        Ok(Self {
            config,
            paths,
            store,
            provider,
            _guard: guard,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    pub fn store(&self) -> Arc<PostRepository> {
        self.store.clone()
    }

    pub fn scorer(&self) -> MisinfoScorer {
        MisinfoScorer::new(self.provider.clone())
    }

    pub fn drafter(&self) -> RebuttalDrafter {
        RebuttalDrafter::new(self.provider.clone())
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings::from_config(&self.config.collection)
    }

    /// Builds a collector around an externally supplied page fetcher
    /// (the browser driver lives outside this crate).
    pub fn collector(&self, fetcher: Arc<dyn PageFetcher>, progress: ProgressSink) -> PostCollector {
        PostCollector::new(
            fetcher,
            self.store.clone(),
            self.scorer(),
            progress,
            self.paths.screenshots_dir.clone(),
        )
    }

    /// A reviewer's status decision. Returns `false` for an unknown id.
    pub async fn review(&self, post_id: i64, status: PostStatus) -> Result<bool> {
        self.store
            .update_post(post_id, &PostUpdate::default().status(status))
            .await
    }

    /// Drafts rebuttals for a stored post and persists the three slots.
    pub async fn generate_drafts_for(&self, post_id: i64) -> Result<[String; 3]> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .with_context(|| format!("post {post_id} not found"))?;

        let rationale = post.rationale.clone().unwrap_or_default();
        let drafts = self
            .drafter()
            .generate_drafts(&post.text_content, &post.tags, &rationale)
            .await;

        self.store
            .update_post(
                post_id,
                &PostUpdate {
                    drafts: Some(drafts.to_vec()),
                    ..PostUpdate::default()
                },
            )
            .await?;
        Ok(drafts)
    }

    pub async fn close(self) {
        self.store.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{
            BrowserConfig, CollectionConfig, DirectoryConfig, LlmConfig, LoggingConfig,
            ProviderKind,
        },
        db::NewPost,
    };
    use std::time::Duration;

    fn test_config() -> AppConfig {
        AppConfig {
            llm: LlmConfig {
                provider: ProviderKind::Mock,
                openai_api_key: None,
                openai_model: "gpt-4-turbo-preview".to_string(),
                anthropic_api_key: None,
                anthropic_model: "claude-3-sonnet-20240229".to_string(),
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llama2".to_string(),
            },
            browser: BrowserConfig {
                headless: true,
                timeout: Duration::from_secs(30),
            },
            collection: CollectionConfig {
                scroll_passes: 3,
                scroll_delay: Duration::from_secs(2),
                max_posts_per_target: 20,
                max_targets_per_run: 5,
            },
            directories: DirectoryConfig {
                data_dir: "data".to_string(),
                logs_dir: "logs".to_string(),
                db_filename: "posts.db".to_string(),
                targets_filename: "targets.json".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    fn test_paths(root: &std::path::Path) -> ResolvedPaths {
        ResolvedPaths {
            data_dir: root.to_path_buf(),
            logs_dir: root.join("logs"),
            screenshots_dir: root.join("screenshots"),
            browser_profile_dir: root.join("browser_profile"),
            db_path: root.join("posts.db"),
            targets_path: root.join("targets.json"),
        }
    }

    #[tokio::test]
    async fn review_and_drafting_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("screenshots")).unwrap();
        let app = CopilotApp::initialize(test_config(), test_paths(dir.path()))
            .await
            .unwrap();

        let store = app.store();
        let id = store
            .add_post(NewPost {
                target_name: "t".to_string(),
                text_content: "Sources say this works, trust me on it.".to_string(),
                ..NewPost::default()
            })
            .await
            .unwrap();

        assert!(app.review(id, PostStatus::NeedsResearch).await.unwrap());
        let post = store.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.status, PostStatus::NeedsResearch);

        let drafts = app.generate_drafts_for(id).await.unwrap();
        assert_eq!(drafts.len(), 3);
        let post = store.get_post(id).await.unwrap().unwrap();
        assert_eq!(post.drafts.unwrap().len(), 3);

        app.close().await;
    }

    #[tokio::test]
    async fn second_instance_on_same_data_dir_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("screenshots")).unwrap();
        let first = CopilotApp::initialize(test_config(), test_paths(dir.path()))
            .await
            .unwrap();
        let second = CopilotApp::initialize(test_config(), test_paths(dir.path())).await;
        assert!(second.is_err());
        drop(first);
    }
}
