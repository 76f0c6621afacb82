use std::{collections::HashSet, path::Path};

use chrono::Utc;
use url::Url;

use crate::{
    browser::{ElementHandle, PageHandle},
    domain::RawPost,
    util::truncate_chars,
};

/// Selector strategies tried in priority order. Feed markup shifts
/// often, so several generations of selectors stay in the list.
pub const POST_SELECTORS: &[&str] = &[
    r#"[data-ad-preview="message"]"#,
    r#"[role="article"]"#,
    r#"div[class*="userContentWrapper"]"#,
    "div.x1yztbdb",
];

const AUTHOR_SELECTORS: &[&str] = &[
    r#"a[role="link"] strong"#,
    "h2 span",
    "strong > span",
    r#"a[aria-label]"#,
];

const POST_LINK_SELECTOR: &str =
    r#"a[href*="/posts/"], a[href*="/permalink/"], a[href*="/photo"]"#;

const MIN_TEXT_CHARS: usize = 20;
const DEDUP_PREFIX_CHARS: usize = 100;

pub struct ExtractedPost {
    pub post: RawPost,
    /// Bare file name under the screenshots directory, when capture
    /// succeeded.
    pub screenshot_path: Option<String>,
}

/// Walks the selector strategies over a fetched page and yields up to
/// `max_posts` deduplicated posts. The dedup key (first 100 characters
/// of the text) is held across all strategies, so a post surfaced by
/// two selectors is emitted once.
pub async fn extract_posts(
    page: &dyn PageHandle,
    target_name: &str,
    max_posts: usize,
    screenshots_dir: &Path,
) -> Vec<ExtractedPost> {
    let mut posts = Vec::new();
    let mut seen_prefixes: HashSet<String> = HashSet::new();

    for selector in POST_SELECTORS {
        let elements = match page.find_all(selector).await {
            Ok(elements) => elements,
            Err(err) => {
                tracing::debug!(
                    target: "collector",
                    selector = %selector,
                    error = %err,
                    "selector lookup failed"
                );
                continue;
            }
        };
        tracing::debug!(
            target: "collector",
            selector = %selector,
            count = elements.len(),
            "selector matched elements"
        );

        // Inspect extra elements per selector; filtering discards some.
        for element in elements.into_iter().take(max_posts * 2) {
            if posts.len() >= max_posts {
                break;
            }
            let Some(extracted) =
                extract_post(element.as_ref(), target_name, screenshots_dir).await
            else {
                continue;
            };
            let prefix = truncate_chars(&extracted.post.text_content, DEDUP_PREFIX_CHARS);
            if seen_prefixes.insert(prefix) {
                posts.push(extracted);
            }
        }

        if posts.len() >= max_posts {
            break;
        }
    }

    posts
}

/// One element to one post. Author, URL, and screenshot are
/// best-effort; only a failed text lookup or too-short text drops the
/// element.
async fn extract_post(
    element: &dyn ElementHandle,
    target_name: &str,
    screenshots_dir: &Path,
) -> Option<ExtractedPost> {
    let text_content = match element.text().await {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            tracing::debug!(target: "collector", error = %err, "element text lookup failed");
            return None;
        }
    };
    // Fragments under 20 characters are UI chrome, not posts.
    if text_content.chars().count() < MIN_TEXT_CHARS {
        return None;
    }

    let author = extract_author(element).await;
    let url = extract_post_url(element).await;
    let screenshot_path = capture_screenshot(element, target_name, screenshots_dir).await;

    Some(ExtractedPost {
        post: RawPost {
            text_content,
            author,
            url,
        },
        screenshot_path,
    })
}

async fn extract_author(element: &dyn ElementHandle) -> Option<String> {
    for selector in AUTHOR_SELECTORS {
        let node = match element.find_first(selector).await {
            Ok(Some(node)) => node,
            Ok(None) => continue,
            Err(_) => continue,
        };
        if let Ok(text) = node.text().await {
            let author = text.trim().to_string();
            if !author.is_empty() {
                return Some(author);
            }
        }
    }
    None
}

async fn extract_post_url(element: &dyn ElementHandle) -> Option<String> {
    let link = element.find_first(POST_LINK_SELECTOR).await.ok()??;
    let href = link.attribute("href").await.ok()??;
    normalize_post_url(&href)
}

fn normalize_post_url(href: &str) -> Option<String> {
    let candidate = if href.starts_with('/') {
        format!("https://www.facebook.com{href}")
    } else if !href.starts_with("http") {
        format!("https://www.facebook.com/{href}")
    } else {
        href.to_string()
    };
    Url::parse(&candidate).ok().map(String::from)
}

async fn capture_screenshot(
    element: &dyn ElementHandle,
    target_name: &str,
    screenshots_dir: &Path,
) -> Option<String> {
    let filename = format!(
        "{}_{}.png",
        sanitize_target(target_name),
        Utc::now().format("%Y%m%d_%H%M%S_%6f")
    );
    let path = screenshots_dir.join(&filename);
    match element.screenshot(&path).await {
        Ok(()) => Some(filename),
        Err(err) => {
            tracing::warn!(
                target: "collector",
                error = %err,
                path = %path.display(),
                "screenshot capture failed"
            );
            None
        }
    }
}

fn sanitize_target(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
