//! Content Extractor — Episode Builder helper (spec §4.4) plus the
//! intra-cluster fallback the selector invokes before returning anchors
//! (spec §4.3 "Cluster fallback for content extraction"), reified here as
//! its own seam per spec §9's design note.

use async_trait::async_trait;
use briefwave_core::ContentExtractor;
use regex::Regex;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const MIN_EXTRACTED_LEN: usize = 100;
const FETCH_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) BriefWave/1.0";

/// Fetches a URL and extracts its main body text. Never raises: any
/// network, status, or content-quality failure yields `None`.
pub struct HttpContentExtractor {
    client: reqwest::Client,
}

impl HttpContentExtractor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client builds with a static config");
        Self { client }
    }
}

impl Default for HttpContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for HttpContentExtractor {
    async fn fetch(&self, url: &str) -> Option<String> {
        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let html = response.text().await.ok()?;
        let text = strip_to_article_body(&html);
        if text.chars().count() < MIN_EXTRACTED_LEN {
            return None;
        }
        Some(text)
    }
}

/// Strips navigation, scripts, styles, and raw tags from HTML, keeping
/// paragraph and table structure as plain text. Not a full readability
/// implementation — the closed-form regex pass the spec's "strip
/// navigation, comments, and hyperlinks; preserve paragraphs and
/// tables" calls for.
fn strip_to_article_body(html: &str) -> String {
    let drop_blocks = Regex::new(r"(?is)<(script|style|nav|header|footer|aside)[^>]*>.*?</\1>").unwrap();
    let comments = Regex::new(r"(?s)<!--.*?-->").unwrap();
    let tags = Regex::new(r"(?s)<[^>]+>").unwrap();
    let whitespace = Regex::new(r"[ \t]+").unwrap();
    let blank_lines = Regex::new(r"\n{3,}").unwrap();

    let without_blocks = drop_blocks.replace_all(html, "\n");
    let without_comments = comments.replace_all(&without_blocks, "\n");
    let text = tags.replace_all(&without_comments, "\n");
    let collapsed = whitespace.replace_all(&text, " ");
    let tightened = blank_lines.replace_all(&collapsed, "\n\n");

    html_escape_decode(tightened.trim())
}

fn html_escape_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

/// One backup candidate from the anchor's own cluster (spec §4.3
/// "Cluster fallback"), ordered `importance desc, published desc`.
pub struct ClusterBackup {
    pub article_id: Uuid,
    pub url: String,
    pub summary: String,
}

/// Up to 3 backup articles from the same cluster, excluding the anchor,
/// for use when the anchor's own URL fails extraction.
pub async fn cluster_backups(pool: &PgPool, cluster_id: Uuid, anchor_id: Uuid) -> anyhow::Result<Vec<ClusterBackup>> {
    let rows = sqlx::query(
        "SELECT a.id, a.url, a.summary, sc.importance \
         FROM articles a JOIN story_clusters sc ON sc.id = a.cluster_id \
         WHERE a.cluster_id = $1 AND a.id != $2 \
         ORDER BY sc.importance DESC, a.published_at DESC NULLS LAST \
         LIMIT 3",
    )
    .bind(cluster_id)
    .bind(anchor_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ClusterBackup {
            article_id: r.get("id"),
            url: r.get("url"),
            summary: r.get("summary"),
        })
        .collect())
}

/// Resolves the body text for one anchor article: try its own URL, then
/// up to 3 cluster backups in order, then fall back to the anchor's RSS
/// summary (spec §4.3).
pub async fn resolve_body(
    extractor: &dyn ContentExtractor,
    pool: &PgPool,
    cluster_id: Uuid,
    anchor_id: Uuid,
    anchor_url: &str,
    anchor_summary: &str,
) -> String {
    if let Some(text) = extractor.fetch(anchor_url).await {
        return text;
    }

    if let Ok(backups) = cluster_backups(pool, cluster_id, anchor_id).await {
        for backup in backups {
            if let Some(text) = extractor.fetch(&backup.url).await {
                return text;
            }
        }
    }

    anchor_summary.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_and_nav_keeping_paragraph_text() {
        let html = "<html><nav>Home</nav><body><script>evil()</script>\
                     <p>First paragraph.</p><p>Second paragraph.</p></body></html>";
        let text = strip_to_article_body(html);
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));
        assert!(!text.contains("evil"));
        assert!(!text.contains("Home"));
    }

    #[test]
    fn decodes_common_html_entities() {
        assert_eq!(html_escape_decode("Tom &amp; Jerry"), "Tom & Jerry");
    }
}
