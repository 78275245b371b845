use anyhow::Result;

/// Application configuration loaded from environment variables.
///
/// The `clustering`/`selection`/`script`/`tts`/`audio` fields are the
/// closed configuration-options table of spec §6; everything else is
/// ambient (connection strings, API keys, server ports).
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Server / database
    pub database_url: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,

    // AI providers
    pub openai_api_key: String,
    pub anthropic_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,

    // TTS provider
    pub tts_api_key: Option<String>,

    // Restate
    pub restate_admin_url: Option<String>,
    pub restate_self_url: Option<String>,
    pub restate_auth_token: Option<String>,

    // Artifact storage (local stand-in for the object store, see DESIGN.md)
    pub artifact_store_dir: String,

    // §6 closed configuration-options table
    pub clustering_similarity_threshold: f64,
    pub hnsw_ef_search: i32,
    pub selection_freshness_days: i64,
    pub selection_coverage_boost: f64,
    pub selection_min_importance: f64,
    pub script_words_per_minute: f64,
    pub script_max_sources: usize,
    pub tts_batch_size: usize,
    pub tts_crossfade_ms: u32,
    pub audio_bitrate_kbps: u32,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            port: env_or("PORT", 9080u16),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.trim().to_string())
                .collect(),

            openai_api_key: std::env::var("OPENAI_API_KEY")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok(),

            tts_api_key: std::env::var("TTS_API_KEY").ok(),

            restate_admin_url: std::env::var("RESTATE_ADMIN_URL").ok(),
            restate_self_url: std::env::var("RESTATE_SELF_URL").ok(),
            restate_auth_token: std::env::var("RESTATE_AUTH_TOKEN").ok(),

            artifact_store_dir: std::env::var("ARTIFACT_STORE_DIR")
                .unwrap_or_else(|_| "./artifacts".to_string()),

            clustering_similarity_threshold: env_or("CLUSTERING_SIMILARITY_THRESHOLD", 0.85),
            hnsw_ef_search: env_or("HNSW_EF_SEARCH", 100i32),
            selection_freshness_days: env_or("SELECTION_FRESHNESS_DAYS", 5i64),
            selection_coverage_boost: env_or("SELECTION_COVERAGE_BOOST", 17.0),
            selection_min_importance: env_or("SELECTION_MIN_IMPORTANCE", 40.0),
            script_words_per_minute: env_or("SCRIPT_WORDS_PER_MINUTE", 120.0),
            script_max_sources: env_or("SCRIPT_MAX_SOURCES", 10usize),
            tts_batch_size: env_or("TTS_BATCH_SIZE", 8usize),
            tts_crossfade_ms: env_or("TTS_CROSSFADE_MS", 50u32),
            audio_bitrate_kbps: env_or("AUDIO_BITRATE_KBPS", 128u32),
        })
    }
}
