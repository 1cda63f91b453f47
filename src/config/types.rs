use serde::Deserialize;

/// Main configuration structure for Catalog-Sync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub origin: OriginConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub titles: TitleConfig,
    pub output: OutputConfig,
}

/// Origin site layout and crawl pacing
#[derive(Debug, Clone, Deserialize)]
pub struct OriginConfig {
    /// Root URL of the catalog site
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Regex matched against link paths to find category listings
    #[serde(rename = "category-pattern", default = "default_category_pattern")]
    pub category_pattern: String,

    /// Path appended to a listing URL for page `{n}` (n >= 2)
    #[serde(rename = "page-path-template", default = "default_page_path_template")]
    pub page_path_template: String,

    /// Path fragments that never identify a catalog entry
    #[serde(rename = "excluded-paths", default = "default_excluded_paths")]
    pub excluded_paths: Vec<String>,

    /// Paths of site pages that are not catalog entries (about, contact, ...)
    #[serde(rename = "non-catalog-paths", default = "default_non_catalog_paths")]
    pub non_catalog_paths: Vec<String>,

    /// CSS selector for candidate entry links on listing pages
    #[serde(rename = "entry-link-selector", default = "default_entry_link_selector")]
    pub entry_link_selector: String,

    /// Circuit breaker against endless pagination
    #[serde(rename = "max-pages-per-source", default = "default_max_pages")]
    pub max_pages_per_source: u32,

    /// Delay between page fetches and between sources (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Keep paginating while pages yield entries, even without pagination links
    #[serde(rename = "blind-increment", default = "default_true")]
    pub blind_increment: bool,
}

/// HTTP fetch behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait before retrying after a timeout (milliseconds)
    #[serde(rename = "timeout-retry-delay-ms", default = "default_timeout_retry_delay_ms")]
    pub timeout_retry_delay_ms: u64,

    /// Wait before retrying after any other error (milliseconds)
    #[serde(rename = "error-retry-delay-ms", default = "default_error_retry_delay_ms")]
    pub error_retry_delay_ms: u64,
}

/// Batch processing and progress behavior
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Entries in flight at once within a batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(rename = "entry-delay-ms", default = "default_entry_delay_ms")]
    pub entry_delay_ms: u64,

    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// How long a finished run's progress stays visible (seconds)
    #[serde(rename = "progress-retention-secs", default = "default_progress_retention_secs")]
    pub progress_retention_secs: u64,

    /// Size of the recently-added titles ring
    #[serde(rename = "recent-titles", default = "default_recent_titles")]
    pub recent_titles: usize,
}

/// Credential extraction tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Selectors for the page builder's text holder blocks
    #[serde(rename = "container-selectors", default = "default_container_selectors")]
    pub container_selectors: Vec<String>,

    /// Following siblings inspected after a LOGIN control
    #[serde(rename = "login-lookahead", default = "default_login_lookahead")]
    pub login_lookahead: usize,
}

/// Title filtering additions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleConfig {
    /// Extra titles (case-insensitive) that are never catalog entries
    #[serde(rename = "extra-denylist", default)]
    pub extra_denylist: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            timeout_retry_delay_ms: default_timeout_retry_delay_ms(),
            error_retry_delay_ms: default_error_retry_delay_ms(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            entry_delay_ms: default_entry_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            progress_retention_secs: default_progress_retention_secs(),
            recent_titles: default_recent_titles(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            container_selectors: default_container_selectors(),
            login_lookahead: default_login_lookahead(),
        }
    }
}

impl OriginConfig {
    /// Builds an origin config with default layout settings for `root_url`
    pub fn with_root(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            category_pattern: default_category_pattern(),
            page_path_template: default_page_path_template(),
            excluded_paths: default_excluded_paths(),
            non_catalog_paths: default_non_catalog_paths(),
            entry_link_selector: default_entry_link_selector(),
            max_pages_per_source: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
            blind_increment: true,
        }
    }
}

fn default_category_pattern() -> String {
    "/category/".to_string()
}

fn default_page_path_template() -> String {
    "page/{n}/".to_string()
}

fn default_excluded_paths() -> Vec<String> {
    [
        "/category/",
        "/tag/",
        "/author/",
        "/page/",
        "/wp-",
        "/feed",
        "/comments",
        "/search",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_non_catalog_paths() -> Vec<String> {
    [
        "/about",
        "/contact",
        "/privacy",
        "/terms",
        "/dmca",
        "/faq",
        "/login",
        "/register",
        "/my-account",
        "/cart",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_entry_link_selector() -> String {
    "a[href]".to_string()
}

fn default_max_pages() -> u32 {
    100
}

fn default_page_delay_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_retry_delay_ms() -> u64 {
    3000
}

fn default_error_retry_delay_ms() -> u64 {
    2000
}

fn default_batch_size() -> usize {
    5
}

fn default_concurrency() -> usize {
    2
}

fn default_entry_delay_ms() -> u64 {
    1500
}

fn default_batch_delay_ms() -> u64 {
    5000
}

fn default_progress_retention_secs() -> u64 {
    300
}

fn default_recent_titles() -> usize {
    10
}

fn default_container_selectors() -> Vec<String> {
    [
        ".elementor-text-editor",
        ".elementor-widget-text-editor",
        ".text-holder",
        ".et_pb_text_inner",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_login_lookahead() -> usize {
    3
}
