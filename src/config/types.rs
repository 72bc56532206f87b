use crate::crawler::SiteProfile;
use serde::Deserialize;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default, rename = "unit")]
    pub units: Vec<UnitConfig>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives downloaded assets and their metadata sidecars
    #[serde(default = "default_output_directory")]
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

/// Worker pool configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum number of units crawled at the same time.
    /// Defaults to the available parallelism of the machine.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

/// HTTP client configuration shared by every unit
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Total request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Browser user agent strings, one is picked at random per fetcher
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agents: default_user_agents(),
        }
    }
}

/// One crawl unit as written in the workload file
#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    /// Human readable label used in logs and reports
    pub name: String,

    /// Site-specific image postprocessing
    #[serde(default)]
    pub profile: SiteProfile,

    /// Top-level pages to start from
    #[serde(default)]
    pub targets: Vec<String>,

    /// Fetch pages through a headless browser instead of plain HTTP
    #[serde(default)]
    pub render: bool,

    /// Image URLs containing any of these substrings are skipped
    #[serde(rename = "image-ignore-patterns", default)]
    pub image_ignore_patterns: Vec<String>,

    /// Only anchors containing one of these substrings are followed
    #[serde(rename = "follow-href-patterns", default)]
    pub follow_href_patterns: Vec<String>,

    /// Maximum recursion depth (inclusive)
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Upper bound of the random pause before each page or asset (seconds)
    #[serde(rename = "think-time", default = "default_think_time")]
    pub think_time: u64,

    /// Number of retries for transient HTTP failures
    #[serde(rename = "http-retries", default = "default_http_retries")]
    pub http_retries: u32,

    /// Exponential backoff factor between retries (seconds)
    #[serde(rename = "retry-backoff", default = "default_retry_backoff")]
    pub retry_backoff: f64,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            profile: SiteProfile::default(),
            targets: Vec::new(),
            render: false,
            image_ignore_patterns: Vec::new(),
            follow_href_patterns: Vec::new(),
            max_depth: default_max_depth(),
            think_time: default_think_time(),
            http_retries: default_http_retries(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

fn default_output_directory() -> String {
    "output".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_4) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.113 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/74.0.3729.169 Safari/537.36".to_string(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.87 Safari/537.36".to_string(),
    ]
}

fn default_max_depth() -> u32 {
    1
}

fn default_think_time() -> u64 {
    10
}

fn default_http_retries() -> u32 {
    5
}

fn default_retry_backoff() -> f64 {
    5.0
}
