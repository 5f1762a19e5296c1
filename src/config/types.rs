use serde::Deserialize;

/// Main configuration structure for Job-Trawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    pub requests: RequestsConfig,
    #[serde(default)]
    pub vpn: VpnConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// What to search for
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search keywords, crossed with every location
    pub keywords: Vec<String>,

    /// Locations, crossed with every keyword
    pub locations: Vec<SearchLocation>,

    /// Experience level filter (`f_E`)
    #[serde(default = "default_experience")]
    pub experience: String,

    /// Posting time range filter (`f_TPR`), e.g. "r86400" for the last day
    pub timespan: String,

    /// Work type filter (`f_WT`): 1 on-site, 2 remote, 3 hybrid
    #[serde(rename = "work-type")]
    pub work_type: String,

    /// Number of result pages to walk per (keyword, location) pair
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Results per search page, used to compute the page offset
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,
}

/// A search location: display text plus the site's geo identifier
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchLocation {
    pub name: String,

    #[serde(rename = "geo-id")]
    pub geo_id: String,
}

/// HTTP request behavior
#[derive(Debug, Clone, Deserialize)]
pub struct RequestsConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Lower bound of the courtesy delay before each attempt (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the courtesy delay before each attempt (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Network timeout of a single attempt (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// VPN client and rotation settings
#[derive(Debug, Clone, Deserialize)]
pub struct VpnConfig {
    #[serde(default)]
    pub enable: bool,

    /// Path to the VPN client binary
    #[serde(default = "default_vpn_path")]
    pub path: String,

    /// Directory holding the per-server client config files
    #[serde(rename = "config-dir", default = "default_config_dir")]
    pub config_dir: String,

    /// File name pattern of a server config; `{n}` is the server number
    #[serde(rename = "config-pattern", default = "default_config_pattern")]
    pub config_pattern: String,

    /// Credentials file passed to the client
    #[serde(rename = "auth-file", default = "default_auth_file")]
    pub auth_file: String,

    /// Number of servers in the pool (servers are numbered 1..=pool-size)
    #[serde(rename = "pool-size", default = "default_pool_size")]
    pub pool_size: u32,

    /// Rotate identity every this many search pages
    #[serde(rename = "rotation-cadence", default = "default_rotation_cadence")]
    pub rotation_cadence: u32,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "shutdown-timeout-secs", default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Endpoint returning `{"ip": "..."}` for the caller's public address
    #[serde(rename = "ip-check-url", default = "default_ip_check_url")]
    pub ip_check_url: String,
}

impl Default for VpnConfig {
    fn default() -> Self {
        Self {
            enable: false,
            path: default_vpn_path(),
            config_dir: default_config_dir(),
            config_pattern: default_config_pattern(),
            auth_file: default_auth_file(),
            pool_size: default_pool_size(),
            rotation_cadence: default_rotation_cadence(),
            connect_timeout_secs: default_connect_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            ip_check_url: default_ip_check_url(),
        }
    }
}

/// Description processing switches
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Enables experience highlighting and qualification tagging
    #[serde(default = "default_true")]
    pub enable: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { enable: true }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory for company logos; logos are skipped when unset
    #[serde(rename = "logo-dir", default)]
    pub logo_dir: Option<String>,
}

/// Endpoints of the job site
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Paginated search endpoint
    #[serde(rename = "search-url", default = "default_search_url")]
    pub search_url: String,

    /// Detail endpoint; the listing id is appended as a path segment
    #[serde(rename = "detail-url", default = "default_detail_url")]
    pub detail_url: String,

    /// Public listing page; the listing id is appended as a path segment
    #[serde(rename = "view-url", default = "default_view_url")]
    pub view_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            detail_url: default_detail_url(),
            view_url: default_view_url(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_experience() -> String {
    "2".to_string()
}

fn default_page_size() -> u32 {
    25
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_vpn_path() -> String {
    "openvpn".to_string()
}

fn default_config_dir() -> String {
    "vpn".to_string()
}

fn default_config_pattern() -> String {
    "us-free-{n}.protonvpn.udp.ovpn".to_string()
}

fn default_auth_file() -> String {
    "vpn/auth.txt".to_string()
}

fn default_pool_size() -> u32 {
    1
}

fn default_rotation_cadence() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    120
}

fn default_shutdown_timeout() -> u64 {
    15
}

fn default_ip_check_url() -> String {
    "https://api.ipify.org?format=json".to_string()
}

fn default_search_url() -> String {
    "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search".to_string()
}

fn default_detail_url() -> String {
    "https://www.linkedin.com/jobs-guest/jobs/api/jobPosting".to_string()
}

fn default_view_url() -> String {
    "https://www.linkedin.com/jobs/view".to_string()
}
