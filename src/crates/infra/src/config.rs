use crate::auth::AuthConfig;
use application::command::sync::RetryPolicy;
use application::query::recommend::{RecommendationSettings, ENGLISH_STOP_WORDS};
use application::query::search::SearchSettings;
use application::shared::IndexNames;
use config::{Config, Environment, File};
use domain::activity::RatingRange;
use dotenvy::dotenv;
use serde::Deserialize;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    database_url: String,
    jwt_expire_secs: i64,
    jwt_secret_key: String,
    salt_cost: i32,
    /// 雪花 ID 的节点号
    node_id: i64,
    server: RawServerConfig,
    search: RawSearchConfig,
    sync: RawSyncConfig,
    recommendation: RawRecommendationConfig,
    rating: RawRatingConfig,
    search_defaults: RawSearchDefaults,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            database_url: "".to_string(),
            jwt_expire_secs: 1800,
            jwt_secret_key: "secret".to_string(),
            salt_cost: 10,
            node_id: 1,
            server: RawServerConfig::default(),
            search: RawSearchConfig::default(),
            sync: RawSyncConfig::default(),
            recommendation: RawRecommendationConfig::default(),
            rating: RawRatingConfig::default(),
            search_defaults: RawSearchDefaults::default(),
        }
    }
}

/// 服务器配置（原始配置）
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawServerConfig {
    /// 监听地址
    host: String,
    /// 监听端口
    port: u16,
}

impl Default for RawServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// 搜索服务配置（原始配置）
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSearchConfig {
    url: String,
    username: String,
    password: String,
    /// 自签名证书的开发环境才需要打开
    accept_invalid_certs: bool,
    songs_index: String,
    playlist_index: String,
    timeout_secs: u64,
}

impl Default for RawSearchConfig {
    fn default() -> Self {
        let names = IndexNames::default();
        Self {
            url: "https://localhost:9200".to_string(),
            username: "".to_string(),
            password: "".to_string(),
            accept_invalid_certs: false,
            songs_index: names.songs,
            playlist_index: names.playlists,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSyncConfig {
    max_attempts: u32,
    backoff_ms: u64,
}

impl Default for RawSyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawRecommendationConfig {
    seed_threshold: usize,
    sample_size: u64,
    result_size: u32,
    min_term_freq: u32,
    stop_words: Vec<String>,
}

impl Default for RawRecommendationConfig {
    fn default() -> Self {
        Self {
            seed_threshold: 3,
            sample_size: 10,
            result_size: 100,
            min_term_freq: 2,
            stop_words: ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawRatingConfig {
    min: i32,
    max: i32,
}

impl Default for RawRatingConfig {
    fn default() -> Self {
        let range = RatingRange::default();
        Self {
            min: range.min,
            max: range.max,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSearchDefaults {
    free_text_size: u32,
    curate_size: u32,
    page_size: u32,
    scroll_keep_alive: String,
}

impl Default for RawSearchDefaults {
    fn default() -> Self {
        Self {
            free_text_size: 10,
            curate_size: 20,
            page_size: 100,
            scroll_keep_alive: "1m".to_string(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 搜索服务连接配置
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
    pub indices: IndexNames,
}

impl SearchConfig {
    /// 用户名为空时不发送 basic auth
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfigImpl {
    pub jwt_expire_secs: Arc<AtomicU64>,
    pub salt_cost: Arc<AtomicU64>,
    jwt_secret_key: String,
    database_url: String,
    node_id: i64,
    server: ServerConfig,
    search: SearchConfig,
    retry: RetryPolicy,
    rating: RatingRange,
    recommendation: RecommendationSettings,
    search_settings: SearchSettings,
    curate_size: u32,
}

impl AppConfigImpl {
    fn new(data: RawConfig) -> Self {
        let search_settings = SearchSettings {
            free_text_size: data.search_defaults.free_text_size,
            page_size: data.search_defaults.page_size,
            scroll_keep_alive: data.search_defaults.scroll_keep_alive,
        };
        let recommendation = RecommendationSettings {
            seed_threshold: data.recommendation.seed_threshold,
            sample_size: data.recommendation.sample_size,
            result_size: data.recommendation.result_size,
            min_term_freq: data.recommendation.min_term_freq,
            stop_words: data.recommendation.stop_words,
            page_size: search_settings.page_size,
            scroll_keep_alive: search_settings.scroll_keep_alive.clone(),
            ..RecommendationSettings::default()
        };
        let search = SearchConfig {
            url: data.search.url.trim_end_matches('/').to_string(),
            username: data.search.username,
            password: data.search.password,
            accept_invalid_certs: data.search.accept_invalid_certs,
            timeout: Duration::from_secs(data.search.timeout_secs),
            indices: IndexNames {
                songs: data.search.songs_index,
                playlists: data.search.playlist_index,
            },
        };
        AppConfigImpl {
            jwt_expire_secs: Arc::new(AtomicU64::new(data.jwt_expire_secs as u64)),
            salt_cost: Arc::new(AtomicU64::new(data.salt_cost as u64)),
            jwt_secret_key: data.jwt_secret_key,
            database_url: data.database_url,
            node_id: data.node_id,
            server: ServerConfig {
                host: data.server.host,
                port: data.server.port,
            },
            search,
            retry: RetryPolicy::new(
                data.sync.max_attempts,
                Duration::from_millis(data.sync.backoff_ms),
            ),
            rating: RatingRange {
                min: data.rating.min,
                max: data.rating.max,
            },
            recommendation,
            search_settings,
            curate_size: data.search_defaults.curate_size,
        }
    }

    pub fn load() -> Result<AppConfigImpl, Box<dyn Error>> {
        dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<AppConfigImpl, Box<dyn Error>> {
        let raw: RawConfig = config.try_deserialize()?; // serde 自动填充默认值
        if raw.rating.min > raw.rating.max {
            return Err(format!(
                "rating.min ({}) must not exceed rating.max ({})",
                raw.rating.min, raw.rating.max
            )
            .into());
        }
        Ok(AppConfigImpl::new(raw))
    }

    pub fn database_url(&self) -> String {
        self.database_url.clone()
    }

    pub fn node_id(&self) -> i64 {
        self.node_id
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone()
    }

    pub fn search(&self) -> SearchConfig {
        self.search.clone()
    }

    pub fn index_names(&self) -> IndexNames {
        self.search.indices.clone()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn rating_range(&self) -> RatingRange {
        self.rating
    }

    pub fn recommendation(&self) -> RecommendationSettings {
        self.recommendation.clone()
    }

    pub fn search_settings(&self) -> SearchSettings {
        self.search_settings.clone()
    }

    /// 策展歌单默认歌曲数
    pub fn curate_size(&self) -> u32 {
        self.curate_size
    }
}

impl AuthConfig for AppConfigImpl {
    fn jwt_secret(&self) -> &str {
        &self.jwt_secret_key
    }

    fn jwt_expire_secs(&self) -> i64 {
        self.jwt_expire_secs.load(Ordering::SeqCst) as i64
    }

    fn salt_cost(&self) -> i32 {
        self.salt_cost.load(Ordering::SeqCst) as i32
    }
}
