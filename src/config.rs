use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

pub const DEFAULT_FEEDS: [&str; 3] = [
    "https://krebsonsecurity.com/feed/",
    "https://feeds.feedburner.com/TheHackersNews",
    "https://securityaffairs.com/feed",
];

/// Ten years.
pub const MAX_WINDOW_HOURS: i64 = 87_600;

pub const DEFAULT_KEYWORDS: [&str; 7] = [
    "ransomware",
    "phishing",
    "malware",
    "zero-day",
    "infosec",
    "CVE",
    "cybersecurity",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub sources: Vec<String>,
    pub window_hours: i64,
    pub max_items: usize,
    pub similarity_threshold: f64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            window_hours: 24,
            max_items: 20,
            similarity_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub woeid: u32,
    pub count: usize,
    pub keywords: Vec<String>,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.twitterapi.io".to_string(),
            woeid: 1,
            count: 5,
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewriterConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub rewrite_articles: bool,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            rewrite_articles: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub sender: Option<String>,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Six-field cron expression (`sec min hour day month weekday`), UTC.
    pub cron: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpConfig,
    pub feeds: FeedsConfig,
    pub trends: TrendsConfig,
    pub rewriter: RewriterConfig,
    pub telegram: TelegramConfig,
    pub discord: DiscordConfig,
    pub email: EmailConfig,
    pub logging: LoggingConfig,
    pub schedule: ScheduleConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let environment = env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let config_file = match environment.as_str() {
            "production" => "prod",
            _ => "dev",
        };

        let s = Config::builder()
            .add_source(File::with_name("config/default.yaml").required(false))
            .add_source(File::with_name(&format!("config/{}.yaml", config_file)).required(false))
            .add_source(File::with_name("config/local.yaml").required(false))
            .add_source(
                Environment::with_prefix("DIGEST")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("feeds.sources")
                    .with_list_parse_key("trends.keywords")
                    .with_list_parse_key("email.recipients"),
            )
            .build()?;

        let settings: Self = s.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let hours = self.feeds.window_hours;
        if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
            return Err(ConfigError::Message(format!(
                "feeds.window_hours must be between 1 and {MAX_WINDOW_HOURS}, got {hours}"
            )));
        }

        let threshold = self.feeds.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Message(format!(
                "feeds.similarity_threshold must be between 0 and 1, got {threshold}"
            )));
        }

        Ok(())
    }
}

/// Treats blank strings as unset, so an empty env var disables a channel.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_digest_behaviour() {
        let settings = Settings::default();

        assert_eq!(settings.feeds.sources.len(), 3);
        assert_eq!(settings.feeds.window_hours, 24);
        assert_eq!(settings.feeds.max_items, 20);
        assert!((settings.feeds.similarity_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(settings.trends.count, 5);
        assert!(settings.trends.api_key.is_none());
        assert!(settings.schedule.cron.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "feeds:\n  window_hours: 48\ntelegram:\n  token: abc\n";
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.feeds.window_hours, 48);
        assert_eq!(settings.feeds.max_items, 20);
        assert_eq!(settings.telegram.token.as_deref(), Some("abc"));
        assert!(settings.telegram.chat_id.is_none());
    }

    #[test]
    fn test_validate_window_and_threshold() {
        assert!(Settings::default().validate().is_ok());

        for hours in [0, -24, MAX_WINDOW_HOURS + 1, i64::MAX] {
            let mut settings = Settings::default();
            settings.feeds.window_hours = hours;
            let err = settings.validate().unwrap_err();
            assert!(err.to_string().contains("feeds.window_hours"), "{hours}: {err}");
        }

        let mut settings = Settings::default();
        settings.feeds.similarity_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(&Some("  ".to_string())), None);
        assert_eq!(non_empty(&None), None);
        assert_eq!(non_empty(&Some(" key ".to_string())), Some("key"));
    }
}
