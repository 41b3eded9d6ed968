use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// WebDriver remote endpoint, e.g. `http://localhost:9515`.
    pub webdriver_url: String,

    /// Base URL a post id is appended to, `{base}/{post_id}/`.
    pub post_url_base: String,

    /// Sent as `Referer` on image fetches. CDN rejects bare requests.
    pub image_referrer: String,
    pub user_agent: String,

    /// Base wait after a successful navigation step, before the next scan.
    pub settle_base: Duration,

    /// Hard cap on navigation steps per post.
    pub max_nav_attempts: u32,
    /// Consecutive steps yielding no new unique image before giving up.
    pub max_no_new_steps: u32,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            webdriver_url: required_env("WEBDRIVER_URL"),
            post_url_base: env::var("GRAMFLOW_POST_URL_BASE")
                .unwrap_or_else(|_| "https://www.instagram.com/p".to_string()),
            image_referrer: env::var("GRAMFLOW_IMAGE_REFERRER")
                .unwrap_or_else(|_| "https://www.instagram.com/".to_string()),
            user_agent: env::var("GRAMFLOW_USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string()
            }),
            settle_base: Duration::from_millis(
                env::var("GRAMFLOW_SETTLE_MS")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .expect("GRAMFLOW_SETTLE_MS must be a number"),
            ),
            max_nav_attempts: env::var("GRAMFLOW_MAX_NAV_ATTEMPTS")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .expect("GRAMFLOW_MAX_NAV_ATTEMPTS must be a number"),
            max_no_new_steps: env::var("GRAMFLOW_MAX_NO_NEW_STEPS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("GRAMFLOW_MAX_NO_NEW_STEPS must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
