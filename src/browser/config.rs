use std::time::Duration;

use crate::config::BrowserSettings;

/// Desktop Chrome; galleries serve a reduced lightbox to unknown agents
const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// How Chrome is launched for a gallery session
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,

    /// Viewport in CSS pixels. Overlay detection depends on element offsets,
    /// so keep this close to a real desktop screen.
    pub window_size: (u32, u32),

    pub user_agent: Option<String>,

    /// Navigation and element lookup timeout for each tab
    pub timeout: Duration,

    /// How long the CDP connection may stay silent before it is dropped.
    /// Settle delays on slow galleries add up, so keep this generous.
    pub idle_timeout: Duration,

    /// Extra command-line switches
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            user_agent: Some(DESKTOP_USER_AGENT.to_string()),
            timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            extra_args: vec![
                "--disable-blink-features=AutomationControlled".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--hide-scrollbars".to_string(),
                "--mute-audio".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        Self {
            headless: settings.headless,
            window_size: (settings.window_width, settings.window_height),
            timeout: settings.timeout(),
            ..Self::default()
        }
    }

    /// Visible window, for watching a scan while tuning selectors
    pub fn visible() -> Self {
        Self {
            headless: false,
            ..Self::default()
        }
    }

    pub fn chrome_args(&self) -> Vec<String> {
        let mut args = self.extra_args.clone();
        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={}", ua));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_desktop_viewport() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(config.window_size, (1920, 1080));
        assert!(config.idle_timeout > config.timeout);
    }

    #[test]
    fn test_visible() {
        assert!(!BrowserConfig::visible().headless);
    }

    #[test]
    fn test_from_settings() {
        let settings = BrowserSettings {
            headless: false,
            window_width: 1280,
            window_height: 720,
            timeout_secs: 10,
        };
        let config = BrowserConfig::from_settings(&settings);
        assert!(!config.headless);
        assert_eq!(config.window_size, (1280, 720));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.user_agent.as_deref(), Some(DESKTOP_USER_AGENT));
    }

    #[test]
    fn test_chrome_args_include_user_agent() {
        let config = BrowserConfig {
            user_agent: Some("TestAgent/1.0".to_string()),
            ..BrowserConfig::default()
        };
        let args = config.chrome_args();
        assert_eq!(args.last().map(String::as_str), Some("--user-agent=TestAgent/1.0"));
        assert!(args.iter().any(|a| a == "--hide-scrollbars"));

        let bare = BrowserConfig {
            user_agent: None,
            extra_args: Vec::new(),
            ..BrowserConfig::default()
        };
        assert!(bare.chrome_args().is_empty());
    }
}
