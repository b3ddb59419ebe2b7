//! Run configuration.
//!
//! Everything portal- or site-specific lives here so the resolver, the report
//! engine and the decision logic can be exercised without a portal. The
//! configuration is built once (defaults, then a YAML file, then CLI
//! overrides) and passed by reference into each component.

use crate::clock::RunDates;
use crate::result::{RestockError, RestockResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete configuration for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestockConfig {
    /// Portal location and store identity
    pub portal: PortalConfig,
    /// Report filter values
    pub filters: FilterConfig,
    /// Settle delays and timeouts
    pub timing: TimingConfig,
    /// Output locations
    pub output: OutputConfig,
    /// Recipients and message text
    pub mail: MailConfig,
    /// Browser launch options
    pub browser: BrowserConfig,
}

impl RestockConfig {
    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> RestockResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_yaml_file(path: &Path) -> RestockResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            RestockError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> RestockResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check the values that would otherwise fail deep inside a run
    pub fn validate(&self) -> RestockResult<()> {
        let url = self.portal.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RestockError::config(format!(
                "portal.base_url must be an http(s) URL, got {url:?}"
            )));
        }
        if self.portal.store_label.trim().is_empty() && self.portal.store_name.trim().is_empty() {
            return Err(RestockError::config("portal.store_label or portal.store_name is required"));
        }
        if self.timing.download_timeout_ms == 0 {
            return Err(RestockError::config("timing.download_timeout_ms must be positive"));
        }
        Ok(())
    }
}

/// Portal location and store identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Portal root (login page)
    pub base_url: String,
    /// Path of the sales-by-product report
    pub report_path: String,
    /// Store option label including the store code
    pub store_label: String,
    /// Store display name; also the partial-match fallback in the store picker
    pub store_name: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "https://astoria.barnetportal.com".to_string(),
            report_path: "/reports/sales-by-product".to_string(),
            store_label: "Astoria Liquor 191222".to_string(),
            store_name: "Astoria Liquor".to_string(),
        }
    }
}

impl PortalConfig {
    /// Absolute report URL
    #[must_use]
    pub fn report_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.report_path.trim_start_matches('/')
        )
    }
}

/// Values typed into the report filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Start time of the sales window
    pub start_time: String,
    /// Finish time of the sales window
    pub finish_time: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            start_time: "07:30 AM".to_string(),
            finish_time: "11:50 PM".to_string(),
        }
    }
}

/// Settle delays and timeouts, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause between typed keys
    pub keystroke_delay_ms: u64,
    /// Settle after submitting the login form
    pub login_settle_ms: u64,
    /// Pause before probing for the store modal
    pub store_probe_ms: u64,
    /// Settle after picking a store
    pub store_settle_ms: u64,
    /// Settle after clicking Apply
    pub apply_settle_ms: u64,
    /// Settle after the Enter-key fallback
    pub enter_settle_ms: u64,
    /// Hard bound on the export download
    pub download_timeout_ms: u64,
    /// Quiet period that counts as network idle
    pub network_quiet_ms: u64,
    /// Give up waiting for network idle after this long
    pub network_idle_cap_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            keystroke_delay_ms: 30,
            login_settle_ms: 1000,
            store_probe_ms: 800,
            store_settle_ms: 800,
            apply_settle_ms: 1500,
            enter_settle_ms: 1000,
            download_timeout_ms: 120_000,
            network_quiet_ms: 500,
            network_idle_cap_ms: 30_000,
        }
    }
}

impl TimingConfig {
    /// No delays at all (tests)
    #[must_use]
    pub const fn instant() -> Self {
        Self {
            keystroke_delay_ms: 0,
            login_settle_ms: 0,
            store_probe_ms: 0,
            store_settle_ms: 0,
            apply_settle_ms: 0,
            enter_settle_ms: 0,
            download_timeout_ms: 1,
            network_quiet_ms: 0,
            network_idle_cap_ms: 0,
        }
    }

    /// Keystroke delay as a duration
    #[must_use]
    pub const fn keystroke_delay(&self) -> Duration {
        Duration::from_millis(self.keystroke_delay_ms)
    }

    /// Download bound as a duration
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }
}

/// Output locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for downloads and generated reports
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
        }
    }
}

impl OutputConfig {
    /// Where error screenshots go
    #[must_use]
    pub fn errors_dir(&self) -> PathBuf {
        self.dir.join("errors")
    }

    /// Where unsent messages are saved
    #[must_use]
    pub fn drafts_dir(&self) -> PathBuf {
        self.dir.join("drafts")
    }

    /// Where the browser drops in-flight downloads
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.dir.join(".staging")
    }

    /// Output report path, named after the execution date
    #[must_use]
    pub fn report_path(&self, dates: &RunDates) -> PathBuf {
        self.dir.join(format!(
            "Restocking_{}.xlsx",
            dates.execution_date().format("%Y-%m-%d")
        ))
    }
}

/// Recipients and message text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Account the transport must send from
    pub sender: String,
    /// Daily team recipients
    pub team_to: Vec<String>,
    /// Daily team cc
    pub team_cc: Vec<String>,
    /// Alert recipients
    pub alert_to: Vec<String>,
    /// Name signed under the team mail
    pub signature: String,
    /// HTTP mail relay endpoint
    pub relay_url: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            team_to: Vec::new(),
            team_cc: Vec::new(),
            alert_to: Vec::new(),
            signature: "Store Operations".to_string(),
            relay_url: None,
        }
    }
}

impl MailConfig {
    /// Check that both notification paths have somewhere to go
    pub fn validate(&self) -> RestockResult<()> {
        if self.team_to.is_empty() {
            return Err(RestockError::config("mail.team_to has no recipients"));
        }
        if self.alert_to.is_empty() {
            return Err(RestockError::config("mail.alert_to has no recipients"));
        }
        Ok(())
    }
}

/// Browser launch options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Persistent profile directory (keeps the portal session)
    pub profile_dir: PathBuf,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1400,
            viewport_height: 900,
            profile_dir: PathBuf::from("barnet_profile"),
            chromium_path: None,
            sandbox: true,
        }
    }
}
