//! Navigation and form-fill engine.
//!
//! A [`PortalSession`] walks the portal from the login page to a downloaded
//! export:
//!
//! ```text
//! Unauthenticated ─login─▶ Authenticated ─select_store─▶ StoreSelected
//!        ─apply_filters─▶ FiltersApplied ─export─▶ Exported
//! ```
//!
//! Every step resolves its controls through the [`ElementResolver`]. Missing
//! controls and failed interactions are logged and the step moves on; only
//! missing credentials in front of a login form and a failed export abort
//! the run.

use crate::clock::RunDates;
use crate::config::RestockConfig;
use crate::credentials::Credentials;
use crate::driver::{Download, PortalDriver};
use crate::locator::ElementRef;
use crate::resolver::{ElementResolver, Role, StrategyTable};
use crate::result::{RestockError, RestockResult};
use crate::wait::{ms, settle};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the session is in the navigation sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalState {
    /// Nothing done yet
    Unauthenticated,
    /// Logged in, or the profile already carried a session
    Authenticated,
    /// Store picker handled (or absent)
    StoreSelected,
    /// Report filters typed and applied
    FiltersApplied,
    /// Export downloaded
    Exported,
}

/// What the login step found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Form filled and submitted
    Submitted,
    /// No complete login form on the page
    AlreadyAuthenticated,
    /// Form found but filling or submitting it failed
    Failed,
}

/// Browser session against the portal
#[derive(Debug)]
pub struct PortalSession<'a, D: PortalDriver> {
    driver: D,
    resolver: ElementResolver,
    config: &'a RestockConfig,
    state: PortalState,
}

impl<'a, D: PortalDriver> PortalSession<'a, D> {
    /// Session over a driver, using the portal's locator strategies
    pub fn new(driver: D, config: &'a RestockConfig) -> Self {
        Self::with_resolver(driver, config, ElementResolver::new(StrategyTable::portal(&config.portal)))
    }

    /// Session with a custom resolver
    pub fn with_resolver(driver: D, config: &'a RestockConfig, resolver: ElementResolver) -> Self {
        Self {
            driver,
            resolver,
            config,
            state: PortalState::Unauthenticated,
        }
    }

    /// Current state
    pub const fn state(&self) -> PortalState {
        self.state
    }

    /// Underlying driver
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Give the driver back (to close it)
    pub fn into_driver(self) -> D {
        self.driver
    }

    async fn goto(&mut self, url: &str) -> RestockResult<()> {
        self.driver.goto(url).await?;
        self.driver.wait_for_network_idle().await
    }

    async fn settle_after_load(&self, delay_ms: u64) {
        if let Err(e) = self.driver.wait_for_network_idle().await {
            debug!(error = %e, "network idle wait failed");
        }
        settle(ms(delay_ms)).await;
    }

    /// Click, select the current content and type `text`
    async fn fill(&self, element: &ElementRef, text: &str) -> RestockResult<()> {
        self.driver.select_all(element).await?;
        self.driver
            .type_text(element, text, self.config.timing.keystroke_delay())
            .await
    }

    /// Log in if the page shows a login form.
    ///
    /// All three controls (user name, password, submit) must resolve for the
    /// page to count as a login form; anything less is taken as an existing
    /// session from the persistent profile.
    pub async fn login(&mut self, credentials: Option<&Credentials>) -> RestockResult<LoginOutcome> {
        info!(url = %self.config.portal.base_url, "opening portal");
        let base_url = self.config.portal.base_url.clone();
        if let Err(e) = self.goto(&base_url).await {
            warn!(error = %e, "could not open portal, continuing");
        }

        let user = self.resolver.resolve(&self.driver, Role::UsernameField).await;
        let pass = self.resolver.resolve(&self.driver, Role::PasswordField).await;
        let submit = self.resolver.resolve(&self.driver, Role::LoginButton).await;
        info!(
            username_field = user.is_some(),
            password_field = pass.is_some(),
            login_button = submit.is_some(),
            "login form probe"
        );

        let (Some(user), Some(pass), Some(submit)) = (user, pass, submit) else {
            info!("no login form detected, assuming existing session");
            self.state = PortalState::Authenticated;
            return Ok(LoginOutcome::AlreadyAuthenticated);
        };

        let credentials = credentials.ok_or(RestockError::MissingCredentials)?;

        info!(username = %credentials.username, "logging in");
        let submitted = async {
            self.fill(&user, &credentials.username).await?;
            self.fill(&pass, &credentials.password).await?;
            self.driver.click(&submit).await
        }
        .await;

        self.state = PortalState::Authenticated;
        match submitted {
            Ok(()) => {
                self.settle_after_load(self.config.timing.login_settle_ms).await;
                info!("login completed");
                Ok(LoginOutcome::Submitted)
            }
            Err(e) => {
                warn!(error = %e, "login step failed, continuing");
                Ok(LoginOutcome::Failed)
            }
        }
    }

    /// Pick the configured store if the "Select Store" modal is up.
    ///
    /// Returns whether the modal was shown. Never fails the run.
    pub async fn select_store(&mut self) -> bool {
        settle(ms(self.config.timing.store_probe_ms)).await;

        let shown = if self.resolver.resolve(&self.driver, Role::StoreModal).await.is_some() {
            info!(store = %self.config.portal.store_name, "selecting store");
            match self.resolver.resolve(&self.driver, Role::StoreOption).await {
                Some(option) => {
                    if let Err(e) = self.driver.click(&option).await {
                        warn!(error = %e, "store option click failed");
                    }
                }
                None => warn!("store option not found in picker"),
            }
            if let Some(close) = self.resolver.resolve(&self.driver, Role::CloseButton).await {
                if let Err(e) = self.driver.click(&close).await {
                    debug!(error = %e, "store modal close failed");
                }
            }
            self.settle_after_load(self.config.timing.store_settle_ms).await;
            info!("store selected");
            true
        } else {
            info!("store selection modal not shown");
            false
        };

        if self.state == PortalState::Authenticated {
            self.state = PortalState::StoreSelected;
        }
        shown
    }

    /// Open the report, type the reporting window and apply it
    pub async fn apply_filters(&mut self, dates: &RunDates) {
        let report_url = self.config.portal.report_url();
        info!(url = %report_url, "opening sales by product report");
        if let Err(e) = self.goto(&report_url).await {
            warn!(error = %e, "could not open report page, continuing");
        }
        let _ = self.select_store().await;

        let day = dates.reporting_date_us();
        let filters = &self.config.filters;
        let fields = [
            (Role::StartDate, day.as_str()),
            (Role::EndDate, day.as_str()),
            (Role::StartTime, filters.start_time.as_str()),
            (Role::FinishTime, filters.finish_time.as_str()),
        ];

        let mut resolved = Vec::with_capacity(fields.len());
        for (role, value) in fields {
            let element = self.resolver.resolve(&self.driver, role).await;
            info!(field = %role, found = element.is_some(), "filter field probe");
            resolved.push((role, element, value));
        }

        info!(
            date = %day,
            start = %filters.start_time,
            finish = %filters.finish_time,
            "setting report window"
        );
        for (role, element, value) in resolved {
            let Some(element) = element else { continue };
            let typed = async {
                self.fill(&element, value).await?;
                self.driver.press(&element, "Enter").await
            }
            .await;
            if let Err(e) = typed {
                warn!(field = %role, error = %e, "could not type into field");
            }
        }

        if !self.click_apply().await {
            if let Err(e) = self.driver.press_page("Enter").await {
                debug!(error = %e, "enter fallback failed");
            }
            self.settle_after_load(self.config.timing.enter_settle_ms).await;
            info!("applied via Enter key");
        }

        self.state = PortalState::FiltersApplied;
        info!("filters applied");
    }

    /// Click the first Apply candidate that accepts a click.
    ///
    /// Returns false when every candidate is absent or fails.
    pub async fn click_apply(&self) -> bool {
        info!("clicking apply");
        let driver = &self.driver;
        let applied = self
            .resolver
            .first_success(driver, Role::ApplyButton, |element| async move {
                let clicked = async {
                    driver.scroll_into_view(&element).await?;
                    driver.click(&element).await
                }
                .await;
                if let Err(ref e) = clicked {
                    debug!(element = %element, error = %e, "apply click failed");
                }
                clicked.is_ok()
            })
            .await;

        if applied.is_some() {
            self.settle_after_load(self.config.timing.apply_settle_ms).await;
            info!("applied");
            true
        } else {
            warn!("could not find an apply button");
            false
        }
    }

    /// Export to Excel and move the download into the output directory
    pub async fn export(&mut self, dates: &RunDates) -> RestockResult<PathBuf> {
        info!("exporting to excel (can take 30-120 seconds)");
        let staging = self.config.output.staging_dir();
        let watch = self.driver.arm_download(&staging).await?;

        let driver = &self.driver;
        let clicked = self
            .resolver
            .first_success(driver, Role::ExportButton, |element| async move {
                driver.click(&element).await.is_ok()
            })
            .await;
        if clicked.is_none() {
            return Err(RestockError::Download {
                message: "Export to Excel control not found".to_string(),
            });
        }

        let download = self
            .driver
            .wait_for_download(&watch, self.config.timing.download_timeout())
            .await?;

        let dest = self
            .config
            .output
            .dir
            .join(download_file_name(&download, dates));
        persist_download(&download, &dest).await?;
        self.state = PortalState::Exported;
        info!(path = %dest.display(), "downloaded");
        Ok(dest)
    }

    /// Full navigation: login, store, filters, re-apply, export
    pub async fn fetch_report(
        &mut self,
        credentials: Option<&Credentials>,
        dates: &RunDates,
    ) -> RestockResult<PathBuf> {
        let _ = self.login(credentials).await?;
        let _ = self.select_store().await;
        self.apply_filters(dates).await;
        let _ = self.click_apply().await;
        self.export(dates).await
    }

    /// Save a screenshot of the current page into `dir`.
    ///
    /// Best effort: failures are logged and yield `None`.
    pub async fn snapshot(&self, dir: &Path) -> Option<PathBuf> {
        let png = match self.driver.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                warn!(error = %e, "error screenshot failed");
                return None;
            }
        };
        let path = dir.join(format!("{}.png", chrono::Local::now().format("%Y%m%d_%H%M%S")));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, png).await
        }
        .await;
        match written {
            Ok(()) => {
                info!(path = %path.display(), "saved error screenshot");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "could not write error screenshot");
                None
            }
        }
    }
}

/// Server-proposed file name, or `SalesByProduct_<reporting date>.xlsx`
fn download_file_name(download: &Download, dates: &RunDates) -> String {
    Path::new(download.suggested_filename.trim())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            format!(
                "SalesByProduct_{}.xlsx",
                dates.reporting_date().format("%Y-%m-%d")
            )
        })
}

async fn persist_download(download: &Download, dest: &Path) -> RestockResult<()> {
    if download.path == dest {
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if tokio::fs::rename(&download.path, dest).await.is_err() {
        let _ = tokio::fs::copy(&download.path, dest)
            .await
            .map_err(|e| RestockError::Download {
                message: format!("cannot save {}: {e}", dest.display()),
            })?;
        let _ = tokio::fs::remove_file(&download.path).await;
    }
    Ok(())
}
