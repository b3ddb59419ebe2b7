//! Browser control over the Chrome `DevTools` Protocol.
//!
//! [`ChromiumDriver`] implements [`PortalDriver`] with chromiumoxide. Elements
//! are located by evaluating the selector's query script in the page; to act
//! on one, the driver tags it with a throwaway `data-restocker-handle`
//! attribute and fetches it back as a CDP element.

use crate::config::{BrowserConfig, TimingConfig};
use crate::driver::{Download, DownloadWatch, PortalDriver};
use crate::locator::{js_string, ElementRef, Selector};
use crate::result::{RestockError, RestockResult};
use crate::wait::{IdleTracker, NetworkProbe, IDLE_POLL_INTERVAL, NETWORK_PROBE_JS};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const HANDLE_ATTR: &str = "data-restocker-handle";
const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser instance with a real CDP connection and one working page
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: CdpBrowser,
    page: CdpPage,
    timing: TimingConfig,
    next_handle: AtomicU64,
    #[allow(dead_code)]
    handle: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch chromium on the persistent profile and open a blank page
    pub async fn launch(config: &BrowserConfig, timing: TimingConfig) -> RestockResult<Self> {
        std::fs::create_dir_all(&config.profile_dir)?;

        let mut builder = CdpConfig::builder()
            .user_data_dir(&config.profile_dir)
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            });

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| RestockError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| RestockError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| RestockError::Page {
                message: e.to_string(),
            })?;

        info!(
            headless = config.headless,
            profile = %config.profile_dir.display(),
            "browser launched"
        );

        Ok(Self {
            browser,
            page,
            timing,
            next_handle: AtomicU64::new(0),
            handle,
        })
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, expr: &str) -> RestockResult<T> {
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| RestockError::script(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| RestockError::script(e.to_string()))
    }

    /// Fetch the referenced node as a CDP element
    async fn materialize(&self, element: &ElementRef) -> RestockResult<Element> {
        let token = self.next_handle.fetch_add(1, Ordering::Relaxed).to_string();
        let tagged: bool = self
            .eval(&format!(
                "(() => {{ const el = {}; if (!el) return false; el.setAttribute({}, {}); return true; }})()",
                element.to_query(),
                js_string(HANDLE_ATTR),
                js_string(&token)
            ))
            .await?;
        if !tagged {
            return Err(RestockError::script(format!("element vanished: {element}")));
        }
        self.page
            .find_element(format!("[{HANDLE_ATTR}='{token}']"))
            .await
            .map_err(|e| RestockError::script(e.to_string()))
    }
}

fn input_err(e: impl std::fmt::Display) -> RestockError {
    RestockError::input(e.to_string())
}

fn is_partial_download(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("crdownload") || ext.eq_ignore_ascii_case("tmp"))
}

async fn list_files(dir: &Path) -> RestockResult<HashSet<PathBuf>> {
    let mut files = HashSet::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            let _ = files.insert(entry.path());
        }
    }
    Ok(files)
}

#[async_trait]
impl PortalDriver for ChromiumDriver {
    async fn goto(&mut self, url: &str) -> RestockResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| RestockError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> RestockResult<()> {
        let start = Instant::now();
        let cap = Duration::from_millis(self.timing.network_idle_cap_ms);
        let mut tracker = IdleTracker::new(Duration::from_millis(self.timing.network_quiet_ms), start);
        loop {
            // Evaluation fails while a navigation swaps the execution context.
            if let Ok(probe) = self.eval::<NetworkProbe>(NETWORK_PROBE_JS).await {
                if tracker.observe(&probe, Instant::now()) {
                    return Ok(());
                }
            }
            if start.elapsed() >= cap {
                debug!(cap_ms = self.timing.network_idle_cap_ms, "network never went idle, continuing");
                return Ok(());
            }
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
        }
    }

    async fn count(&self, selector: &Selector) -> RestockResult<usize> {
        self.eval(&format!("({}).length", selector.to_query())).await
    }

    async fn is_visible(&self, element: &ElementRef) -> RestockResult<bool> {
        self.eval(&format!(
            "(() => {{ const el = {}; if (!el || !el.isConnected) return false; \
             const s = getComputedStyle(el); if (s.visibility === 'hidden' || s.display === 'none') return false; \
             const r = el.getBoundingClientRect(); return r.width > 0 && r.height > 0; }})()",
            element.to_query()
        ))
        .await
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> RestockResult<()> {
        let el = self.materialize(element).await?;
        el.scroll_into_view().await.map_err(input_err)?;
        Ok(())
    }

    async fn click(&self, element: &ElementRef) -> RestockResult<()> {
        let el = self.materialize(element).await?;
        el.click().await.map_err(input_err)?;
        Ok(())
    }

    async fn select_all(&self, element: &ElementRef) -> RestockResult<()> {
        let el = self.materialize(element).await?;
        el.click().await.map_err(input_err)?;
        let selected: bool = self
            .eval(&format!(
                "(() => {{ const el = {}; if (!el) return false; el.focus(); \
                 if (typeof el.select === 'function') el.select(); return true; }})()",
                element.to_query()
            ))
            .await?;
        if selected {
            Ok(())
        } else {
            Err(RestockError::input(format!("cannot select content of {element}")))
        }
    }

    async fn type_text(&self, element: &ElementRef, text: &str, delay: Duration) -> RestockResult<()> {
        let el = self.materialize(element).await?;
        el.focus().await.map_err(input_err)?;
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            el.type_str(ch.encode_utf8(&mut buf)).await.map_err(input_err)?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    async fn press(&self, element: &ElementRef, key: &str) -> RestockResult<()> {
        let el = self.materialize(element).await?;
        el.focus().await.map_err(input_err)?;
        el.press_key(key).await.map_err(input_err)?;
        Ok(())
    }

    async fn press_page(&self, key: &str) -> RestockResult<()> {
        let target = match self.page.find_element(":focus").await {
            Ok(el) => el,
            Err(_) => self.page.find_element("body").await.map_err(input_err)?,
        };
        target.press_key(key).await.map_err(input_err)?;
        Ok(())
    }

    async fn arm_download(&mut self, dir: &Path) -> RestockResult<DownloadWatch> {
        tokio::fs::create_dir_all(dir).await?;
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(dir.to_string_lossy().into_owned())
            .events_enabled(true)
            .build()
            .map_err(|message| RestockError::Download { message })?;
        self.browser
            .execute(params)
            .await
            .map_err(|e| RestockError::Download {
                message: e.to_string(),
            })?;
        Ok(DownloadWatch {
            dir: dir.to_path_buf(),
            existing: list_files(dir).await?,
        })
    }

    async fn wait_for_download(&self, watch: &DownloadWatch, timeout: Duration) -> RestockResult<Download> {
        let poll = async {
            loop {
                let fresh = list_files(&watch.dir)
                    .await?
                    .into_iter()
                    .find(|p| !watch.existing.contains(p) && !is_partial_download(p));
                if let Some(path) = fresh {
                    let suggested_filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    return Ok::<_, RestockError>(Download {
                        suggested_filename,
                        path,
                    });
                }
                tokio::time::sleep(DOWNLOAD_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| RestockError::Timeout {
                ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }

    async fn screenshot(&self) -> RestockResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();

        let screenshot = self
            .page
            .execute(params)
            .await
            .map_err(|e| RestockError::Screenshot {
                message: e.to_string(),
            })?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| RestockError::Screenshot {
                message: e.to_string(),
            })
    }

    async fn close(&mut self) -> RestockResult<()> {
        self.browser
            .close()
            .await
            .map_err(|e| RestockError::BrowserLaunch {
                message: e.to_string(),
            })?;
        Ok(())
    }
}
