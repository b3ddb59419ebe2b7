//! PortalDriver - the browser capability the portal automation is written against
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PortalDriver (async trait)                                   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────┐  │
//! │  │  ChromiumDriver     │        │  MockDriver             │  │
//! │  │  CDP via            │        │  scripted elements,     │  │
//! │  │  chromiumoxide      │        │  call history           │  │
//! │  └─────────────────────┘        └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups (`count`, `is_visible`) are the "locate" half used by the
//! [`ElementResolver`](crate::ElementResolver); everything else acts on an
//! already resolved [`ElementRef`].

use crate::locator::{ElementRef, Selector};
use crate::result::{RestockError, RestockResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// A file the browser finished downloading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// File name proposed by the server (may be empty)
    pub suggested_filename: String,
    /// Where the browser stored the bytes
    pub path: PathBuf,
}

/// Download expectation armed before the triggering click
#[derive(Debug, Clone, Default)]
pub struct DownloadWatch {
    /// Directory the browser was told to save into
    pub dir: PathBuf,
    /// Files already present when the watch was armed
    pub existing: HashSet<PathBuf>,
}

/// Abstract browser driver
///
/// # Implementations
///
/// - `ChromiumDriver` - real browser over CDP (feature `browser`)
/// - [`MockDriver`] - for unit testing
#[async_trait]
pub trait PortalDriver: Send + Sync {
    /// Navigate to URL
    async fn goto(&mut self, url: &str) -> RestockResult<()>;

    /// Block until the page stops loading resources (heuristic, never fails on slowness)
    async fn wait_for_network_idle(&self) -> RestockResult<()>;

    /// Number of elements matching the selector
    async fn count(&self, selector: &Selector) -> RestockResult<usize>;

    /// Whether the element exists and is rendered
    async fn is_visible(&self, element: &ElementRef) -> RestockResult<bool>;

    /// Scroll the element into the viewport
    async fn scroll_into_view(&self, element: &ElementRef) -> RestockResult<()>;

    /// Click the element
    async fn click(&self, element: &ElementRef) -> RestockResult<()>;

    /// Focus the element and select its current content
    async fn select_all(&self, element: &ElementRef) -> RestockResult<()>;

    /// Type text one key at a time, pausing `delay` between keystrokes
    async fn type_text(&self, element: &ElementRef, text: &str, delay: Duration) -> RestockResult<()>;

    /// Press a key (e.g. "Enter") with the element focused
    async fn press(&self, element: &ElementRef, key: &str) -> RestockResult<()>;

    /// Press a key on whatever currently has focus
    async fn press_page(&self, key: &str) -> RestockResult<()>;

    /// Start accepting downloads into `dir`
    async fn arm_download(&mut self, dir: &Path) -> RestockResult<DownloadWatch>;

    /// Wait for the armed download to complete
    async fn wait_for_download(&self, watch: &DownloadWatch, timeout: Duration) -> RestockResult<Download>;

    /// PNG screenshot of the current viewport
    async fn screenshot(&self) -> RestockResult<Vec<u8>>;

    /// Close the browser
    async fn close(&mut self) -> RestockResult<()>;
}

/// Scripted element for [`MockDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockElement {
    /// Rendered and on screen
    pub visible: bool,
    /// Clicking or typing into it raises (e.g. detached node)
    pub broken: bool,
}

impl MockElement {
    /// A visible, working element
    #[must_use]
    pub const fn visible() -> Self {
        Self {
            visible: true,
            broken: false,
        }
    }

    /// A present but hidden element
    #[must_use]
    pub const fn hidden() -> Self {
        Self {
            visible: false,
            broken: false,
        }
    }

    /// A visible element whose interactions fail
    #[must_use]
    pub const fn broken() -> Self {
        Self {
            visible: true,
            broken: true,
        }
    }
}

/// Mock driver for unit testing
///
/// Elements are keyed by the selector's display form; a selector registered
/// with [`MockDriver::with_failing_lookup`] raises on lookup.
#[derive(Debug, Default)]
pub struct MockDriver {
    /// Current URL
    pub current_url: String,
    elements: HashMap<String, Vec<MockElement>>,
    failing_lookups: HashSet<String>,
    download: Option<Download>,
    screenshot: Option<Vec<u8>>,
    history: Mutex<Vec<String>>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one element matching `selector`
    #[must_use]
    pub fn with_element(mut self, selector: &Selector, element: MockElement) -> Self {
        self.elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }

    /// Make lookups of `selector` raise
    #[must_use]
    pub fn with_failing_lookup(mut self, selector: &Selector) -> Self {
        let _ = self.failing_lookups.insert(selector.to_string());
        self
    }

    /// Complete downloads with this file
    #[must_use]
    pub fn with_download(mut self, download: Download) -> Self {
        self.download = Some(download);
        self
    }

    /// Return these bytes from `screenshot`
    #[must_use]
    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(png);
        self
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Check if a call starting with `prefix` was recorded
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(prefix))
    }

    fn record(&self, call: String) {
        if let Ok(mut history) = self.history.lock() {
            history.push(call);
        }
    }

    fn element(&self, element: &ElementRef) -> RestockResult<MockElement> {
        self.elements
            .get(&element.selector().to_string())
            .and_then(|matches| matches.get(element.index()).copied())
            .ok_or_else(|| RestockError::script(format!("no element for {element}")))
    }

    fn interact(&self, element: &ElementRef) -> RestockResult<()> {
        if self.element(element)?.broken {
            return Err(RestockError::input(format!("element detached: {element}")));
        }
        Ok(())
    }
}

#[async_trait]
impl PortalDriver for MockDriver {
    async fn goto(&mut self, url: &str) -> RestockResult<()> {
        self.record(format!("goto:{url}"));
        self.current_url = url.to_string();
        Ok(())
    }

    async fn wait_for_network_idle(&self) -> RestockResult<()> {
        self.record("network_idle".to_string());
        Ok(())
    }

    async fn count(&self, selector: &Selector) -> RestockResult<usize> {
        let key = selector.to_string();
        self.record(format!("count:{key}"));
        if self.failing_lookups.contains(&key) {
            return Err(RestockError::script(format!("lookup raised for {key}")));
        }
        Ok(self.elements.get(&key).map_or(0, Vec::len))
    }

    async fn is_visible(&self, element: &ElementRef) -> RestockResult<bool> {
        Ok(self.element(element).is_ok_and(|e| e.visible))
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> RestockResult<()> {
        self.interact(element)
    }

    async fn click(&self, element: &ElementRef) -> RestockResult<()> {
        self.record(format!("click:{element}"));
        self.interact(element)
    }

    async fn select_all(&self, element: &ElementRef) -> RestockResult<()> {
        self.record(format!("select_all:{element}"));
        self.interact(element)
    }

    async fn type_text(&self, element: &ElementRef, text: &str, _delay: Duration) -> RestockResult<()> {
        self.record(format!("type:{element}:{text}"));
        self.interact(element)
    }

    async fn press(&self, element: &ElementRef, key: &str) -> RestockResult<()> {
        self.record(format!("press:{element}:{key}"));
        self.interact(element)
    }

    async fn press_page(&self, key: &str) -> RestockResult<()> {
        self.record(format!("press_page:{key}"));
        Ok(())
    }

    async fn arm_download(&mut self, dir: &Path) -> RestockResult<DownloadWatch> {
        self.record(format!("arm_download:{}", dir.display()));
        Ok(DownloadWatch {
            dir: dir.to_path_buf(),
            existing: HashSet::new(),
        })
    }

    async fn wait_for_download(&self, _watch: &DownloadWatch, timeout: Duration) -> RestockResult<Download> {
        self.record("wait_for_download".to_string());
        self.download.clone().ok_or(RestockError::Timeout {
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn screenshot(&self) -> RestockResult<Vec<u8>> {
        self.screenshot.clone().ok_or_else(|| RestockError::Screenshot {
            message: "No mock screenshot set".to_string(),
        })
    }

    async fn close(&mut self) -> RestockResult<()> {
        self.record("close".to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod mock_driver_tests {
        use super::*;

        #[test]
        fn test_mock_driver_creation() {
            let driver = MockDriver::new();
            assert!(driver.history().is_empty());
            assert!(driver.current_url.is_empty());
        }

        #[test]
        fn test_mock_element_kinds() {
            assert!(MockElement::visible().visible);
            assert!(!MockElement::hidden().visible);
            assert!(MockElement::broken().broken);
        }

        #[tokio::test]
        async fn test_count_registered_elements() {
            let sel = Selector::css("input");
            let driver = MockDriver::new()
                .with_element(&sel, MockElement::visible())
                .with_element(&sel, MockElement::hidden());
            assert_eq!(driver.count(&sel).await.unwrap(), 2);
            assert_eq!(driver.count(&Selector::text("nope")).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_failing_lookup_raises() {
            let sel = Selector::xpath("//[");
            let driver = MockDriver::new().with_failing_lookup(&sel);
            assert!(driver.count(&sel).await.is_err());
        }

        #[tokio::test]
        async fn test_visibility_by_index() {
            let sel = Selector::css("input");
            let driver = MockDriver::new()
                .with_element(&sel, MockElement::hidden())
                .with_element(&sel, MockElement::visible());
            assert!(!driver.is_visible(&ElementRef::new(sel.clone(), 0)).await.unwrap());
            assert!(driver.is_visible(&ElementRef::new(sel.clone(), 1)).await.unwrap());
            assert!(!driver.is_visible(&ElementRef::new(sel, 2)).await.unwrap());
        }

        #[tokio::test]
        async fn test_broken_element_click_fails() {
            let sel = Selector::text("Apply");
            let driver = MockDriver::new().with_element(&sel, MockElement::broken());
            let el = ElementRef::new(sel, 0);
            assert!(driver.click(&el).await.is_err());
            assert!(driver.was_called("click:text=Apply"));
        }

        #[tokio::test]
        async fn test_download_timeout_without_script() {
            let mut driver = MockDriver::new();
            let watch = driver.arm_download(Path::new("out")).await.unwrap();
            let err = driver
                .wait_for_download(&watch, Duration::from_secs(120))
                .await
                .unwrap_err();
            assert!(matches!(err, RestockError::Timeout { ms: 120_000 }));
        }

        #[tokio::test]
        async fn test_history_tracking() {
            let mut driver = MockDriver::new();
            driver.goto("https://portal.test").await.unwrap();
            driver.press_page("Enter").await.unwrap();
            driver.close().await.unwrap();
            assert_eq!(driver.current_url, "https://portal.test");
            assert_eq!(
                driver.history(),
                vec!["goto:https://portal.test", "press_page:Enter", "close"]
            );
        }
    }
}
