//! Element Resolver: semantic roles to concrete elements.
//!
//! Every [`Role`] owns a ranked list of [`LocatorStrategy`] values. Resolution
//! walks the list in order and stops at the first strategy whose match is
//! present and visible. A lookup that raises only disqualifies that strategy.
//! A role that resolves to nothing means "not on this page", never an error.

use crate::config::PortalConfig;
use crate::driver::PortalDriver;
use crate::locator::{AriaRole, ElementRef, Selector};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// What a control is for, independent of its markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Login user name input
    UsernameField,
    /// Login password / access code input
    PasswordField,
    /// Login submit control
    LoginButton,
    /// "Select Store" modal marker
    StoreModal,
    /// The configured store in the store picker
    StoreOption,
    /// Close control of the store modal
    CloseButton,
    /// Report start date input
    StartDate,
    /// Report end date input
    EndDate,
    /// Report start time input
    StartTime,
    /// Report finish time input
    FinishTime,
    /// Apply filters control
    ApplyButton,
    /// Export to Excel control
    ExportButton,
}

impl Role {
    /// Human readable name used in logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UsernameField => "username field",
            Self::PasswordField => "password field",
            Self::LoginButton => "login button",
            Self::StoreModal => "store modal",
            Self::StoreOption => "store option",
            Self::CloseButton => "close button",
            Self::StartDate => "start date field",
            Self::EndDate => "end date field",
            Self::StartTime => "start time field",
            Self::FinishTime => "finish time field",
            Self::ApplyButton => "apply button",
            Self::ExportButton => "export button",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked way of finding a role's element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorStrategy {
    selector: Selector,
    nth: usize,
}

impl LocatorStrategy {
    /// First match of the selector
    #[must_use]
    pub const fn first(selector: Selector) -> Self {
        Self { selector, nth: 0 }
    }

    /// Positional fallback: the `nth` match of the selector
    #[must_use]
    pub const fn nth(selector: Selector, nth: usize) -> Self {
        Self { selector, nth }
    }

    /// Selector this strategy queries
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Element handle this strategy would produce
    #[must_use]
    pub fn element(&self) -> ElementRef {
        ElementRef::new(self.selector.clone(), self.nth)
    }

    /// Try this strategy against the current page.
    ///
    /// Lookup failures are swallowed and reported as a miss.
    pub async fn locate<D: PortalDriver + ?Sized>(&self, driver: &D) -> Option<ElementRef> {
        let count = match driver.count(&self.selector).await {
            Ok(count) => count,
            Err(e) => {
                debug!(strategy = %self.selector, error = %e, "lookup raised, treating as miss");
                return None;
            }
        };
        if count <= self.nth {
            return None;
        }
        let element = self.element();
        match driver.is_visible(&element).await {
            Ok(true) => Some(element),
            Ok(false) => None,
            Err(e) => {
                debug!(strategy = %self.selector, error = %e, "visibility probe raised, treating as miss");
                None
            }
        }
    }
}

/// Ranked strategies for every role
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    strategies: HashMap<Role, Vec<LocatorStrategy>>,
}

impl StrategyTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the strategies for a role
    #[must_use]
    pub fn with(mut self, role: Role, strategies: Vec<LocatorStrategy>) -> Self {
        self.strategies.insert(role, strategies);
        self
    }

    /// Strategies for a role, highest priority first
    #[must_use]
    pub fn for_role(&self, role: Role) -> &[LocatorStrategy] {
        self.strategies.get(&role).map_or(&[], Vec::as_slice)
    }

    /// The portal's strategies, store options taken from configuration
    #[must_use]
    pub fn portal(portal: &PortalConfig) -> Self {
        use LocatorStrategy as S;

        Self::new()
            .with(
                Role::UsernameField,
                vec![
                    S::first(Selector::label("^Username")),
                    S::first(Selector::xpath("//label[contains(.,'Username')]/following::input[1]")),
                    S::first(Selector::css("form input[type='text']")),
                    S::first(Selector::css("input[name*=user i]")),
                ],
            )
            .with(
                Role::PasswordField,
                vec![
                    S::first(Selector::label("Access Code|Password")),
                    S::first(Selector::xpath(
                        "//label[contains(.,'Access Code') or contains(.,'Password')]/following::input[1]",
                    )),
                    S::first(Selector::css("form input[type='password']")),
                    S::nth(Selector::css("form input[type='text']"), 1),
                    S::first(Selector::css("input[name*=pass i]")),
                ],
            )
            .with(
                Role::LoginButton,
                vec![
                    S::first(Selector::role(AriaRole::Button, "login|sign in")),
                    S::first(Selector::xpath(
                        "//input[@type='submit' or @value='Login' or @value='LOG IN']",
                    )),
                    S::first(Selector::text("Login")),
                ],
            )
            .with(Role::StoreModal, vec![S::first(Selector::text("Select Store"))])
            .with(
                Role::StoreOption,
                [&portal.store_label, &portal.store_name]
                    .into_iter()
                    .filter(|label| !label.trim().is_empty())
                    .map(|label| S::first(Selector::text(label.trim())))
                    .collect(),
            )
            .with(
                Role::CloseButton,
                vec![
                    S::first(Selector::role(AriaRole::Button, "Close")),
                    S::first(Selector::css_with_text("button", "Close")),
                ],
            )
            .with(
                Role::StartDate,
                vec![
                    S::first(Selector::label("^Start($|[^a-z])")),
                    S::first(Selector::placeholder("start|from")),
                    S::first(Selector::css(
                        "input[aria-label*='start' i], input[name*='start' i], input[id*='start' i]",
                    )),
                ],
            )
            .with(
                Role::EndDate,
                vec![
                    S::first(Selector::label("^End($|[^a-z])|Finish Date")),
                    S::first(Selector::placeholder("end|finish|to")),
                    S::first(Selector::css(
                        "input[aria-label*='end' i], input[name*='end' i], input[id*='end' i]",
                    )),
                ],
            )
            .with(
                Role::StartTime,
                vec![
                    S::first(Selector::label("Start Time|From Time")),
                    S::first(Selector::placeholder("time.*start|from time")),
                    S::first(Selector::css(
                        "input[aria-label*='start time' i], input[name*='starttime' i], input[id*='starttime' i]",
                    )),
                ],
            )
            .with(
                Role::FinishTime,
                vec![
                    S::first(Selector::label("Finish Time|End Time|To Time")),
                    S::first(Selector::placeholder("time.*(finish|end|to)")),
                    S::first(Selector::css(
                        "input[aria-label*='finish time' i], input[name*='endtime' i], input[id*='endtime' i]",
                    )),
                ],
            )
            .with(
                Role::ApplyButton,
                vec![
                    S::first(Selector::role(AriaRole::Button, "^\\s*Apply\\s*$")),
                    S::first(Selector::css_with_text("button", "Apply")),
                    S::first(Selector::css("input[type='button'][value='Apply']")),
                    S::first(Selector::css("input[type='submit'][value='Apply']")),
                    S::first(Selector::xpath("//button[normalize-space(.)='Apply']")),
                    S::first(Selector::text("Apply")),
                ],
            )
            .with(
                Role::ExportButton,
                vec![
                    S::first(Selector::role(AriaRole::Button, "Export to Excel")),
                    S::first(Selector::text("Export to Excel")),
                ],
            )
    }
}

/// Resolves roles against whatever page the driver currently shows
#[derive(Debug, Clone)]
pub struct ElementResolver {
    table: StrategyTable,
}

impl ElementResolver {
    /// Resolver over a strategy table
    #[must_use]
    pub const fn new(table: StrategyTable) -> Self {
        Self { table }
    }

    /// Strategy table in use
    #[must_use]
    pub const fn table(&self) -> &StrategyTable {
        &self.table
    }

    /// First visible element for `role`, trying strategies in priority order
    pub async fn resolve<D: PortalDriver + ?Sized>(&self, driver: &D, role: Role) -> Option<ElementRef> {
        for strategy in self.table.for_role(role) {
            if let Some(element) = strategy.locate(driver).await {
                debug!(%role, element = %element, "resolved");
                return Some(element);
            }
        }
        debug!(%role, "no strategy matched");
        None
    }

    /// Walk the role's strategies in order, handing each visible match to
    /// `attempt` until one succeeds. Returns the element that worked.
    ///
    /// Used where an action on a resolved element can still fail (a click on
    /// a node that detached in the meantime) and the next candidate should
    /// be tried.
    pub async fn first_success<D, F, Fut>(&self, driver: &D, role: Role, mut attempt: F) -> Option<ElementRef>
    where
        D: PortalDriver + ?Sized,
        F: FnMut(ElementRef) -> Fut + Send,
        Fut: std::future::Future<Output = bool> + Send,
    {
        for strategy in self.table.for_role(role) {
            let Some(element) = strategy.locate(driver).await else {
                continue;
            };
            if attempt(element.clone()).await {
                return Some(element);
            }
            debug!(%role, element = %element, "candidate failed, trying next");
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};

    fn resolver() -> ElementResolver {
        ElementResolver::new(StrategyTable::portal(&PortalConfig::default()))
    }

    mod table_tests {
        use super::*;

        const ROLES: [Role; 12] = [
            Role::UsernameField,
            Role::PasswordField,
            Role::LoginButton,
            Role::StoreModal,
            Role::StoreOption,
            Role::CloseButton,
            Role::StartDate,
            Role::EndDate,
            Role::StartTime,
            Role::FinishTime,
            Role::ApplyButton,
            Role::ExportButton,
        ];

        #[test]
        fn test_every_role_has_strategies() {
            let table = StrategyTable::portal(&PortalConfig::default());
            for role in ROLES {
                assert!(!table.for_role(role).is_empty(), "{role} has no strategies");
            }
        }

        #[test]
        fn test_store_option_prefers_full_label() {
            let table = StrategyTable::portal(&PortalConfig::default());
            let selectors: Vec<String> = table
                .for_role(Role::StoreOption)
                .iter()
                .map(|s| s.selector().to_string())
                .collect();
            assert_eq!(selectors, vec!["text=Astoria Liquor 191222", "text=Astoria Liquor"]);
        }

        #[test]
        fn test_password_positional_fallback() {
            let table = StrategyTable::portal(&PortalConfig::default());
            let positional = &table.for_role(Role::PasswordField)[3];
            assert_eq!(positional.element().index(), 1);
        }

        #[test]
        fn test_unknown_role_in_empty_table() {
            assert!(StrategyTable::new().for_role(Role::ApplyButton).is_empty());
        }
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test]
        async fn test_absent_when_nothing_matches() {
            let driver = MockDriver::new();
            assert!(resolver().resolve(&driver, Role::StartTime).await.is_none());
        }

        #[tokio::test]
        async fn test_first_strategy_wins_and_short_circuits() {
            let label = Selector::label("^Username");
            let css = Selector::css("form input[type='text']");
            let driver = MockDriver::new()
                .with_element(&label, MockElement::visible())
                .with_element(&css, MockElement::visible());

            let found = resolver().resolve(&driver, Role::UsernameField).await.unwrap();
            assert_eq!(found.selector(), &label);
            assert!(!driver.was_called(&format!("count:{css}")));
        }

        #[tokio::test]
        async fn test_hidden_match_falls_through() {
            let label = Selector::label("^Start($|[^a-z])");
            let placeholder = Selector::placeholder("start|from");
            let driver = MockDriver::new()
                .with_element(&label, MockElement::hidden())
                .with_element(&placeholder, MockElement::visible());

            let found = resolver().resolve(&driver, Role::StartDate).await.unwrap();
            assert_eq!(found.selector(), &placeholder);
        }

        #[tokio::test]
        async fn test_raising_lookup_is_a_miss() {
            let role = Selector::role(AriaRole::Button, "Export to Excel");
            let text = Selector::text("Export to Excel");
            let driver = MockDriver::new()
                .with_failing_lookup(&role)
                .with_element(&text, MockElement::visible());

            let found = resolver().resolve(&driver, Role::ExportButton).await.unwrap();
            assert_eq!(found.selector(), &text);
        }

        #[tokio::test]
        async fn test_nth_requires_enough_matches() {
            let text_inputs = Selector::css("form input[type='text']");
            let driver = MockDriver::new().with_element(&text_inputs, MockElement::visible());
            assert!(resolver().resolve(&driver, Role::PasswordField).await.is_none());

            let driver = MockDriver::new()
                .with_element(&text_inputs, MockElement::visible())
                .with_element(&text_inputs, MockElement::visible());
            let found = resolver().resolve(&driver, Role::PasswordField).await.unwrap();
            assert_eq!(found, ElementRef::new(text_inputs, 1));
        }

        #[tokio::test]
        async fn test_strategies_tried_in_priority_order() {
            let driver = MockDriver::new();
            let _ = resolver().resolve(&driver, Role::ApplyButton).await;
            let counts: Vec<String> = driver
                .history()
                .into_iter()
                .filter(|c| c.starts_with("count:"))
                .collect();
            let expected: Vec<String> = resolver()
                .table()
                .for_role(Role::ApplyButton)
                .iter()
                .map(|s| format!("count:{}", s.selector()))
                .collect();
            assert_eq!(counts, expected);
        }
    }

    mod first_success_tests {
        use super::*;

        #[tokio::test]
        async fn test_failed_attempt_moves_to_next_candidate() {
            let role = Selector::role(AriaRole::Button, "^\\s*Apply\\s*$");
            let text = Selector::text("Apply");
            let driver = MockDriver::new()
                .with_element(&role, MockElement::broken())
                .with_element(&text, MockElement::visible());

            let used = resolver()
                .first_success(&driver, Role::ApplyButton, |el| {
                    let driver = &driver;
                    async move { driver.click(&el).await.is_ok() }
                })
                .await
                .unwrap();
            assert_eq!(used.selector(), &text);
        }

        #[tokio::test]
        async fn test_none_when_every_attempt_fails() {
            let text = Selector::text("Apply");
            let driver = MockDriver::new().with_element(&text, MockElement::broken());
            let used = resolver()
                .first_success(&driver, Role::ApplyButton, |el| {
                    let driver = &driver;
                    async move { driver.click(&el).await.is_ok() }
                })
                .await;
            assert!(used.is_none());
        }
    }
}
