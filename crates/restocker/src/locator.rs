//! Selectors for finding portal elements.
//!
//! A [`Selector`] compiles to a JavaScript expression that evaluates to an
//! array of matching DOM elements, in document order. Drivers count, probe and
//! act on entries of that array; an [`ElementRef`] pins one entry by index.
//!
//! Text-based selectors follow the usual browser-automation conventions:
//! `text=` matches the innermost element whose whitespace-normalized text
//! contains the needle (case-insensitive), `label=` resolves form controls
//! through `<label>` elements and `aria-label`, and `role=` matches ARIA roles
//! by accessible name.

use std::fmt;

/// A regular expression evaluated in the page (JavaScript `RegExp` syntax).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPattern {
    pattern: String,
}

impl TextPattern {
    /// Case-insensitive pattern
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// Raw pattern source
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// JavaScript `RegExp` constructor call
    #[must_use]
    pub fn to_js(&self) -> String {
        format!("new RegExp({}, \"i\")", js_string(&self.pattern))
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/i", self.pattern)
    }
}

/// ARIA roles the portal controls are looked up by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaRole {
    /// Buttons, including `input[type=button|submit]`
    Button,
}

impl AriaRole {
    const fn css(self) -> &'static str {
        match self {
            Self::Button => {
                "button, [role='button'], input[type='button'], input[type='submit'], input[type='reset']"
            }
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Button => "button",
        }
    }
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g., "form input[type='text']")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Innermost element containing the text (case-insensitive)
    Text(String),
    /// CSS selector filtered by contained text (`button:has-text('Apply')`)
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
    /// Form control associated with a matching `<label>` or `aria-label`
    Label(TextPattern),
    /// Input whose placeholder matches
    Placeholder(TextPattern),
    /// Element with an ARIA role and matching accessible name
    Role {
        /// Role to look up
        role: AriaRole,
        /// Accessible name pattern
        name: TextPattern,
    },
}

/// Shared helpers injected in front of text-matching queries.
const NORMALIZE_JS: &str = "const __norm = s => (s || '').replace(/\\s+/g, ' ').trim();";

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a CSS selector filtered by text
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Create a label selector (case-insensitive pattern)
    #[must_use]
    pub fn label(pattern: impl Into<String>) -> Self {
        Self::Label(TextPattern::new(pattern))
    }

    /// Create a placeholder selector (case-insensitive pattern)
    #[must_use]
    pub fn placeholder(pattern: impl Into<String>) -> Self {
        Self::Placeholder(TextPattern::new(pattern))
    }

    /// Create a role selector (case-insensitive name pattern)
    #[must_use]
    pub fn role(role: AriaRole, name: impl Into<String>) -> Self {
        Self::Role {
            role,
            name: TextPattern::new(name),
        }
    }

    /// JavaScript expression evaluating to an array of matching elements
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_string(s)),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 const out = []; for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); return out; }})()",
                js_string(s)
            ),
            Self::Text(t) => {
                let needle = js_string(&t.to_lowercase());
                format!(
                    "(() => {{ {NORMALIZE_JS} const t = {needle}; \
                     const hit = el => __norm(el.textContent).toLowerCase().includes(t) \
                       || (el.tagName === 'INPUT' && ['button', 'submit'].includes(el.type) && __norm(el.value).toLowerCase().includes(t)); \
                     return Array.from(document.body ? document.body.querySelectorAll('*') : []) \
                       .filter(el => !['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE'].includes(el.tagName)) \
                       .filter(el => hit(el) && !Array.from(el.children).some(hit)); }})()"
                )
            }
            Self::CssWithText { css, text } => {
                let needle = js_string(&text.to_lowercase());
                format!(
                    "(() => {{ {NORMALIZE_JS} return Array.from(document.querySelectorAll({})) \
                     .filter(el => __norm(el.textContent || el.value).toLowerCase().includes({needle})); }})()",
                    js_string(css)
                )
            }
            Self::Label(p) => format!(
                "(() => {{ {NORMALIZE_JS} const re = {}; \
                 const viaLabel = Array.from(document.querySelectorAll('label')) \
                   .filter(l => re.test(__norm(l.textContent))) \
                   .map(l => l.control || (l.htmlFor ? document.getElementById(l.htmlFor) : l.querySelector('input, select, textarea'))); \
                 const viaAria = Array.from(document.querySelectorAll('[aria-label]')) \
                   .filter(el => re.test(__norm(el.getAttribute('aria-label')))); \
                 return [...new Set(viaLabel.concat(viaAria).filter(Boolean))]; }})()",
                p.to_js()
            ),
            Self::Placeholder(p) => format!(
                "(() => {{ const re = {}; return Array.from(document.querySelectorAll('[placeholder]')) \
                 .filter(el => re.test(el.getAttribute('placeholder'))); }})()",
                p.to_js()
            ),
            Self::Role { role, name } => format!(
                "(() => {{ {NORMALIZE_JS} const re = {}; \
                 const accName = el => __norm(el.getAttribute('aria-label') || (el.tagName === 'INPUT' ? el.value : el.textContent)); \
                 return Array.from(document.querySelectorAll({})).filter(el => re.test(accName(el))); }})()",
                name.to_js(),
                js_string(role.css())
            ),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Text(t) => write!(f, "text={t}"),
            Self::CssWithText { css, text } => write!(f, "css={css}:has-text({text:?})"),
            Self::Label(p) => write!(f, "label={p}"),
            Self::Placeholder(p) => write!(f, "placeholder={p}"),
            Self::Role { role, name } => write!(f, "role={}[name={name}]", role.name()),
        }
    }
}

/// A resolved element: the `index`-th match of `selector` in the current page.
///
/// Handles are only meaningful for the page they were resolved on and are
/// never stored across navigations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    selector: Selector,
    index: usize,
}

impl ElementRef {
    /// Pin the `index`-th match of a selector
    #[must_use]
    pub const fn new(selector: Selector, index: usize) -> Self {
        Self { selector, index }
    }

    /// Selector the element was found with
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Position among the selector's matches
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// JavaScript expression evaluating to the element, or `undefined`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("({})[{}]", self.selector.to_query(), self.index)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} >> nth={}", self.selector, self.index)
    }
}

/// Quote a string as a JavaScript literal.
pub(crate) fn js_string(s: &str) -> String {
    // JSON string literals are valid JavaScript string literals.
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_css_selector() {
            let query = Selector::css("form input[type='text']").to_query();
            assert!(query.contains("querySelectorAll"));
            assert!(query.contains("form input[type='text']"));
        }

        #[test]
        fn test_xpath_selector() {
            let query = Selector::xpath("//button[normalize-space(.)='Apply']").to_query();
            assert!(query.contains("document.evaluate"));
            assert!(query.contains("ORDERED_NODE_SNAPSHOT_TYPE"));
        }

        #[test]
        fn test_text_selector_is_case_insensitive() {
            let query = Selector::text("Export to Excel").to_query();
            assert!(query.contains("\"export to excel\""));
            assert!(query.contains("toLowerCase"));
        }

        #[test]
        fn test_label_selector_uses_regexp() {
            let query = Selector::label("^Username").to_query();
            assert!(query.contains("new RegExp(\"^Username\", \"i\")"));
            assert!(query.contains("aria-label"));
        }

        #[test]
        fn test_placeholder_selector() {
            let query = Selector::placeholder("start|from").to_query();
            assert!(query.contains("[placeholder]"));
            assert!(query.contains("start|from"));
        }

        #[test]
        fn test_role_selector() {
            let query = Selector::role(AriaRole::Button, "^\\s*Apply\\s*$").to_query();
            assert!(query.contains("input[type='submit']"));
            assert!(query.contains("^\\\\s*Apply\\\\s*$"));
        }

        #[test]
        fn test_css_with_text() {
            let query = Selector::css_with_text("button", "Close").to_query();
            assert!(query.contains("\"button\""));
            assert!(query.contains("\"close\""));
        }

        #[test]
        fn test_quotes_are_escaped() {
            let query = Selector::text("Say \"hi\"").to_query();
            assert!(query.contains("say \\\"hi\\\""));
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_display_forms() {
            assert_eq!(Selector::text("Login").to_string(), "text=Login");
            assert_eq!(Selector::label("Password").to_string(), "label=/Password/i");
            assert_eq!(
                Selector::role(AriaRole::Button, "Close").to_string(),
                "role=button[name=/Close/i]"
            );
            assert_eq!(
                Selector::css_with_text("button", "Apply").to_string(),
                "css=button:has-text(\"Apply\")"
            );
        }

        #[test]
        fn test_pattern_is_case_insensitive() {
            assert_eq!(TextPattern::new("Apply").to_string(), "/Apply/i");
            assert!(TextPattern::new("Apply").to_js().ends_with(", \"i\")"));
        }

        #[test]
        fn test_element_ref() {
            let el = ElementRef::new(Selector::css("form input[type='text']"), 1);
            assert_eq!(el.index(), 1);
            assert_eq!(el.to_string(), "css=form input[type='text'] >> nth=1");
            assert!(el.to_query().ends_with("[1]"));
        }
    }
}
