//! Client-side behaviors for a static marketing site, written against a
//! deterministic in-memory page runtime.
//!
//! A [`Page`] is built from HTML markup. [`install`] wires the six behaviors
//! (navigation toggle, contact form, smooth anchors, image modal, reveal on
//! scroll, back-to-top) to the page's `DOMContentLoaded` event, and the page's
//! user-action, clock and scroll methods drive them from tests or a host.
//!
//! ```no_run
//! use page_behaviors::{install, Page, Services, SiteConfig};
//!
//! # fn main() -> page_behaviors::Result<()> {
//! let mut page = Page::from_html(r#"<body><nav class="navbar"><ul class="nav-list"></ul></nav></body>"#)?;
//! install(&mut page, SiteConfig::default(), Services::default())?;
//! page.finish_loading()?;
//! page.click(".hamburger")?;
//! page.assert_class(".nav-list", "active", true)?;
//! # Ok(())
//! # }
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

mod behaviors;
mod config;
mod debounce;
mod dom;
mod html;
mod js_regex;
mod lookup;
mod page;
mod selector;
mod timers;
mod toolkit;
mod transport;
mod validation;
mod viewport;

pub use behaviors::{InitReport, Setup, initialize_app, install};
pub use config::{
    BackToTopConfig, ContactFormConfig, FormMessages, ImageModalConfig, NavMenuConfig,
    RevealConfig, SiteConfig, SmoothScrollConfig,
};
pub use debounce::Debouncer;
pub use dom::NodeId;
pub use lookup::Capability;
pub use page::{Event, Handler, Page};
pub use timers::PendingTimer;
pub use toolkit::{BootstrapToolkit, UiToolkit};
pub use transport::{SendFailure, SimulatedTransport, Submission, SubmissionTransport};
pub use validation::{EmailRule, FieldError, MessageRule};
pub use viewport::{
    IntersectionCallback, IntersectionEntry, IntersectionOptions, LayoutBox, ObserverId,
    RootMargin, ScrollBehavior, ScrollRequest,
};

pub(crate) use dom::{Dom, truncate_chars};
pub(crate) use html::parse_html;
pub(crate) use js_regex::{Regex, RegexError};
pub(crate) use selector::{
    SelectorAttrCondition, SelectorCombinator, SelectorPart, SelectorStep, parse_selector_groups,
};

/// Collaborators the behaviors depend on but do not implement.
#[derive(Clone)]
pub struct Services {
    pub toolkit: Rc<dyn UiToolkit>,
    pub transport: Rc<RefCell<dyn SubmissionTransport>>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            toolkit: Rc::new(BootstrapToolkit),
            transport: Rc::new(RefCell::new(SimulatedTransport::default())),
        }
    }
}

impl Services {
    pub fn with_transport<T>(transport: T) -> Self
    where
        T: SubmissionTransport + 'static,
    {
        Self {
            transport: Rc::new(RefCell::new(transport)),
            ..Self::default()
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    Runtime(String),
    InvalidConfig(String),
    Regex(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Regex(msg) => write!(f, "regex error: {msg}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}

impl From<RegexError> for Error {
    fn from(value: RegexError) -> Self {
        Self::Regex(value.to_string())
    }
}
