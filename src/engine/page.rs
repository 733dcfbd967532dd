//! Page handle trait and snapshot types.
//!
//! A `PageSnapshot` is the engine's classified view of a result page at
//! one instant: the listings it found, where the search box sits, and the
//! raw text used for challenge-signature checks. Classification of DOM
//! regions into listing kinds is the adapter's job.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::PageError;

/// Axis-aligned region of the page, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Center point of the region.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Where on the result page a listing was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListingKind {
    /// Map/business block embedded in the results.
    LocalPack,
    /// Ranked organic result.
    Organic,
    /// Image-search tile.
    Image,
    /// Any other anchor on the page.
    Other,
}

/// One link-bearing region of a result page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub text: String,
    pub href: String,
    pub region: PageRect,
    pub kind: ListingKind,
}

/// The engine's classified view of the current page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    /// Visible body text, used for challenge-signature detection.
    pub visible_text: String,
    /// Search input region, when present.
    pub search_box: Option<PageRect>,
    /// Next-page control region, when present.
    pub next_page: Option<PageRect>,
    /// All classified listings in presentation order.
    pub listings: Vec<Listing>,
    /// Page height in CSS pixels, for scroll planning.
    pub page_height: f64,
    /// Viewport size in CSS pixels.
    pub viewport_width: f64,
    pub viewport_height: f64,
}

/// Extracted challenge parameters from a challenge page.
#[derive(Debug, Clone)]
pub struct ChallengeWidget {
    pub site_key: String,
    /// Supplementary server token some challenge pages embed.
    pub data_s: Option<String>,
}

/// A cookie as seen by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Low-level input the behavior simulator emits and the engine replays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMove { x: f64, y: f64 },
    PointerDown { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    Wheel { delta_x: f64, delta_y: f64 },
    TouchStart { x: f64, y: f64 },
    TouchMove { x: f64, y: f64 },
    TouchEnd,
    KeyChar(char),
    KeyBackspace,
    KeyEnter,
    /// Pure pause: nothing is dispatched.
    Wait,
}

/// Live handle to one browser page, owned by exactly one journey attempt.
#[async_trait]
pub trait SearchPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    async fn reload(&self) -> Result<(), PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    /// Block until the pending navigation settles or the timeout expires.
    async fn wait_for_navigation(&self, timeout_secs: u64) -> Result<(), PageError>;

    async fn snapshot(&self) -> Result<PageSnapshot, PageError>;

    async fn dispatch(&self, input: InputEvent) -> Result<(), PageError>;

    /// Extract challenge parameters when the page carries a solvable widget.
    async fn challenge_widget(&self) -> Result<Option<ChallengeWidget>, PageError>;

    /// Inject a solved token into the challenge-response field and submit
    /// the enclosing form.
    async fn submit_challenge_response(&self, token: &str) -> Result<(), PageError>;

    async fn cookies(&self) -> Result<Vec<Cookie>, PageError>;

    async fn set_cookies(&self, cookies: &[Cookie]) -> Result<(), PageError>;

    async fn user_agent(&self) -> Result<String, PageError>;

    /// Best-effort close; errors are swallowed by callers.
    async fn close(&self);
}
