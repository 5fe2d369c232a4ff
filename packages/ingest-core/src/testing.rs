//! Testing utilities including mock implementations.
//!
//! These make it possible to exercise the full engine, pagination
//! through failure recovery, without a real
//! rendering engine or network. Pages are scripted per URL; every
//! transport call is tracked for assertions.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::browser::{Browser, BrowserPage, PageElement, WaitStrategy};
use crate::error::{BrowserError, BrowserResult, ExtractError, ExtractResult};
use crate::extract::{EmbeddedEvent, EmbeddedSchema, EmbeddedState};
use crate::failure::ArtifactStore;
use crate::types::Venue;

/// Record of a call made to the mock transport.
#[derive(Debug, Clone)]
pub enum BrowserCall {
    OpenPage { user_agent: String },
    Navigate { url: String },
    Click { selector: String },
    QueryAll { selector: String },
    Evaluate { script: String },
    Screenshot,
    Close,
}

/// One scripted page served for a URL.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    /// Embedded state blob, served through the script tag or window
    /// expression the mock is configured with.
    pub state_blob: Option<Value>,

    /// DOM elements by selector.
    pub elements: HashMap<String, Vec<PageElement>>,

    /// Selectors currently visible (e.g. a consent button).
    pub visible: HashSet<String>,

    /// Successive `scrollHeight` reads; the last value repeats.
    pub heights: Vec<f64>,
}

impl ScriptedPage {
    /// An empty page.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the embedded state blob.
    pub fn with_state(mut self, blob: Value) -> Self {
        self.state_blob = Some(blob);
        self
    }

    /// Add DOM elements for a selector.
    pub fn with_elements(mut self, selector: impl Into<String>, elements: Vec<PageElement>) -> Self {
        self.elements.insert(selector.into(), elements);
        self
    }

    /// Mark a selector as visible.
    pub fn with_visible(mut self, selector: impl Into<String>) -> Self {
        self.visible.insert(selector.into());
        self
    }

    /// Script the height sequence seen by the lazy-load scroll loop.
    pub fn with_heights(mut self, heights: Vec<f64>) -> Self {
        self.heights = heights;
        self
    }
}

#[derive(Default)]
struct MockState {
    pages: RwLock<HashMap<String, VecDeque<ScriptedPage>>>,
    fail_navigation: RwLock<HashSet<String>>,
    state_script: RwLock<Option<String>>,
    state_expression: RwLock<Option<String>>,
    calls: RwLock<Vec<BrowserCall>>,
    pages_opened: RwLock<u32>,
    pages_closed: RwLock<u32>,
}

/// A mock browser serving scripted pages, without a real engine.
#[derive(Clone, Default)]
pub struct MockBrowser {
    inner: Arc<MockState>,
}

impl MockBrowser {
    /// Create a mock with no scripted pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a page for a URL. Scripting the same URL again queues a
    /// second response: each navigation consumes one until a single
    /// response remains, which then repeats.
    pub fn with_page(self, url: impl Into<String>, page: ScriptedPage) -> Self {
        self.inner
            .pages
            .write()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(page);
        self
    }

    /// Make navigation to a URL fail.
    pub fn fail_navigation(self, url: impl Into<String>) -> Self {
        self.inner
            .fail_navigation
            .write()
            .unwrap()
            .insert(url.into());
        self
    }

    /// Configure the script-tag selector that serves the state blob.
    pub fn with_state_script(self, selector: impl Into<String>) -> Self {
        *self.inner.state_script.write().unwrap() = Some(selector.into());
        self
    }

    /// Configure the window expression that serves the state blob.
    pub fn with_state_expression(self, script: impl Into<String>) -> Self {
        *self.inner.state_expression.write().unwrap() = Some(script.into());
        self
    }

    /// All transport calls made so far.
    pub fn calls(&self) -> Vec<BrowserCall> {
        self.inner.calls.read().unwrap().clone()
    }

    /// Number of navigations to a given URL.
    pub fn navigation_count(&self, url: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BrowserCall::Navigate { url: u } if u == url))
            .count()
    }

    /// Pages opened through the factory.
    pub fn pages_opened(&self) -> u32 {
        *self.inner.pages_opened.read().unwrap()
    }

    /// Pages closed.
    pub fn pages_closed(&self) -> u32 {
        *self.inner.pages_closed.read().unwrap()
    }

    /// Open a concrete mock page (tests that bypass the factory seam).
    pub async fn open(&self, user_agent: &str) -> MockPage {
        *self.inner.pages_opened.write().unwrap() += 1;
        self.record(BrowserCall::OpenPage {
            user_agent: user_agent.to_string(),
        });
        MockPage {
            state: self.inner.clone(),
            current: RwLock::new(None),
            height_index: RwLock::new(0),
        }
    }

    fn record(&self, call: BrowserCall) {
        self.inner.calls.write().unwrap().push(call);
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn open_page(&self, user_agent: &str) -> BrowserResult<Box<dyn BrowserPage>> {
        Ok(Box::new(self.open(user_agent).await))
    }
}

/// A page served by [`MockBrowser`].
pub struct MockPage {
    state: Arc<MockState>,
    current: RwLock<Option<(String, ScriptedPage)>>,
    height_index: RwLock<usize>,
}

impl MockPage {
    fn record(&self, call: BrowserCall) {
        self.state.calls.write().unwrap().push(call);
    }

    fn with_current<T>(&self, f: impl FnOnce(&ScriptedPage) -> T) -> Option<T> {
        self.current.read().unwrap().as_ref().map(|(_, p)| f(p))
    }

    fn serves_selector(&self, selector: &str) -> bool {
        let is_state_script = self
            .state
            .state_script
            .read()
            .unwrap()
            .as_deref()
            .is_some_and(|s| s == selector);
        self.with_current(|page| {
            (is_state_script && page.state_blob.is_some())
                || page.elements.get(selector).is_some_and(|e| !e.is_empty())
                || page.visible.contains(selector)
        })
        .unwrap_or(false)
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn navigate(&self, url: &str, _wait: WaitStrategy, _timeout: Duration) -> BrowserResult<()> {
        self.record(BrowserCall::Navigate {
            url: url.to_string(),
        });
        if self.state.fail_navigation.read().unwrap().contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "mock navigation refused".to_string(),
            });
        }
        let page = {
            let mut pages = self.state.pages.write().unwrap();
            match pages.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
                Some(queue) => queue.front().cloned().unwrap_or_default(),
                None => ScriptedPage::default(),
            }
        };
        *self.current.write().unwrap() = Some((url.to_string(), page));
        *self.height_index.write().unwrap() = 0;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> BrowserResult<bool> {
        Ok(self.serves_selector(selector))
    }

    async fn is_visible(&self, selector: &str) -> BrowserResult<bool> {
        Ok(self
            .with_current(|page| page.visible.contains(selector))
            .unwrap_or(false))
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        self.record(BrowserCall::Click {
            selector: selector.to_string(),
        });
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> BrowserResult<()> {
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<Value> {
        self.record(BrowserCall::Evaluate {
            script: script.to_string(),
        });
        if script == "document.body.scrollHeight" {
            let index = {
                let mut guard = self.height_index.write().unwrap();
                let index = *guard;
                *guard += 1;
                index
            };
            let height = self
                .with_current(|page| {
                    page.heights
                        .get(index)
                        .or(page.heights.last())
                        .copied()
                        .unwrap_or(0.0)
                })
                .unwrap_or(0.0);
            return Ok(serde_json::json!(height));
        }
        let is_state_expression = self
            .state
            .state_expression
            .read()
            .unwrap()
            .as_deref()
            .is_some_and(|s| s == script);
        if is_state_expression {
            return Ok(self
                .with_current(|page| page.state_blob.clone())
                .flatten()
                .unwrap_or(Value::Null));
        }
        Ok(Value::Null)
    }

    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<PageElement>> {
        self.record(BrowserCall::QueryAll {
            selector: selector.to_string(),
        });
        let is_state_script = self
            .state
            .state_script
            .read()
            .unwrap()
            .as_deref()
            .is_some_and(|s| s == selector);
        if is_state_script {
            if let Some(blob) = self.with_current(|page| page.state_blob.clone()).flatten() {
                return Ok(vec![PageElement::new().with_text(blob.to_string())]);
            }
            return Ok(vec![]);
        }
        Ok(self
            .with_current(|page| page.elements.get(selector).cloned().unwrap_or_default())
            .unwrap_or_default())
    }

    async fn screenshot(&self) -> BrowserResult<Vec<u8>> {
        self.record(BrowserCall::Screenshot);
        Ok(b"mock-snapshot".to_vec())
    }

    async fn current_url(&self) -> String {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|(url, _)| url.clone())
            .unwrap_or_default()
    }

    async fn close(&self) -> BrowserResult<()> {
        self.record(BrowserCall::Close);
        *self.state.pages_closed.write().unwrap() += 1;
        Ok(())
    }
}

/// In-memory artifact store for failure-recorder tests.
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<Vec<(String, Vec<u8>)>>,
}

impl MemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of stored artifacts, in capture order.
    pub fn keys(&self) -> Vec<String> {
        self.artifacts
            .read()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.read().unwrap().len()
    }

    /// True if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn store(
        &self,
        key: &str,
        bytes: &[u8],
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.artifacts
            .write()
            .unwrap()
            .push((key.to_string(), bytes.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct StubBlob {
    entries: Vec<StubEntry>,
    #[serde(default)]
    venues: Vec<Venue>,
    #[serde(default)]
    pagination: Option<StubPagination>,
}

#[derive(Debug, Deserialize)]
struct StubEntry {
    id: String,
    link: Option<String>,
    title: Option<String>,
    description: Option<String>,
    date_time: Option<String>,
    attendees_count: Option<u64>,
    venue_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StubPagination {
    total_pages: u32,
}

/// A minimal site schema over `{entries, venues, pagination}` blobs,
/// for exercising the embedded strategy in core tests.
pub struct StubSchema;

impl EmbeddedSchema for StubSchema {
    fn total_pages(&self, blob: &Value) -> Option<u32> {
        let parsed: StubBlob = serde_json::from_value(blob.clone()).ok()?;
        parsed.pagination.map(|p| p.total_pages)
    }

    fn project(&self, blob: &Value) -> ExtractResult<EmbeddedState> {
        let parsed: StubBlob =
            serde_json::from_value(blob.clone()).map_err(|e| ExtractError::Unavailable {
                reason: format!("stub state did not match expected shape: {e}"),
            })?;

        let mut state = EmbeddedState::new();
        for entry in parsed.entries {
            state.insert_event(EmbeddedEvent {
                id: entry.id,
                link: entry.link,
                title: entry.title,
                description: entry.description,
                date_time: entry.date_time,
                attendees_count: entry.attendees_count,
                venue_ref: entry.venue_ref,
            });
        }
        for venue in parsed.venues {
            state.insert_venue(venue);
        }
        Ok(state)
    }
}

/// Build a minimal stub blob of `(id, link)` entries.
pub fn stub_blob(entries: &[(&str, &str)], total_pages: Option<u32>) -> Value {
    let entries: Vec<Value> = entries
        .iter()
        .map(|(id, link)| serde_json::json!({ "id": id, "link": link }))
        .collect();
    match total_pages {
        Some(total) => serde_json::json!({
            "entries": entries,
            "pagination": { "total_pages": total },
        }),
        None => serde_json::json!({ "entries": entries }),
    }
}
