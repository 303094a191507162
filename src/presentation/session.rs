/// Search lifecycle and the state the front end renders from
use super::history::SearchHistory;
use super::view::{self, CategoryFilter, SortKey};
use crate::error::{AnalysisError, ValidationError};
use crate::storage::KeyValueStore;
use crate::videos::{VideoAnalyzer, VideoGroup};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use url::Url;

/// Everything the result list is drawn from. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationState {
    pub video_groups: Vec<VideoGroup>,
    pub selected_category: CategoryFilter,
    pub sort_by: SortKey,
    pub is_loading: bool,
    pub error: Option<String>,
    pub has_searched: bool,
}

impl PresentationState {
    /// Filtered and sorted groups, derived on demand
    pub fn visible_groups(&self) -> Vec<&VideoGroup> {
        view::filter_and_sort(&self.video_groups, &self.selected_category, self.sort_by)
    }

    pub fn categories(&self) -> Vec<CategoryFilter> {
        view::categories(&self.video_groups)
    }
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Input was not an http(s) URL; only the error message changed
    Rejected(ValidationError),
    /// Another search is still loading; nothing changed
    Busy,
    /// Analysis succeeded with this many groups
    Found(usize),
    /// Analysis failed; the message is what the user sees
    Failed(String),
}

/// Accept only absolute http and https URLs with a host.
pub fn validate_url(input: &str) -> Result<Url, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }

    let url = Url::parse(input).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::Malformed(format!("{} has no host", input)));
    }

    Ok(url)
}

/// Clears `is_loading` if a search future is dropped before it finishes.
struct LoadingGuard {
    state: Arc<RwLock<PresentationState>>,
    armed: bool,
}

impl LoadingGuard {
    fn new(state: Arc<RwLock<PresentationState>>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Search abandoned before it finished, clearing loading state");

        if let Ok(mut state) = self.state.try_write() {
            state.is_loading = false;
            return;
        }
        // a reader holds the lock; nothing else can start while loading is set
        let state = Arc::clone(&self.state);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    state.write().await.is_loading = false;
                });
            }
            Err(e) => error!("Cannot clear loading state outside the runtime: {}", e),
        }
    }
}

/// One user's search session: the analyzer (and its cache), the displayed
/// state and the persisted history.
///
/// At most one search runs at a time. A submission made while another is
/// loading returns [`SubmitOutcome::Busy`] without touching any state.
pub struct SearchSession {
    analyzer: Arc<VideoAnalyzer>,
    state: Arc<RwLock<PresentationState>>,
    history: RwLock<SearchHistory>,
}

impl SearchSession {
    pub async fn new(analyzer: Arc<VideoAnalyzer>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            analyzer,
            state: Arc::new(RwLock::new(PresentationState::default())),
            history: RwLock::new(SearchHistory::load(store).await),
        }
    }

    pub fn analyzer(&self) -> &VideoAnalyzer {
        &self.analyzer
    }

    /// Validate `input`, analyze the page and update state and history.
    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        if self.state.read().await.is_loading {
            warn!("Search for {} ignored, another search is in progress", input.trim());
            return SubmitOutcome::Busy;
        }

        if let Err(e) = validate_url(input) {
            info!("Rejected search input {:?}: {}", input, e);
            self.state.write().await.error = Some(e.user_message().to_string());
            return SubmitOutcome::Rejected(e);
        }
        let url = input.trim();

        {
            let mut state = self.state.write().await;
            if state.is_loading {
                return SubmitOutcome::Busy;
            }
            state.error = None;
            state.video_groups.clear();
            state.has_searched = true;
            state.selected_category = CategoryFilter::All;
            state.is_loading = true;
        }
        let loading = LoadingGuard::new(Arc::clone(&self.state));

        info!("🔍 Analyzing {}", url);

        let result = AssertUnwindSafe(self.analyzer.resolve(url))
            .catch_unwind()
            .await
            .unwrap_or(Err(AnalysisError::Panicked));

        let outcome = match result {
            Ok(groups) => {
                let count = groups.len();
                self.state.write().await.video_groups = groups;
                self.history.write().await.record(url).await;
                info!("✅ Found {} video groups on {}", count, url);
                SubmitOutcome::Found(count)
            }
            Err(e) => {
                error!("Analysis of {} failed: {}", url, e);
                let message = e.user_message().to_string();
                self.state.write().await.error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        };

        self.state.write().await.is_loading = false;
        loading.disarm();
        outcome
    }

    /// Search again for the history entry at `index` (0 is the most recent).
    pub async fn search_history_entry(&self, index: usize) -> Option<SubmitOutcome> {
        let url = self.history.read().await.get(index)?.to_string();
        Some(self.submit(&url).await)
    }

    pub async fn set_category(&self, category: CategoryFilter) {
        self.state.write().await.selected_category = category;
    }

    pub async fn set_sort(&self, sort: SortKey) {
        self.state.write().await.sort_by = sort;
    }

    /// Copy of the current state for rendering
    pub async fn snapshot(&self) -> PresentationState {
        self.state.read().await.clone()
    }

    pub async fn history(&self) -> Vec<String> {
        self.history.read().await.entries().to_vec()
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear().await;
    }
}
