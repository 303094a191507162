/// Presentation layer
///
/// Holds the per-session display state, derives the filtered and sorted view,
/// and manages search history and clipboard feedback.

pub mod clipboard;
pub mod history;
pub mod render;
pub mod session;
pub mod view;

pub use clipboard::{Clipboard, CopyFeedback, SystemClipboard, COPY_FEEDBACK_DURATION};
pub use history::{SearchHistory, HISTORY_KEY, HISTORY_LIMIT};
pub use session::{validate_url, PresentationState, SearchSession, SubmitOutcome};
pub use view::{categories, compare_titles, filter_and_sort, CategoryFilter, SortKey, ALL_CATEGORIES};
