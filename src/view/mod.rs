//! Page view model.
//!
//! Everything the page shows lives in [`PageState`]. Transitions are plain
//! methods, and [`render`] turns the state into HTML fragments keyed by the
//! page's element ids, so the whole UI can be exercised without a browser.

pub mod file_choice;
pub mod forms;
pub mod lists;
pub mod page;
pub mod render;
pub mod result;

pub use file_choice::{FileChoice, NO_FILE_CHOSEN};
pub use forms::{FormError, PredictionFormState, UploadFormState};
pub use lists::{ModelDropdown, TiffListView, EMPTY_TIFF_LIST, MODEL_PLACEHOLDER};
pub use page::{Completion, Flow, PageState, Refresh, RequestToken};
pub use result::PredictionPanel;
