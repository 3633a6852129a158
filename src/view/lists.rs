use crate::api::TiffRegistry;

/// Label of the "no selection" option that always heads the dropdown
pub const MODEL_PLACEHOLDER: &str = "-- Select a model --";

/// Shown in place of the raster list when the server has none
pub const EMPTY_TIFF_LIST: &str = "No TIFF files uploaded yet";

/// Model selection options, in the order the server listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDropdown {
    models: Vec<String>,
}

impl ModelDropdown {
    /// Replaces every option. Never merges with the previous list.
    pub(crate) fn replace(&mut self, models: Vec<String>) {
        self.models = models;
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// `(value, label)` for every option, placeholder first.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once(("", MODEL_PLACEHOLDER))
            .chain(self.models.iter().map(|m| (m.as_str(), m.as_str())))
    }
}

/// The uploaded raster list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TiffListView {
    /// Nothing fetched yet
    #[default]
    NotLoaded,
    Loaded(TiffRegistry),
}

impl TiffListView {
    pub fn entries(&self) -> Option<&TiffRegistry> {
        match self {
            TiffListView::NotLoaded => None,
            TiffListView::Loaded(registry) => Some(registry),
        }
    }

    /// True once loaded with zero entries
    pub fn is_empty_state(&self) -> bool {
        matches!(self, TiffListView::Loaded(r) if r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_start_with_placeholder_and_keep_order() {
        let mut dropdown = ModelDropdown::default();
        dropdown.replace(vec!["z.pkl".to_string(), "a.pkl".to_string()]);

        let options: Vec<(&str, &str)> = dropdown.options().collect();
        assert_eq!(options, vec![("", MODEL_PLACEHOLDER), ("z.pkl", "z.pkl"), ("a.pkl", "a.pkl")]);
    }

    #[test]
    fn test_replace_drops_previous_options() {
        let mut dropdown = ModelDropdown::default();
        dropdown.replace(vec!["old.pkl".to_string()]);
        dropdown.replace(vec!["new.pkl".to_string()]);
        assert!(!dropdown.contains("old.pkl"));
        assert_eq!(dropdown.options().count(), 2);
    }

    #[test]
    fn test_empty_state_only_after_load() {
        assert!(!TiffListView::NotLoaded.is_empty_state());
        assert!(TiffListView::Loaded(TiffRegistry::default()).is_empty_state());
    }
}
