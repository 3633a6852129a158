use crate::api::PredictionArtifacts;

/// The map section. Download link and map are shown together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PredictionPanel {
    #[default]
    Hidden,
    Shown(PredictionArtifacts),
}

impl PredictionPanel {
    pub fn is_visible(&self) -> bool {
        matches!(self, PredictionPanel::Shown(_))
    }

    pub fn download_href(&self) -> Option<&str> {
        match self {
            PredictionPanel::Shown(a) => Some(&a.prediction_tiff),
            PredictionPanel::Hidden => None,
        }
    }

    pub fn map_src(&self) -> Option<&str> {
        match self {
            PredictionPanel::Shown(a) => Some(&a.map_html),
            PredictionPanel::Hidden => None,
        }
    }
}
