use thiserror::Error;

use crate::api::{PredictionRequest, UploadKind};

use super::file_choice::FileChoice;

/// Input rejected before any request is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("no {0} file chosen")]
    NoFileChosen(UploadKind),

    #[error("unknown TIFF type '{given}', expected one of: {}", allowed.join(", "))]
    UnknownTiffType { given: String, allowed: Vec<String> },

    #[error("model '{0}' is not in the model list")]
    UnknownModel(String),
}

/// Status text shown as soon as an upload is submitted
pub fn uploading_message(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::Model => "Uploading model...",
        UploadKind::Tiff => "Uploading TIFF...",
    }
}

/// State of one upload form: its file input, type selection and status label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFormState {
    kind: UploadKind,
    pub file: FileChoice,
    tiff_type: Option<String>,
    status: Option<String>,
}

impl UploadFormState {
    pub fn new(kind: UploadKind) -> Self {
        Self {
            kind,
            file: FileChoice::default(),
            tiff_type: None,
            status: None,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub(crate) fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(text.into());
    }

    /// Selected raster type; always `None` on the model form
    pub fn tiff_type(&self) -> Option<&str> {
        self.tiff_type.as_deref()
    }

    /// Sets the type selection. `allowed` is the list of options the
    /// selection offers; anything else is rejected.
    pub(crate) fn select_tiff_type(&mut self, value: Option<&str>, allowed: &[String]) -> Result<(), FormError> {
        match value.filter(|v| !v.is_empty()) {
            None => self.tiff_type = None,
            Some(v) if allowed.iter().any(|a| a == v) => self.tiff_type = Some(v.to_string()),
            Some(v) => {
                return Err(FormError::UnknownTiffType {
                    given: v.to_string(),
                    allowed: allowed.to_vec(),
                })
            }
        }
        Ok(())
    }

    /// Clears the inputs. The status label is left alone.
    pub(crate) fn reset(&mut self) {
        self.file.clear();
        if self.kind == UploadKind::Tiff {
            self.tiff_type = None;
        }
    }
}

/// State of the prediction form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionFormState {
    selected_model: Option<String>,
    extra_fields: Vec<(String, String)>,
}

impl PredictionFormState {
    pub fn new(extra_fields: Vec<(String, String)>) -> Self {
        Self { selected_model: None, extra_fields }
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    pub(crate) fn set_selected_model(&mut self, model: Option<String>) {
        self.selected_model = model;
    }

    /// Serializes the form as it stands. An empty selection is sent as an
    /// empty `model_filename`, leaving the verdict to the server.
    pub fn to_request(&self) -> PredictionRequest {
        PredictionRequest {
            model_filename: self.selected_model.clone().unwrap_or_default(),
            extra_fields: self.extra_fields.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["NDVI".to_string(), "elevation".to_string()]
    }

    #[test]
    fn test_tiff_type_must_be_an_offered_option() {
        let mut form = UploadFormState::new(UploadKind::Tiff);
        form.select_tiff_type(Some("elevation"), &allowed()).unwrap();
        assert_eq!(form.tiff_type(), Some("elevation"));

        let err = form.select_tiff_type(Some("ndvi"), &allowed()).unwrap_err();
        assert!(matches!(err, FormError::UnknownTiffType { ref given, .. } if given == "ndvi"));
        assert_eq!(form.tiff_type(), Some("elevation"));

        form.select_tiff_type(Some(""), &allowed()).unwrap();
        assert_eq!(form.tiff_type(), None);
    }

    #[test]
    fn test_reset_clears_type_only_on_tiff_form() {
        let mut form = UploadFormState::new(UploadKind::Tiff);
        form.file.choose(["slope.tif"]);
        form.select_tiff_type(Some("NDVI"), &allowed()).unwrap();
        form.set_status("TIFF uploaded successfully");

        form.reset();
        assert_eq!(form.file.name(), None);
        assert_eq!(form.tiff_type(), None);
        assert_eq!(form.status(), Some("TIFF uploaded successfully"));
    }

    #[test]
    fn test_prediction_request_uses_empty_name_without_selection() {
        let form = PredictionFormState::new(vec![("threshold".to_string(), "0.7".to_string())]);
        let request = form.to_request();
        assert_eq!(request.model_filename, "");
        assert_eq!(request.extra_fields.len(), 1);
    }
}
