use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::api::{
    ApiOutcome, ClientError, PredictionArtifacts, PredictionRequest, TiffRegistry, UploadKind,
    UploadReceipt,
};

use super::forms::{uploading_message, FormError, PredictionFormState, UploadFormState};
use super::lists::{ModelDropdown, TiffListView};
use super::result::PredictionPanel;

/// Independent request flows. Each has its own token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Upload(UploadKind),
    Predict,
    ModelList,
    TiffList,
}

/// Ticket handed out when a request starts. Only the newest ticket of a
/// flow may apply its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    flow: Flow,
    seq: u64,
}

#[derive(Debug, Default)]
struct TokenLedger {
    next: u64,
    latest: HashMap<Flow, u64>,
}

impl TokenLedger {
    fn issue(&mut self, flow: Flow) -> RequestToken {
        self.next += 1;
        self.latest.insert(flow, self.next);
        RequestToken { flow, seq: self.next }
    }

    fn is_current(&self, token: RequestToken) -> bool {
        self.latest.get(&token.flow) == Some(&token.seq)
    }
}

/// List a completed request asks to be refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    Models,
    Tiffs,
}

impl Refresh {
    fn after_upload(kind: UploadKind) -> Self {
        match kind {
            UploadKind::Model => Refresh::Models,
            UploadKind::Tiff => Refresh::Tiffs,
        }
    }
}

/// What applying a response did
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A newer request of the same flow exists; the page was left alone.
    /// A stale upload that the server accepted still asks for its list to
    /// be refreshed, since list refreshes carry their own tokens.
    Stale { refresh: Option<Refresh> },
    Applied { refresh: Option<Refresh> },
}

impl Completion {
    /// List to refresh, whether or not the response was applied
    pub fn refresh(self) -> Option<Refresh> {
        match self {
            Completion::Stale { refresh } | Completion::Applied { refresh } => refresh,
        }
    }
}

/// Everything the page shows.
#[derive(Debug)]
pub struct PageState {
    model_form: UploadFormState,
    tiff_form: UploadFormState,
    tiff_types: Vec<String>,
    models: ModelDropdown,
    tiffs: TiffListView,
    prediction_form: PredictionFormState,
    panel: PredictionPanel,
    alert: Option<String>,
    notice: Option<String>,
    /// List whose failed refresh set the current notice
    notice_from: Option<Refresh>,
    models_refreshed_at: Option<DateTime<Utc>>,
    tiffs_refreshed_at: Option<DateTime<Utc>>,
    tokens: TokenLedger,
}

impl PageState {
    /// `tiff_types` are the options of the raster type selection;
    /// `extra_fields` are sent with every prediction.
    pub fn new(tiff_types: Vec<String>, extra_fields: Vec<(String, String)>) -> Self {
        Self {
            model_form: UploadFormState::new(UploadKind::Model),
            tiff_form: UploadFormState::new(UploadKind::Tiff),
            tiff_types,
            models: ModelDropdown::default(),
            tiffs: TiffListView::default(),
            prediction_form: PredictionFormState::new(extra_fields),
            panel: PredictionPanel::Hidden,
            alert: None,
            notice: None,
            notice_from: None,
            models_refreshed_at: None,
            tiffs_refreshed_at: None,
            tokens: TokenLedger::default(),
        }
    }

    // --- Accessors ---

    pub fn upload_form(&self, kind: UploadKind) -> &UploadFormState {
        match kind {
            UploadKind::Model => &self.model_form,
            UploadKind::Tiff => &self.tiff_form,
        }
    }

    fn upload_form_mut(&mut self, kind: UploadKind) -> &mut UploadFormState {
        match kind {
            UploadKind::Model => &mut self.model_form,
            UploadKind::Tiff => &mut self.tiff_form,
        }
    }

    pub fn tiff_types(&self) -> &[String] {
        &self.tiff_types
    }

    pub fn models(&self) -> &ModelDropdown {
        &self.models
    }

    pub fn tiffs(&self) -> &TiffListView {
        &self.tiffs
    }

    pub fn prediction_form(&self) -> &PredictionFormState {
        &self.prediction_form
    }

    pub fn panel(&self) -> &PredictionPanel {
        &self.panel
    }

    /// Pending blocking alert, if any
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Dismisses and returns the pending alert
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// Last page-level message (refresh failures, delete results)
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn models_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.models_refreshed_at
    }

    pub fn tiffs_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.tiffs_refreshed_at
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.tokens.is_current(token)
    }

    fn set_notice(&mut self, text: String, from: Option<Refresh>) {
        self.notice = Some(text);
        self.notice_from = from;
    }

    /// Drops the notice left by a failed refresh of `list`, if it is still shown.
    fn clear_refresh_notice(&mut self, list: Refresh) {
        if self.notice_from == Some(list) {
            self.notice = None;
            self.notice_from = None;
        }
    }

    // --- Form inputs ---

    /// Reflects the file input's selection in its label.
    pub fn choose_file<I, S>(&mut self, kind: UploadKind, selection: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let form = self.upload_form_mut(kind);
        form.file.choose(selection);
        debug!("{} file label: {}", kind, form.file.label());
    }

    pub fn set_tiff_type(&mut self, value: Option<&str>) -> Result<(), FormError> {
        self.tiff_form.select_tiff_type(value, &self.tiff_types)
    }

    /// Selects a model from the dropdown; `None` picks the placeholder.
    pub fn select_model(&mut self, model: Option<&str>) -> Result<(), FormError> {
        match model.filter(|m| !m.is_empty()) {
            None => self.prediction_form.set_selected_model(None),
            Some(m) if self.models.contains(m) => self.prediction_form.set_selected_model(Some(m.to_string())),
            Some(m) => return Err(FormError::UnknownModel(m.to_string())),
        }
        Ok(())
    }

    // --- Upload flow ---

    /// Marks the upload as in progress and issues its token.
    pub fn begin_upload(&mut self, kind: UploadKind) -> Result<RequestToken, FormError> {
        let form = self.upload_form_mut(kind);
        if form.file.name().is_none() {
            return Err(FormError::NoFileChosen(kind));
        }
        form.set_status(uploading_message(kind));
        Ok(self.tokens.issue(Flow::Upload(kind)))
    }

    /// Applies an upload response. On success the form is reset and the
    /// matching list should be refreshed.
    pub fn complete_upload(
        &mut self,
        token: RequestToken,
        result: &Result<ApiOutcome<UploadReceipt>, ClientError>,
    ) -> Completion {
        let kind = match token.flow {
            Flow::Upload(kind) => kind,
            other => {
                warn!("Upload completion called with a {:?} token", other);
                return Completion::Stale { refresh: None };
            }
        };
        if !self.tokens.is_current(token) {
            warn!("Discarding stale {} upload response", kind);
            let refresh = match result {
                Ok(ApiOutcome::Success(_)) => Some(Refresh::after_upload(kind)),
                _ => None,
            };
            return Completion::Stale { refresh };
        }

        let form = self.upload_form_mut(kind);
        match result {
            Ok(ApiOutcome::Success(receipt)) => {
                info!("{} upload accepted: {}", kind, receipt.message);
                form.set_status(receipt.message.clone());
                form.reset();
                Completion::Applied { refresh: Some(Refresh::after_upload(kind)) }
            }
            Ok(ApiOutcome::Failure { message }) => {
                warn!("{} upload rejected: {}", kind, message);
                form.set_status(message.clone());
                Completion::Applied { refresh: None }
            }
            Err(e) => {
                form.set_status(format!("Upload failed: {}", e));
                Completion::Applied { refresh: None }
            }
        }
    }

    // --- List refreshes ---

    pub fn begin_model_refresh(&mut self) -> RequestToken {
        self.tokens.issue(Flow::ModelList)
    }

    pub fn begin_tiff_refresh(&mut self) -> RequestToken {
        self.tokens.issue(Flow::TiffList)
    }

    /// Rebuilds the dropdown from a `/list_models` response.
    pub fn apply_models(
        &mut self,
        token: RequestToken,
        result: &Result<ApiOutcome<Vec<String>>, ClientError>,
    ) -> Completion {
        if token.flow != Flow::ModelList || !self.tokens.is_current(token) {
            warn!("Discarding stale model list response");
            return Completion::Stale { refresh: None };
        }
        match result {
            Ok(ApiOutcome::Success(models)) => {
                info!("Model list refreshed: {} models", models.len());
                self.models.replace(models.clone());
                self.models_refreshed_at = Some(Utc::now());
                self.clear_refresh_notice(Refresh::Models);
                let selection_gone = self
                    .prediction_form
                    .selected_model()
                    .is_some_and(|m| !self.models.contains(m));
                if selection_gone {
                    self.prediction_form.set_selected_model(None);
                }
            }
            Ok(ApiOutcome::Failure { message }) => {
                warn!("Model list not refreshed: {}", message);
            }
            Err(e) => {
                self.set_notice(format!("Could not refresh models: {}", e), Some(Refresh::Models));
            }
        }
        Completion::Applied { refresh: None }
    }

    /// Rebuilds the raster list from a `/list_tiffs` response.
    pub fn apply_tiffs(
        &mut self,
        token: RequestToken,
        result: &Result<ApiOutcome<TiffRegistry>, ClientError>,
    ) -> Completion {
        if token.flow != Flow::TiffList || !self.tokens.is_current(token) {
            warn!("Discarding stale TIFF list response");
            return Completion::Stale { refresh: None };
        }
        match result {
            Ok(ApiOutcome::Success(registry)) => {
                info!("TIFF list refreshed: {} entries", registry.len());
                self.tiffs = TiffListView::Loaded(registry.clone());
                self.tiffs_refreshed_at = Some(Utc::now());
                self.clear_refresh_notice(Refresh::Tiffs);
            }
            Ok(ApiOutcome::Failure { message }) => {
                warn!("TIFF list not refreshed: {}", message);
            }
            Err(e) => {
                self.set_notice(format!("Could not refresh TIFF list: {}", e), Some(Refresh::Tiffs));
            }
        }
        Completion::Applied { refresh: None }
    }

    // --- Prediction flow ---

    /// Hides the result section and serializes the form.
    pub fn begin_prediction(&mut self) -> (RequestToken, PredictionRequest) {
        self.panel = PredictionPanel::Hidden;
        let token = self.tokens.issue(Flow::Predict);
        (token, self.prediction_form.to_request())
    }

    /// Shows the result on success; otherwise raises an alert and keeps
    /// the section hidden.
    pub fn complete_prediction(
        &mut self,
        token: RequestToken,
        result: &Result<ApiOutcome<PredictionArtifacts>, ClientError>,
    ) -> Completion {
        if token.flow != Flow::Predict || !self.tokens.is_current(token) {
            warn!("Discarding stale prediction response");
            return Completion::Stale { refresh: None };
        }
        match result {
            Ok(ApiOutcome::Success(artifacts)) => {
                info!("Prediction ready: {}", artifacts.prediction_tiff);
                self.panel = PredictionPanel::Shown(artifacts.clone());
            }
            Ok(ApiOutcome::Failure { message }) => {
                warn!("Prediction rejected: {}", message);
                self.panel = PredictionPanel::Hidden;
                self.alert = Some(format!("Error: {}", message));
            }
            Err(e) => {
                self.panel = PredictionPanel::Hidden;
                self.alert = Some(format!("Error: {}", e));
            }
        }
        Completion::Applied { refresh: None }
    }

    // --- Delete ---

    /// Records a delete result; a successful delete refreshes its list.
    pub fn apply_delete(
        &mut self,
        kind: UploadKind,
        filename: &str,
        result: &Result<ApiOutcome<String>, ClientError>,
    ) -> Completion {
        match result {
            Ok(ApiOutcome::Success(message)) => {
                info!("Deleted {} file '{}'", kind, filename);
                self.set_notice(message.clone(), None);
                Completion::Applied { refresh: Some(Refresh::after_upload(kind)) }
            }
            Ok(ApiOutcome::Failure { message }) => {
                warn!("Delete of '{}' rejected: {}", filename, message);
                self.set_notice(message.clone(), None);
                Completion::Applied { refresh: None }
            }
            Err(e) => {
                self.set_notice(format!("Could not delete {}: {}", filename, e), None);
                Completion::Applied { refresh: None }
            }
        }
    }
}
