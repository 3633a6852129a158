//! Drives the page: every user action becomes a state transition, an HTTP
//! call, and a second transition with the response.
//!
//! The page state sits behind a mutex that is only ever held inside
//! [`Controller::update`] and [`Controller::view`], never across an `.await`,
//! so requests of different flows can overlap freely.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::api::{
    ApiClient, ApiOutcome, ClientError, FilePayload, PredictionArtifacts, TiffRegistry, UploadKind,
    UploadReceipt, UploadRequest,
};
use crate::config::Settings;
use crate::view::render::{self, Fragment};
use crate::view::{Completion, FormError, PageState, Refresh};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("no prediction result is shown")]
    NoPrediction,
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// Page controller. Cheap to clone; clones share the same page.
#[derive(Clone)]
pub struct Controller {
    api: ApiClient,
    page: Arc<Mutex<PageState>>,
    chosen: Arc<Mutex<HashMap<UploadKind, PathBuf>>>,
}

impl Controller {
    pub fn new(api: ApiClient, page: PageState) -> Self {
        Self {
            api,
            page: Arc::new(Mutex::new(page)),
            chosen: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Builds the client and an empty page from settings.
    pub fn from_settings(settings: &Settings) -> std::result::Result<Self, ClientError> {
        let api = ApiClient::new(&settings.server)?;
        let extra_fields = settings
            .predict
            .extra_fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect();
        let page = PageState::new(settings.upload.tiff_types.clone(), extra_fields);
        Ok(Self::new(api, page))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Reads the page.
    pub fn view<R>(&self, f: impl FnOnce(&PageState) -> R) -> R {
        let page = self.page.lock().unwrap_or_else(PoisonError::into_inner);
        f(&page)
    }

    /// Mutates the page.
    pub fn update<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        let mut page = self.page.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut page)
    }

    pub fn render(&self) -> Vec<Fragment> {
        self.view(render::render_page)
    }

    pub fn take_alert(&self) -> Option<String> {
        self.update(PageState::take_alert)
    }

    /// Populates the model dropdown and the raster list. Failures end up in
    /// the page notice.
    pub async fn initialize(&self) {
        info!("Initializing page");
        let (models, tiffs) = futures::join!(self.refresh_models(), self.refresh_tiffs());
        if let Err(e) = models {
            error!("Initial model list failed: {}", e);
        }
        if let Err(e) = tiffs {
            error!("Initial TIFF list failed: {}", e);
        }
    }

    /// Records the file picked for `kind`; `None` clears the input.
    pub fn choose_file(&self, kind: UploadKind, path: Option<&Path>) {
        let name = path
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
        {
            let mut chosen = self.chosen.lock().unwrap_or_else(PoisonError::into_inner);
            match path {
                Some(p) => chosen.insert(kind, p.to_path_buf()),
                None => chosen.remove(&kind),
            };
        }
        self.update(|page| page.choose_file(kind, name));
    }

    pub fn set_tiff_type(&self, value: Option<&str>) -> Result<()> {
        Ok(self.update(|page| page.set_tiff_type(value))?)
    }

    pub fn select_model(&self, model: Option<&str>) -> Result<()> {
        Ok(self.update(|page| page.select_model(model))?)
    }

    /// Uploads the chosen file. The outcome is applied to the page before it
    /// is returned; a client error is returned after being shown as status.
    pub async fn submit_upload(&self, kind: UploadKind) -> Result<ApiOutcome<UploadReceipt>> {
        let path = self
            .chosen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .ok_or(FormError::NoFileChosen(kind))?;
        let (token, tiff_type) = self.update(|page| {
            let token = page.begin_upload(kind)?;
            let tiff_type = page.upload_form(kind).tiff_type().map(str::to_string);
            Ok::<_, FormError>((token, tiff_type))
        })?;

        let result = match FilePayload::read(&path).await {
            Ok(file) => self.api.upload(UploadRequest { kind, file, tiff_type }).await,
            Err(e) => Err(e),
        };

        let completion = self.update(|page| page.complete_upload(token, &result));
        debug!("{} upload completion: {:?}", kind, completion);
        // A stale success leaves the newer upload's file in place
        if let Completion::Applied { refresh: Some(_) } = completion {
            self.chosen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&kind);
        }
        if let Some(refresh) = completion.refresh() {
            self.run_refresh(refresh).await;
        }
        Ok(result?)
    }

    pub async fn refresh_models(&self) -> Result<ApiOutcome<Vec<String>>> {
        let token = self.update(PageState::begin_model_refresh);
        let result = self.api.list_models().await;
        let _ = self.update(|page| page.apply_models(token, &result));
        Ok(result?)
    }

    pub async fn refresh_tiffs(&self) -> Result<ApiOutcome<TiffRegistry>> {
        let token = self.update(PageState::begin_tiff_refresh);
        let result = self.api.list_tiffs().await;
        let _ = self.update(|page| page.apply_tiffs(token, &result));
        Ok(result?)
    }

    /// Refreshes the dropdown, then selects `model` from it. A rejected
    /// listing is returned before any selection is attempted.
    pub async fn refresh_and_select(&self, model: &str) -> Result<ApiOutcome<()>> {
        match self.refresh_models().await? {
            ApiOutcome::Success(_) => {
                self.select_model(Some(model))?;
                Ok(ApiOutcome::Success(()))
            }
            ApiOutcome::Failure { message } => Ok(ApiOutcome::Failure { message }),
        }
    }

    async fn run_refresh(&self, refresh: Refresh) {
        let failed = match refresh {
            Refresh::Models => self.refresh_models().await.err(),
            Refresh::Tiffs => self.refresh_tiffs().await.err(),
        };
        if let Some(e) = failed {
            error!("Refresh of {:?} failed: {}", refresh, e);
        }
    }

    /// Hides the result section, submits the form, and shows the result or
    /// raises an alert.
    pub async fn submit_prediction(&self) -> Result<ApiOutcome<PredictionArtifacts>> {
        let (token, request) = self.update(PageState::begin_prediction);
        let result = self.api.predict(&request).await;
        let _ = self.update(|page| page.complete_prediction(token, &result));
        Ok(result?)
    }

    /// Deletes an uploaded file and refreshes its list on success.
    pub async fn delete_file(&self, kind: UploadKind, filename: &str) -> Result<ApiOutcome<String>> {
        let result = self.api.delete_file(kind, filename).await;
        let completion = self.update(|page| page.apply_delete(kind, filename, &result));
        if let Some(refresh) = completion.refresh() {
            self.run_refresh(refresh).await;
        }
        Ok(result?)
    }

    /// Saves the shown prediction raster into `dest_dir`.
    pub async fn download_prediction(&self, dest_dir: &Path) -> Result<PathBuf> {
        let href = self
            .view(|page| page.panel().download_href().map(str::to_string))
            .ok_or(ControllerError::NoPrediction)?;
        Ok(self.api.download(&href, dest_dir).await?)
    }
}
