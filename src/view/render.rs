//! HTML fragments for each element the page updates.
//!
//! Element ids match the page markup, so the fragments can be swapped into
//! the existing document unchanged. Server-provided text is always escaped.

use std::fmt::Write;

use crate::api::UploadKind;

use super::lists::{ModelDropdown, TiffListView, EMPTY_TIFF_LIST};
use super::page::PageState;
use super::result::PredictionPanel;

pub const MODEL_FILE_NAME: &str = "modelFileName";
pub const MODEL_STATUS: &str = "modelStatus";
pub const TIFF_FILE_NAME: &str = "tiffFileName";
pub const TIFF_STATUS: &str = "tiffStatus";
pub const TIFF_TYPE: &str = "tiffType";
pub const SELECTED_MODEL: &str = "selectedModel";
pub const UPLOADED_TIFFS: &str = "uploadedTiffs";
pub const MAP_SECTION: &str = "mapSection";
pub const DOWNLOAD_TIFF_LINK: &str = "downloadTiffLink";
pub const PREDICTION_MAP: &str = "predictionMap";

/// Placeholder option of the raster type selection
pub const TIFF_TYPE_PLACEHOLDER: &str = "-- Select TIFF type --";

/// One element's rendered state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub id: &'static str,
    pub visible: bool,
    /// Attributes to set on the element itself, already escaped
    pub attributes: Vec<(&'static str, String)>,
    pub inner_html: String,
}

impl Fragment {
    fn content(id: &'static str, inner_html: String) -> Self {
        Self { id, visible: true, attributes: Vec::new(), inner_html }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Escapes text for use in element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn file_name_id(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::Model => MODEL_FILE_NAME,
        UploadKind::Tiff => TIFF_FILE_NAME,
    }
}

pub fn status_id(kind: UploadKind) -> &'static str {
    match kind {
        UploadKind::Model => MODEL_STATUS,
        UploadKind::Tiff => TIFF_STATUS,
    }
}

pub fn file_label(page: &PageState, kind: UploadKind) -> Fragment {
    Fragment::content(file_name_id(kind), escape(page.upload_form(kind).file.label()))
}

pub fn upload_status(page: &PageState, kind: UploadKind) -> Fragment {
    let text = page.upload_form(kind).status().unwrap_or_default();
    Fragment::content(status_id(kind), escape(text))
}

fn option(out: &mut String, value: &str, label: &str, selected: bool) {
    let selected = if selected { " selected" } else { "" };
    let _ = write!(out, r#"<option value="{}"{}>{}</option>"#, escape(value), selected, escape(label));
}

pub fn tiff_type_select(page: &PageState) -> Fragment {
    let current = page.upload_form(UploadKind::Tiff).tiff_type();
    let mut html = String::new();
    option(&mut html, "", TIFF_TYPE_PLACEHOLDER, current.is_none());
    for key in page.tiff_types() {
        option(&mut html, key, key, current == Some(key.as_str()));
    }
    Fragment::content(TIFF_TYPE, html)
}

pub fn model_options(dropdown: &ModelDropdown, selected: Option<&str>) -> Fragment {
    let mut html = String::new();
    for (value, label) in dropdown.options() {
        let is_selected = match selected {
            Some(s) => s == value,
            None => value.is_empty(),
        };
        option(&mut html, value, label, is_selected);
    }
    Fragment::content(SELECTED_MODEL, html)
}

pub fn tiff_list(view: &TiffListView) -> Fragment {
    let html = match view.entries() {
        None => String::new(),
        Some(registry) if registry.is_empty() => format!("<p>{}</p>", EMPTY_TIFF_LIST),
        Some(registry) => {
            let mut html = String::from("<ul>");
            for (id, desc) in registry.iter() {
                let _ = write!(html, "<li><strong>{}</strong>: {}</li>", escape(id), escape(desc));
            }
            html.push_str("</ul>");
            html
        }
    };
    Fragment::content(UPLOADED_TIFFS, html)
}

pub fn map_section(panel: &PredictionPanel) -> Fragment {
    Fragment {
        id: MAP_SECTION,
        visible: panel.is_visible(),
        attributes: Vec::new(),
        inner_html: String::new(),
    }
}

pub fn download_link(panel: &PredictionPanel) -> Fragment {
    let attributes = panel
        .download_href()
        .map(|href| vec![("href", escape(href))])
        .unwrap_or_default();
    Fragment {
        id: DOWNLOAD_TIFF_LINK,
        visible: panel.is_visible(),
        attributes,
        inner_html: String::new(),
    }
}

pub fn prediction_map(panel: &PredictionPanel) -> Fragment {
    let html = panel
        .map_src()
        .map(|src| {
            format!(
                r#"<iframe src="{}" style="width:100%;height:500px;border:none;"></iframe>"#,
                escape(src)
            )
        })
        .unwrap_or_default();
    Fragment {
        id: PREDICTION_MAP,
        visible: panel.is_visible(),
        attributes: Vec::new(),
        inner_html: html,
    }
}

/// Every fragment of the page, in document order.
pub fn render_page(page: &PageState) -> Vec<Fragment> {
    vec![
        file_label(page, UploadKind::Model),
        upload_status(page, UploadKind::Model),
        file_label(page, UploadKind::Tiff),
        tiff_type_select(page),
        upload_status(page, UploadKind::Tiff),
        tiff_list(page.tiffs()),
        model_options(page.models(), page.prediction_form().selected_model()),
        map_section(page.panel()),
        download_link(page.panel()),
        prediction_map(page.panel()),
    ]
}
