use colored::*;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

use crate::api::UploadKind;
use crate::view::render::Fragment;
use crate::view::{PageState, PredictionPanel, TiffListView, EMPTY_TIFF_LIST};

fn header(title: &str) -> Cell {
    Cell::new(title)
        .fg(comfy_table::Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn new_table(headers: Vec<Cell>) -> Table {
    let mut table = Table::new();
    table
        .set_header(headers)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Displays the model dropdown as a numbered table, marking the selection.
pub fn display_models(page: &PageState) {
    let models = page.models().models();
    if models.is_empty() {
        println!("{}", "No models uploaded yet".yellow());
        return;
    }

    let selected = page.prediction_form().selected_model();
    let mut table = new_table(vec![header("#"), header("Model"), header("Selected")]);
    for (i, model) in models.iter().enumerate() {
        let marker = if selected == Some(model.as_str()) { "*" } else { "" };
        table.add_row(vec![
            Cell::new(i + 1).fg(comfy_table::Color::White).set_alignment(CellAlignment::Center),
            Cell::new(model).fg(comfy_table::Color::Green),
            Cell::new(marker).fg(comfy_table::Color::Yellow).set_alignment(CellAlignment::Center),
        ]);
    }

    println!("\n{}", table);
    let mut footer = format!("Total models: {}", models.len());
    if let Some(at) = page.models_refreshed_at() {
        footer.push_str(&format!(" (refreshed {})", at.format("%Y-%m-%d %H:%M:%S")));
    }
    println!("{}", footer.bright_green());
}

/// Displays the uploaded raster list, or its empty-state message.
pub fn display_tiffs(page: &PageState) {
    let registry = match page.tiffs() {
        TiffListView::NotLoaded => {
            println!("{}", "TIFF list not loaded".bright_black());
            return;
        }
        TiffListView::Loaded(registry) => registry,
    };
    if registry.is_empty() {
        println!("{}", EMPTY_TIFF_LIST.yellow());
        return;
    }

    let mut table = new_table(vec![header("Type"), header("File")]);
    for (id, desc) in registry.iter() {
        table.add_row(vec![
            Cell::new(id).fg(comfy_table::Color::Magenta).add_attribute(Attribute::Bold),
            Cell::new(desc).fg(comfy_table::Color::Green),
        ]);
    }
    println!("\n{}", table);
    println!("{}", format!("Total TIFF layers: {}", registry.len()).bright_green());
}

/// Displays one upload form: chosen file, type selection and status label.
pub fn display_upload_form(page: &PageState, kind: UploadKind) {
    let form = page.upload_form(kind);
    let title = match kind {
        UploadKind::Model => "Model upload",
        UploadKind::Tiff => "TIFF upload",
    };
    println!("{}", title.cyan().bold());
    println!("  file:   {}", form.file.label());
    if kind == UploadKind::Tiff {
        println!("  type:   {}", form.tiff_type().unwrap_or("-"));
    }
    if let Some(status) = form.status() {
        println!("  status: {}", status.bright_cyan());
    }
}

pub fn display_prediction(panel: &PredictionPanel) {
    match panel {
        PredictionPanel::Hidden => println!("{}", "No prediction shown".bright_black()),
        PredictionPanel::Shown(artifacts) => {
            println!("{}", "Prediction ready".green().bold());
            println!("  download: {}", artifacts.prediction_tiff.bright_cyan());
            println!("  map:      {}", artifacts.map_html.bright_cyan());
        }
    }
}

pub fn display_alert(message: &str) {
    println!("{}", message.red().bold());
}

pub fn display_notice(page: &PageState) {
    if let Some(notice) = page.notice() {
        println!("{}", notice.yellow());
    }
}

/// Whole-page summary
pub fn display_page(page: &PageState) {
    display_upload_form(page, UploadKind::Model);
    display_upload_form(page, UploadKind::Tiff);
    println!();
    display_models(page);
    display_tiffs(page);
    println!();
    display_prediction(page.panel());
    display_notice(page);
}

/// Prints rendered fragments as HTML comments plus markup.
pub fn display_fragments(fragments: &[Fragment]) {
    for fragment in fragments {
        let attributes: String = fragment
            .attributes
            .iter()
            .map(|(name, value)| format!(" {}=\"{}\"", name, value))
            .collect();
        let visibility = if fragment.visible { "" } else { " hidden" };
        println!("<!-- #{}{}{} -->", fragment.id, attributes, visibility);
        if !fragment.inner_html.is_empty() {
            println!("{}", fragment.inner_html);
        }
    }
}
