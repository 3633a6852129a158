use std::future::Future;
use std::path::Path;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::{ApiOutcome, UploadKind};
use crate::controller::{Controller, ControllerError};
use crate::shell::display::{
    display_alert, display_models, display_notice, display_prediction, display_tiffs,
    display_upload_form,
};

/// Runs `work` behind a spinner showing `message`.
pub(crate) async fn with_spinner<F: Future>(message: &str, work: F) -> F::Output {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {wide_msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(message.to_string());
    let output = work.await;
    pb.finish_and_clear();
    output
}

pub(crate) fn parse_kind(word: &str) -> Option<UploadKind> {
    match word.to_lowercase().as_str() {
        "model" | "models" => Some(UploadKind::Model),
        "tiff" | "tif" | "tiffs" | "image" => Some(UploadKind::Tiff),
        _ => None,
    }
}

fn report_error(e: &ControllerError) {
    println!("{}", format!("Error: {}", e).yellow());
}

pub(super) async fn handle_list_models(controller: &Controller) {
    if let Err(e) = with_spinner("Fetching models...", controller.refresh_models()).await {
        report_error(&e);
    }
    controller.view(display_models);
}

pub(super) async fn handle_list_tiffs(controller: &Controller) {
    if let Err(e) = with_spinner("Fetching TIFF list...", controller.refresh_tiffs()).await {
        report_error(&e);
    }
    controller.view(display_tiffs);
}

pub(super) fn handle_choose(controller: &Controller, args: &[&str]) {
    let Some(kind) = args.first().and_then(|w| parse_kind(w)) else {
        println!("Usage: choose <model|tiff> [path]");
        return;
    };
    let path = args.get(1..).map(|rest| rest.join(" ")).filter(|p| !p.is_empty());
    match path.as_deref().map(Path::new) {
        Some(p) if !p.is_file() => {
            println!("{}", format!("Not a file: {}", p.display()).yellow());
        }
        chosen => controller.choose_file(kind, chosen),
    }
    controller.view(|page| println!("{}", page.upload_form(kind).file.label()));
}

pub(super) fn handle_tiff_type(controller: &Controller, value: Option<&str>) {
    match controller.set_tiff_type(value) {
        Ok(()) => controller.view(|page| {
            println!("TIFF type: {}", page.upload_form(UploadKind::Tiff).tiff_type().unwrap_or("-"))
        }),
        Err(e) => report_error(&e),
    }
}

pub(super) async fn handle_upload(controller: &Controller, kind: UploadKind) {
    let message = controller.view(|page| {
        crate::view::forms::uploading_message(kind).to_string() + " " + page.upload_form(kind).file.label()
    });
    match with_spinner(&message, controller.submit_upload(kind)).await {
        Ok(_) | Err(ControllerError::Client(_)) => {}
        Err(e) => {
            report_error(&e);
            return;
        }
    }
    controller.view(|page| display_upload_form(page, kind));
}

/// Selects by name or by 1-based number from the model table.
pub(super) fn handle_select(controller: &Controller, arg: Option<&str>) {
    let name = match arg {
        Some(a) => match a.parse::<usize>() {
            Ok(n) => match controller.view(|page| page.models().models().get(n.wrapping_sub(1)).cloned()) {
                Some(name) => Some(name),
                None => {
                    println!("Invalid model number: {}", a);
                    return;
                }
            },
            Err(_) => Some(a.to_string()),
        },
        None => None,
    };
    match controller.select_model(name.as_deref()) {
        Ok(()) => println!("Selected model: {}", name.as_deref().unwrap_or("-").yellow()),
        Err(e) => report_error(&e),
    }
}

pub(super) async fn handle_predict(controller: &Controller) {
    let result = with_spinner("Running prediction...", controller.submit_prediction()).await;
    if let Some(alert) = controller.take_alert() {
        display_alert(&alert);
    }
    if let Ok(ApiOutcome::Success(_)) = result {
        controller.view(|page| display_prediction(page.panel()));
    }
}

pub(super) async fn handle_download(controller: &Controller, dest: Option<&str>) {
    let dest = Path::new(dest.unwrap_or("."));
    match with_spinner("Downloading prediction...", controller.download_prediction(dest)).await {
        Ok(path) => println!("Saved {}", path.display().to_string().green()),
        Err(e) => report_error(&e),
    }
}

pub(super) async fn handle_delete(controller: &Controller, args: &[&str]) {
    let kind = args.first().and_then(|w| parse_kind(w));
    let filename = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
    let Some(kind) = kind.filter(|_| !filename.is_empty()) else {
        println!("Usage: delete <model|tiff> <filename>");
        return;
    };
    if let Err(e) = with_spinner("Deleting...", controller.delete_file(kind, &filename)).await {
        report_error(&e);
        return;
    }
    controller.view(display_notice);
}
