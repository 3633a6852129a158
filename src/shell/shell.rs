use std::error::Error;
use std::io::Write;

use rustyline::DefaultEditor;

use crate::controller::Controller;
use crate::shell::display::{display_fragments, display_page};

use super::commands::{
    handle_choose, handle_delete, handle_download, handle_list_models, handle_list_tiffs,
    handle_predict, handle_select, handle_tiff_type, handle_upload, parse_kind,
};

const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const BRIGHT_CYAN: &str = "\x1b[96m";
const RESET: &str = "\x1b[0m";

fn print_help() {
    println!("\n{CYAN}Raster Prediction Commands{RESET}");
    println!("{BRIGHT_CYAN}{}{RESET}", "=".repeat(60));
    println!("{GREEN}exit, bye, quit{RESET}              - Exit the shell");
    println!("{GREEN}help{RESET}                         - Show this help message");
    println!("{GREEN}clear{RESET}                        - Clear the screen");
    println!("{GREEN}page{RESET}                         - Show the whole page state");
    println!("{GREEN}html{RESET}                         - Print the page as HTML fragments");
    println!("{GREEN}models{RESET}                       - Refresh and list uploaded models");
    println!("{GREEN}tiffs{RESET}                        - Refresh and list uploaded TIFF layers");
    println!("{GREEN}choose <model|tiff> [path]{RESET}   - Choose the file to upload (no path clears)");
    println!("{GREEN}type [key]{RESET}                   - Set the TIFF type (no key clears)");
    println!("{GREEN}upload <model|tiff>{RESET}          - Upload the chosen file");
    println!("{GREEN}select [name|#]{RESET}              - Select the model to predict with");
    println!("{GREEN}predict{RESET}                      - Run a prediction with the selected model");
    println!("{GREEN}download [dir]{RESET}               - Save the predicted TIFF");
    println!("{GREEN}delete <model|tiff> <name>{RESET}   - Delete an uploaded file");
    println!();
}

/// Interactive session over one page. Loads both lists first, then reads
/// commands until exit.
pub async fn shell_loop(controller: &Controller) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Connected to {}", controller.api().base_url());
    super::with_spinner("Loading page...", controller.initialize()).await;
    controller.view(display_page);
    print_help();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("> ");
        let input = match readline {
            Ok(input) => input,
            Err(_) => {
                println!("Goodbye!");
                break;
            }
        };

        let input_trimmed = input.trim();
        if input_trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input_trimmed);

        let words: Vec<&str> = input_trimmed.split_whitespace().collect();
        let command = words[0].to_lowercase();
        let args = &words[1..];

        match command.as_str() {
            "exit" | "bye" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "help" => print_help(),
            "clear" => {
                print!("\x1B[2J\x1B[1;1H");
                std::io::stdout().flush()?;
            }
            "page" => controller.view(display_page),
            "html" => display_fragments(&controller.render()),
            "models" => handle_list_models(controller).await,
            "tiffs" => handle_list_tiffs(controller).await,
            "choose" => handle_choose(controller, args),
            "type" => handle_tiff_type(controller, args.first().copied()),
            "upload" => match args.first().and_then(|w| parse_kind(w)) {
                Some(kind) => handle_upload(controller, kind).await,
                None => println!("Usage: upload <model|tiff>"),
            },
            "select" => handle_select(controller, args.first().copied()),
            "predict" => handle_predict(controller).await,
            "download" => handle_download(controller, args.first().copied()).await,
            "delete" => handle_delete(controller, args).await,
            _ => println!("Unknown command '{}'. Type 'help' to see commands.", words[0]),
        }
    }

    Ok(())
}
