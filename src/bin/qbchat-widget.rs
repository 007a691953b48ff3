//! Terminal chat widget for QB Tech Solutions.
//!
//! Connects to a running qbchat relay, streams assistant replies as they
//! arrive, and shows numbered follow-up suggestions after each turn.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a relay on localhost
//! qbchat-widget
//!
//! # Point at another relay and disable colors
//! qbchat-widget --url https://chat.example.com --no-color
//! ```
//!
//! Typing a suggestion's number sends that suggestion as the next message.

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use qbchat::widget::suggestion_limit;
use qbchat::{PlainTextRenderer, Renderer, WidgetSession};

/// Command-line arguments for the terminal widget.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct WidgetArgs {
    /// Relay base URL.
    #[arrrg(optional, "Relay base URL (default: http://127.0.0.1:3000)", "URL")]
    url: Option<String>,

    /// Terminal width used to size suggestion chips.
    #[arrrg(optional, "Terminal width in columns (default: 80)", "COLS")]
    width: Option<u16>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = WidgetArgs::from_command_line_relaxed("qbchat-widget [OPTIONS]");
    let url = args
        .url
        .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());
    let width = args.width.unwrap_or(80);
    let chip_limit = suggestion_limit(width);

    let mut session = WidgetSession::new(&url)?;
    let mut renderer = PlainTextRenderer::with_color(!args.no_color).with_chip_limit(chip_limit);
    let mut rl = DefaultEditor::new()?;

    println!("QB Tech Solutions assistant ({url})");
    println!("Type a message, a suggestion number, or /quit to exit\n");

    let mut suggestions: Vec<String> = Vec::new();
    loop {
        let readline = rl.readline("You: ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" || line == "/exit" {
                    println!("Goodbye!");
                    break;
                }
                let _ = rl.add_history_entry(line);

                // A bare chip number resends that suggestion.
                let message = match line.parse::<usize>() {
                    Ok(n) if n >= 1 && n <= suggestions.len().min(chip_limit) => {
                        suggestions[n - 1].clone()
                    }
                    _ => line.to_string(),
                };

                print!("Assistant: ");
                match session.send(&message, &mut renderer).await {
                    Ok(next) => {
                        suggestions = next;
                        if !suggestions.is_empty() {
                            renderer.print_info("");
                            renderer.show_suggestions(&suggestions);
                        }
                    }
                    Err(err) => {
                        renderer.print_error(&format!("\nError: {err}"));
                        suggestions.clear();
                    }
                }
                println!();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }
    Ok(())
}
