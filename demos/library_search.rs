//! Runs one search against a backend and prints the first window.
//!
//! cargo run --example library_search -- <client_id> <repcode> <type> <date> [instance]

use nativelog::client::{ClientOptions, HttpSearchApi};
use nativelog::controller::{ControllerOptions, ViewController};
use nativelog::model::SearchForm;
use nativelog::render::terminal::TerminalSurface;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let form = SearchForm {
        client_id: arg(0),
        repcode: arg(1),
        log_type: arg(2),
        date: arg(3),
        instance: args.get(4).cloned().unwrap_or_else(|| "live".to_string()),
        ..SearchForm::default()
    };

    let api = HttpSearchApi::new(&ClientOptions::default())?;
    let surface = TerminalSurface::new(std::io::stdout());
    let mut view = ViewController::new(api, surface, ControllerOptions::default());
    view.submit(&form).await?;

    let summary = view.summary();
    println!(
        "{} of {} entries shown, more on server: {}",
        summary.shown,
        summary.total,
        view.store().has_more()
    );
    Ok(())
}
