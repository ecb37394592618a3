//! Filters an already fetched page offline and prints it as CSV.
//!
//! cargo run --example export_filtered -- page.json error

use chrono::Utc;
use nativelog::client::{ClientOptions, HttpSearchApi};
use nativelog::controller::{ControllerOptions, ViewController};
use nativelog::filter::TypeFilter;
use nativelog::model::LogEntry;
use nativelog::output::ExportFormat;
use nativelog::render::html::HtmlSurface;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: export_filtered <page.json> [type]")?;
    let filter = TypeFilter::parse(&args.next().unwrap_or_default());

    let entries: Vec<LogEntry> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    let api = HttpSearchApi::new(&ClientOptions::default())?;
    let mut view = ViewController::new(api, HtmlSurface::new(), ControllerOptions::default());
    view.open(entries, None, None);
    view.set_filter(filter);

    let file = view.export(ExportFormat::Csv, Utc::now())?;
    eprintln!("{} ({} bytes)", file.filename, file.bytes.len());
    println!("{}", String::from_utf8_lossy(&file.bytes));
    Ok(())
}
