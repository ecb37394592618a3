use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::{error::ErrorKind, Parser};
use colored::Colorize;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::client::{ClientOptions, HttpSearchApi, SearchApi, SUCCESS_MESSAGE};
use crate::config::{self, ConfigFile};
use crate::controller::{ControllerOptions, Phase, SubmitOutcome, ViewController};
use crate::filter::{TypeField, TypeFilter};
use crate::model::{Instances, SearchForm};
use crate::output::{infer_format_from_path, ExportFormat};
use crate::render::html::HtmlSurface;
use crate::render::terminal::TerminalSurface;
use crate::render::{LogSurface, DEFAULT_PAGE_SIZE};
use crate::utils;

fn print_banner() {
    println!(
        "{} v{} - log search and export",
        "nativelog".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_opt_value<'a>(v: &'a str, default: &'a str) -> &'a str {
    if v.trim().is_empty() {
        default
    } else {
        v
    }
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

const INTERACTIVE_HELP: &str = "\
commands:
  /<text>                   search every field (applied after typing pauses)
  filter <type|all>         only show entries of one message type
  clear                     reset the filter and the search term
  more                      show the next window of matching entries
  fetch                     load the next page from the server
  export <csv|json|txt> [path]
  help                      show this list
  close | quit              discard the results and exit";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Empty,
    Search(String),
    Filter(TypeFilter),
    Clear,
    More,
    Fetch,
    Export {
        format: ExportFormat,
        path: Option<PathBuf>,
    },
    Help,
    Close,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    if let Some(text) = line.strip_prefix('/') {
        return Ok(Command::Search(text.to_string()));
    }
    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let rest: Vec<&str> = parts.collect();
    match name.as_str() {
        "filter" => match rest.as_slice() {
            [value] => Ok(Command::Filter(TypeFilter::parse(value))),
            _ => Err("usage: filter <type|all>".to_string()),
        },
        "clear" => Ok(Command::Clear),
        "more" => Ok(Command::More),
        "fetch" => Ok(Command::Fetch),
        "export" => {
            let (format, path) = match rest.as_slice() {
                [format] => (*format, None),
                [format, path] => (*format, Some(config::expand_tilde(path))),
                _ => return Err("usage: export <csv|json|txt> [path]".to_string()),
            };
            let format = ExportFormat::parse(format)
                .ok_or_else(|| format!("unknown export format '{format}'"))?;
            Ok(Command::Export { format, path })
        }
        "help" | "?" => Ok(Command::Help),
        "close" | "quit" | "exit" => Ok(Command::Close),
        other => Err(format!("unknown command '{other}', type `help`")),
    }
}

#[derive(Clone, Debug)]
struct RunConfig {
    form: SearchForm,
    controller: ControllerOptions,
    client: ClientOptions,
    workers: usize,
    verbose: u8,
    no_color: bool,
    force_color: bool,
    fetch_all: bool,
    show_all: bool,
    interactive: bool,
    search: Option<String>,
    filter: Option<TypeFilter>,
    debounce: Duration,
    output: Option<PathBuf>,
    output_format: Option<ExportFormat>,
    output_dir: Option<PathBuf>,
    html_view: Option<PathBuf>,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let force_color = args.color;
    let no_color = !force_color && (args.no_color || cfg.no_color.unwrap_or(false));

    let mut instances = Instances::default();
    for (name, endpoint) in cfg.instances.unwrap_or_default() {
        if endpoint.trim().is_empty() {
            return Err(format!("invalid endpoint for instance '{name}' in config"));
        }
        instances.insert(name, endpoint);
    }
    let instance = args
        .instance
        .or(cfg.default_instance)
        .unwrap_or_else(|| "live".to_string());

    let page_size = args.page_size.or(cfg.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 {
        return Err("invalid page_size in config, expected positive integer".to_string());
    }

    let type_field_raw = args
        .type_field
        .or(cfg.type_field)
        .unwrap_or_else(|| "message_type".to_string());
    let type_field = TypeField::parse(&type_field_raw)
        .ok_or_else(|| format!("invalid type_field '{type_field_raw}'"))?;

    let timeout = args.timeout.or(cfg.timeout).unwrap_or(30);
    let proxy = args
        .proxy
        .or(cfg.proxy)
        .filter(|p| !p.trim().is_empty());
    let success_message = cfg
        .success_message
        .unwrap_or_else(|| SUCCESS_MESSAGE.to_string());

    let debounce = args
        .debounce_ms
        .or(cfg.debounce_ms)
        .map(Duration::from_millis)
        .unwrap_or(utils::DEFAULT_DEBOUNCE);

    let output = args.output.as_deref().map(config::expand_tilde);
    let output_format = match args.output_format.as_deref() {
        Some(raw) => Some(
            ExportFormat::parse(raw).ok_or_else(|| format!("invalid --output-format '{raw}'"))?,
        ),
        None => args.output.as_deref().and_then(infer_format_from_path),
    };

    let form = SearchForm {
        client_id: args.client_id.unwrap_or_default(),
        repcode: args.repcode.unwrap_or_default(),
        log_type: args.log_type.unwrap_or_default(),
        date: args.date.unwrap_or_default(),
        start_date: args.start_date.unwrap_or_default(),
        end_date: args.end_date.unwrap_or_default(),
        instance,
    };

    Ok(RunConfig {
        form,
        controller: ControllerOptions {
            instances,
            page_size,
            type_field,
        },
        client: ClientOptions {
            timeout_seconds: timeout,
            proxy,
            success_message,
        },
        workers: args.workers.unwrap_or(4),
        verbose: args.verbose,
        no_color,
        force_color,
        fetch_all: args.fetch_all,
        show_all: args.show_all,
        interactive: args.interactive,
        search: args.search.filter(|s| !s.trim().is_empty()),
        filter: args.filter.as_deref().map(TypeFilter::parse),
        debounce,
        output,
        output_format,
        output_dir: cfg.output_dir.as_deref().map(config::expand_tilde),
        html_view: args.html_view.as_deref().map(config::expand_tilde),
    })
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("failed to create directory '{}': {e}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| format!("failed to open output file '{}': {e}", path.display()))?;
    file.write_all(bytes)
        .await
        .map_err(|e| format!("failed to write '{}': {e}", path.display()))?;
    file.flush()
        .await
        .map_err(|e| format!("failed to flush '{}': {e}", path.display()))?;
    Ok(())
}

/// Writes the current view to disk. `Ok(None)` means the controller refused
/// the export and has already shown why.
async fn export_view<A: SearchApi, S: LogSurface>(
    controller: &mut ViewController<A, S>,
    format: ExportFormat,
    path: Option<PathBuf>,
    output_dir: Option<&Path>,
) -> Result<Option<PathBuf>, String> {
    let file = match controller.export(format, Utc::now()) {
        Ok(file) => file,
        Err(e) => {
            debug!(error = %e, "export refused");
            return Ok(None);
        }
    };
    let path = match path {
        Some(path) => path,
        None => match output_dir {
            Some(dir) => dir.join(&file.filename),
            None => PathBuf::from(&file.filename),
        },
    };
    write_file(&path, &file.bytes).await?;
    info!(path = %path.display(), format = format.label(), "wrote export");
    Ok(Some(path))
}

fn report_export(result: Result<Option<PathBuf>, String>) {
    match result {
        Ok(Some(path)) => format_kv_line("Exported", &path.display().to_string()),
        Ok(None) => {}
        Err(e) => println!(":: {e}"),
    }
}

async fn interactive_loop<A: SearchApi, S: LogSurface>(
    run: &RunConfig,
    controller: &mut ViewController<A, S>,
) -> Result<(), String> {
    println!("{INTERACTIVE_HELP}");
    let (term_tx, term_rx) = mpsc::channel::<String>(32);
    let mut terms = utils::debounce(term_rx, run.debounce);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|e| format!("failed to read stdin: {e}"))?;
                let Some(line) = line else {
                    break;
                };
                match parse_command(&line) {
                    Ok(Command::Empty) => {}
                    Ok(Command::Search(text)) => {
                        if term_tx.send(text).await.is_err() {
                            debug!("search debounce task stopped");
                        }
                    }
                    Ok(Command::Filter(filter)) => controller.set_filter(filter),
                    Ok(Command::Clear) => controller.clear_filters(),
                    Ok(Command::More) => {
                        if controller.load_more_local() == 0 {
                            println!(":: nothing more to show locally");
                        }
                    }
                    Ok(Command::Fetch) => {
                        if !controller.store().has_more() {
                            println!(":: no more pages on the server");
                        } else {
                            // failures were already reported as notices
                            let _ = controller.fetch_more().await;
                        }
                    }
                    Ok(Command::Export { format, path }) => {
                        report_export(
                            export_view(controller, format, path, run.output_dir.as_deref()).await,
                        );
                    }
                    Ok(Command::Help) => println!("{INTERACTIVE_HELP}"),
                    Ok(Command::Close) => break,
                    Err(msg) => println!(":: {msg}"),
                }
            }
            Some(term) = terms.recv() => controller.set_search_term(&term),
        }
    }
    controller.close();
    Ok(())
}

/// Runs the search and the one-shot steps asked for on the command line.
/// Returns `false` when the search did not complete. Failures after that are
/// already on the surface as notices and leave the results in place.
async fn session<A: SearchApi, S: LogSurface>(
    run: &RunConfig,
    controller: &mut ViewController<A, S>,
) -> Result<bool, String> {
    match controller.submit(&run.form).await {
        Ok(SubmitOutcome::NoData) => return Ok(true),
        Ok(SubmitOutcome::Results { total }) => debug!(total, "results view opened"),
        Err(e) => {
            debug!(error = %e, "search did not complete");
            return Ok(false);
        }
    }

    if run.fetch_all {
        while controller.store().has_more() {
            match controller.fetch_more().await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "stopped fetching more pages");
                    break;
                }
            }
        }
    }

    if let Some(filter) = run.filter.clone() {
        controller.set_filter(filter);
    }
    if let Some(term) = run.search.as_deref() {
        controller.set_search_term(term);
    }
    if run.show_all {
        while controller.load_more_local() > 0 {}
    }

    if let (Some(path), Some(format)) = (run.output.clone(), run.output_format) {
        report_export(export_view(controller, format, Some(path), None).await);
    }

    if run.interactive {
        interactive_loop(run, controller).await?;
    }
    Ok(true)
}

fn print_summary<A: SearchApi, S: LogSurface>(controller: &ViewController<A, S>) {
    if controller.phase() == Phase::Closed {
        return;
    }
    let summary = controller.summary();
    println!();
    format_kv_line(
        "Shown",
        &format!(
            "{} of {} matching ({} fetched)",
            summary.shown, summary.filtered, summary.total
        ),
    );
    if summary.shown < summary.filtered {
        println!(":: use --show-all or -i to see the remaining matches");
    }
    if controller.store().has_more() {
        println!(":: more pages are available on the server, use -a to fetch them");
    }
}

fn terminal_surface(run: &RunConfig) -> TerminalSurface<Stdout> {
    if run.interactive {
        TerminalSurface::new(std::io::stdout())
    } else {
        TerminalSurface::deferred(std::io::stdout()).without_hints()
    }
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    print_banner();
    format_kv_line("Instance", format_opt_value(&run.form.instance, "-"));
    format_kv_line("Client ID", format_opt_value(&run.form.client_id, "-"));
    format_kv_line("Rep Code", format_opt_value(&run.form.repcode, "-"));
    format_kv_line("Type", format_opt_value(&run.form.log_type, "-"));
    let dates = if run.form.date.is_empty() {
        format!(
            "{} .. {}",
            format_opt_value(&run.form.start_date, "-"),
            format_opt_value(&run.form.end_date, "-")
        )
    } else {
        run.form.date.clone()
    };
    format_kv_line("Date", &dates);
    format_kv_line(
        "Filter",
        run.filter.as_ref().map(TypeFilter::label).unwrap_or("all"),
    );
    format_kv_line("Search", run.search.as_deref().unwrap_or("-"));
    format_kv_line("Fetch All", format_bool(run.fetch_all));
    println!();

    let api = HttpSearchApi::new(&run.client).map_err(|e| e.to_string())?;
    let terminal = terminal_surface(&run);

    let completed = match run.html_view.clone() {
        Some(path) => {
            let surface = (terminal, HtmlSurface::new());
            let mut controller = ViewController::new(api, surface, run.controller.clone());
            let outcome = session(&run, &mut controller).await;
            controller.surface_mut().0.flush();
            print_summary(&controller);
            write_file(&path, controller.surface().1.document("Log Data").as_bytes()).await?;
            format_kv_line("HTML View", &path.display().to_string());
            outcome?
        }
        None => {
            let mut controller = ViewController::new(api, terminal, run.controller.clone());
            let outcome = session(&run, &mut controller).await;
            controller.surface_mut().flush();
            print_summary(&controller);
            outcome?
        }
    };
    if !completed {
        return Err("search did not complete".to_string());
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{e}");
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));

    if args.init_config {
        let path = user_config_path
            .or_else(config::default_config_path)
            .ok_or_else(|| "cannot determine home directory for config".to_string())?;
        if config::ensure_default_config_file(&path)? {
            format_kv_line("Config", &format!("wrote {}", path.display()));
        } else {
            format_kv_line("Config", &format!("{} already exists", path.display()));
        }
        return Ok(());
    }

    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    init_tracing(run.verbose);
    if run.no_color {
        colored::control::set_override(false);
    } else if run.force_color {
        colored::control::set_override(true);
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(run.workers)
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
