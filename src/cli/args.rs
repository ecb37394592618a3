use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nativelog",
    version,
    about = "search, filter and export application logs",
    long_about = "nativelog queries a log search service, pages through the results in the terminal and exports the filtered view.\n\nExamples:\n  nativelog -c ACME -r R001 -t order -d 2024-03-05\n  nativelog -c ACME -r R001 -t order -d 2024-03-05 -s timeout -F error -o errors.csv\n  nativelog -c ACME -r R001 -t order -d 2024-03-05 -i\n\nTip: Use --config to persist instances and view settings."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity on stderr (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Force colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Config",
        help = "Path to config file (defaults to ~/.nativelog/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "ic",
        visible_alias = "init-config",
        help_heading = "Config",
        help = "Write a default config file if none exists, then exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'c',
        long = "cid",
        visible_alias = "client-id",
        value_name = "ID",
        help_heading = "Search",
        help = "Client ID to search logs for."
    )]
    pub client_id: Option<String>,

    #[arg(
        short = 'r',
        long = "rc",
        visible_alias = "repcode",
        value_name = "CODE",
        help_heading = "Search",
        help = "Rep code to search logs for."
    )]
    pub repcode: Option<String>,

    #[arg(
        short = 't',
        long = "typ",
        visible_alias = "type",
        value_name = "TYPE",
        help_heading = "Search",
        help = "Log type (e.g. order, login)."
    )]
    pub log_type: Option<String>,

    #[arg(
        short = 'd',
        long = "dt",
        visible_alias = "date",
        value_name = "DATE",
        help_heading = "Search",
        help = "Single day to search (YYYY-MM-DD); sets both start and end."
    )]
    pub date: Option<String>,

    #[arg(
        long = "sd",
        visible_alias = "start-date",
        value_name = "DATE",
        help_heading = "Search",
        help = "First day of the search range."
    )]
    pub start_date: Option<String>,

    #[arg(
        long = "ed",
        visible_alias = "end-date",
        value_name = "DATE",
        help_heading = "Search",
        help = "Last day of the search range."
    )]
    pub end_date: Option<String>,

    #[arg(
        short = 'I',
        long = "inst",
        visible_alias = "instance",
        value_name = "NAME",
        help_heading = "Search",
        help = "Backend instance to query (live, local, or one from the config)."
    )]
    pub instance: Option<String>,

    #[arg(
        short = 'a',
        long = "fa",
        visible_alias = "fetch-all",
        help_heading = "Search",
        help = "Keep fetching server pages until the continuation token runs out."
    )]
    pub fetch_all: bool,

    #[arg(
        short = 's',
        long = "q",
        visible_alias = "search",
        value_name = "TEXT",
        help_heading = "View",
        help = "Free-text search applied to every field (case-insensitive)."
    )]
    pub search: Option<String>,

    #[arg(
        short = 'F',
        long = "flt",
        visible_alias = "filter",
        value_name = "TYPE",
        help_heading = "View",
        help = "Only show entries of this message type (or 'all')."
    )]
    pub filter: Option<String>,

    #[arg(
        long = "tf",
        visible_alias = "type-field",
        value_name = "FIELD",
        help_heading = "View",
        help = "Field the type filter compares against (message_type or type)."
    )]
    pub type_field: Option<String>,

    #[arg(
        long = "ps",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "View",
        help = "Entries rendered per window."
    )]
    pub page_size: Option<usize>,

    #[arg(
        long = "sa",
        visible_alias = "show-all",
        help_heading = "View",
        help = "Render every matching entry instead of only the first window."
    )]
    pub show_all: bool,

    #[arg(
        short = 'i',
        long = "it",
        visible_alias = "interactive",
        help_heading = "View",
        help = "Read view commands from stdin after the search completes."
    )]
    pub interactive: bool,

    #[arg(
        long = "db",
        visible_alias = "debounce",
        value_name = "MS",
        help_heading = "View",
        help = "Quiet period before an interactive search term is applied."
    )]
    pub debounce_ms: Option<u64>,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Export",
        help = "Export the filtered view to a file (format inferred from the extension)."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Export",
        help = "Export format (csv, json, txt)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "hv",
        visible_alias = "html-view",
        value_name = "FILE",
        help_heading = "Export",
        help = "Also write an HTML snapshot of the rendered view."
    )]
    pub html_view: Option<String>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'w',
        long = "wrk",
        visible_alias = "workers",
        value_name = "N",
        help_heading = "Performance",
        help = "Number of runtime worker threads."
    )]
    pub workers: Option<usize>,
}
