use std::process::exit;

fn main() {
    if let Err(err) = nativelog::app::run_cli() {
        eprintln!("{err}");
        exit(1);
    }
}
