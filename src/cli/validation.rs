use crate::cli::args::CliArgs;
use crate::filter::TypeField;
use crate::output::{infer_format_from_path, ExportFormat};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(size) = args.page_size {
        if size == 0 {
            return Err("invalid page-size, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive number of seconds".to_string());
        }
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err("invalid workers, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.type_field.as_deref() {
        TypeField::parse(raw)
            .ok_or_else(|| format!("invalid --type-field '{raw}', expected message_type or type"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        ExportFormat::parse(raw)
            .ok_or_else(|| format!("invalid --output-format '{raw}', expected csv, json or txt"))?;
    }
    if let Some(path) = args.output.as_deref() {
        if args.output_format.is_none() && infer_format_from_path(path).is_none() {
            return Err(format!(
                "cannot infer export format from '{path}', pass --output-format"
            ));
        }
    }
    if args.date.is_some() && (args.start_date.is_some() || args.end_date.is_some()) {
        return Err("--date cannot be combined with --start-date/--end-date".to_string());
    }
    Ok(())
}
