use crate::error::DashError;
use std::path::Path;

/// Receiver for user-visible messages raised while serving a page.
///
/// Errors are non-fatal; the caller keeps rendering after reporting one.
pub trait Notifier {
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

/// Prints notifications to stderr, inline with the rendered output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn error(&self, message: &str) {
        eprintln!("error: {}", message);
    }

    fn info(&self, message: &str) {
        eprintln!("info: {}", message);
    }
}

/// Print TOON result to stdout.
pub fn print_result(toon_string: &str) {
    print!("{}", toon_string);
}

/// Print error to stderr in the contract format: error: <category>: <message>
pub fn print_error(err: &DashError) {
    eprintln!("error: {}", err);
}

/// Write TOON string to a file.
pub fn write_file(toon_string: &str, path: &Path) -> Result<(), DashError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        return Err(DashError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("parent directory does not exist: {}", parent.display()),
        )));
    }
    std::fs::write(path, toon_string)?;
    Ok(())
}
