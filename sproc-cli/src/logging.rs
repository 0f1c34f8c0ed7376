use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// Where `sproc-call` sends its log lines.
///
/// Stdout carries the JSON result, so logs always go to stderr. With `--log` they are also
/// appended to a file, which keeps the history of repeated invocations in one place.
pub(crate) fn log_writer(path: Option<&Path>) -> io::Result<BoxMakeWriter> {
    let Some(path) = path else {
        return Ok(BoxMakeWriter::new(io::stderr));
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BoxMakeWriter::new(io::stderr.and(Mutex::new(file))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_appended_not_truncated() {
        let path = std::env::temp_dir().join(format!("sproc-call-{}.log", std::process::id()));
        std::fs::write(&path, "earlier run\n").unwrap();

        let writer = log_writer(Some(&path)).unwrap();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || tracing::info!("second run"));

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(text.starts_with("earlier run\n"));
        assert!(text.contains("second run"));
    }

    #[test]
    fn missing_directory_is_reported() {
        let path = std::env::temp_dir().join("sproc-call-no-such-dir").join("x.log");
        assert!(log_writer(Some(&path)).is_err());
    }
}
