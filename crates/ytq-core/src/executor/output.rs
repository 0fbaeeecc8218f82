//! Line classification for yt-dlp stdout/stderr.

use std::path::PathBuf;

use super::args::{FILE_MARKER, PROGRESS_MARKER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Progress { bytes_done: u64, total_bytes: Option<u64> },
    Warning(String),
    Error(String),
    OutputFile(PathBuf),
    Other,
}

/// yt-dlp prints `NA` for unknown fields and floats for estimates.
fn parse_bytes(field: Option<&str>) -> Option<u64> {
    let field = field?.trim();
    if let Ok(n) = field.parse::<u64>() {
        return Some(n);
    }
    field
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
}

pub fn classify(line: &str) -> OutputLine {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        let mut fields = rest.split_whitespace();
        let done = parse_bytes(fields.next());
        let total = parse_bytes(fields.next());
        let estimate = parse_bytes(fields.next());
        return match done {
            Some(bytes_done) => OutputLine::Progress {
                bytes_done,
                total_bytes: total.or(estimate),
            },
            None => OutputLine::Other,
        };
    }
    if let Some(rest) = line.strip_prefix(FILE_MARKER) {
        let path = rest.trim();
        if path.is_empty() || path == "NA" {
            return OutputLine::Other;
        }
        return OutputLine::OutputFile(PathBuf::from(path));
    }
    if let Some(rest) = line.strip_prefix("WARNING:") {
        return OutputLine::Warning(rest.trim().to_string());
    }
    if line.starts_with("ERROR:") {
        return OutputLine::Error(line.trim().to_string());
    }
    OutputLine::Other
}
