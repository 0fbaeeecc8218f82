//! Video id extraction from URL path forms.

const ID_PREFIXES: &[&str] = &["shorts", "embed", "live", "v", "e"];

/// Extracts the id from paths like `/shorts/<id>` or `/embed/<id>`.
///
/// Returns `None` for any other path shape. The id itself is not validated here.
pub fn video_id_from_path(path: &str) -> Option<String> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let prefix = segments.next()?;
    if !ID_PREFIXES.contains(&prefix) {
        return None;
    }
    segments.next().map(str::to_string)
}
