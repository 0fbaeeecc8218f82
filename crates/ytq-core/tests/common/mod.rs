//! Shared helpers for integration tests: a stand-in `yt-dlp` driven by the video id.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes a fake `yt-dlp` into `dir`.
///
/// Ids starting with `fail` exit 1 with an `ERROR:` line. Every other id gets
/// `<download folder>/<id>.mp4` written and reported on the file marker line.
pub fn fake_yt_dlp(dir: &Path) -> PathBuf {
    let path = dir.join("yt-dlp");
    let script = r#"#!/bin/sh
out_dir=""
prev=""
url=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out_dir=$(dirname "$arg"); fi
  prev="$arg"
  url="$arg"
done
id=${url##*v=}
case "$id" in
  fail*)
    echo "ERROR: [youtube] $id: Video unavailable" >&2
    exit 1
    ;;
esac
mkdir -p "$out_dir"
echo "ytq-progress 512 1024 NA"
printf 'video %s' "$id" > "$out_dir/$id.mp4"
echo "ytq-progress 1024 1024 NA"
echo "ytq-file $out_dir/$id.mp4"
exit 0
"#;
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn watch_urls(ids: &[&str]) -> Vec<String> {
    ids.iter()
        .map(|id| format!("https://youtu.be/{id}"))
        .collect()
}
