// Document I/O for the CLI: stdin or file input (gzip by extension), file or stdout output.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use flate2::read::GzDecoder;
use tracing::debug;

/// Input path meaning "read standard input".
pub const STDIN: &str = "-";

/// Reads the whole document text. `-` reads stdin; a `.gz` extension is decompressed.
pub fn read_document(path: &Path) -> anyhow::Result<String> {
    let mut text = String::new();
    if path.as_os_str() == STDIN {
        io::stdin()
            .read_to_string(&mut text)
            .context("reading standard input")?;
        return Ok(text);
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        debug!(path = %path.display(), "decompressing gzip input");
        GzDecoder::new(BufReader::new(file))
            .read_to_string(&mut text)
            .with_context(|| format!("decompressing {}", path.display()))?;
    } else {
        BufReader::new(file)
            .read_to_string(&mut text)
            .with_context(|| format!("reading {}", path.display()))?;
    }
    Ok(text)
}

/// Writes `contents` to `path`, creating missing parent directories; stdout when `path` is None.
pub fn write_output(path: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    let Some(path) = path else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(contents.as_bytes())?;
        stdout.write_all(b"\n")?;
        return Ok(());
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    debug!(path = %path.display(), bytes = contents.len(), "output written");
    Ok(())
}

/// `<dir>/<stem>.report.json` next to the input; `report.json` for stdin input.
pub fn default_report_path(input: &Path) -> PathBuf {
    if input.as_os_str() == STDIN {
        return PathBuf::from("report.json");
    }
    let mut stem = input.to_path_buf();
    // "capture.json.gz" -> "capture"
    while stem.extension().is_some_and(|e| e == "gz" || e == "json") {
        stem.set_extension("");
    }
    let name = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    stem.with_file_name(format!("{name}.report.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_path_strips_json_and_gz() {
        assert_eq!(
            default_report_path(Path::new("data/capture.json.gz")),
            PathBuf::from("data/capture.report.json")
        );
        assert_eq!(
            default_report_path(Path::new("capture.json")),
            PathBuf::from("capture.report.json")
        );
        assert_eq!(default_report_path(Path::new("-")), PathBuf::from("report.json"));
    }
}
