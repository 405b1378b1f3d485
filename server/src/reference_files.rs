//! Local reference source files offered to the model as context

use std::path::Path;

use tokio::fs;

/// One reference file, read verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFile {
    pub filename: String,
    pub content: String,
}

/// Read every `*.{extension}` file directly inside `dir`, ordered by name.
///
/// A missing directory yields no files; unreadable files are skipped with a
/// warning.
pub async fn scan(dir: &Path, extension: &str) -> Vec<ReferenceFile> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Reference directory {} not readable: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                log::warn!("Error listing {}: {}", dir.display(), e);
                break;
            }
        };

        let path = entry.path();
        let matches = path.extension().and_then(|e| e.to_str()) == Some(extension);
        if !matches || !path.is_file() {
            continue;
        }

        let filename = entry.file_name().to_string_lossy().into_owned();
        match fs::read_to_string(&path).await {
            Ok(content) => files.push(ReferenceFile { filename, content }),
            Err(e) => log::warn!("Error reading reference file '{}': {}", path.display(), e),
        }
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    files
}

/// Create the reference directory at startup if it is missing
pub async fn ensure_dir(dir: &Path) {
    if dir.exists() {
        return;
    }
    match fs::create_dir_all(dir).await {
        Ok(()) => log::info!("Created directory '{}' for reference files", dir.display()),
        Err(e) => log::error!(
            "Error creating directory '{}': {}. Please create it manually.",
            dir.display(),
            e
        ),
    }
}
