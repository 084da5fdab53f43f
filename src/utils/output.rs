use crate::core::error::{Outcome, ToolError};
use crate::utils::time::file_date_prefix;
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Where a report goes
#[derive(Debug, Clone, Default)]
pub struct OutputTarget {
    /// Write to this file instead of stdout
    pub file: Option<PathBuf>,
    /// Prefix the file name with `YYYYmmdd_HHMM_`
    pub date_prefix: bool,
}

impl OutputTarget {
    pub fn stdout() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>, date_prefix: bool) -> Self {
        Self {
            file: Some(path.into()),
            date_prefix,
        }
    }

    /// The path that will actually be written, if any
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let file = self.file.as_ref()?;
        if !self.date_prefix {
            return Some(file.clone());
        }

        let base = file.file_name()?.to_string_lossy().into_owned();
        let dated = format!("{}{}", file_date_prefix(Utc::now()), base);
        Some(match file.parent() {
            Some(dir) => dir.join(dated),
            None => PathBuf::from(dated),
        })
    }
}

/// Write lines to the target and return the joined content
pub fn print_content(lines: &[String], target: &OutputTarget) -> Outcome<String> {
    let content = lines.join("\n");

    match target.resolved_path() {
        Some(path) => {
            write_file(&path, &content)?;
            info!(path = %path.display(), lines = lines.len(), "Summary written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{content}").map_err(|e| ToolError::io("<stdout>", e))?;
        }
    }

    Ok(content)
}

fn write_file(path: &Path, content: &str) -> Outcome<()> {
    let mut fd = std::fs::File::create(path).map_err(|e| ToolError::io(path, e))?;
    writeln!(fd, "{content}").map_err(|e| ToolError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        let target = OutputTarget::file(&path, false);

        let content = print_content(&["a".to_string(), "b".to_string()], &target).unwrap();

        assert_eq!(content, "a\nb");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_date_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let target = OutputTarget::file(dir.path().join("out.txt"), true);

        let resolved = target.resolved_path().unwrap();
        let name = resolved.file_name().unwrap().to_string_lossy().into_owned();

        // 20240305_0709_out.txt
        assert_eq!(name.len(), "YYYYmmdd_HHMM_out.txt".len());
        assert!(name.ends_with("_out.txt"));
        assert_eq!(resolved.parent().unwrap(), dir.path());
    }

    #[test]
    fn test_unwritable_file() {
        let target = OutputTarget::file("/nonexistent-dir/x/out.txt", false);
        let err = print_content(&["x".to_string()], &target).unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }

    #[test]
    fn test_stdout_target() {
        assert!(OutputTarget::stdout().resolved_path().is_none());
    }
}
