//! Per-request temporary working copies

use crate::error::Result;
use std::path::Path;
use tempfile::NamedTempFile;

/// Input and output working files for one request.
///
/// Both files are deleted when the workspace is dropped, whichever way
/// the request ends.
pub struct Workspace {
    input: NamedTempFile,
    output: NamedTempFile,
}

impl Workspace {
    /// Create the working files in `dir`, or the system temp directory
    pub fn create(dir: Option<&Path>, file_name: &str) -> Result<Self> {
        let suffix = format!("-{}", sanitize_file_name(file_name));
        let mut input = tempfile::Builder::new();
        input.prefix("pdf-input-").suffix(&suffix);
        let mut output = tempfile::Builder::new();
        output.prefix("pdf-output-").suffix(".pdf");

        let (input, output) = match dir {
            Some(dir) => (input.tempfile_in(dir)?, output.tempfile_in(dir)?),
            None => (input.tempfile()?, output.tempfile()?),
        };

        Ok(Self { input, output })
    }

    pub fn input_path(&self) -> &Path {
        self.input.path()
    }

    pub fn output_path(&self) -> &Path {
        self.output.path()
    }

    /// Replace the input working copy with `data`
    pub async fn write_input(&self, data: &[u8]) -> Result<()> {
        tokio::fs::write(self.input_path(), data).await?;
        Ok(())
    }

    /// Read back the output working copy
    pub async fn read_output(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.output_path()).await?)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        tracing::debug!(
            input = %self.input.path().display(),
            output = %self.output.path().display(),
            "Releasing working copies"
        );
    }
}

/// Keep the original file name recognizable without letting it shape the path
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}
