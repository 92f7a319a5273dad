//! Rendering of heatmap points.
//!
//! The pipeline hands the complete current point list to a [`Renderer`]
//! whenever it changes meaningfully. Calls are idempotent: each one replaces
//! whatever was drawn before.

pub mod generator;

pub use generator::OutputFormat;

use crate::error::{Result, StarheatError};
use crate::models::Point;
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether a render shows intermediate progress or the converged result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Partial,
    Final,
}

pub trait Renderer {
    /// Replace the drawn data with `points`.
    fn set_data(&mut self, points: &[Point], stage: RenderStage) -> Result<()>;
}

/// Writes the point list to a file in the chosen format.
pub struct HeatmapFile {
    path: PathBuf,
    format: OutputFormat,
    renders: usize,
}

impl HeatmapFile {
    pub fn new(path: PathBuf, format: OutputFormat) -> Self {
        Self {
            path,
            format,
            renders: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the file has been written.
    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl Renderer for HeatmapFile {
    fn set_data(&mut self, points: &[Point], stage: RenderStage) -> Result<()> {
        let content = self.format.render(points, Utc::now());
        write_atomic(&self.path, content.as_bytes())?;
        self.renders += 1;
        debug!(
            "Rendered {} points to {} ({:?})",
            points.len(),
            self.path.display(),
            stage
        );
        Ok(())
    }
}

/// Replace `path` with `contents` via a temporary file in the same directory.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.persist(path).map_err(|e| StarheatError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heatmap_file_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.csv");
        let mut renderer = HeatmapFile::new(path.clone(), OutputFormat::Csv);

        let point = Point {
            latitude: 1.0,
            longitude: 2.0,
        };
        renderer.set_data(&[point], RenderStage::Partial).unwrap();
        renderer.set_data(&[point, point], RenderStage::Final).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 3);
        assert_eq!(renderer.renders(), 2);
    }
}
