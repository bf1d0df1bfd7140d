//! Editor configuration and canvas bounds.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::model::Size;

/// Tunables for one editing session. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Arrow-key nudge step; ctrl+arrow moves five grid steps.
    pub grid_size: f64,
    /// Canvas width used when the host supplies no bounds of its own.
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Horizontal room kept free at the right edge so a block is never
    /// dragged fully off-canvas.
    pub block_margin: f64,
    /// Translation applied to pasted blocks.
    pub paste_offset: f64,
    pub default_block_size: Size,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            canvas_width: 800.0,
            canvas_height: 600.0,
            block_margin: 150.0,
            paste_offset: 20.0,
            default_block_size: Size::default(),
        }
    }
}

impl EditorConfig {
    /// Load a JSON configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
        let config: EditorConfig =
            serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path))?;
        if config.grid_size <= 0.0 {
            anyhow::bail!("grid_size must be positive, got {}", config.grid_size);
        }
        Ok(config)
    }
}

/// Source of the current canvas size. The rendering layer owns the real
/// value; the engine only reads it when clamping movement.
pub trait CanvasBounds {
    /// Returns `(width, height)` in model coordinates.
    fn canvas_size(&self) -> (f64, f64);
}

/// A fixed canvas size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasBounds for CanvasSize {
    fn canvas_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

impl CanvasBounds for EditorConfig {
    fn canvas_size(&self) -> (f64, f64) {
        (self.canvas_width, self.canvas_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = EditorConfig::default();
        assert_eq!(c.block_margin, 150.0);
        assert_eq!(c.paste_offset, 20.0);
        assert_eq!(c.canvas_size(), (800.0, 600.0));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"grid_size": 5, "canvas_width": 1024}}"#).unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();
        let c = EditorConfig::load(&path).unwrap();
        assert_eq!(c.grid_size, 5.0);
        assert_eq!(c.canvas_width, 1024.0);
        assert_eq!(c.canvas_height, 600.0);
    }

    #[test]
    fn test_load_rejects_bad_grid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"grid_size": 0}}"#).unwrap();
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).unwrap();
        assert!(EditorConfig::load(&path).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = EditorConfig::load(Utf8Path::new("/nonexistent/flowcanvas.json")).unwrap_err();
        assert!(err.to_string().contains("Open"));
    }
}
