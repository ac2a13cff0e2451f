//! Loaded experiments for one application session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::aggregate::{load_experiment, ExperimentReport};
use crate::core::settings::AnalysisSettings;
use crate::error::Result;
use crate::registry::LossRegistry;
use crate::ui::Palette;

/// Owns every loaded report, the shared loss registry and the palette.
///
/// Reports live until [`unload`](Session::unload); loading the same path
/// again recomputes everything from the source files.
#[derive(Debug, Default)]
pub struct Session {
    pub settings: AnalysisSettings,
    registry: Arc<LossRegistry>,
    palette: Palette,
    loaded: BTreeMap<PathBuf, ExperimentReport>,
}

impl Session {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Shares `registry` with loaders running outside the session.
    pub fn with_registry(settings: AnalysisSettings, registry: Arc<LossRegistry>) -> Self {
        Self {
            settings,
            registry,
            ..Self::default()
        }
    }

    /// Loads `dir` synchronously and registers its loss counters.
    pub fn load(&mut self, dir: &Path) -> Result<&ExperimentReport> {
        let report = load_experiment(dir, &self.settings)?;
        Ok(self.insert(report))
    }

    /// Adopts a report aggregated elsewhere, replacing an earlier one.
    pub fn insert(&mut self, report: ExperimentReport) -> &ExperimentReport {
        self.registry.record_report(&report);
        let path = report.path.clone();
        if self.loaded.contains_key(&path) {
            log::debug!("reloading {}", path.display());
            self.palette.release(&path);
        }
        self.loaded.insert(path.clone(), report);
        &self.loaded[&path]
    }

    /// Discards the report, its colors and its loss entry.
    pub fn unload(&mut self, dir: &Path) -> Option<ExperimentReport> {
        self.registry.forget(dir);
        self.palette.release(dir);
        self.loaded.remove(dir)
    }

    pub fn get(&self, dir: &Path) -> Option<&ExperimentReport> {
        self.loaded.get(dir)
    }

    pub fn reports(&self) -> impl Iterator<Item = &ExperimentReport> {
        self.loaded.values()
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    pub fn registry(&self) -> &Arc<LossRegistry> {
        &self.registry
    }

    /// Reports and palette together, for rendering.
    pub fn render_parts(&mut self) -> (impl Iterator<Item = &ExperimentReport>, &mut Palette) {
        (self.loaded.values(), &mut self.palette)
    }

    pub fn label_of(&self, dir: &Path) -> String {
        self.loaded
            .get(dir)
            .map(|r| r.label.clone())
            .unwrap_or_else(|| dir.display().to_string())
    }
}
