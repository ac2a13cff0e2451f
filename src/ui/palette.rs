//! Session-scoped series colors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use plotters::style::RGBColor;

use crate::aggregate::MetricKey;

const DEFAULT_COLORS: [RGBColor; 8] = [
    RGBColor(0, 0, 255),
    RGBColor(128, 128, 0),
    RGBColor(128, 0, 0),
    RGBColor(255, 0, 0),
    RGBColor(0, 128, 128),
    RGBColor(128, 0, 128),
    RGBColor(0, 128, 0),
    RGBColor(255, 128, 0),
];

/// Hands out one color per `(experiment, metric)`, stable on repeat
/// requests, cycling once every color is taken.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<RGBColor>,
    next: usize,
    assigned: HashMap<(PathBuf, MetricKey), RGBColor>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(DEFAULT_COLORS.to_vec())
    }
}

impl Palette {
    /// An empty `colors` falls back to the default set.
    pub fn new(colors: Vec<RGBColor>) -> Self {
        let colors = if colors.is_empty() { DEFAULT_COLORS.to_vec() } else { colors };
        Self {
            colors,
            next: 0,
            assigned: HashMap::new(),
        }
    }

    pub fn color_for(&mut self, experiment: &Path, metric: MetricKey) -> RGBColor {
        let key = (experiment.to_path_buf(), metric);
        if let Some(&color) = self.assigned.get(&key) {
            return color;
        }
        let color = self.colors[self.next % self.colors.len()];
        self.next += 1;
        self.assigned.insert(key, color);
        color
    }

    /// Drops every assignment of `experiment`; the cycle position is kept.
    pub fn release(&mut self, experiment: &Path) {
        self.assigned.retain(|(path, _), _| path != experiment);
    }

    pub fn assigned(&self) -> usize {
        self.assigned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_per_key_and_wraps() {
        let mut palette = Palette::new(vec![RGBColor(1, 1, 1), RGBColor(2, 2, 2)]);
        let a = palette.color_for(Path::new("a"), MetricKey::Rtt);
        let b = palette.color_for(Path::new("b"), MetricKey::Rtt);
        let c = palette.color_for(Path::new("a"), MetricKey::Cwnd);

        assert_eq!(palette.color_for(Path::new("a"), MetricKey::Rtt), a);
        assert_ne!(a, b);
        assert_eq!(c, a);
        assert_eq!(palette.assigned(), 3);

        palette.release(Path::new("a"));
        assert_eq!(palette.assigned(), 1);
    }

    #[test]
    fn separate_palettes_do_not_share_state() {
        let mut first = Palette::default();
        let mut second = Palette::default();
        first.color_for(Path::new("x"), MetricKey::Rtt);
        assert_eq!(second.color_for(Path::new("y"), MetricKey::Rtt), DEFAULT_COLORS[0]);
    }
}
