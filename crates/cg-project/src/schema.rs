//! Loop configuration file schema.

use cg_controls::{DEFAULT_PERIOD_S, InputRange, LoopConfig, PidGains, ToleranceConfig};
use serde::{Deserialize, Serialize};

/// Schema version written by this crate.
pub const LATEST_VERSION: u32 = 1;

fn default_period_s() -> f64 {
    DEFAULT_PERIOD_S
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlProject {
    pub version: u32,
    pub name: String,
    /// Sample period for loops that do not set their own.
    #[serde(default = "default_period_s")]
    pub default_period_s: f64,
    #[serde(default)]
    pub loops: Vec<LoopDef>,
}

impl ControlProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: LATEST_VERSION,
            name: name.into(),
            default_period_s: DEFAULT_PERIOD_S,
            loops: Vec::new(),
        }
    }

    pub fn loop_def(&self, id: &str) -> Option<&LoopDef> {
        self.loops.iter().find(|l| l.id == id)
    }

    /// Resolved configuration for loop `id`, with project defaults applied.
    pub fn loop_config(&self, id: &str) -> Option<LoopConfig> {
        self.loop_def(id)
            .map(|l| l.to_loop_config(self.default_period_s))
    }
}

/// One closed loop as written in a project file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoopDef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub gains: PidGains,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub izone: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_range: Option<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_range: Option<InputRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<ToleranceConfig>,
}

impl LoopDef {
    pub fn new(id: impl Into<String>, gains: PidGains) -> Self {
        Self {
            id: id.into(),
            name: None,
            gains,
            period_s: None,
            izone: None,
            output_range: None,
            input_range: None,
            tolerance: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn to_loop_config(&self, default_period_s: f64) -> LoopConfig {
        let mut config = LoopConfig::new(self.gains);
        config.period_s = self.period_s.unwrap_or(default_period_s);
        config.izone = self.izone;
        if let Some(range) = self.output_range {
            config.output_range = range;
        }
        config.input_range = self.input_range;
        config.tolerance = self.tolerance;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_falls_back_to_project_period() {
        let mut project = ControlProject::new("arm");
        project.default_period_s = 0.02;
        project.loops.push(LoopDef::new("shoulder", PidGains::new(1.0, 0.0, 0.0)));
        let mut wrist = LoopDef::new("wrist", PidGains::new(2.0, 0.1, 0.0));
        wrist.period_s = Some(0.01);
        wrist.output_range = Some((-0.5, 0.5));
        project.loops.push(wrist);

        let shoulder = project.loop_config("shoulder").unwrap();
        assert_eq!(shoulder.period_s, 0.02);
        assert_eq!(shoulder.output_range, (-1.0, 1.0));

        let wrist = project.loop_config("wrist").unwrap();
        assert_eq!(wrist.period_s, 0.01);
        assert_eq!(wrist.output_range, (-0.5, 0.5));

        assert!(project.loop_config("elbow").is_none());
    }

    #[test]
    fn display_name_defaults_to_id() {
        let mut def = LoopDef::new("lift", PidGains::new(1.0, 0.0, 0.0));
        assert_eq!(def.display_name(), "lift");
        def.name = Some("Lift height".to_string());
        assert_eq!(def.display_name(), "Lift height");
    }
}
