//! cg-project: loop configuration files and validation.
//!
//! A project file lists closed loops by id. Files are validated on load, and
//! [`build_controller`] turns one loop into a ready-to-enable
//! [`PidController`].

pub mod schema;
pub mod validate;

use std::sync::Arc;

use cg_controls::{Actuator, ControlError, NodeRef, PidController};
use tracing::info;

pub use schema::*;
pub use validate::{ValidationError, validate_project};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),
}

pub fn from_yaml_str(content: &str) -> ProjectResult<ControlProject> {
    let project: ControlProject = serde_yaml::from_str(content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn from_json_str(content: &str) -> ProjectResult<ControlProject> {
    let project: ControlProject = serde_json::from_str(content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<ControlProject> {
    let content = std::fs::read_to_string(path)?;
    let project = from_yaml_str(&content)?;
    info!(path = %path.display(), name = %project.name, loops = project.loops.len(), "loaded project");
    Ok(project)
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<ControlProject> {
    let content = std::fs::read_to_string(path)?;
    let project = from_json_str(&content)?;
    info!(path = %path.display(), name = %project.name, loops = project.loops.len(), "loaded project");
    Ok(project)
}

/// Build a disabled controller for loop `id`.
///
/// The caller supplies the hardware side: the measurement node and the
/// actuator the loop drives.
pub fn build_controller(
    project: &ControlProject,
    id: &str,
    measurement: NodeRef,
    actuator: Arc<dyn Actuator>,
) -> ProjectResult<PidController> {
    let config = project
        .loop_config(id)
        .ok_or_else(|| ValidationError::MissingReference {
            id: id.to_string(),
            context: "loops".to_string(),
        })?;
    let controller = PidController::from_config(&config, measurement, actuator)?;
    Ok(controller)
}
