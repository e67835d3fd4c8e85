//! Project validation logic.

use std::collections::HashSet;

use cg_controls::ControlError;

use crate::schema::{ControlProject, LATEST_VERSION};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid loop {id}: {source}")]
    InvalidLoop {
        id: String,
        #[source]
        source: ControlError,
    },
}

pub fn validate_project(project: &ControlProject) -> Result<(), ValidationError> {
    if project.version == 0 || project.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let period = project.default_period_s;
    if !period.is_finite() || period <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: "default_period_s".to_string(),
            value: period.to_string(),
            reason: "must be positive and finite".to_string(),
        });
    }

    let mut loop_ids = HashSet::new();
    for def in &project.loops {
        if def.id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "loops.id".to_string(),
                value: format!("{:?}", def.id),
                reason: "must not be empty".to_string(),
            });
        }
        if !loop_ids.insert(def.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: def.id.clone(),
                context: "loops".to_string(),
            });
        }
        def.to_loop_config(period)
            .validate()
            .map_err(|source| ValidationError::InvalidLoop {
                id: def.id.clone(),
                source,
            })?;
    }

    Ok(())
}
