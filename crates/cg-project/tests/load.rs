use std::sync::Arc;

use cg_controls::{Constant, Node, RefInput};
use cg_project::{
    ProjectError, ValidationError, build_controller, from_json_str, from_yaml_str, load_yaml,
};

const ARM_YAML: &str = r#"
version: 1
name: Arm
default_period_s: 0.02
loops:
  - id: shoulder
    name: Shoulder angle
    gains: { kp: 0.5, ki: 0.0, kd: 0.0 }
    output_range: [-0.25, 0.25]
  - id: turret
    gains: { kp: 0.01, ki: 0.0, kd: 0.0, kff: 0.1 }
    period_s: 0.01
    input_range: { min: 0.0, max: 360.0, continuous: true }
    tolerance: { error: 2.0 }
"#;

#[test]
fn yaml_project_resolves_defaults() {
    let project = from_yaml_str(ARM_YAML).unwrap();
    assert_eq!(project.name, "Arm");
    assert_eq!(project.loops.len(), 2);

    let shoulder = project.loop_config("shoulder").unwrap();
    assert_eq!(shoulder.period_s, 0.02);
    assert_eq!(shoulder.output_range, (-0.25, 0.25));
    assert_eq!(project.loop_def("shoulder").unwrap().display_name(), "Shoulder angle");

    let turret = project.loop_config("turret").unwrap();
    assert_eq!(turret.period_s, 0.01);
    assert_eq!(turret.gains.kff, Some(0.1));
    let tol = turret.tolerance.unwrap();
    assert!(tol.delta.is_none());
    assert_eq!(tol.delta_or_inf(), f64::INFINITY);
}

#[test]
fn json_project_loads() {
    let json = r#"{
        "version": 1,
        "name": "Lift",
        "loops": [{ "id": "height", "gains": { "kp": 1.0, "ki": 0.2, "kd": 0.0 } }]
    }"#;
    let project = from_json_str(json).unwrap();
    assert_eq!(project.default_period_s, 0.05);
    assert_eq!(project.loop_config("height").unwrap().period_s, 0.05);
}

#[test]
fn load_yaml_reads_from_disk() {
    let path = std::env::temp_dir().join(format!("cg-project-{}.yaml", std::process::id()));
    std::fs::write(&path, ARM_YAML).unwrap();
    let project = load_yaml(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(project.loops[1].id, "turret");
}

#[test]
fn missing_file_is_io_error() {
    let err = load_yaml(std::path::Path::new("/nonexistent/cg-project.yaml")).unwrap_err();
    assert!(matches!(err, ProjectError::Io(_)));
}

#[test]
fn malformed_yaml_is_yaml_error() {
    let err = from_yaml_str("version: [").unwrap_err();
    assert!(matches!(err, ProjectError::Yaml(_)));
}

#[test]
fn invalid_loop_fails_validation() {
    let yaml = r#"
version: 1
name: Bad
loops:
  - id: x
    gains: { kp: 1.0, ki: 0.0, kd: 0.0 }
    input_range: { min: 10.0, max: 10.0, continuous: false }
"#;
    let err = from_yaml_str(yaml).unwrap_err();
    assert!(matches!(
        err,
        ProjectError::Validation(ValidationError::InvalidLoop { .. })
    ));
}

#[test]
fn builds_controller_from_loop() {
    let project = from_yaml_str(ARM_YAML).unwrap();
    let writes = Arc::new(support::Recorder::default());
    let sink = writes.clone();
    let controller = build_controller(
        &project,
        "shoulder",
        Arc::new(Constant::new(0.0)),
        Arc::new(move |u: f64| sink.push(u)),
    )
    .unwrap();

    controller.set_setpoint(2.0);
    controller.output().tick();
    // 0.5 * 2.0 = 1.0, clamped to the configured output range.
    assert_eq!(writes.last(), Some(0.25));
    assert!(!controller.is_enabled());
}

#[test]
fn continuous_loop_wraps_error() {
    let project = from_yaml_str(ARM_YAML).unwrap();
    let heading = Arc::new(RefInput::new(350.0));
    let controller =
        build_controller(&project, "turret", heading.clone(), Arc::new(|_u: f64| {})).unwrap();

    controller.set_setpoint(0.0);
    // Raw error is -350; the PID acts on the wrapped +10.
    let u = controller.pid().output();
    assert!((u - 0.1).abs() < 1e-9);
    assert!((controller.error() + 350.0).abs() < 1e-9);
}

#[test]
fn unknown_loop_is_missing_reference() {
    let project = from_yaml_str(ARM_YAML).unwrap();
    let err = build_controller(
        &project,
        "elbow",
        Arc::new(Constant::new(0.0)),
        Arc::new(|_u: f64| {}),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ProjectError::Validation(ValidationError::MissingReference { .. })
    ));
}

mod support {
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Recorder(Mutex<Vec<f64>>);

    impl Recorder {
        pub fn push(&self, u: f64) {
            self.0.lock().unwrap().push(u);
        }

        pub fn last(&self) -> Option<f64> {
            self.0.lock().unwrap().last().copied()
        }
    }
}
