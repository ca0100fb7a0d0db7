use rat_inputs_core::domain::{Calculation, LayerModel};
use rat_inputs_core::project::{Contrast, Data, Layer, Parameter, Project};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rat-inputs"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("rat-inputs binary should run")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are valid UTF-8")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent directory should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn read_json(path: &Path) -> Value {
    let content = fs::read_to_string(path).expect("output should exist");
    serde_json::from_str(&content).expect("output should be valid JSON")
}

fn sample_project() -> Project {
    let mut project = Project::new(Calculation::Normal, LayerModel::StandardLayers).with_data(vec![
        Data::new("Simulation", Vec::new()),
        Data::new("Sample", vec![vec![0.01, 1.0, 0.1], vec![0.02, 0.5, 0.05]]),
    ]);
    project.parameters.extend([
        Parameter::new("Oxide Thickness").with_bounds(5.0, 15.0, 30.0).fitted(),
        Parameter::new("Oxide SLD").with_bounds(3e-6, 3.41e-6, 4e-6),
        Parameter::new("Oxide Roughness").with_bounds(1.0, 3.0, 6.0),
    ]);
    project.layers.push(Layer::new(
        "Oxide",
        "Oxide Thickness",
        "Oxide SLD",
        "Oxide Roughness",
    ));
    project
        .contrasts
        .push(Contrast::new("D2O", "Sample", vec!["Oxide".into()]));
    project
}

fn write_project(temp: &TempDir, project: &Project) -> std::path::PathBuf {
    let path = temp.path().join("project.json");
    write_file(
        &path,
        &serde_json::to_string_pretty(project).expect("project should serialize"),
    );
    path
}

fn assert_failure(output: &Output, exit_code: i32, placeholder: &str) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(exit_code), "stderr: {stderr}");
    assert!(
        stderr.contains(&format!("ERROR: [{placeholder}]")),
        "stderr should name {placeholder}: {stderr}"
    );
    assert!(
        stderr.contains(&format!("FATAL EXIT CODE: {exit_code}")),
        "stderr should carry the exit line: {stderr}"
    );
}

#[test]
fn make_input_writes_all_five_outputs() {
    let temp = TempDir::new().expect("tempdir should be created");
    let project = write_project(&temp, &sample_project());
    let out = temp.path().join("inputs");

    let output = run_cli(&[
        "make-input",
        "--project",
        path_arg(&project),
        "--out",
        path_arg(&out),
    ]);
    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 contrast(s)"));

    for name in [
        "problem.json",
        "limits.json",
        "priors.json",
        "checks.json",
        "controls.json",
    ] {
        assert!(out.join(name).is_file(), "{name} should be written");
    }

    let problem = read_json(&out.join("problem.json"));
    assert_eq!(problem["TF"], json!("normal"));
    assert_eq!(problem["numberOfContrasts"], json!(1));
    assert_eq!(problem["contrastLayers"], json!([[1]]));
    assert_eq!(
        problem["layersDetails"][0],
        json!({ "thickness": 2, "sld": 3, "roughness": 4, "hydration": null, "hydrateWith": 2 })
    );
    assert_eq!(problem["fitParams"], json!([3.0, 15.0]));

    let checks = read_json(&out.join("checks.json"));
    assert_eq!(checks["params"], json!([1, 1, 0, 0]));

    let controls = read_json(&out.join("controls.json"));
    assert_eq!(controls["procedure"], json!("calculate"));
    assert_eq!(controls["strategy"], json!(4));

    let priors = read_json(&out.join("priors.json"));
    assert_eq!(priors["priorValues"][0][2], json!("inf"));

    let check = run_cli(&["check", "--problem", path_arg(&out.join("problem.json"))]);
    assert!(
        check.status.success(),
        "stored problem should pass, stderr: {}",
        String::from_utf8_lossy(&check.stderr)
    );
}

#[test]
fn make_input_applies_controls_file() {
    let temp = TempDir::new().expect("tempdir should be created");
    let project = write_project(&temp, &sample_project());
    let controls = temp.path().join("controls.json");
    write_file(
        &controls,
        r#"{ "procedure": "de", "populationSize": 40, "strategy": 2 }"#,
    );
    let out = temp.path().join("inputs");

    let output = run_cli(&[
        "make-input",
        "--project",
        path_arg(&project),
        "--controls",
        path_arg(&controls),
        "--out",
        path_arg(&out),
    ]);
    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let written = read_json(&out.join("controls.json"));
    assert_eq!(written["procedure"], json!("de"));
    assert_eq!(written["populationSize"], json!(40));
    assert_eq!(written["strategy"], json!(2));
    assert_eq!(written["nLive"], json!(150));
}

#[test]
fn options_of_another_procedure_are_rejected() {
    let temp = TempDir::new().expect("tempdir should be created");
    let project = write_project(&temp, &sample_project());
    let controls = temp.path().join("controls.json");
    write_file(&controls, r#"{ "procedure": "simplex", "nLive": 10 }"#);

    let output = run_cli(&[
        "make-input",
        "--project",
        path_arg(&project),
        "--controls",
        path_arg(&controls),
        "--out",
        path_arg(&temp.path().join("inputs")),
    ]);
    assert_failure(&output, 2, "CONTROLS.NOT_APPLICABLE");
    assert!(!temp.path().join("inputs/problem.json").exists());
}

#[test]
fn unknown_names_fail_with_input_validation_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut project = sample_project();
    project.contrasts[0].scalefactor = "Scalefactor 2".to_string();
    let project = write_project(&temp, &project);

    let output = run_cli(&["make-input", "--project", path_arg(&project)]);
    assert_failure(&output, 2, "PROJECT.UNKNOWN_NAME");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Scalefactor 2"));
}

#[test]
fn check_reports_out_of_range_indices() {
    let temp = TempDir::new().expect("tempdir should be created");
    let project = write_project(&temp, &sample_project());
    let out = temp.path().join("inputs");
    let output = run_cli(&[
        "make-input",
        "--project",
        path_arg(&project),
        "--out",
        path_arg(&out),
    ]);
    assert!(output.status.success());

    let problem_path = out.join("problem.json");
    let mut problem = read_json(&problem_path);
    problem["contrastBulkIns"] = json!([2]);
    write_file(
        &problem_path,
        &serde_json::to_string_pretty(&problem).expect("problem should serialize"),
    );

    let output = run_cli(&["check", "--problem", path_arg(&problem_path)]);
    assert_failure(&output, 3, "INDEX.CONTRAST_BULK_INS");
    assert!(String::from_utf8_lossy(&output.stderr).contains(
        "The problem field \"contrastBulkIns\" contains: 2, which lies outside of the range of \"bulkIns\""
    ));
}

#[test]
fn append_background_prints_joined_matrix() {
    let temp = TempDir::new().expect("tempdir should be created");
    let data = temp.path().join("data.json");
    let background = temp.path().join("background.json");
    write_file(&data, "[[1, 2, 3], [4, 5, 6]]");
    write_file(&background, "[[1, 10, 11], [4, 12, 13]]");

    let output = run_cli(&[
        "append-background",
        "--data",
        path_arg(&data),
        "--background",
        path_arg(&background),
    ]);
    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let joined: Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a JSON matrix");
    assert_eq!(
        joined,
        json!([
            [1.0, 2.0, 3.0, 0.0, 10.0, 11.0],
            [4.0, 5.0, 6.0, 0.0, 12.0, 13.0]
        ])
    );
}

#[test]
fn append_background_rejects_mismatched_q() {
    let temp = TempDir::new().expect("tempdir should be created");
    let data = temp.path().join("data.json");
    let background = temp.path().join("background.json");
    write_file(&data, "[[1, 2, 3], [4, 5, 6], [7, 8, 9]]");
    write_file(&background, "[[56, 10, 11], [41, 12, 13], [7, 14, 15]]");

    let output = run_cli(&[
        "append-background",
        "--data",
        path_arg(&data),
        "--background",
        path_arg(&background),
    ]);
    assert_failure(&output, 4, "BACKGROUND.Q_MISMATCH");
    assert!(String::from_utf8_lossy(&output.stderr)
        .contains("The q-values of the data and background must be equal."));
}

#[test]
fn missing_and_malformed_inputs_are_reported() {
    let temp = TempDir::new().expect("tempdir should be created");

    let output = run_cli(&[
        "make-input",
        "--project",
        path_arg(&temp.path().join("missing.json")),
    ]);
    assert_failure(&output, 6, "IO.READ_INPUT");

    let broken = temp.path().join("broken.json");
    write_file(&broken, "{ \"name\": ");
    let output = run_cli(&["check", "--problem", path_arg(&broken)]);
    assert_failure(&output, 2, "INPUT.PROBLEM_PARSE");
}

#[test]
fn usage_errors_and_help() {
    let output = run_cli(&["make-input"]);
    assert_failure(&output, 2, "INPUT.CLI_USAGE");

    let output = run_cli(&["--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("make-input"));
}
