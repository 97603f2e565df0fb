use std::path::PathBuf;
use std::process::Command;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn tabula() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tabula"))
}

fn fixture(name: &str) -> String {
    fixtures_dir().join(name).to_string_lossy().into_owned()
}

// -------------------------------------------------------------------------
// build
// -------------------------------------------------------------------------

#[test]
fn build_text_table() {
    let out = tabula()
        .args(["build", "--data", &fixture("demo.csv"), "--config", &fixture("table.toml")])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("Baseline characteristics"));
    // arm A ages 40/50/60/70
    assert!(stdout.contains("55.0 (12.9)"), "stdout:\n{stdout}");
    // arm B sex: 3 of 4 are F
    assert!(stdout.contains("3 (75.0%)"));
    assert!(stdout.contains("p-value"));
    // one bmi value is NA in arm A
    assert!(stdout.contains("Missing"));
    assert!(stdout.contains("Ages in years."));

    // build summary goes to stderr
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("populated cells"), "stderr:\n{stderr}");
}

#[test]
fn quiet_suppresses_build_summary() {
    let out = tabula()
        .args([
            "build",
            "--data",
            &fixture("demo.csv"),
            "--config",
            &fixture("table.toml"),
            "--quiet",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(out.stderr.is_empty(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
}

#[test]
fn html_and_latex_carry_the_same_values() {
    let run = |format: &str| -> String {
        let out = tabula()
            .args([
                "build",
                "--data",
                &fixture("demo.csv"),
                "--config",
                &fixture("table.toml"),
                "--format",
                format,
                "--quiet",
            ])
            .output()
            .unwrap();
        assert!(out.status.success(), "{format} failed");
        String::from_utf8(out.stdout).unwrap()
    };

    let html = run("html");
    assert!(html.contains("<table>"));
    assert!(html.contains("<caption>Baseline characteristics</caption>"));
    assert!(html.contains("55.0 (12.9)"));

    let latex = run("latex");
    assert!(latex.contains("\\begin{tabular}"));
    assert!(latex.contains("55.0 (12.9)"));
    assert!(latex.contains("3 (75.0\\%)"));
}

#[test]
fn build_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("table.txt");
    let out = tabula()
        .args([
            "build",
            "--data",
            &fixture("demo.csv"),
            "--config",
            &fixture("table.toml"),
            "-o",
            &out_path.to_string_lossy(),
            "--quiet",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    let written = std::fs::read_to_string(&out_path).unwrap();
    assert!(written.contains("55.0 (12.9)"));
}

// -------------------------------------------------------------------------
// failure modes
// -------------------------------------------------------------------------

#[test]
fn unknown_variable_fails_with_build_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("bad.toml");
    std::fs::write(
        &config_path,
        "[table]\ngroup = [\"treatment\"]\nvariables = [\"weight\"]\n",
    )
    .unwrap();

    let out = tabula()
        .args([
            "build",
            "--data",
            &fixture("demo.csv"),
            "--config",
            &config_path.to_string_lossy(),
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("'weight' not found"), "stderr:\n{stderr}");
}

#[test]
fn missing_data_file_is_an_io_error() {
    let out = tabula()
        .args(["build", "--data", "no-such.csv", "--config", &fixture("table.toml")])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn malformed_config_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("broken.toml");
    std::fs::write(&config_path, "[table\nvariables = [").unwrap();

    let out = tabula()
        .args([
            "build",
            "--data",
            &fixture("demo.csv"),
            "--config",
            &config_path.to_string_lossy(),
        ])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn missing_required_arg_is_a_usage_error() {
    let out = tabula().args(["build", "--data", &fixture("demo.csv")]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
}

// -------------------------------------------------------------------------
// inspect
// -------------------------------------------------------------------------

#[test]
fn inspect_reports_classification_and_missingness() {
    let out = tabula()
        .args(["inspect", "--data", &fixture("demo.csv"), "--threshold", "5"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("8 rows"));
    assert!(stdout.contains("age: continuous, 8 distinct, 0 missing"));
    assert!(stdout.contains("sex: categorical, 2 distinct, 0 missing"));
    assert!(stdout.contains("bmi: continuous, 7 distinct, 1 missing"));
}
