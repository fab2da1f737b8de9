use anyhow::{Context, Result};
use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// A throwaway copy of the demo project.
struct DitteauTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl DitteauTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let project_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .context("Workspace root not found")?
            .join("demos/ditteau_project");

        let dest = tmp.path().join("ditteau_project");
        let mut options = fs_extra::dir::CopyOptions::new();
        options.content_only = true;
        std::fs::create_dir_all(&dest)?;
        fs_extra::dir::copy(&project_root, &dest, &options)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        Ok(Self {
            _tmp: tmp,
            root: dest,
        })
    }

    fn ditteau(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ditteau"));
        cmd.current_dir(&self.root);
        cmd.env_remove("DITTEAU_REFERENCE_DATE");
        cmd.env_remove("DITTEAU_ACADEMIC_YEAR_START_MONTH");
        cmd
    }

    fn evaluate(&self, dataset: &str, role: &str, input: &str, extra: &[&str]) -> Result<Value> {
        let output = self
            .ditteau()
            .args(["evaluate", "--dataset", dataset, "--role", role, "--input", input])
            .args(extra)
            .output()?;
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    fn enrollment(&self, role: &str) -> Result<Value> {
        self.evaluate("student_enrollment", role, "data/student_enrollment.json", &[])
    }
}

fn visibility(report: &Value) -> Vec<bool> {
    report["decisions"]
        .as_array()
        .map(|d| d.iter().map(|x| x["visible"] == true).collect())
        .unwrap_or_default()
}

#[test]
fn test_check_accepts_demo_project() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    env.ditteau()
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Datasets: 3"));
    Ok(())
}

#[test]
fn test_check_rejects_cyclic_roles() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    let manifest = env.root.join("ditteau.yaml");
    let yaml = std::fs::read_to_string(&manifest)?.replace(
        "  - name: ANALYST_BASE_ROLE\n",
        "  - name: ANALYST_BASE_ROLE\n    inherits: [DATA_ADMIN_ROLE]\n",
    );
    std::fs::write(&manifest, yaml)?;

    env.ditteau()
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular role inheritance"));
    Ok(())
}

#[test]
fn test_registrar_sees_declared_statuses_with_last_four_ssn() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    let report = env.enrollment("REGISTRAR_ANALYST_ROLE")?;

    assert_eq!(visibility(&report), vec![true, true, false, false]);
    let first = &report["decisions"][0]["row"];
    assert_eq!(first["ssn"], "XXX-XX-6789");
    assert_eq!(first["date_of_birth"], "2000-01-15");
    assert_eq!(first["email"], "jane.doe@ditteau.edu");
    assert!(report["decisions"][2]["row"].is_null());
    Ok(())
}

#[test]
fn test_financial_aid_does_not_see_withdrawn_students() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    let report = env.enrollment("FINANCIAL_AID_ANALYST_ROLE")?;

    assert_eq!(visibility(&report), vec![true, false, false, false]);
    let row = &report["decisions"][0]["row"];
    assert_eq!(row["ssn"], "REDACTED");
    assert!(row["date_of_birth"].is_null());
    assert_eq!(row["email"], "j****@ditteau.edu");
    Ok(())
}

#[test]
fn test_ir_and_engineer_masks() -> Result<()> {
    let env = DitteauTestEnv::new()?;

    let ir = env.enrollment("IR_ANALYST_ROLE")?;
    assert_eq!(ir["decisions"][0]["row"]["date_of_birth"], "2000-01-01");

    let engineer = env.enrollment("DATA_ENGINEER_ROLE")?;
    assert_eq!(engineer["decisions"][0]["row"]["ssn"], "XXX-XX-6789");
    Ok(())
}

#[test]
fn test_admin_sees_everything_unmasked() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    let report = env.enrollment("DATA_ADMIN_ROLE")?;

    assert_eq!(visibility(&report), vec![true; 4]);
    assert_eq!(report["decisions"][3]["row"]["ssn"], "222-33-4444");
    Ok(())
}

#[test]
fn test_unknown_role_is_denied_with_warning() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    let report = env.enrollment("GUEST")?;

    assert_eq!(report["summary"]["visible"], 0);
    assert_eq!(report["warnings"][0]["role"], "GUEST");
    Ok(())
}

#[test]
fn test_reference_date_moves_the_academic_window() -> Result<()> {
    let env = DitteauTestEnv::new()?;

    let flagged = env.evaluate(
        "student_enrollment",
        "REGISTRAR_ANALYST_ROLE",
        "data/student_enrollment.json",
        &["--as-of", "2030-09-01"],
    )?;
    assert_eq!(flagged["as_of"], "2030-09-01");
    assert_eq!(flagged["summary"]["visible"], 0);

    let output = env
        .ditteau()
        .env("DITTEAU_REFERENCE_DATE", "2017-09-01")
        .args([
            "evaluate",
            "-d",
            "student_enrollment",
            "-r",
            "DATA_ENGINEER_ROLE",
            "-i",
            "data/student_enrollment.json",
        ])
        .output()?;
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout)?;
    // Window 2014..=2017: only the 2015-2016 row qualifies
    assert_eq!(visibility(&report), vec![false, false, false, true]);
    Ok(())
}

#[test]
fn test_json_lines_input_and_rounding() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    let report = env.evaluate(
        "financial_aid_award",
        "IR_ANALYST_ROLE",
        "data/financial_aid_award.jsonl",
        &[],
    )?;

    assert_eq!(visibility(&report), vec![true, false, true]);
    assert_eq!(report["decisions"][0]["row"]["award_amount"], 12000);
    assert_eq!(report["decisions"][2]["row"]["award_amount"], -2000);
    Ok(())
}

#[test]
fn test_broken_json_line_is_hidden_and_others_evaluated() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    std::fs::write(
        env.root.join("awards.jsonl"),
        concat!(
            r#"{"student_id": 1001, "aid_year": "2024-2025", "department": "NURSING", "award_amount": 12345}"#,
            "\n",
            r#"{"student_id": 1004, "aid_year": "#,
            "\n",
            r#"{"student_id": 1003, "aid_year": "2023-2024", "department": "BUSINESS", "award_amount": -2750}"#,
            "\n",
        ),
    )?;

    let report = env.evaluate("financial_aid_award", "IR_ANALYST_ROLE", "awards.jsonl", &[])?;
    assert_eq!(visibility(&report), vec![true, false, true]);
    assert_eq!(report["summary"]["errors"], 1);
    assert_eq!(report["decisions"][1]["error"]["kind"], "malformed_row");
    assert_eq!(report["decisions"][2]["row"]["award_amount"], -2000);
    Ok(())
}

#[test]
fn test_malformed_rows_are_hidden() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    std::fs::write(
        env.root.join("bad.json"),
        r#"[{"enrollment_status": "ENROLLED", "academic_year": "2024-2025", "ferpa_consent": "yes",
             "ssn": "1", "date_of_birth": null, "email": null}]"#,
    )?;

    let report = env.evaluate("student_enrollment", "DATA_ADMIN_ROLE", "bad.json", &[])?;
    assert_eq!(report["summary"]["errors"], 1);
    assert_eq!(report["decisions"][0]["visible"], false);
    assert_eq!(report["decisions"][0]["error"]["kind"], "type_mismatch");
    Ok(())
}

#[test]
fn test_output_file_is_written() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    env.ditteau()
        .args([
            "evaluate",
            "-d",
            "student_enrollment",
            "-r",
            "REGISTRAR_ANALYST_ROLE",
            "-i",
            "data/student_enrollment.json",
            "--output",
            "out/decisions.json",
            "--trace",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 visible, 2 hidden, 0 errors"))
        .stderr(predicate::str::contains("mask ssn via ssn_mask"));

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(env.root.join("out/decisions.json"))?)?;
    assert_eq!(saved["dataset"], "student_enrollment");
    assert_eq!(saved["decisions"].as_array().map(Vec::len), Some(4));
    Ok(())
}

#[test]
fn test_inspect_lists_policy_references() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    let output = env
        .ditteau()
        .args(["inspect", "--dataset", "student_enrollment", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let catalog: Value = serde_json::from_slice(&output.stdout)?;
    let refs = catalog["references"].as_array().context("references")?;
    assert_eq!(refs.len(), 6);
    assert!(refs.iter().any(|r| r["policy"] == "ssn_mask" && r["column"] == "ssn"));

    env.ditteau()
        .arg("inspect")
        .assert()
        .success()
        .stdout(predicate::str::contains("ferpa_consent_access"));
    Ok(())
}

#[test]
fn test_audit_check_fails_on_unmasked_sensitive_column() -> Result<()> {
    let env = DitteauTestEnv::new()?;
    env.ditteau().args(["audit", "--check"]).assert().success();

    std::fs::write(
        env.root.join("policies/staff.yml"),
        r#"
datasets:
  - name: staff
    row_access:
      - policy: department_access
        on: department
    columns:
      - name: department
        type: string
      - name: ssn
        type: string
        tags: {pii_type: ssn}
"#,
    )?;

    env.ditteau()
        .args(["audit", "--check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("unmasked_sensitive_column"));
    Ok(())
}
