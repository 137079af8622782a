use assert_cmd::Command;
use predicates::prelude::*;

fn fedcheck() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("fedcheck").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn json_output(args: &[&str]) -> serde_json::Value {
    let output = fedcheck().args(args).output().unwrap();
    assert!(output.status.success(), "exit status {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("valid JSON")
}

// ── Terminal output ──

#[test]
fn aggregate_prints_summary() {
    fedcheck()
        .args(["--no-color", "tests/fixtures/metadata.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary: 3 entities"))
        .stdout(predicate::str::contains("SP privacy 50.0%"));
}

#[test]
fn federation_names_come_from_map() {
    fedcheck()
        .args([
            "--no-color",
            "--federations",
            "tests/fixtures/federations.json",
            "tests/fixtures/metadata.xml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Federation A"))
        .stdout(predicate::str::contains("Federation B"));
}

#[test]
fn unmapped_federations_show_authority() {
    fedcheck()
        .args(["--no-color", "tests/fixtures/metadata.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://federation-a.example"));
}

#[test]
fn verbose_lists_entities() {
    fedcheck()
        .args(["--no-color", "-v", "tests/fixtures/metadata.xml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://wiki.uni-a.example/sp"))
        .stdout(predicate::str::contains("University A"))
        .stdout(predicate::str::contains("College B"));
}

// ── JSON output ──

#[test]
fn json_output_has_global_and_federations() {
    let parsed = json_output(&[
        "--json",
        "--federations",
        "tests/fixtures/federations.json",
        "tests/fixtures/metadata.xml",
    ]);

    let global = &parsed["global"];
    assert_eq!(global["total_entities"], 3);
    assert_eq!(global["total_sps"], 2);
    assert_eq!(global["total_idps"], 1);
    assert_eq!(global["sps_has_privacy"], 1);
    assert_eq!(global["total_has_security"], 2);
    assert_eq!(global["total_has_sirtfi"], 1);
    assert_eq!(global["coverage"]["sp_privacy_pct"], 50.0);
    assert_eq!(parsed["validated"], false);

    let fed_a = &parsed["federations"]["Federation A"];
    assert_eq!(fed_a["total_sps"], 2);
    assert_eq!(fed_a["sps_has_both"], 1);
    assert_eq!(fed_a["sps_missing_both"], 1);
    assert_eq!(parsed["federations"]["Federation B"]["idps_has_security"], 1);
    assert!(parsed.get("entities").is_none());
}

#[test]
fn json_verbose_includes_rows() {
    let parsed = json_output(&["--json", "-v", "tests/fixtures/metadata.xml"]);
    let rows = parsed["entities"].as_array().expect("entities array");
    assert_eq!(rows.len(), 3);

    let idp = rows
        .iter()
        .find(|r| r["entity_id"] == "https://idp.college-b.example/idp/shibboleth")
        .unwrap();
    assert_eq!(idp["role"], "IdP");
    assert_eq!(idp["privacy"], "n/a");
    assert_eq!(idp["security"], "yes");

    // Only an OrganizationName, no display name.
    let wiki = rows
        .iter()
        .find(|r| r["entity_id"] == "https://wiki.uni-a.example/sp")
        .unwrap();
    assert_eq!(wiki["org_name"], "Unknown");
    assert_eq!(wiki["privacy"], "no");
}

// ── Validation ──

#[test]
fn validation_counts_invalid_urls_as_broken() {
    let parsed = json_output(&["--json", "--validate", "tests/fixtures/invalid_urls.xml"]);
    assert_eq!(parsed["validated"], true);
    assert_eq!(parsed["global"]["urls_checked"], 2);
    assert_eq!(parsed["global"]["urls_accessible"], 0);
    assert_eq!(parsed["global"]["urls_broken"], 2);
}

#[test]
fn validation_writes_cache_file() {
    let cache = std::env::temp_dir().join(format!("fedcheck-it-cache-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&cache);

    fedcheck()
        .args(["--no-color", "--validate", "--cache"])
        .arg(&cache)
        .arg("tests/fixtures/invalid_urls.xml")
        .assert()
        .success();

    let contents = std::fs::read_to_string(&cache).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed["not a url"]["error"], "Invalid URL format");
    assert!(parsed["not a url"].get("from_cache").is_none());

    let _ = std::fs::remove_file(&cache);
}

#[test]
fn check_urls_reports_each_input() {
    let output = fedcheck()
        .args(["check-urls", "--json", "not a url", ""])
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["not a url"]["accessible"], false);
    assert_eq!(parsed[""]["error"], "Empty URL");
}

// ── Exit codes ──

#[test]
fn fail_under_threshold_exits_one() {
    fedcheck()
        .args(["--no-color", "--fail-under", "60", "tests/fixtures/metadata.xml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("below 60.0%"));
}

#[test]
fn fail_under_met_exits_zero() {
    fedcheck()
        .args(["--no-color", "--fail-under", "50", "tests/fixtures/metadata.xml"])
        .assert()
        .success();
}

#[test]
fn fail_under_skipped_without_sps() {
    fedcheck()
        .args(["--no-color", "--fail-under", "90", "tests/fixtures/idp_only.xml"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not applied"));
}

#[test]
fn missing_file_exits_two() {
    fedcheck()
        .arg("tests/fixtures/does-not-exist.xml")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn malformed_xml_exits_two() {
    fedcheck()
        .arg("tests/fixtures/malformed.xml")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("XML parse error"));
}

#[test]
fn invalid_federation_map_exits_two() {
    fedcheck()
        .args([
            "--federations",
            "tests/fixtures/malformed.xml",
            "tests/fixtures/metadata.xml",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid federation map"));
}

// ── Completions ──

#[test]
fn completions_bash() {
    fedcheck()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fedcheck"));
}
