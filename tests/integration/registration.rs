//! `add`, `remove` and `list` against real files, always with `--direct`.

use claude_code_quickstart::scope::project_key;
use claude_code_quickstart::test_utils::TestProject;
use predicates::prelude::*;
use serde_json::Value;
use serial_test::serial;
use std::fs;

use crate::quickstart;

const TOKEN: &str = "GITHUB_PERSONAL_ACCESS_TOKEN=ghp_integration";

#[test]
fn test_add_project_scope_preserves_other_keys() {
    let project = TestProject::new().unwrap();
    project
        .write(
            ".mcp.json",
            r#"{"permissions":{"allow":["Bash(ls)"]},"mcpServers":{"mine":{"command":"node"}}}"#,
        )
        .unwrap();

    quickstart(&project)
        .args(["add", "github", "--direct", "--scope", "project", "--env", TOKEN])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed"));

    let doc = project.read_json(".mcp.json").unwrap();
    assert_eq!(doc["permissions"]["allow"][0], "Bash(ls)");
    assert_eq!(doc["mcpServers"]["mine"]["command"], "node");
    let github = &doc["mcpServers"]["github"];
    assert_eq!(github["command"], "npx");
    assert_eq!(github["args"][1], "@modelcontextprotocol/server-github");
    assert_eq!(github["env"]["GITHUB_PERSONAL_ACCESS_TOKEN"], "ghp_integration");
}

#[test]
fn test_add_sse_server_writes_transport_record() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["add", "cloudflare-bindings", "--direct", "--scope", "project"])
        .assert()
        .success();

    let doc = project.read_json(".mcp.json").unwrap();
    assert_eq!(
        doc["mcpServers"]["cloudflare-bindings"],
        serde_json::json!({"transport": "sse", "url": "https://bindings.mcp.cloudflare.com/sse"})
    );
}

#[cfg(unix)]
#[test]
fn test_add_defaults_to_local_scope() {
    let project = TestProject::new().unwrap();

    quickstart(&project).args(["add", "context7", "--direct"]).assert().success();

    let doc = project.read_json(project.home_dir.join(".claude.json")).unwrap();
    let entry = &doc["projects"][project_key(&project.project_dir)];
    assert_eq!(entry["mcpServers"]["context7"]["command"], "npx");
    assert!(doc.get("mcpServers").is_none());
    assert!(!project.path(".mcp.json").exists());
}

#[cfg(unix)]
#[test]
fn test_add_local_scope_keeps_user_settings_and_other_projects() {
    let project = TestProject::new().unwrap();
    let home_config = project.home_dir.join(".claude.json");
    fs::write(
        &home_config,
        r#"{
            "numStartups": 12,
            "mcpServers": {"global": {"command": "node"}},
            "projects": {"/elsewhere": {"mcpServers": {"other": {"command": "uvx"}}}}
        }"#,
    )
    .unwrap();

    quickstart(&project).args(["add", "playwright", "--direct"]).assert().success();

    let doc = project.read_json(&home_config).unwrap();
    assert_eq!(doc["numStartups"], 12);
    assert_eq!(doc["mcpServers"]["global"]["command"], "node");
    assert_eq!(doc["projects"]["/elsewhere"]["mcpServers"]["other"]["command"], "uvx");
    let entry = &doc["projects"][project_key(&project.project_dir)];
    assert_eq!(entry["mcpServers"]["playwright"]["command"], "npx");
}

#[cfg(unix)]
#[test]
fn test_add_user_scope_writes_home_config() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["add", "brave-search", "--direct", "--scope", "user"])
        .args(["--env", "BRAVE_API_KEY=bsk_test"])
        .assert()
        .success();

    let doc = project.read_json(project.home_dir.join(".claude.json")).unwrap();
    assert_eq!(doc["mcpServers"]["brave-search"]["env"]["BRAVE_API_KEY"], "bsk_test");
}

#[test]
fn test_add_takes_token_from_process_env() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .env("GITHUB_PERSONAL_ACCESS_TOKEN", "ghp_from_env")
        .args(["add", "github", "--direct", "--scope", "project"])
        .assert()
        .success();

    let doc = project.read_json(".mcp.json").unwrap();
    assert_eq!(doc["mcpServers"]["github"]["env"]["GITHUB_PERSONAL_ACCESS_TOKEN"], "ghp_from_env");
}

#[test]
fn test_add_without_required_env_fails() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["add", "github", "--direct", "--scope", "project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_PERSONAL_ACCESS_TOKEN"))
        .stderr(predicate::str::contains("--env NAME=VALUE"));

    assert!(!project.path(".mcp.json").exists());
}

#[test]
fn test_add_rejects_malformed_env_argument() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["add", "github", "--direct", "--env", "NO_EQUALS_SIGN"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
}

#[test]
fn test_add_unknown_key_suggests_closest() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["add", "githb", "--direct"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown MCP server 'githb'"))
        .stderr(predicate::str::contains("Did you mean 'github'?"));
}

#[test]
fn test_add_dry_run_writes_nothing() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["add", "github", "--direct", "--scope", "project", "--dry-run", "--env", TOKEN])
        .assert()
        .success()
        .stdout(predicate::str::contains("would write mcpServers.github"));

    assert!(!project.path(".mcp.json").exists());
    assert!(!project.path(".mcp.json.lock").exists());
}

#[test]
fn test_add_recovers_from_corrupt_config() {
    let project = TestProject::new().unwrap();
    project.write(".mcp.json", "{ this is not json").unwrap();

    quickstart(&project)
        .args(["add", "context7", "--direct", "--scope", "project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("corrupt configuration moved to"));

    let doc = project.read_json(".mcp.json").unwrap();
    assert!(doc["mcpServers"]["context7"].is_object());

    let backups = project.files_with_prefix(&project.project_dir, ".mcp.json.corrupt-").unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "{ this is not json");
}

#[test]
fn test_remove_direct() {
    let project = TestProject::new().unwrap();
    project
        .write(
            ".mcp.json",
            r#"{
                "mcpServers": {"github": {"command": "npx"}, "mine": {"command": "node"}},
                "theme": "dark"
            }"#,
        )
        .unwrap();

    quickstart(&project)
        .args(["remove", "github", "--direct", "--scope", "project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed github"));

    let doc = project.read_json(".mcp.json").unwrap();
    assert!(doc["mcpServers"].get("github").is_none());
    assert_eq!(doc["mcpServers"]["mine"]["command"], "node");
    assert_eq!(doc["theme"], "dark");

    quickstart(&project)
        .args(["remove", "github", "--direct", "--scope", "project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not registered"));
}

#[test]
fn test_list_json_reports_status() {
    let project = TestProject::new().unwrap();
    project
        .write(
            ".mcp.json",
            r#"{"mcpServers":{
                "github":{"command":"npx"},
                "cloudflare-builds":{"command":"npx"},
                "handmade":{"command":"node"}
            }}"#,
        )
        .unwrap();

    let output = quickstart(&project)
        .args(["list", "--scope", "project", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(report["scope"], "project");
    assert_eq!(report["other"], serde_json::json!(["handmade"]));

    let servers = report["servers"].as_array().unwrap();
    let row = |key: &str| servers.iter().find(|s| s["key"] == key).unwrap().clone();
    assert_eq!(row("github")["configured"], true);
    assert_eq!(row("github")["env"][0], "GITHUB_PERSONAL_ACCESS_TOKEN");

    // Present without the SSE marker
    let builds = row("cloudflare-builds");
    assert_eq!(builds["exists"], true);
    assert_eq!(builds["configured"], false);
    assert_eq!(builds["status"], "needs update");

    assert_eq!(row("context7")["exists"], false);
}

#[test]
fn test_settings_file_sets_default_scope_and_mode() {
    let project = TestProject::new().unwrap();
    let settings = project.temp_dir.path().join("settings.toml");
    fs::write(&settings, "default_scope = \"project\"\ndirect = true\n").unwrap();

    quickstart(&project)
        .env("CLAUDE_QUICKSTART_CONFIG", &settings)
        .args(["add", "context7"])
        .assert()
        .success();

    let doc = project.read_json(".mcp.json").unwrap();
    assert!(doc["mcpServers"]["context7"].is_object());
}

#[test]
fn test_invalid_settings_file_is_reported() {
    let project = TestProject::new().unwrap();
    let settings = project.temp_dir.path().join("settings.toml");
    fs::write(&settings, "default_scope = \"galaxy\"\n").unwrap();

    quickstart(&project)
        .arg("--config")
        .arg(&settings)
        .args(["list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid settings file"));
}

#[test]
#[serial]
fn test_concurrent_adds_keep_both_entries() {
    let project = TestProject::new().unwrap();
    let keys = ["context7", "playwright", "cloudflare-bindings", "cloudflare-builds"];

    std::thread::scope(|s| {
        for key in keys {
            let project = &project;
            s.spawn(move || {
                quickstart(project)
                    .args(["add", key, "--direct", "--scope", "project"])
                    .assert()
                    .success();
            });
        }
    });

    let doc = project.read_json(".mcp.json").unwrap();
    let servers = doc["mcpServers"].as_object().unwrap();
    for key in keys {
        assert!(servers.contains_key(key), "missing {key} in {servers:?}");
    }
    // Lock file stays behind, holder record cleared
    let lock = fs::read_to_string(project.path(".mcp.json.lock")).unwrap_or_default();
    assert!(lock.is_empty());
}
