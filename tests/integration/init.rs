use claude_code_quickstart::test_utils::TestProject;
use predicates::prelude::*;
use std::fs;

use crate::quickstart;

#[test]
fn test_init_creates_templates_and_gitignore() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created CLAUDE.md"))
        .stdout(predicate::str::contains("Next steps"));

    assert!(project.path("CLAUDE.md").is_file());
    assert!(project.path(".claude/commands/review.md").is_file());

    let mcp = project.read_json(".mcp.json").unwrap();
    assert!(mcp["mcpServers"].as_object().unwrap().is_empty());

    let gitignore = fs::read_to_string(project.path(".gitignore")).unwrap();
    assert!(gitignore.lines().any(|l| l == ".claude/settings.local.json"));
}

#[test]
fn test_init_twice_keeps_files_and_gitignore_entry_once() {
    let project = TestProject::new().unwrap();
    project.write(".gitignore", "target/\n").unwrap();

    quickstart(&project).arg("init").assert().success();
    project.write("CLAUDE.md", "# My notes\n").unwrap();

    quickstart(&project)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept existing CLAUDE.md"))
        .stdout(predicate::str::contains("--force"));

    assert_eq!(fs::read_to_string(project.path("CLAUDE.md")).unwrap(), "# My notes\n");
    let gitignore = fs::read_to_string(project.path(".gitignore")).unwrap();
    assert!(gitignore.starts_with("target/\n"));
    assert_eq!(gitignore.matches(".claude/settings.local.json").count(), 1);
}

#[test]
fn test_init_force_never_replaces_mcp_json() {
    let project = TestProject::new().unwrap();
    project
        .write(".mcp.json", r#"{"mcpServers":{"mine":{"command":"node","args":["s.js"]}}}"#)
        .unwrap();
    project.write("CLAUDE.md", "old").unwrap();

    quickstart(&project)
        .args(["init", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overwrote CLAUDE.md"));

    let mcp = project.read_json(".mcp.json").unwrap();
    assert_eq!(mcp["mcpServers"]["mine"]["command"], "node");
    assert_ne!(fs::read_to_string(project.path("CLAUDE.md")).unwrap(), "old");
}

#[test]
fn test_init_into_new_directory() {
    let project = TestProject::new().unwrap();
    let target = project.temp_dir.path().join("fresh").join("app");

    quickstart(&project).arg("init").arg("--path").arg(&target).assert().success();

    assert!(target.join("CLAUDE.md").is_file());
    assert!(target.join(".gitignore").is_file());
    assert!(!project.path("CLAUDE.md").exists());
}
