use claude_code_quickstart::test_utils::TestProject;
use predicates::prelude::*;

use crate::quickstart;

#[test]
fn test_check_url_accepts_cloudflare_endpoint() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["check-url", "https://bindings.mcp.cloudflare.com/sse"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accepted"))
        .stdout(predicate::str::contains("bindings.mcp.cloudflare.com"));
}

#[test]
fn test_check_url_rejects_lookalike_host() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["check-url", "https://fake-bindings.mcp.cloudflare.com.evil.io/sse"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not a trusted MCP endpoint"));
}

#[test]
fn test_check_url_rejects_plain_http() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["check-url", "http://bindings.mcp.cloudflare.com/sse"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("https"));
}

#[test]
fn test_check_url_rejects_shell_metacharacters() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["check-url", "https://bindings.mcp.cloudflare.com/sse;rm -rf /"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dangerous character"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_check_url_rejects_traversal() {
    let project = TestProject::new().unwrap();

    quickstart(&project)
        .args(["check-url", "https://bindings.mcp.cloudflare.com/../admin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("traversal"));
}
