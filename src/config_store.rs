//! Direct reading and merging of the JSON files Claude Code keeps its MCP
//! server registrations in.
//!
//! Used when the `claude` CLI is unavailable (or `--direct` is given) and by
//! the status check. A configuration document is an object with an
//! `mcpServers` map; every other key belongs to someone else and is carried
//! through untouched. For project-private registrations the document is not
//! the whole file but the `projects.<path>` entry inside `~/.claude.json`.
//!
//! Writes follow one protocol:
//!
//! 1. take the [`ConfigLock`] for the file
//! 2. load the current document, recovering from corruption
//! 3. apply the pure merge
//! 4. write a temp file in the same directory, then rename it over the target
//!
//! A file that is not JSON at all is never silently dropped: it is renamed
//! to `<name>.corrupt-<timestamp>` before an empty document replaces it.
//! Valid JSON with an unexpected layout is repaired where that loses nothing
//! (a non-object `mcpServers` reads as empty) and otherwise refused with
//! [`QuickstartError::UnsupportedConfiguration`], leaving the file alone.

use crate::catalog::{EnvVarMap, Transport};
use crate::constants::{default_lock_timeout, default_stale_lock_threshold};
use crate::core::QuickstartError;
use crate::lock::ConfigLock;
use crate::scope::{ConfigTarget, RegistrationScope};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Key of the server map inside a document.
const MCP_SERVERS: &str = "mcpServers";
/// Key of the per-project map in the user's file.
const PROJECTS: &str = "projects";

/// Why document text could not be used.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Not JSON; recovered by backup and reset
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    /// JSON of the wrong shape; never rewritten
    #[error("{0}")]
    Layout(String),
}

/// One `mcpServers` map together with its sibling keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerConfigDocument {
    /// Registered servers, keyed by server key
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: Map<String, Value>,

    /// Every sibling key of `mcpServers`, preserved as-is
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ServerConfigDocument {
    /// Parse document text. Empty or whitespace-only text is an empty document.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        parse_object(text).map(Self::from_object)
    }

    /// Split an object into its server map and everything else.
    ///
    /// A `mcpServers` value that is not an object holds no usable entries and
    /// reads as an empty map.
    #[must_use]
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        let mcp_servers = match object.remove(MCP_SERVERS) {
            Some(Value::Object(servers)) => servers,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                warn!(
                    target: "config",
                    "{MCP_SERVERS} is {}, not an object; treating it as empty",
                    json_kind(&other)
                );
                Map::new()
            }
        };
        Self {
            mcp_servers,
            other: object,
        }
    }

    /// Inverse of [`from_object`](Self::from_object).
    #[must_use]
    pub fn into_object(self) -> Map<String, Value> {
        let mut object = self.other;
        object.insert(MCP_SERVERS.to_string(), Value::Object(self.mcp_servers));
        object
    }

    #[must_use]
    pub fn server(&self, key: &str) -> Option<&Value> {
        self.mcp_servers.get(key)
    }

    /// Whether `key` is registered with a record of the given transport.
    #[must_use]
    pub fn exists(&self, key: &str, transport: Transport) -> bool {
        server_state(self, key, transport).configured
    }
}

/// A server record as written by this tool.
///
/// Records found on disk may carry other fields; those are read back as raw
/// JSON and never round-tripped through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedServerRecord {
    /// `{"transport": "sse", "url": ...}`
    Sse {
        transport: String,
        url: String,
    },
    /// `{"command": ..., "args": [...], "env": {...}}`
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "EnvVarMap::is_empty")]
        env: EnvVarMap,
    },
}

impl PersistedServerRecord {
    #[must_use]
    pub fn sse(url: &str) -> Self {
        Self::Sse {
            transport: "sse".to_string(),
            url: url.to_string(),
        }
    }

    #[must_use]
    pub fn stdio(command: &str, args: Vec<String>, env: EnvVarMap) -> Self {
        Self::Stdio {
            command: command.to_string(),
            args,
            env,
        }
    }

    #[must_use]
    pub const fn transport(&self) -> Transport {
        match self {
            Self::Sse { .. } => Transport::Sse,
            Self::Stdio { .. } => Transport::Stdio,
        }
    }

    fn to_value(&self) -> Value {
        // Both variants are plain string/map data
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Whether a server is registered in one document.
///
/// `configured` implies `exists`. An entry that exists but is not configured
/// holds a record of another transport (or garbage) and gets re-registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerState {
    pub exists: bool,
    pub configured: bool,
}

impl ServerState {
    pub const ABSENT: Self = Self {
        exists: false,
        configured: false,
    };
    pub const CONFIGURED: Self = Self {
        exists: true,
        configured: true,
    };
    pub const MISMATCHED: Self = Self {
        exists: true,
        configured: false,
    };
}

fn is_sse_marked(record: &Map<String, Value>) -> bool {
    ["transport", "type"]
        .iter()
        .any(|field| record.get(*field).and_then(Value::as_str) == Some("sse"))
}

/// Classify the record stored under `key`.
#[must_use]
pub fn server_state(doc: &ServerConfigDocument, key: &str, transport: Transport) -> ServerState {
    let Some(entry) = doc.server(key) else {
        return ServerState::ABSENT;
    };
    let Some(record) = entry.as_object() else {
        return ServerState::MISMATCHED;
    };

    let matches = match transport {
        Transport::Sse => {
            is_sse_marked(record) && record.get("url").is_some_and(Value::is_string)
        }
        Transport::Stdio => {
            !is_sse_marked(record) && record.get("command").is_some_and(Value::is_string)
        }
    };
    ServerState {
        exists: true,
        configured: matches,
    }
}

/// Set `mcpServers[key]` to `record`, replacing any previous entry.
///
/// Pure: every other server and top-level key is kept. Applying the same
/// record twice yields the same document.
#[must_use]
pub fn merge_server(
    mut doc: ServerConfigDocument,
    key: &str,
    record: &PersistedServerRecord,
) -> ServerConfigDocument {
    doc.mcp_servers.insert(key.to_string(), record.to_value());
    doc
}

/// Drop `mcpServers[key]`. The flag tells whether it was present.
#[must_use]
pub fn remove_server(mut doc: ServerConfigDocument, key: &str) -> (ServerConfigDocument, bool) {
    let removed = doc.mcp_servers.remove(key).is_some();
    (doc, removed)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a whole file into its top-level object.
fn parse_object(text: &str) -> Result<Map<String, Value>, DocumentError> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(text)? {
        Value::Object(object) => Ok(object),
        other => Err(DocumentError::Layout(format!(
            "top level is {}, expected an object",
            json_kind(&other)
        ))),
    }
}

/// The object holding the server map: the root itself, or `projects.<key>`.
fn section(
    root: &Map<String, Value>,
    project: Option<&str>,
) -> Result<Map<String, Value>, String> {
    let Some(project) = project else {
        return Ok(root.clone());
    };
    match root.get(PROJECTS) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(projects)) => match projects.get(project) {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(entry)) => Ok(entry.clone()),
            Some(other) => Err(format!(
                "{PROJECTS}.\"{project}\" is {}, expected an object",
                json_kind(other)
            )),
        },
        Some(other) => Err(format!("{PROJECTS} is {}, expected an object", json_kind(other))),
    }
}

/// Put `entry` back where [`section`] found it. Sibling projects are kept.
fn with_section(
    mut root: Map<String, Value>,
    project: Option<&str>,
    entry: Map<String, Value>,
) -> Map<String, Value> {
    let Some(project) = project else {
        return entry;
    };
    let projects = root.entry(PROJECTS).or_insert_with(|| Value::Object(Map::new()));
    if !projects.is_object() {
        *projects = Value::Object(Map::new());
    }
    if let Value::Object(projects) = projects {
        projects.insert(project.to_string(), Value::Object(entry));
    }
    root
}

/// Result of [`ConfigStore::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub document: ServerConfigDocument,
    /// Where the unreadable original was moved, if the file was corrupt
    pub recovered_from: Option<PathBuf>,
}

/// What a merge did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// An entry with the same key was overwritten
    pub replaced: bool,
    /// Backup of a corrupt file that was reset before merging
    pub recovered_from: Option<PathBuf>,
}

/// The file behind one scope, plus the project entry inside it if any.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    project: Option<String>,
    lock_timeout: Duration,
    stale_after: Duration,
}

impl ConfigStore {
    /// Store for the top-level `mcpServers` map of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            project: None,
            lock_timeout: default_lock_timeout(),
            stale_after: default_stale_lock_threshold(),
        }
    }

    /// Store for the file and entry that back `scope`.
    pub fn for_scope(scope: RegistrationScope, project_dir: &Path) -> Result<Self> {
        Ok(Self::for_target(scope.config_target(project_dir)?))
    }

    #[must_use]
    pub fn for_target(target: ConfigTarget) -> Self {
        let store = Self::new(target.path);
        match target.project {
            Some(project) => store.in_project(project),
            None => store,
        }
    }

    /// Address the `projects.<key>` entry instead of the file's top level.
    #[must_use]
    pub fn in_project(mut self, key: impl Into<String>) -> Self {
        self.project = Some(key.into());
        self
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_stale_after(mut self, threshold: Duration) -> Self {
        self.stale_after = threshold;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// File path and project entry, for messages.
    #[must_use]
    pub fn target(&self) -> ConfigTarget {
        ConfigTarget {
            path: self.path.clone(),
            project: self.project.clone(),
        }
    }

    /// Read the document without modifying anything on disk.
    ///
    /// A missing file is an empty document.
    ///
    /// # Errors
    ///
    /// [`QuickstartError::CorruptConfiguration`] if the file is not JSON,
    /// [`QuickstartError::UnsupportedConfiguration`] if it is laid out wrongly.
    pub fn read(&self) -> Result<ServerConfigDocument> {
        let Some(text) = self.read_text()? else {
            return Ok(ServerConfigDocument::default());
        };
        let root = parse_object(&text).map_err(|e| match e {
            DocumentError::Syntax(e) => QuickstartError::CorruptConfiguration {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            },
            DocumentError::Layout(reason) => self.unsupported(reason),
        })?;
        self.document_in(&root)
    }

    /// Read the document, moving a file that is not JSON aside and starting
    /// over with an empty document.
    pub fn load(&self) -> Result<LoadedDocument> {
        let (root, recovered_from) = self.load_root()?;
        Ok(LoadedDocument {
            document: self.document_in(&root)?,
            recovered_from,
        })
    }

    fn unsupported(&self, reason: String) -> QuickstartError {
        QuickstartError::UnsupportedConfiguration {
            path: self.path.display().to_string(),
            reason,
        }
    }

    fn document_in(&self, root: &Map<String, Value>) -> Result<ServerConfigDocument> {
        let entry = section(root, self.project()).map_err(|reason| self.unsupported(reason))?;
        Ok(ServerConfigDocument::from_object(entry))
    }

    fn load_root(&self) -> Result<(Map<String, Value>, Option<PathBuf>)> {
        let Some(text) = self.read_text()? else {
            debug!(target: "config", path = %self.path.display(), "No configuration file yet");
            return Ok((Map::new(), None));
        };

        match parse_object(&text) {
            Ok(root) => Ok((root, None)),
            Err(DocumentError::Syntax(e)) => {
                let backup = self.backup_corrupt()?;
                warn!(
                    target: "config",
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Configuration file was not valid JSON; backed it up and started fresh"
                );
                Ok((Map::new(), Some(backup)))
            }
            Err(DocumentError::Layout(reason)) => Err(self.unsupported(reason).into()),
        }
    }

    fn read_text(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read configuration: {}", self.path.display())),
        }
    }

    fn backup_corrupt(&self) -> Result<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%dT%H%M%S").to_string();
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut backup = self.path.with_file_name(format!("{name}.corrupt-{stamp}"));
        let mut n = 1;
        while backup.exists() {
            backup = self.path.with_file_name(format!("{name}.corrupt-{stamp}-{n}"));
            n += 1;
        }

        fs::rename(&self.path, &backup).with_context(|| {
            format!("Failed to back up corrupt configuration to: {}", backup.display())
        })?;
        Ok(backup)
    }

    /// Replace the file with `root` using temp-file-then-rename.
    ///
    /// Readers see the old or the new content, never a mix. Existing file
    /// permissions are carried over; new files keep the temp file's
    /// owner-only mode.
    fn write_root(&self, root: Map<String, Value>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut content = serde_json::to_string_pretty(&Value::Object(root))
            .context("Failed to serialize configuration document")?;
        content.push('\n');

        let mut temp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in: {}", dir.display()))?;
        temp.write_all(content.as_bytes()).context("Failed to write temp file")?;
        temp.as_file().sync_all().context("Failed to sync file to disk")?;

        if let Ok(meta) = fs::metadata(&self.path) {
            temp.as_file()
                .set_permissions(meta.permissions())
                .context("Failed to copy file permissions")?;
        }

        temp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace: {}", self.path.display()))?;
        Ok(())
    }

    /// Load, change and write back the document under the file lock.
    async fn update<T>(
        &self,
        change: impl FnOnce(ServerConfigDocument) -> (ServerConfigDocument, T),
    ) -> Result<(T, Option<PathBuf>)> {
        let _lock =
            ConfigLock::acquire_with_timeout(&self.path, self.lock_timeout, self.stale_after)
                .await?;

        let (root, recovered_from) = self.load_root()?;
        let document = self.document_in(&root)?;
        let before = document.clone();
        let (document, value) = change(document);

        if document != before || recovered_from.is_some() {
            let entry = document.into_object();
            self.write_root(with_section(root, self.project(), entry))?;
        }
        Ok((value, recovered_from))
    }

    /// Register `key` under the file lock.
    pub async fn merge_server(
        &self,
        key: &str,
        record: &PersistedServerRecord,
    ) -> Result<MergeOutcome> {
        let (replaced, recovered_from) = self
            .update(|document| {
                let replaced = document.mcp_servers.contains_key(key);
                (merge_server(document, key, record), replaced)
            })
            .await?;

        info!(
            target: "config",
            target_file = %self.target(),
            server = key,
            replaced,
            "Wrote server entry"
        );
        Ok(MergeOutcome {
            replaced,
            recovered_from,
        })
    }

    /// Remove `key` under the file lock. Returns whether it was present.
    ///
    /// The file is left untouched when the key is absent.
    pub async fn remove_server(&self, key: &str) -> Result<bool> {
        let (removed, _) = self.update(|document| remove_server(document, key)).await?;
        if removed {
            info!(
                target: "config",
                target_file = %self.target(),
                server = key,
                "Removed server entry"
            );
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn github_record(token: &str) -> PersistedServerRecord {
        let mut env = EnvVarMap::new();
        env.insert("GITHUB_PERSONAL_ACCESS_TOKEN".to_string(), token.to_string());
        PersistedServerRecord::stdio(
            "npx",
            vec!["-y".to_string(), "@modelcontextprotocol/server-github".to_string()],
            env,
        )
    }

    #[test]
    fn test_record_shapes() {
        let sse = serde_json::to_value(PersistedServerRecord::sse("https://x/sse")).unwrap();
        assert_eq!(sse, serde_json::json!({"transport": "sse", "url": "https://x/sse"}));

        let stdio = serde_json::to_value(PersistedServerRecord::stdio(
            "npx",
            vec!["-y".to_string()],
            EnvVarMap::new(),
        ))
        .unwrap();
        assert_eq!(stdio, serde_json::json!({"command": "npx", "args": ["-y"]}));
    }

    #[test]
    fn test_merge_preserves_unrelated_keys_and_is_idempotent() {
        let doc = ServerConfigDocument::parse(
            r#"{"permissions": {"allow": ["Bash"]}, "mcpServers": {"other": {"command": "x"}}}"#,
        )
        .unwrap();

        let once = merge_server(doc, "github", &github_record("a"));
        let twice = merge_server(once.clone(), "github", &github_record("a"));
        assert_eq!(once, twice);
        assert_eq!(once.other["permissions"]["allow"][0], "Bash");
        assert!(once.server("other").is_some());
        assert_eq!(once.server("github").unwrap()["env"]["GITHUB_PERSONAL_ACCESS_TOKEN"], "a");
    }

    #[test]
    fn test_merge_overwrites_same_key() {
        let doc = merge_server(ServerConfigDocument::default(), "github", &github_record("old"));
        let doc = merge_server(doc, "github", &github_record("new"));
        assert_eq!(doc.mcp_servers.len(), 1);
        assert_eq!(doc.server("github").unwrap()["env"]["GITHUB_PERSONAL_ACCESS_TOKEN"], "new");
    }

    #[test]
    fn test_server_state_by_transport() {
        let doc = ServerConfigDocument::parse(
            r#"{"mcpServers": {
                "cf": {"transport": "sse", "url": "https://bindings.mcp.cloudflare.com/sse"},
                "typed": {"type": "sse", "url": "https://x"},
                "gh": {"command": "npx", "args": []},
                "broken": "nope"
            }}"#,
        )
        .unwrap();

        assert_eq!(server_state(&doc, "cf", Transport::Sse), ServerState::CONFIGURED);
        assert_eq!(server_state(&doc, "typed", Transport::Sse), ServerState::CONFIGURED);
        assert_eq!(server_state(&doc, "cf", Transport::Stdio), ServerState::MISMATCHED);
        assert_eq!(server_state(&doc, "gh", Transport::Stdio), ServerState::CONFIGURED);
        assert_eq!(server_state(&doc, "gh", Transport::Sse), ServerState::MISMATCHED);
        assert_eq!(server_state(&doc, "broken", Transport::Stdio), ServerState::MISMATCHED);
        assert_eq!(server_state(&doc, "missing", Transport::Stdio), ServerState::ABSENT);
        assert!(doc.exists("gh", Transport::Stdio));
    }

    #[test]
    fn test_empty_text_is_empty_document() {
        assert_eq!(ServerConfigDocument::parse("  \n").unwrap(), ServerConfigDocument::default());
    }

    #[test]
    fn test_parse_separates_syntax_from_layout() {
        assert!(matches!(ServerConfigDocument::parse("{ nope"), Err(DocumentError::Syntax(_))));
        assert!(matches!(ServerConfigDocument::parse("[]"), Err(DocumentError::Layout(_))));

        // A non-object server map holds nothing usable; its siblings survive
        let doc = ServerConfigDocument::parse(r#"{"mcpServers": [], "theme": "dark"}"#).unwrap();
        assert!(doc.mcp_servers.is_empty());
        assert_eq!(doc.other["theme"], "dark");
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join(".mcp.json"));
        let loaded = store.load().unwrap();
        assert_eq!(loaded.document, ServerConfigDocument::default());
        assert!(loaded.recovered_from.is_none());
    }

    #[test]
    fn test_corrupt_file_is_backed_up_and_reset() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".mcp.json");
        fs::write(&path, "{ not json").unwrap();
        let store = ConfigStore::new(&path);

        assert!(matches!(
            store.read().unwrap_err().downcast_ref::<QuickstartError>(),
            Some(QuickstartError::CorruptConfiguration { .. })
        ));
        // read() leaves the file alone
        assert!(path.exists());

        let loaded = store.load().unwrap();
        let backup = loaded.recovered_from.unwrap();
        assert_eq!(loaded.document, ServerConfigDocument::default());
        assert_eq!(fs::read_to_string(&backup).unwrap(), "{ not json");
        assert!(
            backup.file_name().unwrap().to_string_lossy().starts_with(".mcp.json.corrupt-"),
            "{}",
            backup.display()
        );
    }

    #[tokio::test]
    async fn test_merge_server_writes_valid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude").join("settings.local.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"permissions": {"deny": []}}"#).unwrap();

        let store = ConfigStore::new(&path);
        let outcome = store.merge_server("github", &github_record("t")).await.unwrap();
        assert!(!outcome.replaced);

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["permissions"], serde_json::json!({"deny": []}));
        assert_eq!(written["mcpServers"]["github"]["command"], "npx");

        let outcome = store.merge_server("github", &github_record("t")).await.unwrap();
        assert!(outcome.replaced);
    }

    #[tokio::test]
    async fn test_merge_into_corrupt_file_recovers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".mcp.json");
        fs::write(&path, "garbage").unwrap();

        let store = ConfigStore::new(&path);
        let outcome =
            store.merge_server("cf", &PersistedServerRecord::sse("https://x")).await.unwrap();
        assert!(outcome.recovered_from.unwrap().exists());
        assert!(store.read().unwrap().exists("cf", Transport::Sse));
    }

    #[tokio::test]
    async fn test_remove_server() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(temp.path().join(".mcp.json"));
        store.merge_server("github", &github_record("t")).await.unwrap();

        assert!(store.remove_server("github").await.unwrap());
        assert!(!store.remove_server("github").await.unwrap());
        assert!(store.read().unwrap().mcp_servers.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_write_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        ConfigStore::new(&path).merge_server("x", &github_record("t")).await.unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
    }

    #[tokio::test]
    async fn test_null_server_map_keeps_other_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        fs::write(
            &path,
            r#"{"mcpServers": null, "permissions": {"allow": ["Bash"]}, "numStartups": 42}"#,
        )
        .unwrap();

        let store = ConfigStore::new(&path);
        let outcome =
            store.merge_server("cf", &PersistedServerRecord::sse("https://x")).await.unwrap();
        assert!(outcome.recovered_from.is_none());

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["permissions"], serde_json::json!({"allow": ["Bash"]}));
        assert_eq!(written["numStartups"], 42);
        assert_eq!(written["mcpServers"]["cf"]["transport"], "sse");

        let backups: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert!(backups.is_empty());
    }

    #[tokio::test]
    async fn test_non_object_top_level_is_refused_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = ConfigStore::new(&path);
        let err = store.merge_server("cf", &PersistedServerRecord::sse("https://x")).await;
        assert!(matches!(
            err.unwrap_err().downcast_ref::<QuickstartError>(),
            Some(QuickstartError::UnsupportedConfiguration { .. })
        ));
        assert!(matches!(
            store.read().unwrap_err().downcast_ref::<QuickstartError>(),
            Some(QuickstartError::UnsupportedConfiguration { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1, 2, 3]");
    }

    #[tokio::test]
    async fn test_project_entry_merge_keeps_siblings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        fs::write(
            &path,
            r#"{
                "numStartups": 7,
                "mcpServers": {"global": {"command": "node"}},
                "projects": {
                    "/work/other": {"mcpServers": {"x": {"command": "y"}}},
                    "/work/app": {"allowedTools": ["Read"], "mcpServers": {}}
                }
            }"#,
        )
        .unwrap();

        let store = ConfigStore::new(&path).in_project("/work/app");
        store.merge_server("github", &github_record("t")).await.unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["numStartups"], 7);
        assert_eq!(written["mcpServers"], serde_json::json!({"global": {"command": "node"}}));
        assert_eq!(written["projects"]["/work/other"]["mcpServers"]["x"]["command"], "y");
        let app = &written["projects"]["/work/app"];
        assert_eq!(app["allowedTools"], serde_json::json!(["Read"]));
        assert_eq!(app["mcpServers"]["github"]["command"], "npx");

        // Top-level servers are not visible from the project entry and vice versa
        let doc = store.read().unwrap();
        assert!(doc.exists("github", Transport::Stdio));
        assert!(doc.server("global").is_none());
        assert!(ConfigStore::new(&path).read().unwrap().server("github").is_none());

        assert!(store.remove_server("github").await.unwrap());
        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(written["projects"]["/work/app"]["mcpServers"].as_object().unwrap().is_empty());
        assert_eq!(written["projects"]["/work/other"]["mcpServers"]["x"]["command"], "y");
    }

    #[tokio::test]
    async fn test_project_entry_created_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        fs::write(&path, r#"{"userID": "abc"}"#).unwrap();

        let store = ConfigStore::new(&path).in_project("/work/new");
        store.merge_server("cf", &PersistedServerRecord::sse("https://x")).await.unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["userID"], "abc");
        assert_eq!(written["projects"]["/work/new"]["mcpServers"]["cf"]["url"], "https://x");
    }

    #[tokio::test]
    async fn test_wrongly_typed_project_entry_is_refused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        let original = r#"{"projects": {"/work/app": "oops"}}"#;
        fs::write(&path, original).unwrap();

        let store = ConfigStore::new(&path).in_project("/work/app");
        assert!(store.merge_server("github", &github_record("t")).await.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_cancelled_merge_releases_lock_and_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".mcp.json");
        let store = ConfigStore::new(&path).with_lock_timeout(Duration::from_secs(30));

        let held = ConfigLock::acquire(&path).await.unwrap();
        let cancelled = tokio::time::timeout(
            Duration::from_millis(100),
            store.merge_server("github", &github_record("t")),
        )
        .await;
        assert!(cancelled.is_err(), "merge should still be waiting for the lock");
        drop(held);

        // The dropped merge must not be holding the lock
        let store = store.with_lock_timeout(Duration::from_secs(2));
        store.merge_server("github", &github_record("t")).await.unwrap();
        assert!(store.read().unwrap().exists("github", Transport::Stdio));

        let mut names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![".mcp.json".to_string(), ".mcp.json.lock".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_merges_lose_nothing() {
        let temp = TempDir::new().unwrap();
        let path = Arc::new(temp.path().join(".mcp.json"));

        let mut handles = Vec::new();
        for i in 0..8 {
            let path = Arc::clone(&path);
            handles.push(tokio::spawn(async move {
                let store = ConfigStore::new(path.as_path());
                store
                    .merge_server(&format!("server-{i}"), &github_record(&i.to_string()))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let doc = ConfigStore::new(path.as_path()).read().unwrap();
        assert_eq!(doc.mcp_servers.len(), 8);
    }
}
