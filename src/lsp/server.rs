//! LSP server implementation: triggers, debounce, recovery, and the command
//! surface.
//!
//! All mutable state hangs off the per-connection [`Session`]; there are no
//! process-wide globals. Validation is never cached; a container stopped and
//! restarted between triggers is picked up by the next run or by the silent
//! recovery loop.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tower_lsp::jsonrpc::{Error as JsonRpcError, ErrorCode, Result as JsonRpcResult};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::{Config, ValidateOn};
use crate::ddev::{DdevClient, ValidationErrorKind, ValidationOutcome};
use crate::phpstan::{self, Interpretation};
use crate::{AnalysisError, analyze_file, analyze_file_raw};

/// How long a typing pause must last before an on-type analysis fires.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Cadence of the silent loop that recovers from a stopped container without
/// user action.
const RECOVERY_INTERVAL: Duration = Duration::from_secs(30);

pub const COMMAND_ANALYZE: &str = "ddevstan.analyze";
pub const COMMAND_DEBUG_ANALYZE: &str = "ddevstan.debugAnalyze";
pub const COMMAND_ENABLE: &str = "ddevstan.enable";
pub const COMMAND_DISABLE: &str = "ddevstan.disable";
pub const COMMAND_TOGGLE: &str = "ddevstan.toggle";

const ACTION_START_DDEV: &str = "Start DDEV";
const ACTION_DISABLE: &str = "Disable for this project";

/// Per-connection state shared with spawned tasks.
struct Session {
    config: RwLock<Config>,
    workspace_root: RwLock<Option<PathBuf>>,
    /// Documents we currently hold published diagnostics for, so disabling
    /// the integration can clear them.
    published: RwLock<HashSet<Url>>,
    /// Pending on-type analysis; each qualifying edit replaces it.
    debounce: Mutex<Option<JoinHandle<()>>>,
    /// Whether the last validation succeeded. The recovery loop only probes
    /// while this is false.
    healthy: RwLock<bool>,
}

impl Session {
    fn new() -> Self {
        Self {
            config: RwLock::new(Config::default()),
            workspace_root: RwLock::new(None),
            published: RwLock::new(HashSet::new()),
            debounce: Mutex::new(None),
            healthy: RwLock::new(false),
        }
    }

    async fn ddev_client(&self) -> Option<DdevClient> {
        self.workspace_root.read().await.clone().map(DdevClient::new)
    }

    /// Replace a document's diagnostics; an empty list is an explicit clear,
    /// not a skipped publish.
    async fn publish(&self, client: &Client, uri: &Url, diagnostics: Vec<Diagnostic>) {
        let mut published = self.published.write().await;
        if diagnostics.is_empty() {
            published.remove(uri);
        } else {
            published.insert(uri.clone());
        }
        drop(published);
        client.publish_diagnostics(uri.clone(), diagnostics, None).await;
    }

    /// Clear every document we have published for.
    async fn clear_all(&self, client: &Client) {
        let uris: Vec<Url> = self.published.write().await.drain().collect();
        for uri in uris {
            client.publish_diagnostics(uri, Vec::new(), None).await;
        }
    }

    /// Re-validate the environment. Non-silent failures surface an
    /// actionable message; silent ones only log.
    async fn validate(&self, client: &Client, silent: bool) -> bool {
        let Some(ddev) = self.ddev_client().await else {
            *self.healthy.write().await = false;
            if !silent {
                self.handle_validation_failure(
                    client,
                    ValidationErrorKind::NoWorkspace,
                    "No workspace folder found".to_string(),
                )
                .await;
            }
            return false;
        };

        match ddev.validate_tool(phpstan::TOOL_NAME).await {
            ValidationOutcome::Valid => {
                *self.healthy.write().await = true;
                true
            }
            ValidationOutcome::Invalid { kind, message } => {
                *self.healthy.write().await = false;
                if silent {
                    log::debug!("validation failed: {message}");
                } else {
                    self.handle_validation_failure(client, kind, message).await;
                }
                false
            }
        }
    }

    /// Surface a validation failure with remediation actions.
    async fn handle_validation_failure(
        &self,
        client: &Client,
        kind: ValidationErrorKind,
        message: String,
    ) {
        *self.healthy.write().await = false;

        let mut actions = Vec::new();
        if kind == ValidationErrorKind::DdevNotRunning {
            actions.push(MessageActionItem {
                title: ACTION_START_DDEV.to_string(),
                properties: Default::default(),
            });
        }
        actions.push(MessageActionItem {
            title: ACTION_DISABLE.to_string(),
            properties: Default::default(),
        });

        let choice = client
            .show_message_request(MessageType::WARNING, message, Some(actions))
            .await;

        match choice {
            Ok(Some(item)) if item.title == ACTION_START_DDEV => {
                let Some(ddev) = self.ddev_client().await else {
                    return;
                };
                client
                    .log_message(MessageType::INFO, "starting DDEV")
                    .await;
                match ddev.start().await {
                    Ok(()) => {
                        client
                            .show_message(
                                MessageType::INFO,
                                "DDEV started. Save the file again to re-run PHPStan.",
                            )
                            .await;
                    }
                    Err(err) => {
                        client
                            .show_message(MessageType::ERROR, format!("Failed to start DDEV: {err}"))
                            .await;
                    }
                }
            }
            Ok(Some(item)) if item.title == ACTION_DISABLE => {
                self.set_enabled(client, false).await;
            }
            _ => {}
        }
    }

    async fn set_enabled(&self, client: &Client, enabled: bool) {
        self.config.write().await.enable = enabled;
        if !enabled {
            self.clear_all(client).await;
        }
        client
            .show_message(
                MessageType::INFO,
                format!("PHPStan {}.", if enabled { "enabled" } else { "disabled" }),
            )
            .await;
    }

    /// Run the full pipeline for one document and publish the result.
    async fn analyze_document(&self, client: &Client, uri: &Url) {
        let config = self.config.read().await.clone();
        if !config.enable {
            return;
        }

        let Ok(path) = uri.to_file_path() else {
            return;
        };
        let Some(root) = self.workspace_root.read().await.clone() else {
            self.handle_validation_failure(
                client,
                ValidationErrorKind::NoWorkspace,
                "No workspace folder found for the current file".to_string(),
            )
            .await;
            return;
        };

        let relative = path
            .strip_prefix(&root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();

        // A new run supersedes the previous one for this document
        self.publish(client, uri, Vec::new()).await;

        let ddev = DdevClient::new(root);
        match analyze_file(&ddev, &config, &relative).await {
            Ok(Interpretation::Diagnostics(diagnostics)) => {
                *self.healthy.write().await = true;
                self.publish(client, uri, diagnostics).await;
            }
            Ok(Interpretation::Fatal) => {
                client
                    .show_message(
                        MessageType::ERROR,
                        "PHPStan encountered a fatal error. Check the file for syntax errors.",
                    )
                    .await;
            }
            Ok(Interpretation::MissingConfig) => {
                client
                    .show_message(
                        MessageType::ERROR,
                        "PHPStan configuration file not found. Check the configPath setting.",
                    )
                    .await;
            }
            Ok(Interpretation::Unparsable) => {
                client
                    .log_message(
                        MessageType::WARNING,
                        "PHPStan output could not be parsed; the analysis may still have succeeded",
                    )
                    .await;
            }
            Err(AnalysisError::Invalid { kind, message }) => {
                self.handle_validation_failure(client, kind, message).await;
            }
            Err(AnalysisError::Exec(err)) => {
                client
                    .log_message(
                        MessageType::ERROR,
                        format!(
                            "PHPStan failed: command={} status={:?} stderr={} stdout={}",
                            err.command,
                            err.status,
                            err.stderr.trim(),
                            err.stdout.trim()
                        ),
                    )
                    .await;
                client
                    .show_message(MessageType::ERROR, phpstan::summarize_exec_error(&err))
                    .await;
            }
        }
    }
}

/// Main LSP server for ddevstan.
pub struct DdevstanLanguageServer {
    client: Client,
    session: Arc<Session>,
}

impl DdevstanLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            session: Arc::new(Session::new()),
        }
    }

    fn is_php_document(uri: &Url) -> bool {
        uri.path().ends_with(".php")
    }

    /// Cancel any pending on-type analysis and schedule a new one after the
    /// quiet period.
    async fn schedule_analysis(&self, uri: Url) {
        let session = self.session.clone();
        let client = self.client.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE).await;
            session.analyze_document(&client, &uri).await;
        });

        let mut pending = self.session.debounce.lock().await;
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    fn document_arg(arguments: &[Value]) -> JsonRpcResult<Url> {
        arguments
            .first()
            .and_then(Value::as_str)
            .and_then(|raw| Url::parse(raw).ok())
            .ok_or_else(|| JsonRpcError {
                code: ErrorCode::InvalidParams,
                message: "expected a document URI as the first argument".to_string().into(),
                data: None,
            })
    }

    async fn ensure_enabled(&self, action: &str) -> bool {
        if self.session.config.read().await.enable {
            return true;
        }
        self.client
            .show_message(
                MessageType::WARNING,
                format!("PHPStan is disabled. Enable it first to {action}."),
            )
            .await;
        false
    }

    /// Run the pipeline but hand back the raw output, formatted for a
    /// scratch buffer on the client side.
    async fn debug_analyze(&self, uri: &Url) -> Option<String> {
        let config = self.session.config.read().await.clone();
        let Some(root) = self.session.workspace_root.read().await.clone() else {
            self.client
                .show_message(MessageType::WARNING, "No workspace folder found")
                .await;
            return None;
        };
        let Ok(path) = uri.to_file_path() else {
            return None;
        };
        let relative = path
            .strip_prefix(&root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();

        let ddev = DdevClient::new(root);
        match analyze_file_raw(&ddev, &config, &relative).await {
            Ok(raw) => {
                let report = format!(
                    "PHPStan Debug Output for: {relative}\nCommand: {}\nOutput length: {} characters\n{}\n\n{}",
                    raw.command,
                    raw.output.len(),
                    "=".repeat(80),
                    raw.output
                );
                self.client.log_message(MessageType::INFO, &report).await;
                Some(report)
            }
            Err(err) => {
                self.client
                    .show_message(MessageType::ERROR, format!("Debug execution failed: {err}"))
                    .await;
                None
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for DdevstanLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> JsonRpcResult<InitializeResult> {
        log::info!("initializing ddevstan language server");

        let folder_uri = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| folder.uri.clone());
        #[allow(deprecated)]
        let root_uri = folder_uri.or_else(|| params.root_uri.clone());
        if let Some(root) = root_uri.and_then(|uri| uri.to_file_path().ok()) {
            *self.session.workspace_root.write().await = Some(root);
        }

        if let Some(options) = params.initialization_options {
            match serde_json::from_value::<Config>(options) {
                Ok(config) => *self.session.config.write().await = config,
                Err(err) => log::warn!("ignoring malformed initialization options: {err}"),
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![
                        COMMAND_ANALYZE.to_string(),
                        COMMAND_DEBUG_ANALYZE.to_string(),
                        COMMAND_ENABLE.to_string(),
                        COMMAND_DISABLE.to_string(),
                        COMMAND_TOGGLE.to_string(),
                    ],
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "ddevstan".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("ddevstan language server initialized");
        self.client
            .log_message(MessageType::INFO, "ddevstan language server started")
            .await;

        if self.session.config.read().await.enable {
            self.session.validate(&self.client, false).await;
        }

        // Silent recovery: a stopped container that comes back is picked up
        // without user action. Failures on this path never produce popups.
        let session = self.session.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RECOVERY_INTERVAL);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                let enabled = session.config.read().await.enable;
                if !enabled || *session.healthy.read().await {
                    continue;
                }
                log::debug!("attempting to recover the PHPStan service");
                if session.validate(&client, true).await {
                    client
                        .log_message(MessageType::INFO, "PHPStan is available again")
                        .await;
                }
            }
        });
    }

    async fn shutdown(&self) -> JsonRpcResult<()> {
        log::info!("shutting down ddevstan language server");
        if let Some(pending) = self.session.debounce.lock().await.take() {
            pending.abort();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        log::debug!("opened {}", params.text_document.uri);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if !Self::is_php_document(&uri) {
            return;
        }
        let config = self.session.config.read().await.clone();
        if !config.enable || config.validate_on != ValidateOn::Type {
            return;
        }
        self.schedule_analysis(uri).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if !Self::is_php_document(&uri) {
            return;
        }
        let config = self.session.config.read().await.clone();
        if !config.enable || config.validate_on != ValidateOn::Save {
            return;
        }
        self.session.analyze_document(&self.client, &uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.session
            .publish(&self.client, &params.text_document.uri, Vec::new())
            .await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        // Settings may arrive as the whole settings object or already
        // narrowed to our section.
        let section = params
            .settings
            .get("ddevstan")
            .cloned()
            .unwrap_or(params.settings);
        let config = match serde_json::from_value::<Config>(section) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("ignoring malformed configuration update: {err}");
                return;
            }
        };

        let was_enabled = self.session.config.read().await.enable;
        *self.session.config.write().await = config.clone();

        if was_enabled && !config.enable {
            self.session.clear_all(&self.client).await;
        } else if config.enable {
            self.session.validate(&self.client, true).await;
        }
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> JsonRpcResult<Option<Value>> {
        match params.command.as_str() {
            COMMAND_ANALYZE => {
                if !self.ensure_enabled("analyze files").await {
                    return Ok(None);
                }
                let uri = Self::document_arg(&params.arguments)?;
                self.session.analyze_document(&self.client, &uri).await;
                Ok(None)
            }
            COMMAND_DEBUG_ANALYZE => {
                if !self.ensure_enabled("debug analysis").await {
                    return Ok(None);
                }
                let uri = Self::document_arg(&params.arguments)?;
                Ok(self.debug_analyze(&uri).await.map(Value::String))
            }
            COMMAND_ENABLE => {
                self.session.set_enabled(&self.client, true).await;
                Ok(None)
            }
            COMMAND_DISABLE => {
                self.session.set_enabled(&self.client, false).await;
                Ok(None)
            }
            COMMAND_TOGGLE => {
                let enabled = self.session.config.read().await.enable;
                self.session.set_enabled(&self.client, !enabled).await;
                Ok(None)
            }
            unknown => Err(JsonRpcError {
                code: ErrorCode::MethodNotFound,
                message: format!("unknown command: {unknown}").into(),
                data: None,
            }),
        }
    }
}
