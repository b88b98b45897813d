//! tower-lsp based Language Server implementation.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};

use super::hover::{build_completion_item, build_hover_content};
use super::semantic::{byte_offset, encode, legend, utf16_len};
use crate::config::EditorConfig;
use crate::context::EditorContext;
use crate::error::ConfigError;
use crate::grammar::Grammar;
use crate::model::Problem;

const SET_KEYWORDS: &str = "gherkin.setKeywords";
const SET_ELEMENTS: &str = "gherkin.setElements";
const SET_VARIABLES: &str = "gherkin.setVariables";
const SET_STEP_LIST: &str = "gherkin.setStepList";
const SET_SYNTAX_MESSAGE: &str = "gherkin.setSyntaxMessage";

const COMMANDS: [&str; 5] = [
    SET_KEYWORDS,
    SET_ELEMENTS,
    SET_VARIABLES,
    SET_STEP_LIST,
    SET_SYNTAX_MESSAGE,
];

/// Shared state that can be cloned into spawned tasks via Arc.
struct State {
    client: Client,
    context: Mutex<EditorContext>,
    diagnostics_delay_ms: Mutex<u64>,
    debounce_tokens: DashMap<String, tokio::sync::watch::Sender<()>>,
    documents: DashMap<String, (i32, String)>,
}

impl State {
    fn new(client: Client, context: EditorContext, diagnostics_delay_ms: u64) -> Self {
        Self {
            client,
            context: Mutex::new(context),
            diagnostics_delay_ms: Mutex::new(diagnostics_delay_ms),
            debounce_tokens: DashMap::new(),
            documents: DashMap::new(),
        }
    }

    async fn publish_diagnostics(&self, uri: &str, text: &str, version: i32) {
        let Ok(url) = Url::parse(uri) else {
            warn!(uri, "cannot publish diagnostics for invalid URI");
            return;
        };
        let problems = {
            let context = self.context.lock().await;
            context.steps().check_syntax(text, &context.vocabulary())
        };
        let diagnostics = build_diagnostics(text, &problems);
        self.client
            .publish_diagnostics(url, diagnostics, Some(version))
            .await;
    }

    /// Re-check every open document after the tables changed.
    async fn refresh_all(&self) {
        let documents: Vec<(String, i32, String)> = self
            .documents
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().0, entry.value().1.clone()))
            .collect();
        for (uri, version, text) in documents {
            self.publish_diagnostics(&uri, &text, version).await;
        }
        if let Err(e) = self.client.semantic_tokens_refresh().await {
            debug!("client rejected semantic token refresh: {e}");
        }
    }

    async fn apply_command(&self, command: &str, args: &[Value]) -> Result<()> {
        let mut context = self.context.lock().await;
        let outcome: std::result::Result<(), ConfigError> = match command {
            SET_KEYWORDS => context.set_keywords(&payload_arg(args)?),
            SET_ELEMENTS => context.set_elements(&payload_arg(args)?, clear_arg(args)),
            SET_VARIABLES => context.set_variables(&payload_arg(args)?, clear_arg(args)),
            SET_STEP_LIST => context.set_step_list(&payload_arg(args)?, clear_arg(args)),
            SET_SYNTAX_MESSAGE => {
                context.set_syntax_message(&payload_arg(args)?);
                Ok(())
            }
            other => return Err(Error::invalid_params(format!("unknown command: {other}"))),
        };
        outcome.map_err(|e| {
            warn!(command, "rejected configuration: {e}");
            Error::invalid_params(e.to_string())
        })
    }
}

/// First argument as payload text; JSON values are accepted as-is.
fn payload_arg(args: &[Value]) -> Result<String> {
    match args.first() {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(value) => Ok(value.to_string()),
        None => Err(Error::invalid_params("missing payload argument")),
    }
}

/// Optional second argument: discard existing entries first.
fn clear_arg(args: &[Value]) -> bool {
    args.get(1).and_then(Value::as_bool).unwrap_or(false)
}

fn build_diagnostics(text: &str, problems: &[Problem]) -> Vec<Diagnostic> {
    let lines: Vec<&str> = text.lines().collect();
    problems
        .iter()
        .map(|p| {
            let line = p.line_number.saturating_sub(1);
            let width = lines.get(line as usize).map_or(0, |l| utf16_len(l));
            Diagnostic {
                range: Range {
                    start: Position { line, character: 0 },
                    end: Position {
                        line,
                        character: width,
                    },
                },
                severity: Some(DiagnosticSeverity::ERROR),
                source: Some("gherkin-lens".to_string()),
                message: p.message.clone(),
                ..Default::default()
            }
        })
        .collect()
}

/// Byte offset where a completion starts replacing text: after the leading
/// keyword and its trailing spaces, or at the first non-blank character.
fn replace_start(grammar: &Grammar, line: &str, cursor: usize) -> usize {
    let after = match grammar.leading_keyword(line) {
        Some((end, _)) if end <= cursor => end,
        _ => 0,
    };
    let rest = &line[after..cursor];
    after + (rest.len() - rest.trim_start().len())
}

pub struct Backend {
    state: Arc<State>,
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(opts) = params.initialization_options {
            let config = EditorConfig::from_value(opts)
                .map_err(|e| Error::invalid_params(e.to_string()))?;
            let context = EditorContext::from_config(&config)
                .map_err(|e| Error::invalid_params(e.to_string()))?;
            *self.state.context.lock().await = context;
            *self.state.diagnostics_delay_ms.lock().await = config.diagnostics_delay_ms;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![" ".to_string()]),
                    ..Default::default()
                }),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend: legend(),
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                            ..Default::default()
                        },
                    ),
                ),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let context = self.state.context.lock().await;
        info!(
            keywords = context.vocabulary().keywords().len(),
            steps = context.steps().len(),
            "language server ready"
        );
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        let text = params.text_document.text;
        let version = params.text_document.version;
        self.state
            .documents
            .insert(uri.clone(), (version, text.clone()));
        self.state.publish_diagnostics(&uri, &text, version).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        let version = params.text_document.version;

        if let Some(change) = params.content_changes.into_iter().last() {
            self.state.documents.insert(uri.clone(), (version, change.text));

            // Cancel previous debounce
            if let Some((_, old_tx)) = self.state.debounce_tokens.remove(&uri) {
                let _ = old_tx.send(());
            }

            let (cancel_tx, mut cancel_rx) = tokio::sync::watch::channel(());
            self.state.debounce_tokens.insert(uri.clone(), cancel_tx);

            let state = Arc::clone(&self.state);
            let delay = *self.state.diagnostics_delay_ms.lock().await;

            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_millis(delay)) => {
                        let (version, text) = match state.documents.get(&uri) {
                            Some(entry) => entry.clone(),
                            None => return,
                        };
                        state.publish_diagnostics(&uri, &text, version).await;
                    }
                    _ = cancel_rx.changed() => {}
                }
            });
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        if let Some((_, tx)) = self.state.debounce_tokens.remove(&uri) {
            let _ = tx.send(());
        }
        self.state.documents.remove(&uri);
        self.state
            .client
            .publish_diagnostics(params.text_document.uri, vec![], None)
            .await;
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri.to_string();
        let (_, text) = match self.state.documents.get(&uri) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };
        let grammar = self.state.context.lock().await.grammar();
        let data = encode(&text, &grammar.tokenize(&text));
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data,
        })))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri.to_string();
        let pos = params.text_document_position.position;
        let (_, text) = match self.state.documents.get(&uri) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };
        let line = text.lines().nth(pos.line as usize).unwrap_or_default();
        let cursor = byte_offset(line, pos.character);

        let context = self.state.context.lock().await;
        let grammar = context.grammar();
        let start = replace_start(&grammar, line, cursor);
        let range = Range {
            start: Position {
                line: pos.line,
                character: utf16_len(&line[..start]),
            },
            end: Position {
                line: pos.line,
                character: utf16_len(&line[..cursor]),
            },
        };
        let items: Vec<CompletionItem> = context
            .steps()
            .suggest(&line[..cursor], &context.vocabulary())
            .into_iter()
            .map(|step| build_completion_item(step, range))
            .collect();

        Ok(if items.is_empty() {
            None
        } else {
            Some(CompletionResponse::Array(items))
        })
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params
            .text_document_position_params
            .text_document
            .uri
            .to_string();
        let pos = params.text_document_position_params.position;

        let (_, text) = match self.state.documents.get(&uri) {
            Some(entry) => entry.clone(),
            None => return Ok(None),
        };
        let Some(line) = text.lines().nth(pos.line as usize) else {
            return Ok(None);
        };

        let context = self.state.context.lock().await;
        let Some(step) = context.steps().step_for_line(line, &context.vocabulary()) else {
            return Ok(None);
        };
        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: build_hover_content(step),
            }),
            range: Some(Range {
                start: Position {
                    line: pos.line,
                    character: 0,
                },
                end: Position {
                    line: pos.line,
                    character: utf16_len(line),
                },
            }),
        }))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        debug!(command = %params.command, "execute command");
        self.state
            .apply_command(&params.command, &params.arguments)
            .await?;
        self.state.refresh_all().await;
        Ok(None)
    }
}

/// Start the LSP server on stdio.
pub async fn serve_stdio(config: &EditorConfig) -> std::result::Result<(), ConfigError> {
    let context = EditorContext::from_config(config)?;
    let delay = config.diagnostics_delay_ms;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(move |client| Backend {
        state: Arc::new(State::new(client, context, delay)),
    });
    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}
