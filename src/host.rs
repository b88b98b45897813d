//! JSON-lines bridge between an [`Editor`] and a host process.
//!
//! Each input line is `{"method": NAME, "params": [ARGS...]}`. Events go out
//! as `{"event": NAME, "payload": STRING}`; queries answer with
//! `{"method": NAME, "result": VALUE}` and failures with
//! `{"method": NAME, "error": MESSAGE}`.
//!
//! Breakpoint toggles are reported once the coalescing window closes. The
//! window is a deadline inside the same `select!` loop that reads input, so
//! commands and the timer never run concurrently.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::editor::{Command, Editor};
use crate::model::HostEvent;

#[derive(Debug, Deserialize)]
struct Request {
    method: String,
    #[serde(default)]
    params: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outbound {
    Event(HostEvent),
    Reply { method: String, result: Value },
    Failure { method: String, error: String },
}

/// Positional arguments of one request.
struct Params<'a>(&'a [Value]);

impl Params<'_> {
    fn value(&self, index: usize) -> Result<&Value> {
        self.0
            .get(index)
            .with_context(|| format!("missing argument {}", index + 1))
    }

    /// A JSON payload argument; strings are taken as JSON text.
    fn payload(&self, index: usize) -> Result<String> {
        Ok(match self.value(index)? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn text(&self, index: usize) -> Result<&str> {
        self.value(index)?
            .as_str()
            .with_context(|| format!("argument {} must be a string", index + 1))
    }

    fn line(&self, index: usize) -> Result<u32> {
        self.value(index)?
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .with_context(|| format!("argument {} must be a line number", index + 1))
    }

    fn flag(&self, index: usize) -> bool {
        self.0.get(index).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Apply one request; `Some` carries a query result.
fn dispatch(editor: &mut Editor, request: &Request) -> Result<Option<Value>> {
    let p = Params(&request.params);
    match request.method.as_str() {
        "setContent" => editor.set_content(p.text(0)?),
        "getContent" => return Ok(Some(Value::String(editor.content()))),
        "edit" => {
            let lines: Vec<String> = serde_json::from_value(p.value(2)?.clone())
                .context("argument 3 must be a list of lines")?;
            editor.apply_edit(p.line(0)?, p.line(1)?, lines);
        }
        "setKeywords" => editor.set_keywords(&p.payload(0)?)?,
        "setElements" => editor.set_elements(&p.payload(0)?, p.flag(1))?,
        "setVariables" => editor.set_variables(&p.payload(0)?, p.flag(1))?,
        "setStepList" => editor.set_step_list(&p.payload(0)?, p.flag(1))?,
        "setSyntaxMessage" => editor.set_syntax_message(p.text(0)?),
        "setErrorLinks" => editor.set_error_links(&p.payload(0)?)?,
        "getProblems" => return Ok(Some(serde_json::to_value(editor.problems())?)),
        "decorateBreakpoints" => editor.decorate_breakpoints(&p.payload(0)?)?,
        "getBreakpoints" => return Ok(Some(serde_json::to_value(editor.breakpoints())?)),
        "toggleBreakpoint" => {
            editor.toggle_breakpoint(p.line(0)?);
        }
        "hover" => {
            let line = match p.0.first() {
                None | Some(Value::Null) => None,
                Some(_) => Some(p.line(0)?),
            };
            editor.hover_gutter(line);
        }
        "setCursor" => editor.set_cursor(p.line(0)?),
        "setHighlight" => editor.set_highlight(p.text(0)?, &p.payload(1)?)?,
        "getHighlight" => return Ok(Some(json!(editor.get_highlight(p.text(0)?)))),
        "showError" => editor.show_error(p.line(0)?, p.text(1)?, p.text(2)?),
        "showCode" => editor.show_code(p.line(0)?, p.text(1)?, p.text(2)?),
        "clearErrors" => editor.clear_errors(),
        "clear" => editor.clear(),
        "startDebugging" => editor.execute(Command::StartDebugging),
        "startDebuggingAtStep" => editor.execute(Command::StartDebuggingAtStep),
        "startDebuggingAtStepAndContinue" => {
            editor.execute(Command::StartDebuggingAtStepAndContinue)
        }
        "startDebuggingAtEntry" => editor.execute(Command::StartDebuggingAtEntry),
        "stepOver" => editor.execute(Command::StepOver),
        "toggleBreakpointAtCursor" => editor.execute(Command::ToggleBreakpoint),
        other => bail!("unknown method: {other}"),
    }
    Ok(None)
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, message: &Outbound) -> Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

async fn send_events<W: AsyncWrite + Unpin>(writer: &mut W, editor: &mut Editor) -> Result<()> {
    for event in editor.drain_events() {
        send(writer, &Outbound::Event(event)).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Serve requests from `reader` until it reaches end of input.
///
/// A report still pending at end of input is sent before returning.
pub async fn run<R, W>(
    mut editor: Editor,
    reader: R,
    mut writer: W,
    report_delay: Duration,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read host input")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                handle_line(&mut editor, &line, &mut writer).await?;
                deadline = match (editor.is_report_pending(), deadline) {
                    (false, _) => None,
                    (true, None) => Some(Instant::now() + report_delay),
                    (true, open) => open,
                };
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                editor.flush_breakpoints();
                send_events(&mut writer, &mut editor).await?;
            }
        }
    }

    editor.flush_breakpoints();
    send_events(&mut writer, &mut editor).await
}

async fn handle_line<W: AsyncWrite + Unpin>(
    editor: &mut Editor,
    line: &str,
    writer: &mut W,
) -> Result<()> {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("unparseable host request: {e}");
            let failure = Outbound::Failure {
                method: String::new(),
                error: format!("invalid request: {e}"),
            };
            send(writer, &failure).await?;
            return send_events(writer, editor).await;
        }
    };
    debug!(method = %request.method, "host request");

    match dispatch(editor, &request) {
        Ok(None) => {}
        Ok(Some(result)) => {
            let reply = Outbound::Reply {
                method: request.method.clone(),
                result,
            };
            send(writer, &reply).await?;
        }
        Err(e) => {
            warn!(method = %request.method, "host request failed: {e:#}");
            let failure = Outbound::Failure {
                method: request.method.clone(),
                error: format!("{e:#}"),
            };
            send(writer, &failure).await?;
        }
    }
    send_events(writer, editor).await
}

/// Run the bridge on the process's stdin and stdout.
pub async fn serve_stdio(editor: Editor, report_delay: Duration) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run(editor, stdin, tokio::io::stdout(), report_delay).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, BufReader};

    const DELAY: Duration = Duration::from_millis(100);

    async fn run_script(script: &str) -> Vec<Value> {
        let mut output = Vec::new();
        run(Editor::default(), script.as_bytes(), &mut output, DELAY)
            .await
            .unwrap();
        parse_output(&output)
    }

    fn parse_output(bytes: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(bytes)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    // ── dispatch ──

    #[tokio::test]
    async fn queries_reply_with_results() {
        let out = run_script(concat!(
            r#"{"method":"setContent","params":["a\nb\nc"]}"#,
            "\n",
            r#"{"method":"setHighlight","params":["complete",[1,3]]}"#,
            "\n",
            r#"{"method":"getHighlight","params":["complete"]}"#,
            "\n",
        ))
        .await;
        assert_eq!(out[0], json!({"event": "CONTENT_DID_CHANGE"}));
        assert_eq!(out[1], json!({"method": "getHighlight", "result": [1, 3]}));
    }

    #[tokio::test]
    async fn failures_are_reported_and_survived() {
        let out = run_script(concat!(
            "not json\n",
            r#"{"method":"setKeywords","params":["{oops"]}"#,
            "\n",
            r#"{"method":"fly"}"#,
            "\n",
            r#"{"method":"getContent"}"#,
            "\n",
        ))
        .await;
        assert_eq!(out.len(), 4);
        assert!(out[0]["error"].as_str().unwrap().starts_with("invalid request"));
        assert_eq!(out[1]["method"], "setKeywords");
        assert!(out[1]["error"].as_str().unwrap().contains("keywords"));
        assert_eq!(out[2]["error"], "unknown method: fly");
        assert_eq!(out[3], json!({"method": "getContent", "result": ""}));
    }

    #[tokio::test]
    async fn pending_report_flushed_at_end_of_input() {
        let out = run_script(concat!(
            r#"{"method":"toggleBreakpoint","params":[2]}"#,
            "\n",
        ))
        .await;
        assert_eq!(
            out,
            vec![json!({
                "event": "UPDATE_BREAKPOINTS",
                "payload": r#"[{"lineNumber":2,"enable":true}]"#
            })]
        );
    }

    // ── coalescing window ──

    #[tokio::test(start_paused = true)]
    async fn toggles_coalesce_within_window() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut client_read, mut client_write) = tokio::io::split(client);

        let bridge = tokio::spawn(run(
            Editor::default(),
            BufReader::new(server_read),
            server_write,
            DELAY,
        ));

        for line in [3, 5, 3] {
            let request = format!("{{\"method\":\"toggleBreakpoint\",\"params\":[{line}]}}\n");
            client_write.write_all(request.as_bytes()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(DELAY * 2).await;

        client_write
            .write_all(b"{\"method\":\"getBreakpoints\"}\n")
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();
        bridge.await.unwrap().unwrap();

        let mut output = Vec::new();
        client_read.read_to_end(&mut output).await.unwrap();
        let out = parse_output(&output);
        assert_eq!(
            out,
            vec![
                json!({
                    "event": "UPDATE_BREAKPOINTS",
                    "payload": r#"[{"lineNumber":5,"enable":true}]"#
                }),
                json!({"method": "getBreakpoints", "result": [{"lineNumber": 5, "enable": true}]}),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn host_push_cancels_window() {
        let out = run_script(concat!(
            r#"{"method":"toggleBreakpoint","params":[1]}"#,
            "\n",
            r#"{"method":"decorateBreakpoints","params":[[{"lineNumber":4,"enable":false}]]}"#,
            "\n",
        ))
        .await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn commands_fire_events() {
        let out = run_script(concat!(
            r#"{"method":"setContent","params":["a\nb"]}"#,
            "\n",
            r#"{"method":"setCursor","params":[2]}"#,
            "\n",
            r#"{"method":"stepOver"}"#,
            "\n",
        ))
        .await;
        assert_eq!(out[1], json!({"event": "STEP_OVER", "payload": "2"}));
    }
}
