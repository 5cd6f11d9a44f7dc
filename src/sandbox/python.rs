// src/sandbox/python.rs
//! Worker backed by a Python child process.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use super::{ExecutionOutcome, Sandbox, SandboxWorker};
use crate::errors::{GraderError, Result};

/// Reads the source from stdin, runs it as `__main__` under the filename
/// `<exec>` and prints one JSON line with either the value of the trailing
/// expression or the formatted traceback.
const BOOTSTRAP: &str = r#"
import ast, json, sys, traceback, types

def _answer(payload):
    sys.__stdout__.write(json.dumps(payload) + "\n")
    sys.__stdout__.flush()

def _run(source):
    module = types.ModuleType("__main__")
    sys.modules["__main__"] = module
    namespace = module.__dict__
    tree = ast.parse(source, "<exec>", "exec")
    last = None
    if tree.body and isinstance(tree.body[-1], ast.Expr):
        last = ast.Expression(tree.body.pop().value)
    exec(compile(tree, "<exec>", "exec"), namespace)
    if last is None:
        return ""
    value = eval(compile(last, "<exec>", "eval"), namespace)
    return "" if value is None else str(value)

try:
    _answer({"results": _run(sys.stdin.read())})
except BaseException:
    _answer({"error": {"message": traceback.format_exc()}})
"#;

/// Spawns one `python -I -c <bootstrap>` process per run.
#[derive(Debug, Clone)]
pub struct PythonSandbox {
    interpreter: String,
}

impl PythonSandbox {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl Default for PythonSandbox {
    fn default() -> Self {
        Self::new("python3")
    }
}

#[async_trait]
impl Sandbox for PythonSandbox {
    async fn spawn(&self) -> Result<Box<dyn SandboxWorker>> {
        let mut child = Command::new(&self.interpreter)
            .arg("-I")
            .arg("-c")
            .arg(BOOTSTRAP)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GraderError::Channel {
                message: format!("failed to start interpreter: {}", e),
                filename: Some(self.interpreter.clone()),
                lineno: None,
            })?;

        log::debug!("Started {} worker (pid {:?})", self.interpreter, child.id());

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        Ok(Box::new(PythonWorker {
            interpreter: self.interpreter.clone(),
            child,
            stdin,
            stdout,
            stderr,
        }))
    }
}

pub struct PythonWorker {
    interpreter: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl PythonWorker {
    fn fault(&self, message: impl Into<String>) -> GraderError {
        GraderError::Channel {
            message: message.into(),
            filename: Some(self.interpreter.clone()),
            lineno: None,
        }
    }
}

/// Picks the worker's answer out of its stdout. Only the last non-empty
/// line is the protocol message.
fn parse_answer(stdout: &str) -> Option<ExecutionOutcome> {
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line).ok()
}

#[async_trait]
impl SandboxWorker for PythonWorker {
    async fn post(&mut self, source: &str) -> Result<()> {
        let mut stdin = self
            .stdin
            .take()
            .ok_or_else(|| self.fault("source already posted"))?;
        stdin
            .write_all(source.as_bytes())
            .await
            .map_err(|e| self.fault(format!("failed to send source: {}", e)))?;
        // Closing stdin marks the end of the source.
        drop(stdin);
        Ok(())
    }

    async fn recv(&mut self) -> Result<ExecutionOutcome> {
        let mut stdout = self.stdout.take().ok_or_else(|| self.fault("no stdout"))?;
        let mut stderr = self.stderr.take();

        let mut out = String::new();
        let mut err = String::new();
        let (out_res, _) = tokio::join!(stdout.read_to_string(&mut out), async {
            if let Some(stderr) = stderr.as_mut() {
                let _ = stderr.read_to_string(&mut err).await;
            }
        });
        out_res.map_err(|e| self.fault(format!("failed to read worker output: {}", e)))?;

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| self.fault(format!("failed to wait for worker: {}", e)))?;

        parse_answer(&out).ok_or_else(|| {
            self.fault(format!(
                "worker exited ({}) without an answer: {}",
                status,
                err.trim()
            ))
        })
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.child.kill().await {
            log::debug!("Worker already gone: {}", e);
        }
    }
}
