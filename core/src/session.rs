//! Session files
//!
//! A session bundles a set of computations, the one to spawn, and a driver
//! script of engine operations. Running it produces a transcript with one
//! entry per operation. Engine errors are recorded in the transcript rather
//! than aborting the run, so a script can exercise misuse as well.

use crate::engine::{
    Computation, Engine, EngineError, Envelope, FrameId, FrameStatus, Injection, Outcome, Val,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub computations: Vec<Computation>,
    /// Computation the driven Frame is spawned from
    pub main: String,
    #[serde(default)]
    pub args: Vec<Val>,
    pub script: Vec<DriverOp>,
}

/// One driver operation applied to the main Frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DriverOp {
    Start,
    Resume {
        #[serde(default)]
        value: Val,
    },
    /// Either `kind` (with an optional `payload`) or a full `envelope`
    Inject {
        #[serde(default)]
        kind: Option<String>,
        #[serde(default)]
        payload: Option<Val>,
        #[serde(default)]
        envelope: Option<Envelope>,
    },
    Close,
    Status,
}

impl DriverOp {
    pub fn name(&self) -> &'static str {
        match self {
            DriverOp::Start => "start",
            DriverOp::Resume { .. } => "resume",
            DriverOp::Inject { .. } => "inject",
            DriverOp::Close => "close",
            DriverOp::Status => "status",
        }
    }

    fn injection(&self) -> Option<Injection> {
        let DriverOp::Inject {
            kind,
            payload,
            envelope,
        } = self
        else {
            return None;
        };

        match (envelope, kind, payload) {
            (Some(envelope), _, _) => Some(Injection::Envelope(envelope.clone())),
            (None, Some(kind), Some(payload)) => {
                Some(Injection::KindWithPayload(kind.clone(), payload.clone()))
            }
            (None, Some(kind), None) => Some(Injection::Kind(kind.clone())),
            (None, None, _) => None,
        }
    }
}

/// Result of one driver operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub op: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FrameStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Values reported by any body during this operation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reports: Vec<Val>,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            writeln!(f, "  report {}", report)?;
        }
        write!(f, "{} -> ", self.op)?;
        match (&self.outcome, &self.status, &self.error) {
            (_, _, Some(error)) => write!(f, "error: {}", error),
            (Some(outcome), _, _) => write!(f, "{}", outcome),
            (None, Some(status), _) => write!(f, "{}", status),
            (None, None, None) => write!(f, "ok"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub frame: Option<FrameId>,
    pub entries: Vec<Entry>,
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl Session {
    /// Read a session from a `.json` or `.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)
                .with_context(|| format!("Invalid session file {}", path.display())),
            Some("toml") => toml::from_str(&contents)
                .with_context(|| format!("Invalid session file {}", path.display())),
            _ => bail!(
                "Unsupported session file {}: expected .json or .toml",
                path.display()
            ),
        }
    }

    /// Register the computations, spawn `main` and apply the script
    pub fn run(&self, engine: &mut Engine) -> Result<Transcript> {
        for computation in &self.computations {
            engine
                .register(computation.clone())
                .with_context(|| format!("Failed to register '{}'", computation.name))?;
        }

        let frame = engine
            .spawn(&self.main, self.args.clone())
            .with_context(|| format!("Failed to spawn '{}'", self.main))?;
        debug!(frame = %frame, main = %self.main, ops = self.script.len(), "running session");

        let entries = self
            .script
            .iter()
            .map(|op| apply(engine, frame, op))
            .collect();

        Ok(Transcript {
            frame: Some(frame),
            entries,
        })
    }
}

fn apply(engine: &mut Engine, frame: FrameId, op: &DriverOp) -> Entry {
    let mut entry = Entry {
        op: op.name().to_string(),
        outcome: None,
        status: None,
        error: None,
        reports: Vec::new(),
    };

    let result: Result<Option<Outcome>, EngineError> = match op {
        DriverOp::Start => engine.start(frame).map(Some),
        DriverOp::Resume { value } => engine.resume(frame, value.clone()).map(Some),
        DriverOp::Inject { .. } => match op.injection() {
            Some(injection) => engine.inject(frame, injection).map(Some),
            None => {
                entry.error = Some("inject needs a kind or an envelope".to_string());
                Ok(None)
            }
        },
        DriverOp::Close => engine.close(frame).map(Some),
        DriverOp::Status => engine.status(frame).map(|status| {
            entry.status = Some(status);
            None
        }),
    };

    match result {
        Ok(outcome) => entry.outcome = outcome,
        Err(e) => entry.error = Some(e.to_string()),
    }
    entry.reports = engine
        .drain_reports()
        .into_iter()
        .map(|report| report.value)
        .collect();
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::io::Write;

    const DEMO: &str = include_str!("../../demos/delegation_throw.json");

    fn demo() -> Session {
        serde_json::from_str(DEMO).expect("demo session parses")
    }

    #[test]
    fn test_demo_transcript() {
        let mut engine = Engine::new(EngineConfig::default());
        let transcript = demo().run(&mut engine).unwrap();

        let outcomes: Vec<_> = transcript
            .entries
            .iter()
            .map(|e| e.outcome.clone())
            .collect();
        assert_eq!(
            outcomes,
            vec![
                Some(Outcome::Suspended(Val::Num(1.0))),
                Some(Outcome::Suspended(Val::Str("str1".into()))),
                Some(Outcome::Failed(Envelope::of_kind("DownstreamFailure"))),
                None,
                None,
            ]
        );

        // The handler inside the inner computation reports the injected kind
        assert_eq!(
            transcript.entries[1].reports,
            vec![Val::Str("UpstreamSignal".into())]
        );
        assert_eq!(transcript.entries[3].status, Some(FrameStatus::Failed));
        assert!(transcript.entries[4]
            .error
            .as_deref()
            .unwrap()
            .contains("already finished"));
    }

    #[test]
    fn test_transcript_text() {
        let mut engine = Engine::default();
        let text = demo().run(&mut engine).unwrap().to_string();

        assert!(text.contains("start -> suspended 1"));
        assert!(text.contains("  report \"UpstreamSignal\""));
        assert!(text.contains("resume -> failed DownstreamFailure"));
        assert!(text.contains("status -> failed"));
    }

    #[test]
    fn test_load_toml_session() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(
            br#"
main = "pair"

[[computations]]
name = "pair"

[computations.body]
t = "Block"
body = [
    { t = "Expr", expr = { t = "Yield", value = { t = "LitNum", v = 1.0 } } },
    { t = "Return", value = { t = "LitStr", v = "done" } },
]

[[script]]
op = "start"

[[script]]
op = "resume"

[[script]]
op = "resume"
"#,
        )
        .unwrap();

        let session = Session::load(file.path()).unwrap();
        let mut engine = Engine::default();
        let transcript = session.run(&mut engine).unwrap();

        assert_eq!(
            transcript.entries[1].outcome,
            Some(Outcome::Completed(Val::Str("done".into())))
        );
        assert!(transcript.entries[2].error.is_some());
    }

    #[test]
    fn test_inject_without_kind_is_recorded() {
        let mut session = demo();
        session.script = vec![
            DriverOp::Start,
            DriverOp::Inject {
                kind: None,
                payload: None,
                envelope: None,
            },
        ];

        let mut engine = Engine::default();
        let transcript = session.run(&mut engine).unwrap();
        assert!(transcript.entries[1].error.is_some());
        assert_eq!(
            engine.status(transcript.frame.unwrap()).unwrap(),
            FrameStatus::Suspended
        );
    }

    #[test]
    fn test_unknown_main_fails() {
        let mut session = demo();
        session.main = "missing".to_string();

        let mut engine = Engine::default();
        assert!(session.run(&mut engine).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(Session::load(file.path()).is_err());
    }
}
