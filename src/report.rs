use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::dispatcher::RunSummary;
use crate::prober::{ProbeOutcome, ProbeResult};
use crate::util::duration_ms;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Consumer of the result stream. `result` is called once per finished
/// probe in arrival order, `complete` exactly once after the last result.
pub trait Reporter {
    fn result(&mut self, result: &ProbeResult) -> io::Result<()>;
    fn complete(&mut self, summary: &RunSummary) -> io::Result<()>;
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn result(&mut self, result: &ProbeResult) -> io::Result<()> {
        (**self).result(result)
    }

    fn complete(&mut self, summary: &RunSummary) -> io::Result<()> {
        (**self).complete(summary)
    }
}

/// `<target> @ <duration>` per success, `<target> failed: <error>` per failure, then `Done`.
pub struct LineReporter<W> {
    out: W,
}

impl<W: Write> LineReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for LineReporter<W> {
    fn result(&mut self, result: &ProbeResult) -> io::Result<()> {
        match &result.outcome {
            ProbeOutcome::Success { elapsed, .. } => {
                writeln!(self.out, "{} @ {:?}", result.target, elapsed)?
            }
            ProbeOutcome::Failure(err) => writeln!(self.out, "{} failed: {}", result.target, err)?,
        }
        self.out.flush()
    }

    fn complete(&mut self, _summary: &RunSummary) -> io::Result<()> {
        writeln!(self.out, "Done")?;
        self.out.flush()
    }
}

#[derive(Serialize)]
struct JsonResult<'a> {
    target: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct JsonDone {
    done: bool,
    total: usize,
    succeeded: usize,
    failed: usize,
}

/// One JSON object per line, terminated by a `{"done":true,...}` record.
pub struct JsonReporter<W> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, value)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn result(&mut self, result: &ProbeResult) -> io::Result<()> {
        let (status, error) = match &result.outcome {
            ProbeOutcome::Success { status, .. } => (*status, None),
            ProbeOutcome::Failure(err) => (None, Some(err.to_string())),
        };
        let line = JsonResult {
            target: &result.target,
            success: result.outcome.is_success(),
            elapsed_ms: result.outcome.elapsed().map(duration_ms),
            status,
            error,
        };
        self.write_line(&line)
    }

    fn complete(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.write_line(&JsonDone {
            done: true,
            total: summary.total,
            succeeded: summary.succeeded,
            failed: summary.failed,
        })
    }
}

pub fn reporter_for<W: Write + 'static>(format: OutputFormat, out: W) -> Box<dyn Reporter> {
    match format {
        OutputFormat::Text => Box::new(LineReporter::new(out)),
        OutputFormat::Json => Box::new(JsonReporter::new(out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prober::ProbeError;
    use std::time::Duration;

    fn success(target: &str, ms: u64) -> ProbeResult {
        ProbeResult {
            target: target.into(),
            outcome: ProbeOutcome::Success {
                elapsed: Duration::from_millis(ms),
                status: Some(200),
            },
        }
    }

    fn failure(target: &str) -> ProbeResult {
        ProbeResult {
            target: target.into(),
            outcome: ProbeOutcome::Failure(ProbeError::Connect("connection refused".into())),
        }
    }

    #[test]
    fn text_lines() {
        let mut reporter = LineReporter::new(Vec::new());
        reporter.result(&success("https://a.example", 123)).unwrap();
        reporter.result(&failure("https://b.example")).unwrap();
        reporter
            .complete(&RunSummary {
                total: 2,
                succeeded: 1,
                failed: 1,
            })
            .unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            out,
            "https://a.example @ 123ms\n\
             https://b.example failed: connect failed: connection refused\n\
             Done\n"
        );
    }

    #[test]
    fn json_lines() {
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.result(&success("a", 10)).unwrap();
        reporter.result(&failure("b")).unwrap();
        reporter
            .complete(&RunSummary {
                total: 2,
                succeeded: 1,
                failed: 1,
            })
            .unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["target"], "a");
        assert_eq!(lines[0]["elapsed_ms"], 10.0);
        assert_eq!(lines[0]["status"], 200);
        assert_eq!(lines[1]["success"], false);
        assert!(lines[1].get("elapsed_ms").is_none());
        assert_eq!(lines[2]["done"], true);
        assert_eq!(lines[2]["failed"], 1);
    }

    #[test]
    fn output_format_parses_lowercase() {
        let format: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, OutputFormat::Json);
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }
}
