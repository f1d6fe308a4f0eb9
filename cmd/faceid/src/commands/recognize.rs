//! Recognize command.

use clap::Args;
use serde::Serialize;

use faceid_engine::MatchResult;

use super::{load_request, open_service, output_result, parse_embedding, print_verbose};
use crate::Cli;

/// Match an embedding against enrolled identities.
///
/// The query comes from --embedding "0.1,0.2,..." or from -f, a JSON/YAML
/// file holding an array of numbers.
#[derive(Args)]
pub struct RecognizeCommand {
    /// Comma-separated query embedding
    #[arg(long, short = 'e')]
    embedding: Option<String>,
}

#[derive(Debug, Serialize)]
struct RecognizeOutput {
    label: String,
    known: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    /// Closest identity, even when below the threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    closest: Option<String>,
    /// None when the store is empty.
    score: Option<f64>,
    metric: String,
    threshold: f64,
}

impl RecognizeOutput {
    fn new(result: &MatchResult, threshold: f64) -> Self {
        Self {
            label: result.label().to_string(),
            known: result.is_known,
            id: result.record.as_ref().map(|r| r.id),
            closest: result.record.as_ref().map(|r| r.name.clone()),
            score: result.record.as_ref().map(|_| result.score),
            metric: result.metric.to_string(),
            threshold,
        }
    }
}

impl RecognizeCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let query = match (&self.embedding, cli.input.as_deref()) {
            (Some(s), None) => parse_embedding(s)?,
            (None, Some(path)) => load_request::<Vec<f32>>(path)?,
            (Some(_), Some(_)) => anyhow::bail!("use either --embedding or -f, not both"),
            (None, None) => anyhow::bail!("query embedding is required, use --embedding or -f"),
        };
        print_verbose(cli, &format!("query dimension: {}", query.len()));

        let svc = open_service(cli)?;
        let result = svc.recognize(&query)?;
        output_result(&RecognizeOutput::new(&result, svc.engine().threshold()), cli.json)
    }
}
