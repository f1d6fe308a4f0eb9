//! Register command.

use clap::Args;
use serde::Deserialize;

use faceid_engine::{Candidate, IdentitySummary};

use super::{
    load_request, open_service, output_result, print_success, print_warning, require_input_file,
};
use crate::Cli;

/// Enroll an identity from sample embeddings.
///
/// The -f file is a JSON/YAML array; each entry is either a bare vector or
/// an object `{embedding: [...], quality_ok: false}` for a sample that
/// failed upstream checks. Samples are averaged into one identity.
#[derive(Args)]
pub struct RegisterCommand {
    /// Identity name
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidateInput {
    Bare(Vec<f32>),
    Full {
        #[serde(default)]
        embedding: Vec<f32>,
        #[serde(default = "default_quality_ok")]
        quality_ok: bool,
    },
}

fn default_quality_ok() -> bool {
    true
}

impl From<CandidateInput> for Candidate {
    fn from(c: CandidateInput) -> Self {
        match c {
            CandidateInput::Bare(embedding) => Candidate::accepted(embedding),
            CandidateInput::Full {
                embedding,
                quality_ok,
            } => Candidate {
                embedding,
                quality_ok,
            },
        }
    }
}

impl RegisterCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let path = require_input_file(cli)?;
        let inputs: Vec<CandidateInput> = load_request(path)?;
        if inputs.is_empty() {
            print_warning("candidate file is empty");
        }
        let candidates: Vec<Candidate> = inputs.into_iter().map(Candidate::from).collect();

        let svc = open_service(cli)?;
        let record = svc.register(&self.name, candidates)?;
        print_success(&format!(
            "Registered {} as id {} from {} sample(s)",
            record.name, record.id, record.source_count
        ));
        output_result(&IdentitySummary::from(record.as_ref()), cli.json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_and_full_entries() {
        let json = r#"[
            [1.0, 0.0],
            {"embedding": [0.0, 1.0]},
            {"embedding": [5.0, 5.0], "quality_ok": false},
            {"quality_ok": false}
        ]"#;
        let inputs: Vec<CandidateInput> = serde_json::from_str(json).unwrap();
        let got: Vec<Candidate> = inputs.into_iter().map(Candidate::from).collect();
        assert_eq!(
            got,
            vec![
                Candidate::accepted(vec![1.0, 0.0]),
                Candidate::accepted(vec![0.0, 1.0]),
                Candidate {
                    embedding: vec![5.0, 5.0],
                    quality_ok: false
                },
                Candidate::rejected(),
            ]
        );
    }
}
