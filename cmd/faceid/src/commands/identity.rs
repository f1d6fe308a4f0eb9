//! Identity listing and removal commands.

use clap::Args;
use serde::Serialize;

use faceid_engine::IdentitySummary;

use super::{open_service, output_result, print_info, print_success};
use crate::Cli;

/// List enrolled identities in enrollment order.
#[derive(Args)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        let identities = svc.list_identities();

        if cli.json {
            return output_result(&identities, true);
        }
        if identities.is_empty() {
            print_info("No identities enrolled");
            return Ok(());
        }

        println!("{:<8} {:<24} {:<8} {}", "ID", "NAME", "SOURCES", "CREATED");
        for s in &identities {
            println!(
                "{:<8} {:<24} {:<8} {}",
                s.id,
                s.name,
                s.source_count,
                s.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Ok(())
    }
}

/// Show one identity.
#[derive(Args)]
pub struct ShowCommand {
    /// Identity id
    id: u64,

    /// Include the stored embedding
    #[arg(long)]
    embedding: bool,
}

#[derive(Serialize)]
struct IdentityView {
    #[serde(flatten)]
    summary: IdentitySummary,
    dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
}

impl ShowCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        let record = svc.get_identity(self.id)?;
        let view = IdentityView {
            summary: IdentitySummary::from(record.as_ref()),
            dimension: record.embedding.len(),
            embedding: self.embedding.then(|| record.embedding.clone()),
        };
        output_result(&view, cli.json)
    }
}

/// Remove an identity. Its id is never reused.
#[derive(Args)]
pub struct RemoveCommand {
    /// Identity id
    id: u64,
}

impl RemoveCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        let record = svc.get_identity(self.id)?;
        svc.remove_identity(self.id)?;
        print_success(&format!(
            "Removed identity {} ({})",
            record.id, record.name
        ));
        Ok(())
    }
}
