//! Utility functions for CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use faceid_engine::{EmbeddingStore, FaceService};
use faceid_store::RedbBackend;

use super::cli_config::{load_config, Config};
use crate::Cli;

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(cli.config.as_deref())
}

/// Opens the identity store and wraps it in a service.
pub fn open_service(cli: &Cli) -> anyhow::Result<FaceService> {
    let cfg = get_config(cli)?;
    let path = cfg.resolve_store_path(cli.store.as_deref())?;
    print_verbose(cli, &format!("store: {}", path.display()));

    let backend = RedbBackend::open(&path)
        .with_context(|| format!("open store {}", path.display()))?;
    let store = EmbeddingStore::open(Box::new(backend), cfg.engine.store_options())
        .with_context(|| format!("load store {}", path.display()))?;
    Ok(FaceService::new(Arc::new(store), &cfg.engine)?)
}

/// Loads a request from a YAML or JSON file.
pub fn load_request<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("read input file {path}"))?;
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml");

    let result = match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };

    Ok(result)
}

/// Requires input file to be provided.
pub fn require_input_file(cli: &Cli) -> anyhow::Result<&str> {
    cli.input
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("input file is required, use -f flag"))
}

/// Parses "0.1, 0.2,0.3" into a vector.
pub fn parse_embedding(s: &str) -> anyhow::Result<Vec<f32>> {
    let values = s
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<f32>()
                .with_context(|| format!("invalid embedding component {p:?}"))
        })
        .collect::<anyhow::Result<Vec<f32>>>()?;
    if values.is_empty() {
        anyhow::bail!("embedding is empty");
    }
    Ok(values)
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };
    print!("{}", output);
    Ok(())
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints info message.
pub fn print_info(msg: &str) {
    eprintln!("\x1b[34mℹ\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embeddings() {
        assert_eq!(parse_embedding("0.5, -1,2e-1").unwrap(), vec![0.5, -1.0, 0.2]);
        assert_eq!(parse_embedding("1,2,").unwrap(), vec![1.0, 2.0]);
        assert!(parse_embedding("").is_err());
        assert!(parse_embedding("1,x,3").is_err());
    }

    #[test]
    fn loads_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("v.json");
        std::fs::write(&json, "[1.0, 2.0]").unwrap();
        let yaml = dir.path().join("v.yaml");
        std::fs::write(&yaml, "- 3.0\n- 4.0\n").unwrap();

        let v: Vec<f32> = load_request(json.to_str().unwrap()).unwrap();
        assert_eq!(v, vec![1.0, 2.0]);
        let v: Vec<f32> = load_request(yaml.to_str().unwrap()).unwrap();
        assert_eq!(v, vec![3.0, 4.0]);
    }
}
