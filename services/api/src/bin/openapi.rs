//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the Idea Namer API. The output path is the
//! first argument and defaults to `openapi.json`.

use api_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn output_path(mut args: impl Iterator<Item = String>) -> PathBuf {
    args.next()
        .filter(|arg| !arg.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = output_path(std::env::args().skip(1));
    let document = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, document)?;
    println!("OpenAPI document written to {}", path.display());
    Ok(())
}
