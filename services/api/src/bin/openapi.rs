//! services/api/src/bin/openapi.rs
//!
//! Writes the API's OpenAPI 3.0 document to `openapi.json` so it can be
//! committed or fed to client generators without starting the server.

use api_lib::web::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());
    let document = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, document)?;
    println!("cardsmith OpenAPI document written to {path}");
    Ok(())
}
