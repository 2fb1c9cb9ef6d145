// src/cli/list.rs
use crate::error::ServiceResult;
use crate::service::SheetsApi;

pub fn run(api: &SheetsApi, owner: &str) -> ServiceResult<()> {
    let endpoints = api.list(owner)?;
    if endpoints.is_empty() {
        println!("No endpoints registered for {}", owner);
        return Ok(());
    }

    println!("=== Endpoints for {} ===\n", owner);
    println!("{:<34} {:<20} {:<20} {}", "Key", "Name", "Range", "Created");
    println!("{}", "-".repeat(100));
    for endpoint in endpoints {
        println!(
            "{:<34} {:<20} {:<20} {}",
            endpoint.key,
            endpoint.name,
            endpoint.range,
            endpoint.created_at.to_rfc3339()
        );
    }
    Ok(())
}
