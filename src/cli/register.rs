// src/cli/register.rs
use crate::error::ServiceResult;
use crate::service::SheetsApi;

pub async fn run(
    api: &SheetsApi,
    owner: &str,
    name: &str,
    sheet_id: &str,
    range: Option<&str>,
) -> ServiceResult<()> {
    let registration = api.register(owner, name, sheet_id, range).await?;
    let endpoint = &registration.endpoint;

    println!("{}\n", registration.message);
    println!("  Key:      {}", endpoint.key);
    println!("  Path:     {}", endpoint.endpoint_path);
    println!("  Sheet:    {}", endpoint.spreadsheet_id);
    println!("  Range:    {}", endpoint.range);
    match registration.access {
        Some(access) => println!(
            "  Access:   readable={} writable={}",
            access.readable, access.writable
        ),
        None => println!("  Access:   unknown (probe failed)"),
    }
    println!("  Share with: {}", registration.share_with);
    Ok(())
}
