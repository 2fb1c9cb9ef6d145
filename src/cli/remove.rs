// src/cli/remove.rs
use crate::error::ServiceResult;
use crate::service::SheetsApi;

pub fn run(api: &SheetsApi, owner: &str, key: &str) -> ServiceResult<()> {
    api.remove(owner, key)?;
    println!("Removed endpoint {}", key);
    Ok(())
}
