use std::path::Path;

use sitesync_core::{Mutation, Operation, ServerId};

use crate::commands::common::{open_service, resolve_payload};
use crate::error::CliError;

pub async fn run_enqueue(
    entity: &str,
    op: Operation,
    payload: Option<&str>,
    server_id: Option<&str>,
    client_version: Option<i64>,
    db_path: &Path,
) -> Result<(), CliError> {
    let entity = entity.trim();
    if entity.is_empty() {
        return Err(CliError::EmptyEntity);
    }

    let mut mutation = Mutation::new(entity, op, resolve_payload(payload)?);
    if let Some(server_id) = server_id.map(str::trim).filter(|id| !id.is_empty()) {
        mutation = mutation.with_server_id(server_id.parse::<ServerId>()?);
    }
    if let Some(version) = client_version {
        mutation = mutation.with_client_version(version);
    }

    let service = open_service(db_path).await?;
    let offline_id = service.queue().enqueue(mutation).await?;
    println!("{offline_id}");
    Ok(())
}
