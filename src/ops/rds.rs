//! RDS database instance commands.

use std::io::BufRead;

use crate::error::{OpsError, OpsResult};
use crate::ops::resolve_id;
use crate::providers::{RdsApi, ResourceDescriptor};
use crate::style::{self, Level};

/// `nimbus rds list`.
pub fn list(api: &dyn RdsApi) -> OpsResult<()> {
    style::line(Level::Info, "Listing RDS Instances...");
    println!();

    let databases = api.list_db_instances()?;
    if databases.is_empty() {
        style::line(Level::Warn, "No RDS instances found");
        return Ok(());
    }

    style::line(
        Level::Success,
        &format!("{:<30} {:<12} {:<12} {}", "Identifier", "Engine", "Status", "Endpoint"),
    );
    style::separator(90);
    for db in &databases {
        let row = format!(
            "{:<30} {:<12} {:<12} {}",
            db.id,
            db.engine,
            db.status,
            db.endpoint.as_deref().unwrap_or("N/A"),
        );
        println!("{}", style::state_row(&db.status, &row));
    }
    Ok(())
}

/// `nimbus rds describe [ID]` - raw JSON for the instance.
pub fn describe<R: BufRead>(input: &mut R, api: &dyn RdsApi, id: Option<String>) -> OpsResult<()> {
    let Some(db_id) = pick(input, api, id, "describe")? else {
        return Ok(());
    };
    let value = api.describe_db_instance(&db_id)?;
    println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
    Ok(())
}

/// `nimbus rds start [ID]`.
pub fn start<R: BufRead>(input: &mut R, api: &dyn RdsApi, id: Option<String>) -> OpsResult<()> {
    let Some(db_id) = pick(input, api, id, "start")? else {
        return Ok(());
    };
    println!("Starting database {db_id}...");
    match api.start_db_instance(&db_id) {
        Ok(()) => style::line(Level::Success, &format!("✓ Database {db_id} is starting")),
        Err(OpsError::AlreadyInState { detail }) => {
            style::line(Level::Warn, &format!("Database {db_id} needs no start ({detail})"));
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// `nimbus rds stop [ID]`.
pub fn stop<R: BufRead>(input: &mut R, api: &dyn RdsApi, id: Option<String>) -> OpsResult<()> {
    let Some(db_id) = pick(input, api, id, "stop")? else {
        return Ok(());
    };
    println!("Stopping database {db_id}...");
    match api.stop_db_instance(&db_id) {
        Ok(()) => style::line(Level::Success, &format!("✓ Database {db_id} is stopping")),
        Err(OpsError::AlreadyInState { detail }) => {
            style::line(Level::Warn, &format!("Database {db_id} needs no stop ({detail})"));
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

fn pick<R: BufRead>(
    input: &mut R,
    api: &dyn RdsApi,
    supplied: Option<String>,
    purpose: &str,
) -> OpsResult<Option<String>> {
    let candidates = || {
        Ok(api
            .list_db_instances()?
            .iter()
            .map(|db| ResourceDescriptor {
                id: db.id.clone(),
                name: db.engine.clone(),
                state: db.status.clone(),
            })
            .collect())
    };
    resolve_id(input, supplied, candidates, purpose)
}
