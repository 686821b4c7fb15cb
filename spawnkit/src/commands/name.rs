//! Structured sub-task names.

use anyhow::{Result, bail};
use colored::Colorize;

use spawnkit_core::NamingRecord;
use spawnkit_sdk::SpawnKit;

use crate::cli::{NameAction, NameCommand};
use crate::config::Config;

pub async fn execute(cmd: NameCommand, config: &Config) -> Result<()> {
    match cmd.action {
        NameAction::Allocate { parent, role, offline } => allocate(&parent, &role, offline, config).await,
        NameAction::Parse { name } => {
            let kit = offline_kit(config)?;
            match kit.parse(&name) {
                Some(record) => {
                    print_record(&kit, &record);
                    Ok(())
                }
                None => bail!("'{}' is not a valid structured name", name),
            }
        }
        NameAction::Migrate { label, parent } => {
            let kit = offline_kit(config)?;
            match kit.migrate_legacy(Some(&label), Some(&parent)) {
                Some(record) => {
                    print_record(&kit, &record);
                    Ok(())
                }
                None => bail!("No role for '{}' may run under {}", label, parent),
            }
        }
        NameAction::Roles { parent, json } => roles(parent.as_deref(), json, config),
    }
}

/// Naming needs no telemetry; the demo provider is never fetched here.
fn offline_kit(config: &Config) -> Result<SpawnKit> {
    let provider = std::sync::Arc::new(spawnkit_core::provider::DemoProvider::default());
    Ok(SpawnKit::new(provider, config.one_shot_engine())?)
}

async fn allocate(parent: &str, role: &str, offline: bool, config: &Config) -> Result<()> {
    let kit = if offline {
        offline_kit(config)?
    } else {
        let kit = super::open(config, config.one_shot_engine())?;
        // Names already visible in the snapshot count as taken.
        kit.init().await;
        kit
    };

    let record = kit.allocate(parent, role)?;
    print_record(&kit, &record);
    Ok(())
}

fn print_record(kit: &SpawnKit, record: &NamingRecord) {
    println!("{}", record.to_string().green().bold());
    println!("  Parent:   {}", record.parent_key.display_name());
    println!("  Role:     {}", record.role_key);
    println!("  Id:       {}", record.id_suffix);
    if let Some(short) = kit.abbreviated(record) {
        println!("  Short:    {}", short);
    }
}

fn roles(parent: Option<&str>, json: bool, config: &Config) -> Result<()> {
    let kit = offline_kit(config)?;
    let roles = match parent {
        Some(parent) => kit.available_roles(parent)?,
        None => {
            let listing = kit.list_roles();
            listing.core.into_iter().chain(listing.custom).collect()
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&roles)?);
        return Ok(());
    }

    for role in &roles {
        let parents: Vec<&str> = role.parents.iter().map(|p| p.display_name()).collect();
        println!(
            "  {:<16} {:<5} {:<8} {}",
            role.name.bold(),
            role.abbreviation.cyan(),
            role.category,
            parents.join(", ").dimmed()
        );
    }
    println!();
    println!("  {} roles", roles.len());
    Ok(())
}
