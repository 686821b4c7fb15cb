//! One refresh, printed as JSON.

use anyhow::Result;

use crate::config::Config;

pub async fn execute(compact: bool, config: &Config) -> Result<()> {
    let kit = super::open(config, config.one_shot_engine())?;
    kit.init().await;

    let snapshot = kit.snapshot();
    let out = if compact {
        serde_json::to_string(&*snapshot)?
    } else {
        serde_json::to_string_pretty(&*snapshot)?
    };
    println!("{}", out);
    Ok(())
}
