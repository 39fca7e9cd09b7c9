//! The `aptly recommend` command.

use std::path::Path;

use anyhow::Result;
use comfy_table::Table;

use aptly_core::recommend::recommend;

use super::{open_engine, resolve_user};

pub fn execute(user: String, config_path: Option<&Path>) -> Result<()> {
    let (_, engine) = open_engine(config_path)?;
    let user = resolve_user(&engine, &user)?;
    let attempts = engine.ledger().list_attempts_for_user(&user.user_key)?;

    if attempts.is_empty() {
        println!("No completed tests for {}; showing general suggestions.", user.user_key);
    }

    let mut table = Table::new();
    table.set_header(vec!["Career", "Match", "Why", "Path"]);
    for r in recommend(&attempts) {
        table.add_row(vec![
            r.title,
            format!("{}%", r.match_percent),
            r.reason,
            r.path,
        ]);
    }
    println!("{table}");

    Ok(())
}
