//! The `aptly init` command.

use std::path::Path;

use anyhow::Result;

use aptly_store::config::SAMPLE_CONFIG;

const STARTER_BANKS: &[(&str, &str)] = &[
    (
        "question-banks/career.toml",
        include_str!("../../../../question-banks/career.toml"),
    ),
    (
        "question-banks/personality.toml",
        include_str!("../../../../question-banks/personality.toml"),
    ),
    (
        "question-banks/skills.toml",
        include_str!("../../../../question-banks/skills.toml"),
    ),
];

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("aptly.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("question-banks")?;
    for (path, content) in STARTER_BANKS {
        write_if_missing(Path::new(path), content)?;
    }

    println!("\nNext steps:");
    println!("  1. Edit aptly.toml to choose where data is stored");
    println!("  2. Run: aptly import --bank question-banks");
    println!("  3. Run: aptly schedule create --exam career --start-date ... --end-date ...");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}
