//! Diagnostic command: check that the store opens, WAL mode is active,
//! and an LLM API key is configured.

use lcm_core::Config;
use lcm_store::Store;

pub fn run(config: &Config) -> anyhow::Result<()> {
    println!("Running diagnostics...\n");

    println!("Database: {:?}", config.db_path);
    if let Some(parent) = config.db_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match Store::open(&config.db_path) {
        Ok(_) => println!("  ✓ Opens (WAL mode)"),
        Err(e) => println!("  ✗ Failed to open: {e}"),
    }

    println!("\nConfig directory: {:?}", Config::config_dir());
    if Config::config_dir().exists() {
        println!("  ✓ Exists");
    } else {
        println!("  ✗ Does not exist (defaults apply)");
    }

    println!("\nLLM provider:");
    println!("  model: {}", config.llm.model);
    match config.llm.resolve_api_key() {
        Some(_) => println!("  ✓ {} is set", config.llm.api_key_env),
        None => println!(
            "  ✗ {} is not set (soft compaction will abort, hard compaction falls back to truncated summaries)",
            config.llm.api_key_env
        ),
    }

    println!("\nCompaction thresholds:");
    println!(
        "  tau_soft={} tau_hard={} block=[{}, {}] fanout={}",
        config.compaction.tau_soft_tokens,
        config.compaction.tau_hard_tokens,
        config.compaction.block_min_tokens,
        config.compaction.block_max_tokens,
        config.compaction.condensation_fanout,
    );

    println!("\nDiagnostics complete.");
    Ok(())
}
