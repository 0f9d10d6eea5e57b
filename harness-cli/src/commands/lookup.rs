//! Find a node by hostname fragment.

use anyhow::Result;
use harness_core::TopologyStore;

/// Run the lookup command.
pub async fn run(store: &TopologyStore, pattern: &str) -> Result<()> {
    let node = store.lookup_by_host(pattern)?;
    println!("{}", node);
    Ok(())
}
