//! Print the hosts carrying a role.

use anyhow::{Context, Result};
use harness_core::TopologyStore;
use harness_types::Role;

/// Run the resolve command.
pub async fn run(store: &TopologyStore, role: Role) -> Result<()> {
    let nodes = store
        .resolve_role(role)
        .with_context(|| format!("Cannot resolve role {}", role))?;

    for node in nodes {
        println!("{}", node.hostname());
    }
    Ok(())
}
