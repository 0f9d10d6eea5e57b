//! Show the declared topology.

use anyhow::Result;
use harness_core::TopologyStore;

/// Run the info command.
pub async fn run(store: &TopologyStore) -> Result<()> {
    println!("=== cloudtest topology ===");
    println!();
    println!("Network: {}", store.network_mode());

    let hypervisor = match store.hypervisor() {
        Ok(Some(hv)) => hv.to_string(),
        Ok(None) => "unknown".to_string(),
        Err(_) => "n/a (no node controller)".to_string(),
    };
    println!("Hypervisor: {}", hypervisor);
    println!();

    println!("Nodes: {}", store.nodes().len());
    for node in store.nodes() {
        println!("  {}", node);
    }
    println!();

    match store.controllers() {
        Ok(controllers) => {
            println!("Controllers:");
            for (i, node) in controllers.iter().enumerate() {
                let label = if i == 0 { "primary" } else { "secondary" };
                println!("  [{}] {}", label, node.hostname());
            }
            if controllers.len() != 2 {
                println!("  (failover needs exactly 2 controllers)");
            }
        }
        Err(_) => println!("Controllers: NONE DECLARED"),
    }

    Ok(())
}
