//! Calls against the active cloud controller with one-shot failover.

use harness_core::ControllerSelector;
use harness_types::{Credentials, HarnessError, Node};
use std::future::Future;

use crate::session::{Session, SessionProvider};

/// Run `op` against the active controller, swapping once on a connection error.
///
/// `op` receives the controller to talk to. If it fails with
/// [`HarnessError::Connection`], the selector swaps to the other candidate and
/// `op` is retried exactly once; the retry's result is returned as-is. Any
/// other error is returned without swapping.
///
/// # Errors
///
/// - the error from `op` if it is not a connection error, or if the retry fails
/// - [`HarnessError::UnsupportedTopology`] if a swap is needed but the
///   topology does not declare exactly two controllers
pub async fn with_controller_failover<T, F, Fut>(
    selector: &mut ControllerSelector,
    mut op: F,
) -> Result<T, HarnessError>
where
    F: FnMut(Node) -> Fut,
    Fut: Future<Output = Result<T, HarnessError>>,
{
    let first = selector.active().clone();
    let err = match op(first.clone()).await {
        Err(err) if err.is_connection() => err,
        other => return other,
    };

    tracing::warn!(host = %first.hostname(), error = %err, "controller unreachable");
    let next = selector.swap()?.clone();
    tracing::warn!(from = %first.hostname(), to = %next.hostname(), "swapped active controller, retrying once");

    op(next).await
}

/// Open a session to the active controller, failing over once if needed.
pub async fn open_active_controller<P: SessionProvider>(
    provider: &P,
    selector: &mut ControllerSelector,
    credentials: &Credentials,
) -> Result<Box<dyn Session>, HarnessError> {
    with_controller_failover(selector, |node| async move {
        provider
            .open(node.hostname(), credentials)
            .await
            .map_err(|e| HarnessError::Connection {
                host: node.hostname().to_string(),
                reason: e.to_string(),
            })
    })
    .await
}
