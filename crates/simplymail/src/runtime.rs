//! Per-call runtime for the blocking entry points.

use std::future::Future;
use std::io;

/// Runs `future` to completion on a fresh single-threaded runtime.
///
/// The runtime, and with it every socket the future opened, is dropped
/// before this returns.
pub(crate) fn block_on<F: Future>(future: F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
