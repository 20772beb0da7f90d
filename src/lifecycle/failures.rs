//! Process-level failure handling.
//!
//! # Responsibilities
//! - Log every panic through tracing (panic hook)
//! - Supervise fire-and-forget tasks: a failure is logged and counted,
//!   never fatal
//!
//! Fatal failures (an error or panic escaping the server task) are
//! classified by `await_server`; the binary exits with status 1 for them.

use std::future::Future;
use std::panic::PanicHookInfo;

use tokio::task::JoinHandle;

use crate::observability::metrics;

/// Install a panic hook that logs through tracing before unwinding.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info: &PanicHookInfo<'_>| {
        let message = panic_message(info);
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(
            message = %message,
            location = %location,
            backtrace = %backtrace,
            "Panic"
        );
    }));
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Spawn a background task whose failure must not take the process down.
///
/// A panic inside `future` is logged and counted as an unobserved failure.
pub fn spawn_supervised<F>(name: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(future);
    tokio::spawn(async move {
        if let Err(e) = task.await {
            if e.is_panic() {
                tracing::error!(task = name, error = %e, "Unhandled failure in background task");
                metrics::record_unobserved_failure(name);
            } else {
                tracing::debug!(task = name, "Background task cancelled");
            }
        }
    })
}

/// How the server task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOutcome {
    /// Shutdown was requested and every in-flight request completed.
    Drained,
    /// The server returned an error.
    Failed,
    /// The server task panicked or was aborted.
    Crashed,
}

impl ServerOutcome {
    /// Process exit status for this outcome.
    pub fn exit_code(self) -> u8 {
        match self {
            ServerOutcome::Drained => 0,
            ServerOutcome::Failed | ServerOutcome::Crashed => 1,
        }
    }
}

/// Wait for the server task and classify how it ended.
pub async fn await_server(handle: JoinHandle<Result<(), std::io::Error>>) -> ServerOutcome {
    match handle.await {
        Ok(Ok(())) => {
            tracing::info!("Shutdown complete");
            ServerOutcome::Drained
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Server failed");
            ServerOutcome::Failed
        }
        Err(e) => {
            tracing::error!(error = %e, "Uncaught failure in server task");
            ServerOutcome::Crashed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_outcomes_map_to_exit_codes() {
        let drained = await_server(tokio::spawn(async { Ok(()) })).await;
        assert_eq!(drained, ServerOutcome::Drained);
        assert_eq!(drained.exit_code(), 0);

        let failed = await_server(tokio::spawn(async {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "accept failed"))
        }))
        .await;
        assert_eq!(failed, ServerOutcome::Failed);
        assert_eq!(failed.exit_code(), 1);

        let crashed = await_server(tokio::spawn(async {
            panic!("server task exploded");
        }))
        .await;
        assert_eq!(crashed, ServerOutcome::Crashed);
        assert_eq!(crashed.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_supervised_panic_is_contained() {
        let handle = spawn_supervised("test", async {
            panic!("background failure");
        });
        // The supervisor itself completes normally.
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_supervised_success() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        spawn_supervised("test", async move {
            let _ = tx.send(42);
        })
        .await
        .unwrap();
        assert_eq!(rx.await.unwrap(), 42);
    }
}
