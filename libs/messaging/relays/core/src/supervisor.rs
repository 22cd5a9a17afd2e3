//! Supervised task spawning
//!
//! Every handler the reader loop dispatches and every background loop runs
//! through [`spawn_supervised`]. A failure or panic in the spawned future is
//! logged under the task's name and reported in the [`TaskOutcome`]; it never
//! unwinds into the runtime unobserved.

use futures::FutureExt;
use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// How a supervised task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    Panicked(String),
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }
}

/// Spawn `future` on the runtime under a fault boundary named `name`
pub fn spawn_supervised<F, E>(name: impl Into<String>, future: F) -> JoinHandle<TaskOutcome>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let name = name.into();
    tokio::spawn(async move {
        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => {
                debug!(task = %name, "Task completed");
                TaskOutcome::Completed
            }
            Ok(Err(e)) => {
                error!(task = %name, error = %e, "Task failed");
                TaskOutcome::Failed(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(task = %name, panic = %message, "Task panicked");
                TaskOutcome::Panicked(message)
            }
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_each_outcome() {
        let ok = spawn_supervised("ok", async { Ok::<(), String>(()) });
        let failed = spawn_supervised("failed", async { Err::<(), _>("boom".to_string()) });
        let panicked = spawn_supervised("panicked", async {
            if true {
                panic!("handler bug");
            }
            Ok::<(), String>(())
        });

        assert_eq!(ok.await.unwrap(), TaskOutcome::Completed);
        assert_eq!(failed.await.unwrap(), TaskOutcome::Failed("boom".to_string()));
        assert_eq!(
            panicked.await.unwrap(),
            TaskOutcome::Panicked("handler bug".to_string())
        );
    }
}
