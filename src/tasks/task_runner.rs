use std::future::Future;
use std::pin::Pin;

use tokio::task::JoinHandle;
use tracing::debug;

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Background tasks that live beside the monitor loop, started together and
/// torn down together.
pub struct TaskRunner {
    tasks: Vec<(&'static str, BoxedTask)>,
}

pub struct RunningTasks {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn add_task<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push((name, Box::pin(task)));
    }

    pub fn start_all(self) -> RunningTasks {
        let handles = self
            .tasks
            .into_iter()
            .map(|(name, task)| {
                debug!(task = name, "starting background task");
                (name, tokio::spawn(task))
            })
            .collect();
        RunningTasks { handles }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningTasks {
    pub fn abort_all(self) {
        for (name, handle) in self.handles {
            debug!(task = name, "stopping background task");
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn started_tasks_run_and_can_be_aborted() {
        let ran = Arc::new(AtomicBool::new(false));
        let mut runner = TaskRunner::new();
        runner.add_task("flag", {
            let ran = ran.clone();
            async move {
                ran.store(true, Ordering::SeqCst);
            }
        });
        runner.add_task("forever", std::future::pending::<()>());

        let running = runner.start_all();
        tokio::task::yield_now().await;
        for _ in 0..50 {
            if ran.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(ran.load(Ordering::SeqCst));
        running.abort_all();
    }
}
