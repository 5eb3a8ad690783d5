use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tokio::select;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tracing::{error, info, warn};

use crate::AppState;

use super::{Task, tasks::handle_task};

const BATCH_SIZE: usize = 10;
const IDLE_PAUSE: Duration = Duration::from_millis(125);
const ERROR_PAUSE: Duration = Duration::from_millis(500);

/// Drains the work queue in batches, running each batch's tasks concurrently.
pub struct WorkQueueSubsystem {
    state: AppState,
}

impl WorkQueueSubsystem {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    async fn drain(&self) {
        loop {
            match self.state.work_queue.pull(BATCH_SIZE as i64).await {
                Ok(tasks) => {
                    stream::iter(tasks)
                        .for_each_concurrent(BATCH_SIZE, |task| self.run_task(task))
                        .await;
                    tokio::time::sleep(IDLE_PAUSE).await;
                }
                Err(err) => {
                    error!("Work queue could not claim tasks: {err:#}");
                    tokio::time::sleep(ERROR_PAUSE).await;
                }
            }
        }
    }

    async fn run_task(&self, task: Task) {
        let task_id = task.task_id;
        let task_type = task.domain_args.to_string();

        let outcome = match handle_task(&self.state, task).await {
            Ok(()) => self.state.work_queue.delete_task(task_id).await,
            Err(err) => {
                warn!("{task_type} task {task_id} failed: {err:#}");
                self.state
                    .work_queue
                    .fail_task(task_id)
                    .await
                    .map(|gave_up| {
                        if gave_up {
                            error!("{task_type} task {task_id} is out of retries, parking it");
                        }
                    })
            }
        };

        if let Err(err) = outcome {
            error!("Could not update {task_type} task {task_id}: {err:#}");
        }
    }
}

#[async_trait]
impl IntoSubsystem<anyhow::Error> for WorkQueueSubsystem {
    async fn run(self, subsys: SubsystemHandle) -> Result<(), anyhow::Error> {
        info!("Work queue starting.");
        select!(
            _ = self.drain() => {
                error!("Work queue stopped.");
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Work queue shutdown.");
            }
        );
        Ok(())
    }
}
