mod queue;
pub mod subsystem;
mod tasks;

pub use queue::{Task, TaskArgs, TaskId, TaskLimit, TaskStatus, TaskTrigger, WorkQueue};
pub use tasks::{TaskDomainArgs, handle_task};
