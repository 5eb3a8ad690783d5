mod web_server;
pub mod work_queue;

pub use web_server::{WebServer, router};
pub use work_queue::subsystem::WorkQueueSubsystem;
