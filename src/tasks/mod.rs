pub mod monitor_loop;
pub mod task_runner;
