mod project_repository;
mod stats_repository;
mod task_repository;

pub use project_repository::*;
pub use stats_repository::*;
pub use task_repository::*;
