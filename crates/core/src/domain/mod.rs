mod agent;
mod project;
mod status;
mod task;

pub use agent::{AgentType, Operation};
pub use project::{Language, Project, ProjectKind, API_SPEC_FILE_KEY};
pub use status::Status;
pub use task::{Payload, Task, TaskParameters, PARSED_DATA_KEY};
