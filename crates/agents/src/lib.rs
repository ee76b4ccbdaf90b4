pub mod agent;
pub mod dispatcher;
pub mod error;
pub mod parser;
pub mod remote;
pub mod simulation;

pub use agent::{Agent, UnavailableAgent};
pub use dispatcher::{DispatchPolicy, Dispatcher, FallbackMode, UnknownOperation};
pub use error::{AgentError, DispatchError, Result};
pub use parser::SpecParserAgent;
pub use remote::{GenerationClient, RemoteAgent};
