pub mod endpoint;
pub mod executor;
pub mod server;

pub use endpoint::{EndpointSpec, Param};
pub use executor::{CliExecutor, OutcomeStatus, ProcessOutcome};
