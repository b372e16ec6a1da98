pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod metrics;

pub use engine::attempt::{attempt, AttemptReport, Endpoints, LoginOutcome};
pub use engine::credentials::{load_credentials, parse_credentials, Credential};
pub use engine::nonce::{extract_nonce, fetch_nonce, NonceError};
pub use engine::orchestrator::{Orchestrator, RunReport, RunSettings, ACTIVE_ATTEMPTS};
pub use engine::state::{RunState, StopCause};
