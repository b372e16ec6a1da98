pub mod attempt;
pub mod client;
pub mod credentials;
pub mod nonce;
pub mod orchestrator;
pub mod state;
