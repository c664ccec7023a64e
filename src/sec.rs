pub mod authn;
pub mod state;
