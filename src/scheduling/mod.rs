pub mod extract;
pub mod ident;
pub mod import;
pub mod planner;
pub mod reconcile;
pub mod roster;
pub mod rotation;

pub use import::{run_import, ImportPhase, ImportSummary};
