pub mod coordinator;
pub mod rules;

pub use coordinator::GameCoordinator;
