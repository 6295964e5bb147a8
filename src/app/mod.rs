mod bootstrap;
mod targets;

pub use bootstrap::App;
pub use targets::TargetSelection;
