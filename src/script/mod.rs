pub mod assets;
pub mod executor;

pub use assets::Script;
pub use executor::{BashExecutor, ScriptExecutor};
