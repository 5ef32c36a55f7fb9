pub mod plugin;
pub mod probe;
pub mod spec;

pub use plugin::{FlavorPlugin, KubernetesFlavor};
pub use probe::{Health, InstanceProbe, NoopProbe};
pub use spec::FlavorSpec;
