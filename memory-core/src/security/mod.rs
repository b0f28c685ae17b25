pub mod capabilities;
pub mod paths;

pub use capabilities::{Capability, CapabilityFn, CapabilityTable};
pub use paths::{expand_user, normalize_key, normalize_path};
