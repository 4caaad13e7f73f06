pub mod clock;
pub mod ed25519;
pub mod memory_snapshot;

pub use clock::*;
pub use ed25519::*;
pub use memory_snapshot::*;
