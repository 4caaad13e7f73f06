pub mod authority;
pub mod eval_state;
pub mod indexes;
pub mod objects;
pub mod skip_flags;

pub use authority::*;
pub use eval_state::*;
pub use indexes::*;
pub use objects::*;
pub use skip_flags::*;
