pub mod events;
pub mod ports;
pub mod registry;
pub mod sampler;
pub mod selection;
pub mod types;
pub mod validator;

pub use events::*;
pub use ports::*;
pub use registry::*;
pub use sampler::*;
pub use selection::*;
pub use types::*;
pub use validator::*;
