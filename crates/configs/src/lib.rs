pub mod arguments;
pub mod deserialize_env;

pub use arguments::{CommonArguments, LogFormat};
