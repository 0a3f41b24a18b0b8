//! Shared types for the managed ML platform: storage locations, resource
//! names, job states and the records handed between commands.

mod endpoint;
mod error;
mod job;
mod resource;
mod result_line;
mod storage;

pub use endpoint::*;
pub use error::*;
pub use job::*;
pub use resource::*;
pub use result_line::*;
pub use storage::*;
