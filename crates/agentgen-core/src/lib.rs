pub mod config;
pub mod error;
pub mod fence;
pub mod frontmatter;
pub mod handoff;
pub mod include;
pub mod io;
pub mod paths;
pub mod roles;
pub mod source;
pub mod sync;

pub use error::{AgentgenError, Result};
