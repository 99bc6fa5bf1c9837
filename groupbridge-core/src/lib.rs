pub mod directory;
pub mod error;
pub mod identifier;
pub mod local;
pub mod resolver;
pub mod settings;
pub mod translator;
pub mod users;
pub mod utils;

pub use error::{ResolverError, ResolverResult};
pub use resolver::HybridResolver;
