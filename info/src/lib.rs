//! Build information baked in at compile time.

pub const NAME: &str = "petmatch";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const REVISION: Option<&str> = option_env!("PETMATCH_REVISION");

pub const BUILD_TIMESTAMP: Option<&str> = option_env!("PETMATCH_BUILD_TIMESTAMP");
