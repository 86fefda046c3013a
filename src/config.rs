use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// The path segment every API route lives under.
pub const API_PATH: &str = "api";

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Where the server keeps its animals.
#[derive(Clone, Debug, PartialEq)]
pub enum Storage {
    /// The `animales` table in a Postgres database.
    Postgres { connection_string: String },

    /// A single serialized block in a local directory.
    Local { directory: PathBuf },
}

/// The kinds of storage that can be named in `BACKEND_STORAGE`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StorageKind {
    Postgres,
    Local,
}

#[derive(Debug, Error)]
#[error("unknown storage kind {0:?}; expected `postgres` or `local`")]
pub struct UnknownStorageKind(String);

impl FromStr for StorageKind {
    type Err = UnknownStorageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageKind::Postgres),
            "local" => Ok(StorageKind::Local),
            _ => Err(UnknownStorageKind(s.to_owned())),
        }
    }
}

/// Settings read from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub base_url: Url,
    pub storage: Storage,
}

impl Config {
    /// Reads the configuration, panicking with the name of the first
    /// variable that is missing or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name).unwrap_or_else(|| panic!("must define {} environment variable", name))
        };

        let port = get("BACKEND_PORT")
            .parse()
            .expect("parse BACKEND_PORT as u16");
        let base_url = Url::parse(&get("BACKEND_BASE_URL")).expect("parse BACKEND_BASE_URL");

        let kind: StorageKind = get("BACKEND_STORAGE")
            .parse()
            .unwrap_or_else(|e| panic!("parse BACKEND_STORAGE: {}", e));
        let storage = match kind {
            StorageKind::Postgres => Storage::Postgres {
                connection_string: get("BACKEND_DB_CONNECTION_STRING"),
            },
            StorageKind::Local => Storage::Local {
                directory: PathBuf::from(get("BACKEND_LOCAL_STORAGE_DIR")),
            },
        };

        Config {
            port,
            base_url,
            storage,
        }
    }
}
