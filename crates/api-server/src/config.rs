//! Server configuration from environment variables

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use command_runner::DEFAULT_MAX_OUTPUT_BYTES;
use plangate_core::backend::{DatastoreConfig, ExecutionLimits};
use thiserror::Error;

const DEFAULT_PORT: u16 = 1337;
const DEFAULT_COMPILER: &str = "python runclang.py clang";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),

    #[error("{name} has invalid value {value:?}: {message}")]
    InvalidValue {
        name: &'static str,
        value: String,
        message: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            name,
            value: value.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Base of the canonical query URLs handed to clients
    pub public_url: String,
    /// Where plan sources are written for the compiler
    pub artifact_dir: PathBuf,
    /// Directory reported to clients uploading datasets
    pub upload_dir: PathBuf,
    pub datastore: DatastoreConfig,
    pub compiler_program: String,
    pub compiler_args: Vec<String>,
    pub limits: ExecutionLimits,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let raco_home = var("RACO_HOME").ok_or(ConfigError::MissingVar("RACO_HOME"))?;
        let artifact_dir = PathBuf::from(raco_home).join("c_test_environment");

        let bind_ip: IpAddr = match var("PLANGATE_BIND") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::invalid("PLANGATE_BIND", &raw, "expected an IP address"))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port = match var("PLANGATE_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::invalid("PLANGATE_PORT", &raw, "expected a port number"))?,
            None => DEFAULT_PORT,
        };

        let public_url = var("PLANGATE_PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        let upload_dir = var("PLANGATE_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let timeout = match var("PLANGATE_COMMAND_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    ConfigError::invalid("PLANGATE_COMMAND_TIMEOUT_SECS", &raw, "expected seconds")
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };
        let max_output_bytes = match var("PLANGATE_MAX_OUTPUT_BYTES") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::invalid(
                        "PLANGATE_MAX_OUTPUT_BYTES",
                        &raw,
                        "expected a positive byte count",
                    ))
                }
            },
            None => DEFAULT_MAX_OUTPUT_BYTES,
        };
        let limits = ExecutionLimits {
            timeout,
            max_output_bytes,
        };

        let datastore = DatastoreConfig {
            script: var("PLANGATE_DATASTORE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./datastore.py")),
            interpreter: var("PLANGATE_DATASTORE_INTERPRETER"),
            working_dir: var("PLANGATE_DATASTORE_DIR").map(PathBuf::from),
            limits,
        };

        let compiler = var("PLANGATE_COMPILER").unwrap_or_else(|| DEFAULT_COMPILER.to_string());
        let mut words = compiler.split_whitespace().map(str::to_string);
        let compiler_program = words
            .next()
            .ok_or_else(|| ConfigError::invalid("PLANGATE_COMPILER", &compiler, "empty command"))?;
        let compiler_args = words.collect();

        Ok(Self {
            bind_addr: SocketAddr::new(bind_ip, port),
            public_url,
            artifact_dir,
            upload_dir,
            datastore,
            compiler_program,
            compiler_args,
            limits,
        })
    }
}
