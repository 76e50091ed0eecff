// Process configuration, read once from the environment at startup

use crate::executor::{ExecutorConfig, ExecutorKind};
use crate::transport::{HttpConfig, TransportConfig};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{Level, warn};

/// Everything the process recognizes, built once and threaded into constructors
#[derive(Debug, Clone)]
pub struct Config {
    pub transport: TransportConfig,
    pub executor: ExecutorConfig,
    /// Maximum tracing level (default: info)
    pub log_level: Level,
    /// Variables that were set but could not be parsed
    pub warnings: Vec<InvalidVar>,
}

/// A variable whose value was rejected in favor of the default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVar {
    pub name: String,
    pub value: String,
}

/// Variable source that remembers which values it had to reject
struct EnvReader<F> {
    lookup: F,
    invalid: Vec<InvalidVar>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }

    /// A variable that is set to something other than whitespace
    fn non_empty(&self, name: &str) -> Option<String> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    /// Parse a variable, recording it if the value is present but invalid
    fn parse<T: FromStr>(&mut self, name: &str, default: T) -> T {
        match self.get(name) {
            Some(v) => match v.trim().parse() {
                Ok(parsed) => parsed,
                Err(_) => {
                    self.invalid.push(InvalidVar {
                        name: name.to_string(),
                        value: v,
                    });
                    default
                }
            },
            None => default,
        }
    }
}

impl Config {
    /// Load from `.env` and the process environment
    pub fn from_env(kind: ExecutorKind) -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(kind, |name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source
    pub fn from_lookup(kind: ExecutorKind, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut env = EnvReader {
            lookup,
            invalid: Vec::new(),
        };

        // Presence of a port variable alone selects HTTP
        let port_var = if env.get("HTTP_PORT").is_some() {
            Some("HTTP_PORT")
        } else if env.get("PORT").is_some() {
            Some("PORT")
        } else {
            None
        };
        let use_http = env.get("USE_HTTP").is_some_and(|v| v.trim() == "true") || port_var.is_some();

        let transport = if use_http {
            let mut http = HttpConfig::new(kind.default_port());
            if let Some(var) = port_var {
                http.listen_port = env.parse(var, http.listen_port);
            }
            if let Some(addr) = env.non_empty("HTTP_BIND") {
                http.listen_addr = addr.trim().to_string();
            }
            http.max_body_bytes = env.parse("HTTP_BODY_LIMIT", http.max_body_bytes);
            http.auth_token = env.non_empty("AUTH_TOKEN");
            TransportConfig::http(http)
        } else {
            TransportConfig::default()
        };

        let mut executor = ExecutorConfig::new(kind);
        if let Some(path) = env.non_empty("TOOLS_TOML") {
            executor.tools_toml_path = PathBuf::from(path);
        }

        if let Some(list) = env.get("ALLOWED_COMMANDS") {
            executor.shell.allowed_commands = list
                .split(',')
                .map(|cmd| cmd.trim().to_string())
                .filter(|cmd| !cmd.is_empty())
                .collect();
        }
        executor.shell.working_dir = env.non_empty("SHELL_WORKING_DIR").map(PathBuf::from);
        // Zero disables the timeout
        executor.shell.timeout_secs =
            Some(env.parse("SHELL_TIMEOUT_SECS", 0u64)).filter(|secs| *secs > 0);

        executor.browser.executable = env.non_empty("BROWSER_EXECUTABLE").map(PathBuf::from);
        executor.browser.launch_on_start =
            env.parse("BROWSER_LAUNCH_ON_START", executor.browser.launch_on_start);

        let log_level = env.parse("LOG_LEVEL", Level::INFO);

        Self {
            transport,
            executor,
            log_level,
            warnings: env.invalid,
        }
    }

    /// Emit one warning per rejected variable; call once logging is up
    pub fn log_warnings(&self) {
        for var in &self.warnings {
            warn!(var = %var.name, value = %var.value, "Invalid env var value, using default");
        }
    }
}
