use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default listen address of the relay (all interfaces, port 3000).
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_CERT_PATH: &str = "certs/signaling/cert.pem";
pub const DEFAULT_KEY_PATH: &str = "certs/signaling/key.pem";

/// INI-style configuration file: `key = value` lines, optional `[Section]`
/// headers, `#` comments, surrounding quotes stripped from values.
#[derive(Debug)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Error reading file {}: {e}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut globals = HashMap::new();
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = &line[1..line.len() - 1];
                current_section = Some(name.trim().to_string());
                continue;
            }

            if let Some(pos) = line.find('=') {
                let key = line[..pos].trim().to_string();
                let value = line[pos + 1..].trim().trim_matches('"').to_string();

                match &current_section {
                    None => {
                        globals.insert(key, value);
                    }
                    Some(sec) => {
                        sections.entry(sec.clone()).or_default().insert(key, value);
                    }
                }
            }
        }
        Config { globals, sections }
    }

    pub fn empty() -> Self {
        Self {
            globals: HashMap::new(),
            sections: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(|s| s.as_str())
    }

    #[must_use]
    pub fn get_non_empty_or_default<'a>(
        &'a self,
        section: &str,
        key: &str,
        default: &'a str,
    ) -> &'a str {
        self.get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .unwrap_or(default)
    }

    /// Reads a boolean (`true/false`, `yes/no`, `on/off`, `1/0`) from the
    /// section, then from the globals. Missing or unrecognised values yield `default`.
    #[must_use]
    pub fn get_bool_or(&self, section: &str, key: &str, default: bool) -> bool {
        match self
            .get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .map(|v| v.to_ascii_lowercase())
            .as_deref()
        {
            Some("true" | "yes" | "on" | "1") => true,
            Some("false" | "no" | "off" | "0") => false,
            _ => default,
        }
    }
}

/// Where the signaling TLS certificate chain and key live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// `[Logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub file_name: Option<String>,
    /// Mirror every line to stderr.
    pub console: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            file_name: Some("signaling_server".to_owned()),
            console: true,
        }
    }
}

/// Typed view of the relay configuration.
///
/// ```text
/// [Signaling]
/// bind_addr = 0.0.0.0:3000
/// serve_test_page = true
///
/// [TLS]
/// enabled = true
/// signaling_cert = certs/signaling/cert.pem
/// signaling_key = certs/signaling/key.pem
///
/// [Logging]
/// server_log_path = ~/.rustyrelay/logs
/// server_log_filename = signaling_server
/// console = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySettings {
    pub bind_addr: String,
    /// `None` serves plain `ws://`.
    pub tls: Option<TlsPaths>,
    pub serve_test_page: bool,
    pub logging: LogSettings,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            tls: None,
            serve_test_page: true,
            logging: LogSettings::default(),
        }
    }
}

impl RelaySettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let bind_addr = config
            .get_non_empty_or_default("Signaling", "bind_addr", DEFAULT_BIND_ADDR)
            .to_owned();

        let tls = config.get_bool_or("TLS", "enabled", false).then(|| TlsPaths {
            cert: expand_path(config.get_non_empty_or_default(
                "TLS",
                "signaling_cert",
                DEFAULT_CERT_PATH,
            )),
            key: expand_path(config.get_non_empty_or_default(
                "TLS",
                "signaling_key",
                DEFAULT_KEY_PATH,
            )),
        });

        let defaults = LogSettings::default();
        let logging = LogSettings {
            dir: config
                .get_non_empty("Logging", "server_log_path")
                .map(expand_path),
            file_name: config
                .get_non_empty("Logging", "server_log_filename")
                .map(str::to_owned)
                .or(defaults.file_name),
            console: config.get_bool_or("Logging", "console", defaults.console),
        };

        Self {
            bind_addr,
            tls,
            serve_test_page: config.get_bool_or("Signaling", "serve_test_page", true),
            logging,
        }
    }

    /// URL scheme clients should use for this listener.
    #[must_use]
    pub fn ws_scheme(&self) -> &'static str {
        if self.tls.is_some() { "wss" } else { "ws" }
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_path(path_str: &str) -> PathBuf {
    if path_str.starts_with('~') {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
            .map(PathBuf::from);

        if let Some(mut home_path) = home {
            if path_str == "~" {
                return home_path;
            }
            if path_str.starts_with("~/") || path_str.starts_with("~\\") {
                home_path.push(&path_str[2..]);
                return home_path;
            }
        }
    }
    PathBuf::from(path_str)
}
