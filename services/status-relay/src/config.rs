//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The config file is
//! optional; a deployment that only sets `TWITCH_CLIENT_ID`, `TWITCH_SECRET`
//! and `PORT` runs with the built-in streamer list.
//!
//! The client secret is loaded from `TWITCH_SECRET` or `client_secret_file`,
//! never from the TOML directly, so it can't leak through a committed file.

use common::Secret;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use stream_presence::{MAX_LOGINS_PER_REQUEST, STREAMS_ENDPOINT};
use twitch_auth::TOKEN_ENDPOINT;

/// Logins monitored when neither the config file nor `STREAMERS` names any.
const DEFAULT_STREAMERS: &[&str] = &["aienia", "polackentv", "fieraaa"];

/// Config file layout. Every section and field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub twitch: TwitchSection,
    pub server: ServerSection,
    pub streamers: StreamersSection,
}

/// Twitch application credentials and endpoints
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TwitchSection {
    pub client_id: Option<String>,
    /// Path to a file holding the client secret (alternative to TWITCH_SECRET)
    pub client_secret_file: Option<PathBuf>,
    pub identity_url: String,
    pub streams_url: String,
    pub timeout_secs: u64,
}

impl Default for TwitchSection {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret_file: None,
            identity_url: TOKEN_ENDPOINT.to_string(),
            streams_url: STREAMS_ENDPOINT.to_string(),
            timeout_secs: 10,
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub listen_addr: Option<SocketAddr>,
    pub max_connections: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen_addr: None,
            max_connections: 1000,
        }
    }
}

/// Monitored accounts
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamersSection {
    pub logins: Vec<String>,
}

impl Default for StreamersSection {
    fn default() -> Self {
        Self {
            logins: DEFAULT_STREAMERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Fully resolved and validated configuration
#[derive(Debug)]
pub struct Config {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub identity_url: String,
    pub streams_url: String,
    pub timeout: Duration,
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
    pub streamers: Vec<String>,
}

impl Config {
    /// Load the optional config file, then overlay environment variables.
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        let file = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => ConfigFile::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with values from `env` and validate.
    ///
    /// Environment keys:
    /// - `TWITCH_CLIENT_ID` overrides `twitch.client_id`
    /// - `TWITCH_SECRET` takes precedence over `twitch.client_secret_file`
    /// - `PORT` overrides the port of `server.listen_addr`, or binds
    ///   `0.0.0.0:PORT` when no address is configured
    /// - `STREAMERS` (comma separated) replaces `streamers.logins`
    ///
    /// Blank values count as unset.
    pub fn resolve(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> common::Result<Self> {
        let env = |key: &str| env(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let client_id = env("TWITCH_CLIENT_ID")
            .or(file.twitch.client_id)
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .ok_or(common::Error::Missing("TWITCH_CLIENT_ID"))?;

        let client_secret = match env("TWITCH_SECRET") {
            Some(secret) => Secret::new(secret),
            None => match file.twitch.client_secret_file {
                Some(ref secret_file) => Secret::from_file(secret_file)?,
                None => return Err(common::Error::Missing("TWITCH_SECRET")),
            },
        };

        let listen_addr = match (env("PORT"), file.server.listen_addr) {
            (Some(port), addr) => {
                let port: u16 = port.parse().map_err(|e| {
                    common::Error::Config(format!("PORT must be a port number, got {port}: {e}"))
                })?;
                let mut addr =
                    addr.unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)));
                addr.set_port(port);
                addr
            }
            (None, Some(addr)) => addr,
            (None, None) => return Err(common::Error::Missing("PORT")),
        };

        let streamers = match env("STREAMERS") {
            Some(list) => list.split(',').map(|s| s.trim().to_owned()).collect(),
            None => file.streamers.logins,
        };

        for (key, url) in [
            ("identity_url", &file.twitch.identity_url),
            ("streams_url", &file.twitch.streams_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{key} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if file.twitch.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if file.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        validate_streamers(&streamers)?;

        Ok(Self {
            client_id,
            client_secret,
            identity_url: file.twitch.identity_url,
            streams_url: file.twitch.streams_url,
            timeout: Duration::from_secs(file.twitch.timeout_secs),
            listen_addr,
            max_connections: file.server.max_connections,
            streamers,
        })
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    /// `None` means run from environment and defaults only.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        std::env::var("CONFIG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    }
}

fn validate_streamers(streamers: &[String]) -> common::Result<()> {
    if streamers.is_empty() {
        return Err(common::Error::Config("streamer list is empty".into()));
    }
    if streamers.iter().any(|s| s.trim().is_empty()) {
        return Err(common::Error::Config(
            "streamer list contains a blank login".into(),
        ));
    }
    if streamers.len() > MAX_LOGINS_PER_REQUEST {
        return Err(common::Error::Config(format!(
            "at most {MAX_LOGINS_PER_REQUEST} streamers can be checked per request, got {}",
            streamers.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serializes tests that mutate process environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("TWITCH_CLIENT_ID", "client-abc"),
            ("TWITCH_SECRET", "secret-xyz"),
            ("PORT", "3000"),
        ]
    }

    fn parse(toml_str: &str) -> ConfigFile {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn env_only_uses_defaults() {
        let config = Config::resolve(ConfigFile::default(), env_of(&required_env())).unwrap();

        assert_eq!(config.client_id, "client-abc");
        assert_eq!(config.client_secret.expose(), "secret-xyz");
        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.identity_url, "https://id.twitch.tv/oauth2/token");
        assert_eq!(config.streams_url, "https://api.twitch.tv/helix/streams");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.streamers, vec!["aienia", "polackentv", "fieraaa"]);
    }

    #[test]
    fn missing_client_id_fails() {
        let env = env_of(&[("TWITCH_SECRET", "s"), ("PORT", "3000")]);
        let err = Config::resolve(ConfigFile::default(), env).unwrap_err();
        assert!(
            matches!(err, common::Error::Missing("TWITCH_CLIENT_ID")),
            "got: {err}"
        );
    }

    #[test]
    fn missing_secret_fails() {
        let env = env_of(&[("TWITCH_CLIENT_ID", "id"), ("PORT", "3000")]);
        let err = Config::resolve(ConfigFile::default(), env).unwrap_err();
        assert!(
            matches!(err, common::Error::Missing("TWITCH_SECRET")),
            "got: {err}"
        );
    }

    #[test]
    fn missing_port_fails_fast() {
        let env = env_of(&[("TWITCH_CLIENT_ID", "id"), ("TWITCH_SECRET", "s")]);
        let err = Config::resolve(ConfigFile::default(), env).unwrap_err();
        assert!(matches!(err, common::Error::Missing("PORT")), "got: {err}");
    }

    #[test]
    fn blank_env_values_count_as_unset() {
        let env = env_of(&[
            ("TWITCH_CLIENT_ID", "   "),
            ("TWITCH_SECRET", "s"),
            ("PORT", "3000"),
        ]);
        let err = Config::resolve(ConfigFile::default(), env).unwrap_err();
        assert!(matches!(err, common::Error::Missing("TWITCH_CLIENT_ID")));
    }

    #[test]
    fn invalid_port_rejected() {
        let env = env_of(&[
            ("TWITCH_CLIENT_ID", "id"),
            ("TWITCH_SECRET", "s"),
            ("PORT", "http"),
        ]);
        let err = Config::resolve(ConfigFile::default(), env).unwrap_err();
        assert!(err.to_string().contains("PORT must be a port number"), "got: {err}");
    }

    #[test]
    fn file_values_fill_in_when_env_is_absent() {
        let file = parse(
            r#"
[twitch]
client_id = "file-client"
timeout_secs = 3

[server]
listen_addr = "127.0.0.1:8080"
max_connections = 50

[streamers]
logins = ["one", "Two"]
"#,
        );
        let config = Config::resolve(file, env_of(&[("TWITCH_SECRET", "s")])).unwrap();

        assert_eq!(config.client_id, "file-client");
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.streamers, vec!["one", "Two"]);
    }

    #[test]
    fn port_env_overrides_file_port_but_keeps_host() {
        let file = parse(
            r#"
[server]
listen_addr = "127.0.0.1:8080"
"#,
        );
        let config = Config::resolve(file, env_of(&required_env())).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn client_id_env_overrides_file() {
        let file = parse(
            r#"
[twitch]
client_id = "file-client"
"#,
        );
        let config = Config::resolve(file, env_of(&required_env())).unwrap();
        assert_eq!(config.client_id, "client-abc");
    }

    #[test]
    fn streamers_env_replaces_list() {
        let mut env: Vec<(&str, &str)> = required_env();
        env.push(("STREAMERS", "alpha, Beta ,gamma"));
        let config = Config::resolve(ConfigFile::default(), env_of(&env)).unwrap();
        assert_eq!(config.streamers, vec!["alpha", "Beta", "gamma"]);
    }

    #[test]
    fn blank_streamer_entry_rejected() {
        let mut env: Vec<(&str, &str)> = required_env();
        env.push(("STREAMERS", "alpha,,gamma"));
        let err = Config::resolve(ConfigFile::default(), env_of(&env)).unwrap_err();
        assert!(err.to_string().contains("blank login"), "got: {err}");
    }

    #[test]
    fn empty_streamer_list_rejected() {
        let file = parse(
            r#"
[streamers]
logins = []
"#,
        );
        let err = Config::resolve(file, env_of(&required_env())).unwrap_err();
        assert!(err.to_string().contains("streamer list is empty"), "got: {err}");
    }

    #[test]
    fn more_than_one_request_worth_of_streamers_rejected() {
        let logins: Vec<String> = (0..=MAX_LOGINS_PER_REQUEST)
            .map(|i| format!("login{i}"))
            .collect();
        let mut env: Vec<(&str, &str)> = required_env();
        let joined = logins.join(",");
        env.push(("STREAMERS", &joined));
        let err = Config::resolve(ConfigFile::default(), env_of(&env)).unwrap_err();
        assert!(err.to_string().contains("at most 100"), "got: {err}");
    }

    #[test]
    fn url_without_scheme_rejected() {
        let file = parse(
            r#"
[twitch]
streams_url = "api.twitch.tv/helix/streams"
"#,
        );
        let err = Config::resolve(file, env_of(&required_env())).unwrap_err();
        assert!(
            err.to_string().contains("streams_url must start with http"),
            "got: {err}"
        );
    }

    #[test]
    fn zero_timeout_rejected() {
        let file = parse(
            r#"
[twitch]
timeout_secs = 0
"#,
        );
        assert!(Config::resolve(file, env_of(&required_env())).is_err());
    }

    #[test]
    fn zero_max_connections_rejected() {
        let file = parse(
            r#"
[server]
max_connections = 0
"#,
        );
        assert!(Config::resolve(file, env_of(&required_env())).is_err());
    }

    #[test]
    fn inline_client_secret_is_not_accepted() {
        let result: Result<ConfigFile, _> = toml::from_str(
            r#"
[twitch]
client_secret = "oops"
"#,
        );
        assert!(result.is_err(), "secrets must not be accepted inline");
    }

    #[test]
    fn secret_read_from_file_and_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("twitch_secret");
        std::fs::write(&secret_path, "file-secret\n").unwrap();

        let file = parse(&format!(
            r#"
[twitch]
client_secret_file = "{}"
"#,
            secret_path.display()
        ));
        let env = env_of(&[("TWITCH_CLIENT_ID", "id"), ("PORT", "3000")]);
        let config = Config::resolve(file, env).unwrap();
        assert_eq!(config.client_secret.expose(), "file-secret");
    }

    #[test]
    fn secret_env_overrides_missing_file() {
        let file = parse(
            r#"
[twitch]
client_secret_file = "/nonexistent/path/twitch_secret"
"#,
        );
        let config = Config::resolve(file, env_of(&required_env())).unwrap();
        assert_eq!(config.client_secret.expose(), "secret-xyz");
    }

    #[test]
    fn nonexistent_secret_file_is_an_error() {
        let file = parse(
            r#"
[twitch]
client_secret_file = "/nonexistent/path/twitch_secret"
"#,
        );
        let env = env_of(&[("TWITCH_CLIENT_ID", "id"), ("PORT", "3000")]);
        let err = Config::resolve(file, env).unwrap_err();
        assert!(
            err.to_string().contains("failed to read secret file"),
            "got: {err}"
        );
    }

    #[test]
    fn load_reads_file_and_process_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(
            &path,
            r#"
[server]
listen_addr = "127.0.0.1:9000"

[streamers]
logins = ["solo"]
"#,
        )
        .unwrap();

        unsafe {
            set_env("TWITCH_CLIENT_ID", "env-client");
            set_env("TWITCH_SECRET", "env-secret");
            remove_env("PORT");
            remove_env("STREAMERS");
        }
        let config = Config::load(Some(&path)).unwrap();
        unsafe {
            remove_env("TWITCH_CLIENT_ID");
            remove_env("TWITCH_SECRET");
        }

        assert_eq!(config.client_id, "env-client");
        assert_eq!(config.listen_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.streamers, vec!["solo"]);
    }

    #[test]
    fn load_missing_file_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/path/relay.toml")));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn load_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid {{{{ toml").unwrap();

        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn resolve_path_prefers_cli_arg() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(path, Some(PathBuf::from("/cli/wins.toml")));
    }

    #[test]
    fn resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/relay.toml") };
        let path = Config::resolve_path(None);
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(path, Some(PathBuf::from("/env/relay.toml")));
    }

    #[test]
    fn resolve_path_none_without_cli_or_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(Config::resolve_path(None), None);
    }
}
