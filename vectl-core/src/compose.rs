//! Typed model of the `docker-compose.yml` that provisions the database.
//!
//! The manifest is consumed by the container runtime, not by vectl. We parse
//! it for two reasons: to check that it still declares the database vectl
//! expects (`vectl compose check`), and to derive the connection URL and the
//! readiness probe parameters from the same source of truth.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::duration::parse_duration;
use crate::error::{Result, VectlError};

/// Standard data directory of the postgres image.
pub const PG_DATA_DIR: &str = "/var/lib/postgresql/data";
/// Standard listening port of postgres.
pub const PG_PORT: u16 = 5432;
/// Environment variable holding the superuser password.
pub const PASSWORD_VAR: &str = "POSTGRES_PASSWORD";
/// Server setting that turns on full statement logging.
pub const LOG_ALL_STATEMENTS: &str = "log_statement=all";
/// Readiness command shipped with the postgres image.
pub const READINESS_COMMAND: &str = "pg_isready";

/// Probes slower than this are flagged, the manifest asks for short ones.
const MAX_PROBE_DURATION: Duration = Duration::from_secs(30);

// Runtime defaults when a healthcheck omits a field.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComposeFile {
    #[serde(default)]
    pub services: BTreeMap<String, Service>,

    /// Top-level named volumes. Values are usually empty (`pgdata:`).
    #[serde(default)]
    pub volumes: BTreeMap<String, Option<serde_yaml::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Service {
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub command: Option<CommandSpec>,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub volumes: Vec<VolumeEntry>,

    #[serde(default)]
    pub ports: Vec<PortEntry>,

    #[serde(default)]
    pub healthcheck: Option<HealthCheck>,
}

/// `command:` and `healthcheck.test:` accept a shell string or an exec list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Shell(String),
    Exec(Vec<String>),
}

impl CommandSpec {
    /// Argument words, splitting the shell form on whitespace.
    pub fn words(&self) -> Vec<String> {
        match self {
            CommandSpec::Shell(line) => line.split_whitespace().map(str::to_owned).collect(),
            CommandSpec::Exec(args) => args.clone(),
        }
    }
}

/// `environment:` accepts a mapping or a list of `KEY=VALUE` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Environment {
    Map(BTreeMap<String, serde_yaml::Value>),
    List(Vec<String>),
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Map(BTreeMap::new())
    }
}

impl Environment {
    /// Value of `key`, rendering scalars as strings. `None` when unset or null.
    pub fn get(&self, key: &str) -> Option<String> {
        match self {
            Environment::Map(map) => match map.get(key)? {
                serde_yaml::Value::String(s) => Some(s.clone()),
                serde_yaml::Value::Number(n) => Some(n.to_string()),
                serde_yaml::Value::Bool(b) => Some(b.to_string()),
                _ => None,
            },
            Environment::List(entries) => entries.iter().find_map(|entry| {
                let (name, value) = entry.split_once('=')?;
                (name == key).then(|| value.to_owned())
            }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Environment::Map(map) => map.len(),
            Environment::List(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A `ports:` entry: `"15432:5432"`, a bare container port number, or the
/// long form with `target` / `published` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortEntry {
    Number(u16),
    Text(String),
    Long(LongPort),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongPort {
    pub target: PortValue,
    #[serde(default)]
    pub published: Option<PortValue>,
    #[serde(default)]
    pub host_ip: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Port numbers in the long form may be written as integers or strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u16),
    Text(String),
}

impl PortValue {
    fn port(&self, which: &str) -> Result<u16> {
        match self {
            PortValue::Number(port) => Ok(*port),
            PortValue::Text(text) if text.contains('-') => Err(VectlError::invalid_port(
                text.as_str(),
                "port ranges are not supported",
            )),
            PortValue::Text(text) => text.trim().parse().map_err(|_| {
                VectlError::invalid_port(text.as_str(), format!("{which} port is not a number"))
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host_ip: Option<String>,
    /// `None` when the runtime picks an ephemeral host port.
    pub host: Option<u16>,
    pub container: u16,
    pub protocol: String,
}

impl PortEntry {
    pub fn mapping(&self) -> Result<PortMapping> {
        match self {
            PortEntry::Number(port) => Ok(PortMapping {
                host_ip: None,
                host: None,
                container: *port,
                protocol: "tcp".to_owned(),
            }),
            PortEntry::Text(text) => text.parse(),
            PortEntry::Long(long) => Ok(PortMapping {
                host_ip: long.host_ip.clone(),
                host: long
                    .published
                    .as_ref()
                    .map(|published| published.port("host"))
                    .transpose()?,
                container: long.target.port("container")?,
                protocol: long.protocol.clone().unwrap_or_else(|| "tcp".to_owned()),
            }),
        }
    }
}

impl FromStr for PortMapping {
    type Err = VectlError;

    fn from_str(value: &str) -> Result<Self> {
        let (spec, protocol) = match value.rsplit_once('/') {
            Some((spec, proto)) => (spec, proto.to_owned()),
            None => (value, "tcp".to_owned()),
        };

        let parse_port = |part: &str, which: &str| -> Result<u16> {
            if part.contains('-') {
                return Err(VectlError::invalid_port(value, "port ranges are not supported"));
            }
            part.parse::<u16>()
                .map_err(|_| VectlError::invalid_port(value, format!("{which} port is not a number")))
        };

        let parts: Vec<&str> = spec.rsplitn(3, ':').collect();
        match parts.as_slice() {
            [container] => Ok(PortMapping {
                host_ip: None,
                host: None,
                container: parse_port(*container, "container")?,
                protocol,
            }),
            [container, host] => Ok(PortMapping {
                host_ip: None,
                host: Some(parse_port(*host, "host")?),
                container: parse_port(*container, "container")?,
                protocol,
            }),
            [container, host, ip] => Ok(PortMapping {
                host_ip: Some((*ip).to_owned()),
                host: if host.is_empty() {
                    None
                } else {
                    Some(parse_port(*host, "host")?)
                },
                container: parse_port(*container, "container")?,
                protocol,
            }),
            _ => Err(VectlError::invalid_port(value, "empty mapping")),
        }
    }
}

/// A service `volumes:` entry, `"pgdata:/var/lib/postgresql/data"` or the long
/// form with `type` / `source` / `target` keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeEntry {
    Short(String),
    Long(LongVolume),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongVolume {
    /// `volume`, `bind` or `tmpfs`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

impl VolumeEntry {
    pub fn mount(&self) -> Result<VolumeMount> {
        match self {
            VolumeEntry::Short(text) => text.parse(),
            VolumeEntry::Long(long) => {
                if long.target.is_empty() || long.source.as_deref() == Some("") {
                    return Err(VectlError::invalid_mount(format!(
                        "{{ source: {}, target: {} }}",
                        long.source.as_deref().unwrap_or("~"),
                        long.target
                    )));
                }
                // tmpfs mounts never have a source, whatever the file says
                let source = match long.kind.as_deref() {
                    Some("tmpfs") => None,
                    _ => long.source.clone(),
                };
                Ok(VolumeMount {
                    source,
                    target: long.target.clone(),
                    read_only: long.read_only,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Named volume or host path. `None` for anonymous volumes.
    pub source: Option<String>,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    /// Named volumes must be declared at the top level; bind mounts need not.
    pub fn is_named(&self) -> bool {
        self.source
            .as_deref()
            .map(|s| !(s.starts_with('.') || s.starts_with('/') || s.starts_with('~')))
            .unwrap_or(false)
    }
}

impl FromStr for VolumeMount {
    type Err = VectlError;

    fn from_str(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split(':').collect();
        let mount = match parts.as_slice() {
            [target] => VolumeMount {
                source: None,
                target: (*target).to_owned(),
                read_only: false,
            },
            [source, target] => VolumeMount {
                source: Some((*source).to_owned()),
                target: (*target).to_owned(),
                read_only: false,
            },
            [source, target, mode] => VolumeMount {
                source: Some((*source).to_owned()),
                target: (*target).to_owned(),
                read_only: mode.split(',').any(|m| m == "ro"),
            },
            _ => return Err(VectlError::invalid_mount(value)),
        };
        if mount.target.is_empty() || mount.source.as_deref() == Some("") {
            return Err(VectlError::invalid_mount(value));
        }
        Ok(mount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    #[serde(default)]
    pub test: Option<CommandSpec>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub start_period: Option<String>,
    #[serde(default)]
    pub disable: bool,
}

impl HealthCheck {
    /// The probe command without its `CMD` / `CMD-SHELL` marker.
    pub fn probe_words(&self) -> Vec<String> {
        let Some(test) = &self.test else {
            return Vec::new();
        };
        match test {
            CommandSpec::Shell(line) => line.split_whitespace().map(str::to_owned).collect(),
            CommandSpec::Exec(args) => match args.first().map(String::as_str) {
                Some("CMD") => args[1..].to_vec(),
                Some("CMD-SHELL") => args[1..]
                    .iter()
                    .flat_map(|a| a.split_whitespace().map(str::to_owned))
                    .collect(),
                Some("NONE") => Vec::new(),
                _ => args.clone(),
            },
        }
    }

    fn duration_or(&self, field: &Option<String>, default: Duration) -> Result<Duration> {
        field.as_deref().map(parse_duration).unwrap_or(Ok(default))
    }
}

/// Readiness polling parameters taken from a service's healthcheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessProbe {
    pub interval: Duration,
    pub timeout: Duration,
    pub retries: u32,
    pub start_period: Duration,
}

impl Default for ReadinessProbe {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            start_period: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One manifest validation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub service: Option<String>,
    pub message: String,
}

impl Finding {
    fn error(service: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            service: service.map(str::to_owned),
            message: message.into(),
        }
    }

    fn warning(service: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            service: service.map(str::to_owned),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match &self.service {
            Some(service) => write!(f, "{level}: [{service}] {}", self.message),
            None => write!(f, "{level}: {}", self.message),
        }
    }
}

impl FromStr for ComposeFile {
    type Err = VectlError;

    fn from_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| VectlError::yaml("<inline>", e))
    }
}

impl ComposeFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let compose = serde_yaml::from_str(&contents).map_err(|e| VectlError::yaml(path, e))?;
        debug!("Loaded compose manifest from {}", path.display());
        Ok(compose)
    }

    /// The database service: the one running a postgres-family image, or the
    /// only service when there is just one.
    pub fn database_service(&self) -> Result<(&str, &Service)> {
        let is_postgres = |svc: &Service| {
            svc.image
                .as_deref()
                .map(|img| img.contains("postgres") || img.contains("pgvector"))
                .unwrap_or(false)
        };

        self.services
            .iter()
            .find(|(_, svc)| is_postgres(*svc))
            .or_else(|| {
                if self.services.len() == 1 {
                    self.services.iter().next()
                } else {
                    None
                }
            })
            .map(|(name, svc)| (name.as_str(), svc))
            .ok_or_else(|| VectlError::missing_service("no postgres service declared"))
    }

    /// Check the manifest against the database contract vectl relies on.
    pub fn validate(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        if self.services.len() != 1 {
            findings.push(Finding::error(
                None,
                format!("expected exactly one service, found {}", self.services.len()),
            ));
        }

        for (name, service) in &self.services {
            self.validate_service(name, service, &mut findings);
        }

        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        findings
    }

    fn validate_service(&self, name: &str, service: &Service, findings: &mut Vec<Finding>) {
        let svc = Some(name);

        match service.image.as_deref() {
            None => findings.push(Finding::error(svc, "no image declared")),
            Some(image) if !image.contains("pgvector") => findings.push(Finding::error(
                svc,
                format!("image '{image}' does not ship the vector extension"),
            )),
            Some(image) if !image.contains(':') => findings.push(Finding::warning(
                svc,
                format!("image '{image}' is not pinned to a tag"),
            )),
            Some(_) => {}
        }

        let logs_everything = service
            .command
            .as_ref()
            .map(|cmd| cmd.words().iter().any(|w| w.ends_with(LOG_ALL_STATEMENTS)))
            .unwrap_or(false);
        if !logs_everything {
            findings.push(Finding::error(
                svc,
                format!("startup command does not set '{LOG_ALL_STATEMENTS}'"),
            ));
        }

        match service.environment.get(PASSWORD_VAR) {
            Some(_) => findings.push(Finding::warning(
                svc,
                format!("{PASSWORD_VAR} is stored in plaintext"),
            )),
            None => findings.push(Finding::error(svc, format!("{PASSWORD_VAR} is not set"))),
        }

        let mut data_mounted = false;
        for entry in &service.volumes {
            match entry.mount() {
                Ok(mount) => {
                    if mount.is_named() {
                        let source = mount.source.as_deref().unwrap_or_default();
                        if !self.volumes.contains_key(source) {
                            findings.push(Finding::error(
                                svc,
                                format!("named volume '{source}' is not declared"),
                            ));
                        }
                    }
                    if mount.target.trim_end_matches('/') == PG_DATA_DIR {
                        data_mounted = true;
                        if mount.source.is_none() {
                            findings.push(Finding::warning(
                                svc,
                                "data directory uses an anonymous volume",
                            ));
                        }
                    }
                }
                Err(err) => findings.push(Finding::error(svc, err.to_string())),
            }
        }
        if !data_mounted {
            findings.push(Finding::error(
                svc,
                format!("no volume mounted at {PG_DATA_DIR}"),
            ));
        }

        let mut published = false;
        for entry in &service.ports {
            match entry.mapping() {
                Ok(mapping) if mapping.container == PG_PORT => match mapping.host {
                    Some(host) if host < 1024 => findings.push(Finding::error(
                        svc,
                        format!("host port {host} is privileged"),
                    )),
                    Some(_) => published = true,
                    None => findings.push(Finding::warning(
                        svc,
                        format!("port {PG_PORT} is published on an ephemeral host port"),
                    )),
                },
                Ok(_) => {}
                Err(err) => findings.push(Finding::error(svc, err.to_string())),
            }
        }
        if !published {
            findings.push(Finding::error(
                svc,
                format!("container port {PG_PORT} is not published on a fixed host port"),
            ));
        }

        match &service.healthcheck {
            None => findings.push(Finding::error(svc, "no healthcheck declared")),
            Some(check) if check.disable => {
                findings.push(Finding::error(svc, "healthcheck is disabled"))
            }
            Some(check) => {
                if !check
                    .probe_words()
                    .iter()
                    .any(|w| w.ends_with(READINESS_COMMAND))
                {
                    findings.push(Finding::error(
                        svc,
                        format!("healthcheck does not run {READINESS_COMMAND}"),
                    ));
                }
                for (field, value) in [("interval", &check.interval), ("timeout", &check.timeout)] {
                    match value.as_deref().map(parse_duration) {
                        None => findings.push(Finding::warning(
                            svc,
                            format!("healthcheck {field} falls back to the runtime default"),
                        )),
                        Some(Err(err)) => findings.push(Finding::error(svc, err.to_string())),
                        Some(Ok(d)) if d > MAX_PROBE_DURATION => findings.push(Finding::warning(
                            svc,
                            format!("healthcheck {field} of {d:?} is not short"),
                        )),
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    /// Readiness parameters of the database service's healthcheck.
    pub fn readiness(&self) -> Result<ReadinessProbe> {
        let (_, service) = self.database_service()?;
        let Some(check) = &service.healthcheck else {
            return Ok(ReadinessProbe::default());
        };
        Ok(ReadinessProbe {
            interval: check.duration_or(&check.interval, DEFAULT_INTERVAL)?,
            timeout: check.duration_or(&check.timeout, DEFAULT_TIMEOUT)?,
            retries: check.retries.unwrap_or(DEFAULT_RETRIES),
            start_period: check.duration_or(&check.start_period, Duration::ZERO)?,
        })
    }

    /// Connection URL for the database service as seen from `host`.
    pub fn database_url(&self, host: &str) -> Result<Url> {
        let (name, service) = self.database_service()?;

        let port = service
            .ports
            .iter()
            .filter_map(|entry| entry.mapping().ok())
            .find(|m| m.container == PG_PORT)
            .and_then(|m| m.host)
            .ok_or_else(|| {
                VectlError::missing_service(format!("service '{name}' does not publish {PG_PORT}"))
            })?;

        let user = service
            .environment
            .get("POSTGRES_USER")
            .unwrap_or_else(|| "postgres".to_owned());
        let database = service
            .environment
            .get("POSTGRES_DB")
            .unwrap_or_else(|| user.clone());
        let password = service.environment.get(PASSWORD_VAR);

        let invalid = |what: &str| VectlError::config(format!("cannot build database URL: {what}"));
        let mut url = Url::parse("postgres://localhost").map_err(|_| invalid("base"))?;
        url.set_host(Some(host)).map_err(|_| invalid("host"))?;
        url.set_port(Some(port)).map_err(|_| invalid("port"))?;
        url.set_username(&user).map_err(|_| invalid("user"))?;
        url.set_password(password.as_deref())
            .map_err(|_| invalid("password"))?;
        url.set_path(&format!("/{database}"));
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_mapping_forms() {
        let m: PortMapping = "15432:5432".parse().unwrap();
        assert_eq!(m.host, Some(15432));
        assert_eq!(m.container, 5432);
        assert_eq!(m.protocol, "tcp");

        let m: PortMapping = "127.0.0.1:15432:5432/tcp".parse().unwrap();
        assert_eq!(m.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(m.host, Some(15432));

        let m: PortMapping = "5432".parse().unwrap();
        assert_eq!(m.host, None);

        assert!("5000-5010:5432".parse::<PortMapping>().is_err());
        assert!("x:5432".parse::<PortMapping>().is_err());
    }

    #[test]
    fn volume_mount_forms() {
        let m: VolumeMount = "pgdata:/var/lib/postgresql/data".parse().unwrap();
        assert!(m.is_named());
        assert!(!m.read_only);

        let m: VolumeMount = "./data:/var/lib/postgresql/data:ro".parse().unwrap();
        assert!(!m.is_named());
        assert!(m.read_only);

        let m: VolumeMount = "/var/lib/postgresql/data".parse().unwrap();
        assert_eq!(m.source, None);

        assert!(":/data".parse::<VolumeMount>().is_err());
    }

    #[test]
    fn long_syntax_ports_and_volumes() {
        let compose: ComposeFile = r#"
services:
  db:
    image: pgvector/pgvector:pg17
    environment:
      POSTGRES_PASSWORD: postgres
    volumes:
      - type: volume
        source: pgdata
        target: /var/lib/postgresql/data
      - type: bind
        source: ./init
        target: /docker-entrypoint-initdb.d
        read_only: true
    ports:
      - target: 5432
        published: "15432"
        host_ip: 127.0.0.1
volumes:
  pgdata:
"#
        .parse()
        .unwrap();

        let service = &compose.services["db"];
        let data = service.volumes[0].mount().unwrap();
        assert_eq!(data.source.as_deref(), Some("pgdata"));
        assert!(data.is_named());
        let init = service.volumes[1].mount().unwrap();
        assert!(init.read_only);
        assert!(!init.is_named());

        let port = service.ports[0].mapping().unwrap();
        assert_eq!(port.container, 5432);
        assert_eq!(port.host, Some(15432));
        assert_eq!(port.host_ip.as_deref(), Some("127.0.0.1"));

        let url = compose.database_url("localhost").unwrap();
        assert_eq!(url.port(), Some(15432));
    }

    #[test]
    fn long_syntax_port_range_is_rejected() {
        let entry: PortEntry =
            serde_yaml::from_str("target: 5432\npublished: \"15432-15440\"\n").unwrap();
        assert!(entry.mapping().is_err());

        let entry: PortEntry = serde_yaml::from_str("target: 5432\n").unwrap();
        assert_eq!(entry.mapping().unwrap().host, None);
    }

    #[test]
    fn environment_list_form() {
        let env = Environment::List(vec!["POSTGRES_PASSWORD=secret".into(), "A=b=c".into()]);
        assert_eq!(env.get("POSTGRES_PASSWORD").as_deref(), Some("secret"));
        assert_eq!(env.get("A").as_deref(), Some("b=c"));
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn healthcheck_probe_words_strip_marker() {
        let check = HealthCheck {
            test: Some(CommandSpec::Exec(vec![
                "CMD-SHELL".into(),
                "pg_isready -U postgres".into(),
            ])),
            interval: None,
            timeout: None,
            retries: None,
            start_period: None,
            disable: false,
        };
        assert_eq!(check.probe_words(), vec!["pg_isready", "-U", "postgres"]);
    }

    #[test]
    fn finding_display() {
        let finding = Finding::error(Some("db"), "no image declared");
        assert_eq!(finding.to_string(), "error: [db] no image declared");
    }
}
