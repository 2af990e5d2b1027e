//! Configuration Vault – reads/writes `~/.rovlink/config.toml`.
//!
//! Only deployment details live here (where to connect, how fast to tick).
//! Smoothing and pose constants are compiled in.

use rovlink_middleware::mqtt_listener::DEFAULT_MQTT_PORT;
use rovlink_middleware::{
    MqttListener, NetworkIngestor, SocketListener, SocketMode, TopicListener, TopicMap,
};
use rovlink_types::{ControlMode, PairLayout, RovError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest accepted control loop rate.
pub const MAX_TICK_HZ: u32 = 1000;

/// Default rosbridge WebSocket port.
const DEFAULT_ROSBRIDGE_PORT: u16 = 9090;

/// Protocol spoken by the telemetry broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerTransport {
    #[default]
    Mqtt,
    Rosbridge,
}

/// Telemetry topic broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub transport: BrokerTransport,
    #[serde(default = "default_broker_host")]
    pub host: String,
    /// Unset means the transport's standard port (1883 or 9090).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default = "default_pipe_topic")]
    pub pipe_topic: String,
    #[serde(default = "default_odometry_topic")]
    pub odometry_topic: String,
    #[serde(default = "default_follow_speed_topic")]
    pub follow_speed_topic: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            transport: BrokerTransport::default(),
            host: default_broker_host(),
            port: None,
            pipe_topic: default_pipe_topic(),
            odometry_topic: default_odometry_topic(),
            follow_speed_topic: default_follow_speed_topic(),
        }
    }
}

impl BrokerConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.transport {
            BrokerTransport::Mqtt => DEFAULT_MQTT_PORT,
            BrokerTransport::Rosbridge => DEFAULT_ROSBRIDGE_PORT,
        })
    }

    fn topics(&self) -> TopicMap {
        TopicMap {
            pipe: self.pipe_topic.clone(),
            odometry: self.odometry_topic.clone(),
            follow_speed: self.follow_speed_topic.clone(),
        }
    }

    pub fn listener(&self) -> Box<dyn NetworkIngestor> {
        match self.transport {
            BrokerTransport::Mqtt => {
                Box::new(MqttListener::new(&self.host, self.port()).with_topics(self.topics()))
            }
            BrokerTransport::Rosbridge => {
                Box::new(TopicListener::new(&self.host, self.port()).with_topics(self.topics()))
            }
        }
    }
}

/// Raw ASCII-pair socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// `listen` binds `address:port`; `connect` dials it.
    #[serde(default)]
    pub mode: SocketMode,
    #[serde(default = "default_socket_address")]
    pub address: String,
    #[serde(default = "default_socket_port")]
    pub port: u16,
    /// Overrides the per-mode default reading of the two floats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<PairLayout>,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: SocketMode::Listen,
            address: default_socket_address(),
            port: default_socket_port(),
            layout: None,
        }
    }
}

impl SocketConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn listener(&self) -> SocketListener {
        let listener = match self.mode {
            SocketMode::Listen => SocketListener::listen(self.endpoint()),
            SocketMode::Connect => SocketListener::connect(self.endpoint()),
        };
        match self.layout {
            Some(layout) => listener.with_layout(layout),
            None => listener,
        }
    }
}

/// Persisted operator configuration stored in `~/.rovlink/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Tick frequency of the control loop.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Producer active at startup.
    #[serde(default)]
    pub start_mode: ControlMode,

    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub socket: SocketConfig,
}

fn default_true() -> bool {
    true
}
fn default_tick_hz() -> u32 {
    60
}
fn default_broker_host() -> String {
    "localhost".to_string()
}
fn default_pipe_topic() -> String {
    "/pipe".to_string()
}
fn default_odometry_topic() -> String {
    "/odom".to_string()
}
fn default_follow_speed_topic() -> String {
    "/pipefollowspeed".to_string()
}
fn default_socket_address() -> String {
    "0.0.0.0".to_string()
}
fn default_socket_port() -> u16 {
    8888
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            start_mode: ControlMode::default(),
            broker: BrokerConfig::default(),
            socket: SocketConfig::default(),
        }
    }
}

impl Config {
    /// Rate the loop actually runs at: zero falls back to the default and
    /// anything above [`MAX_TICK_HZ`] is capped.
    pub fn tick_rate(&self) -> u32 {
        match self.tick_hz {
            0 => default_tick_hz(),
            hz => hz.min(MAX_TICK_HZ),
        }
    }

    /// Interval between ticks.  Never zero.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate()
    }
}

/// Return the path to `~/.rovlink/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rovlink").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, RovError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, RovError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RovError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let mut cfg: Config = toml::from_str(&raw).map_err(|e| {
        RovError::Config(format!("failed to parse {}: {}", path.display(), e))
    })?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Defaults with env overrides applied, for when no file exists.
pub fn defaults_with_env() -> Config {
    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    cfg
}

/// Apply `ROVLINK_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVLINK_BROKER_HOST` | `broker.host` |
/// | `ROVLINK_BROKER_PORT` | `broker.port` |
/// | `ROVLINK_SOCKET_PORT` | `socket.port` |
/// | `ROVLINK_TICK_HZ` | `tick_hz` |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROVLINK_BROKER_HOST") {
        cfg.broker.host = v;
    }
    if let Ok(v) = std::env::var("ROVLINK_BROKER_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.broker.port = Some(port);
    }
    if let Ok(v) = std::env::var("ROVLINK_SOCKET_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.socket.port = port;
    }
    if let Ok(v) = std::env::var("ROVLINK_TICK_HZ")
        && let Ok(hz) = v.parse::<u32>()
        && (1..=MAX_TICK_HZ).contains(&hz)
    {
        cfg.tick_hz = hz;
    }
}

/// Save the config to disk, creating `~/.rovlink/` if necessary.
pub fn save(cfg: &Config) -> Result<(), RovError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), RovError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RovError::Config(format!("failed to create config directory: {}", e))
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                RovError::Config(format!("failed to set config directory permissions: {}", e))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RovError::Config(format!("failed to serialize config: {}", e)))?;
    fs::write(path, raw)
        .map_err(|e| RovError::Config(format!("failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_points_to_rovlink_dir() {
        let p = config_path_for_home("/home/pilot");
        assert!(p.to_string_lossy().contains(".rovlink"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.start_mode, ControlMode::Local);
        assert_eq!(loaded.broker.pipe_topic, "/pipe");
        assert_eq!(loaded.socket.mode, SocketMode::Listen);
        assert_eq!(loaded.socket.port, 8888);
    }

    #[cfg(unix)]
    #[test]
    fn config_directory_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&Config::default(), &path).expect("save");

        let parent = path.parent().expect("parent");
        let mode = std::fs::metadata(parent).expect("dir metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "start_mode = \"remote\"\n[socket]\nmode = \"connect\"\naddress = \"192.168.2.1\"\nlayout = \"offset_heading\"\n",
        )
        .expect("write");

        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.start_mode, ControlMode::Remote);
        assert_eq!(cfg.socket.mode, SocketMode::Connect);
        assert_eq!(cfg.socket.endpoint(), "192.168.2.1:8888");
        assert_eq!(cfg.socket.layout, Some(PairLayout::OffsetHeading));
        assert!(cfg.broker.enabled);
        assert_eq!(cfg.broker.odometry_topic, "/odom");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "tick_hz = \"fast\"").expect("write");
        assert!(matches!(load_from(&path), Err(RovError::Config(_))));
    }

    #[test]
    fn unwritable_path_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").expect("write");
        let err = save_to(&Config::default(), &blocker.join("config.toml")).unwrap_err();
        assert!(matches!(err, RovError::Config(_)));
    }

    #[test]
    fn socket_listener_follows_mode_and_layout() {
        let mut s = SocketConfig::default();
        assert_eq!(s.listener().mode(), SocketMode::Listen);
        assert_eq!(s.listener().layout(), PairLayout::DistanceAngle);

        s.mode = SocketMode::Connect;
        assert_eq!(s.listener().layout(), PairLayout::OffsetHeading);
        s.layout = Some(PairLayout::DistanceAngle);
        assert_eq!(s.listener().layout(), PairLayout::DistanceAngle);
    }

    #[test]
    fn broker_defaults_to_mqtt_on_1883() {
        let b = BrokerConfig::default();
        assert_eq!(b.transport, BrokerTransport::Mqtt);
        assert_eq!(b.port(), 1883);
        assert_eq!(b.listener().name(), "mqtt-listener");
    }

    #[test]
    fn rosbridge_transport_is_selectable() {
        let cfg: Config =
            toml::from_str("[broker]\ntransport = \"rosbridge\"\nhost = \"topside\"\n").expect("parse");
        assert_eq!(cfg.broker.transport, BrokerTransport::Rosbridge);
        assert_eq!(cfg.broker.port(), 9090);
        assert_eq!(cfg.broker.listener().name(), "topic-listener");
        assert_eq!(TopicListener::new(&cfg.broker.host, cfg.broker.port()).url(), "ws://topside:9090");
    }

    #[test]
    fn explicit_broker_port_wins() {
        let mut b = BrokerConfig::default();
        b.port = Some(11883);
        assert_eq!(b.port(), 11883);
    }

    #[test]
    fn tick_period_from_rate() {
        let mut cfg = Config::default();
        cfg.tick_hz = 50;
        assert_eq!(cfg.tick_period(), Duration::from_millis(20));
        cfg.tick_hz = 0;
        assert_eq!(cfg.tick_period(), Duration::from_secs(1) / 60);
    }

    #[test]
    fn tick_rate_is_capped() {
        let mut cfg = Config::default();
        cfg.tick_hz = 2_000_000_000;
        assert_eq!(cfg.tick_rate(), MAX_TICK_HZ);
        assert_eq!(cfg.tick_period(), Duration::from_millis(1));
        cfg.tick_hz = u32::MAX;
        assert!(!cfg.tick_period().is_zero());
    }

    #[test]
    fn apply_env_overrides_changes_broker_host() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVLINK_BROKER_HOST", "rov-topside") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.broker.host, "rov-topside");
        unsafe { std::env::remove_var("ROVLINK_BROKER_HOST") };
    }

    #[test]
    fn apply_env_overrides_changes_broker_port() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVLINK_BROKER_PORT", "9191") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.broker.port(), 9191);
        unsafe { std::env::remove_var("ROVLINK_BROKER_PORT") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_socket_port() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVLINK_SOCKET_PORT", "not-a-port") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.socket.port, 8888);
        unsafe { std::env::remove_var("ROVLINK_SOCKET_PORT") };
    }

    #[test]
    fn apply_env_overrides_changes_tick_rate() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("ROVLINK_TICK_HZ", "30") };
        let cfg = defaults_with_env();
        assert_eq!(cfg.tick_hz, 30);
        unsafe { std::env::remove_var("ROVLINK_TICK_HZ") };
    }
}
