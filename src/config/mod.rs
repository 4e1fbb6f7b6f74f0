//! Workload configuration module
//!
//! Handles loading, saving, and validation of the declarative workload
//! document: which backend to drive, and which synthetic streams to emit
//! at which rates.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::{LogBenchError, Result};

pub mod persistence;

/// Default endpoint matching the Rerun proxy port used by the harness.
pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:9876";

/// Minimum resource sampling interval; anything tighter perturbs the run.
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Synthetic data kinds supported by the generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// 3D point cloud with per-point colors
    Points3d,
    /// RGB8 image
    Image,
    /// Text log line
    Text,
    /// Triangle mesh with per-vertex colors
    Mesh,
}

impl DataKind {
    /// Get a human-readable name for the kind
    pub fn name(&self) -> &'static str {
        match self {
            DataKind::Points3d => "points3d",
            DataKind::Image => "image",
            DataKind::Text => "text",
            DataKind::Mesh => "mesh",
        }
    }
}

/// Size descriptor for one stream: a flat element count, or image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpec {
    /// Number of points, characters, or vertices
    Count(u64),
    /// Image dimensions in pixels
    Dimensions { width: u32, height: u32 },
}

impl SizeSpec {
    /// Parse a size descriptor from its config form: an integer, or a
    /// `WIDTHxHEIGHT` string such as `"640x480"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();

        if let Ok(count) = raw.parse::<u64>() {
            if count == 0 {
                return Err(LogBenchError::InvalidSizeDescriptor(
                    "size must be positive".to_string(),
                ));
            }
            return Ok(SizeSpec::Count(count));
        }

        let lower = raw.to_ascii_lowercase();
        let (w, h) = lower.split_once('x').ok_or_else(|| {
            LogBenchError::InvalidSizeDescriptor(format!(
                "expected an integer or WIDTHxHEIGHT, got: {}",
                raw
            ))
        })?;

        let width: u32 = w.trim().parse().map_err(|_| {
            LogBenchError::InvalidSizeDescriptor(format!("invalid width in: {}", raw))
        })?;
        let height: u32 = h.trim().parse().map_err(|_| {
            LogBenchError::InvalidSizeDescriptor(format!("invalid height in: {}", raw))
        })?;

        if width == 0 || height == 0 {
            return Err(LogBenchError::InvalidSizeDescriptor(
                "width and height must be positive".to_string(),
            ));
        }

        Ok(SizeSpec::Dimensions { width, height })
    }

    /// Human-readable description of this size for the given kind
    pub fn describe(&self, kind: DataKind) -> String {
        match (kind, self) {
            (DataKind::Points3d, SizeSpec::Count(n)) => format!("{} points", n),
            (DataKind::Image, SizeSpec::Count(n)) => format!("{}x{} pixels", n, n),
            (DataKind::Image, SizeSpec::Dimensions { width, height }) => {
                format!("{}x{} pixels", width, height)
            }
            (DataKind::Text, SizeSpec::Count(n)) => format!("{} chars", n),
            (DataKind::Mesh, SizeSpec::Count(n)) => format!("{} vertices", n),
            (_, SizeSpec::Dimensions { width, height }) => format!("{}x{}", width, height),
        }
    }
}

impl Serialize for SizeSpec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            SizeSpec::Count(n) => serializer.serialize_u64(*n),
            SizeSpec::Dimensions { width, height } => {
                serializer.serialize_str(&format!("{}x{}", width, height))
            }
        }
    }
}

impl<'de> Deserialize<'de> for SizeSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawSize {
            Count(u64),
            Text(String),
        }

        match RawSize::deserialize(deserializer)? {
            RawSize::Count(n) => {
                if n == 0 {
                    return Err(serde::de::Error::custom("size must be positive"));
                }
                Ok(SizeSpec::Count(n))
            }
            RawSize::Text(s) => SizeSpec::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// The bound on one stream: run for a wall-clock duration, or emit a fixed
/// number of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLimit {
    /// Emit for this long from run start
    Duration(Duration),
    /// Emit exactly this many records
    Records(u64),
}

/// Definition of one synthetic stream within a workload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSpec {
    /// Data kind emitted by this stream
    pub kind: DataKind,
    /// Structural size of each payload
    pub size: SizeSpec,
    /// Target emission rate in records per second
    pub rate_hz: f64,
    /// Duration bound; mutually exclusive with `count`
    #[serde(default, with = "opt_duration_serde", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    /// Record-count bound; mutually exclusive with `duration`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl StreamSpec {
    /// Create a new stream definition bounded by duration
    pub fn new(kind: DataKind, size: SizeSpec, rate_hz: f64) -> Self {
        Self {
            kind,
            size,
            rate_hz,
            duration: Some(Duration::from_secs(10)),
            count: None,
        }
    }

    /// Bound this stream by wall-clock duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self.count = None;
        self
    }

    /// Bound this stream by total record count
    pub fn with_count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self.duration = None;
        self
    }

    /// The configured bound for this stream
    pub fn limit(&self) -> StreamLimit {
        match (self.count, self.duration) {
            (Some(n), _) => StreamLimit::Records(n),
            (None, Some(d)) => StreamLimit::Duration(d),
            // Rejected by validate(); treat as an empty stream.
            (None, None) => StreamLimit::Records(0),
        }
    }

    /// Total number of emission events this stream will produce
    pub fn total_events(&self) -> u64 {
        match self.limit() {
            StreamLimit::Records(n) => n,
            StreamLimit::Duration(d) => (self.rate_hz * d.as_secs_f64()).floor() as u64,
        }
    }

    /// Spacing between consecutive target timestamps
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }

    /// Validate this stream definition
    pub fn validate(&self) -> Result<()> {
        if !self.rate_hz.is_finite() || self.rate_hz <= 0.0 {
            return Err(LogBenchError::ConfigError(format!(
                "Stream rate must be positive, got {}",
                self.rate_hz
            )));
        }

        match (self.duration, self.count) {
            (Some(_), Some(_)) => {
                return Err(LogBenchError::ConfigError(
                    "Stream must set either duration or count, not both".to_string(),
                ));
            }
            (None, None) => {
                return Err(LogBenchError::ConfigError(
                    "Stream must set a duration or count bound".to_string(),
                ));
            }
            (Some(d), None) if d.is_zero() => {
                return Err(LogBenchError::ConfigError(
                    "Stream duration must be greater than 0".to_string(),
                ));
            }
            (None, Some(0)) => {
                return Err(LogBenchError::ConfigError(
                    "Stream count must be greater than 0".to_string(),
                ));
            }
            _ => {}
        }

        // Dimensions only make sense for images; a plain count is valid for
        // every kind (an image with count n means an n x n frame).
        if let SizeSpec::Dimensions { .. } = self.size {
            if self.kind != DataKind::Image {
                return Err(LogBenchError::InvalidSizeDescriptor(format!(
                    "{} streams take an element count, not dimensions",
                    self.kind.name()
                )));
            }
        }

        Ok(())
    }
}

/// Backend selection for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Which log server to benchmark
    pub kind: BackendKind,
    /// Endpoint the adapter connects to, e.g. `127.0.0.1:9876`
    pub endpoint: String,
}

impl Default for BackendSpec {
    fn default() -> Self {
        Self {
            kind: BackendKind::Rerun,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

/// Root workload specification: one backend, one set of streams, one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSpec {
    /// Workload name, used in reports
    pub name: String,
    /// Backend selection
    #[serde(default)]
    pub backend: BackendSpec,
    /// Stream definitions, in declaration order
    pub streams: Vec<StreamSpec>,
    /// Resource sampling cadence, independent of emission
    #[serde(default = "default_sample_interval", with = "duration_serde")]
    pub sample_interval: Duration,
}

fn default_sample_interval() -> Duration {
    Duration::from_millis(100)
}

impl Default for WorkloadSpec {
    fn default() -> Self {
        Self {
            name: "benchmark".to_string(),
            backend: BackendSpec::default(),
            streams: Vec::new(),
            sample_interval: default_sample_interval(),
        }
    }
}

impl WorkloadSpec {
    /// Create a new workload specification with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the backend selection
    pub fn with_backend(mut self, kind: BackendKind, endpoint: impl Into<String>) -> Self {
        self.backend = BackendSpec {
            kind,
            endpoint: endpoint.into(),
        };
        self
    }

    /// Append a stream definition
    pub fn with_stream(mut self, stream: StreamSpec) -> Self {
        self.streams.push(stream);
        self
    }

    /// Set the resource sampling interval
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Validate the workload specification
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LogBenchError::ConfigError(
                "Workload name must not be empty".to_string(),
            ));
        }

        if self.streams.is_empty() {
            return Err(LogBenchError::ConfigError(
                "Workload must declare at least one stream".to_string(),
            ));
        }

        for (i, stream) in self.streams.iter().enumerate() {
            stream.validate().map_err(|e| match e {
                LogBenchError::InvalidSizeDescriptor(msg) => {
                    LogBenchError::InvalidSizeDescriptor(format!("stream {}: {}", i, msg))
                }
                LogBenchError::ConfigError(msg) => {
                    LogBenchError::ConfigError(format!("stream {}: {}", i, msg))
                }
                other => other,
            })?;
        }

        if self.backend.endpoint.trim().is_empty() {
            return Err(LogBenchError::ConfigError(
                "Backend endpoint must not be empty".to_string(),
            ));
        }

        if self.sample_interval < MIN_SAMPLE_INTERVAL {
            return Err(LogBenchError::ConfigError(format!(
                "Sample interval must be at least {:?}",
                MIN_SAMPLE_INTERVAL
            )));
        }

        Ok(())
    }

    /// Load a workload specification from a TOML file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LogBenchError::ConfigError(format!(
                "Failed to read workload file {}: {}",
                path.display(),
                e
            ))
        })?;

        let spec: Self = toml::from_str(&content).map_err(|e| {
            LogBenchError::ConfigError(format!(
                "Failed to parse workload file {}: {}",
                path.display(),
                e
            ))
        })?;

        spec.validate()?;
        Ok(spec)
    }

    /// Save this workload specification to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.validate()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LogBenchError::ConfigError(format!(
                    "Failed to create workload directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            LogBenchError::ConfigError(format!(
                "Failed to write workload file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

/// Serde helpers for humantime-formatted durations ("10s", "250ms")
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod opt_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text: Option<String> = Option::deserialize(deserializer)?;
        text.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
