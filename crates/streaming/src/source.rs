//! Tile providers.
//!
//! A `DataSource` answers one question per tile: here are the encoded bytes,
//! the tile does not exist (`Ok(None)`), or the provider itself failed
//! (`Err`). Only the last one is allowed to abort a reconstruction.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use foundation::TileCoord;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub const DEFAULT_TERRAIN_TEMPLATE: &str =
    "https://api.mapbox.com/v4/mapbox.terrain-rgb/{z}/{x}/{y}.pngraw?access_token={key}";
pub const DEFAULT_IMAGERY_TEMPLATE: &str =
    "https://api.mapbox.com/styles/v1/mapbox/outdoors-v12/tiles/256/{z}/{x}/{y}?access_token={key}";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with status {status}")]
    Status { status: u16, url: String },
    #[error("tile template needs an API key but none is configured")]
    MissingKey,
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// What a tile encodes. Decides the URL template and the fill used for
/// tiles that never arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    /// Terrain-RGB elevation.
    Terrain,
    /// Satellite or styled map imagery.
    Imagery,
}

impl TileKind {
    /// RGBA written where a tile of this kind is missing.
    pub fn placeholder(self) -> [u8; 4] {
        match self {
            TileKind::Terrain => formats::ZERO_ELEVATION_RGBA,
            TileKind::Imagery => [0, 0, 0, 0],
        }
    }
}

impl std::fmt::Display for TileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileKind::Terrain => f.write_str("terrain"),
            TileKind::Imagery => f.write_str("imagery"),
        }
    }
}

/// Supplies the credential substituted for `{key}` in tile templates.
pub trait KeyProvider: Send + Sync {
    fn key(&self) -> Option<String>;
}

/// A key fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticKey(pub Option<String>);

impl StaticKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl KeyProvider for StaticKey {
    fn key(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A key read from an environment variable on every request, so rotating
/// the variable takes effect without rebuilding the source.
#[derive(Debug, Clone)]
pub struct EnvKey {
    var: String,
}

impl EnvKey {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl KeyProvider for EnvKey {
    fn key(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Trait for tile data sources.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait DataSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Returns `Ok(None)` if the tile doesn't exist (equivalent to 404),
    /// `Err` on actual errors (network, protocol, credentials).
    fn get_tile(&self, coord: TileCoord) -> BoxFuture<'_, Result<Option<Bytes>, SourceError>>;
}

/// HTTP tile source driven by a `{z}/{x}/{y}` URL template.
pub struct HttpSource {
    name: String,
    url_template: String,
    key: Arc<dyn KeyProvider>,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(
        url_template: impl Into<String>,
        name: impl Into<String>,
        key: Arc<dyn KeyProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            key,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn tile_url(&self, coord: TileCoord) -> Result<String, SourceError> {
        let url = self
            .url_template
            .replace("{z}", &coord.z.to_string())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string());
        if !url.contains("{key}") {
            return Ok(url);
        }
        let key = self.key.key().ok_or(SourceError::MissingKey)?;
        Ok(url.replace("{key}", &key))
    }
}

impl DataSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_tile(&self, coord: TileCoord) -> BoxFuture<'_, Result<Option<Bytes>, SourceError>> {
        Box::pin(async move {
            let url = self.tile_url(coord)?;
            let resp = self.client.get(&url).send().await?;

            if resp.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !resp.status().is_success() {
                // Never log or return the credential-bearing URL verbatim.
                let shown = url.split('?').next().unwrap_or_default().to_string();
                return Err(SourceError::Status {
                    status: resp.status().as_u16(),
                    url: shown,
                });
            }

            Ok(Some(resp.bytes().await?))
        })
    }
}

/// In-memory tile source for tests and offline runs.
///
/// Counts every `get_tile` call so callers can check deduplication.
pub struct MemorySource {
    name: String,
    tiles: RwLock<HashMap<TileCoord, Bytes>>,
    failing: RwLock<HashSet<TileCoord>>,
    latency: Option<Duration>,
    requests: AtomicUsize,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tiles: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
            latency: None,
            requests: AtomicUsize::new(0),
        }
    }

    /// Delay every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn set_tile(&self, coord: TileCoord, data: impl Into<Bytes>) {
        self.tiles.write().await.insert(coord, data.into());
    }

    /// Make requests for `coord` fail hard.
    pub async fn fail_tile(&self, coord: TileCoord) {
        self.failing.write().await.insert(coord);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_tile(&self, coord: TileCoord) -> BoxFuture<'_, Result<Option<Bytes>, SourceError>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            if self.failing.read().await.contains(&coord) {
                return Err(SourceError::Unavailable(format!("{} refused {coord}", self.name)));
            }
            Ok(self.tiles.read().await.get(&coord).cloned())
        })
    }
}

/// One source per tile kind.
#[derive(Clone)]
pub struct TileSources {
    pub terrain: Arc<dyn DataSource>,
    pub imagery: Arc<dyn DataSource>,
}

impl TileSources {
    pub fn new(terrain: Arc<dyn DataSource>, imagery: Arc<dyn DataSource>) -> Self {
        Self { terrain, imagery }
    }

    pub fn get(&self, kind: TileKind) -> &Arc<dyn DataSource> {
        match kind {
            TileKind::Terrain => &self.terrain,
            TileKind::Imagery => &self.imagery,
        }
    }

    /// HTTP sources for both kinds, sharing one client and one key.
    pub fn http(config: &TileSourceConfig, key: Arc<dyn KeyProvider>) -> Self {
        let client = reqwest::Client::new();
        let terrain = HttpSource::new(&config.terrain_template, "terrain", key.clone())
            .with_client(client.clone());
        let imagery =
            HttpSource::new(&config.imagery_template, "imagery", key).with_client(client);
        Self::new(Arc::new(terrain), Arc::new(imagery))
    }
}

impl std::fmt::Debug for TileSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSources")
            .field("terrain", &self.terrain.name())
            .field("imagery", &self.imagery.name())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSourceConfig {
    pub terrain_template: String,
    pub imagery_template: String,
    pub timeout_secs: u64,
}

impl Default for TileSourceConfig {
    fn default() -> Self {
        Self {
            terrain_template: DEFAULT_TERRAIN_TEMPLATE.to_string(),
            imagery_template: DEFAULT_IMAGERY_TEMPLATE.to_string(),
            timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
        }
    }
}

impl TileSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use foundation::TileCoord;
    use pretty_assertions::assert_eq;

    use super::{
        DataSource, HttpSource, MemorySource, SourceError, StaticKey, TileKind, TileSourceConfig,
    };

    #[test]
    fn template_substitutes_coordinates_and_key() {
        let source = HttpSource::new(
            "https://tiles.example/{z}/{x}/{y}.pngraw?access_token={key}",
            "terrain",
            Arc::new(StaticKey::new("pk.test")),
        );
        let url = source.tile_url(TileCoord::new(12, 2145, 1434)).unwrap();
        assert_eq!(url, "https://tiles.example/12/2145/1434.pngraw?access_token=pk.test");
    }

    #[test]
    fn template_without_key_placeholder_needs_no_key() {
        let source = HttpSource::new("http://localhost/{z}/{x}/{y}.png", "local", Arc::new(StaticKey::none()));
        assert_eq!(
            source.tile_url(TileCoord::new(1, 0, 1)).unwrap(),
            "http://localhost/1/0/1.png"
        );
    }

    #[test]
    fn missing_key_is_a_hard_error() {
        let source = HttpSource::new(
            "https://tiles.example/{z}/{x}/{y}?access_token={key}",
            "imagery",
            Arc::new(StaticKey::none()),
        );
        assert!(matches!(
            source.tile_url(TileCoord::new(0, 0, 0)),
            Err(SourceError::MissingKey)
        ));
    }

    #[test]
    fn placeholders_per_kind() {
        assert_eq!(TileKind::Terrain.placeholder(), [1, 134, 160, 255]);
        assert_eq!(TileKind::Imagery.placeholder(), [0, 0, 0, 0]);
    }

    #[test]
    fn config_fills_defaults() {
        let config: TileSourceConfig = serde_json::from_str(r#"{"timeout_secs": 3}"#).unwrap();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.terrain_template, TileSourceConfig::default().terrain_template);
        assert!(config.imagery_template.contains("{z}/{x}/{y}"));
    }

    #[tokio::test]
    async fn memory_source_distinguishes_absent_and_failing() {
        let source = MemorySource::new("mem");
        let present = TileCoord::new(3, 1, 1);
        let broken = TileCoord::new(3, 2, 2);
        source.set_tile(present, vec![1u8, 2, 3]).await;
        source.fail_tile(broken).await;

        assert_eq!(source.get_tile(present).await.unwrap().as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(source.get_tile(TileCoord::new(3, 0, 0)).await.unwrap().is_none());
        assert!(source.get_tile(broken).await.is_err());
        assert_eq!(source.request_count(), 3);
    }
}
