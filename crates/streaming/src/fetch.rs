//! Deduplicated, concurrent tile fetching.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use formats::RasterImage;
use foundation::TileCoord;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::source::{DEFAULT_FETCH_TIMEOUT, SourceError, TileKind, TileSources};

#[derive(Debug, thiserror::Error)]
#[error("failed to fetch {kind} tile {key}")]
pub struct FetchError {
    pub kind: TileKind,
    pub key: String,
    #[source]
    pub source: SourceError,
}

/// Outcome of one tile request after the per-tile policy is applied.
enum TileOutcome {
    Loaded(RasterImage),
    Missing,
    Failed(SourceError),
}

/// Decoded tiles of one fetch, keyed by coordinate.
///
/// `None` marks a tile that was absent, timed out or failed to decode.
#[derive(Debug, Default)]
pub struct FetchedTiles {
    tiles: BTreeMap<TileCoord, Option<RasterImage>>,
    requested: usize,
}

impl FetchedTiles {
    pub fn get(&self, coord: TileCoord) -> Option<&RasterImage> {
        self.tiles.get(&coord).and_then(Option::as_ref)
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    /// Coordinate references handed to `fetch`, duplicates included.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Distinct tiles actually requested from the source.
    pub fn unique(&self) -> usize {
        self.tiles.len()
    }

    pub fn missing(&self) -> usize {
        self.tiles.values().filter(|t| t.is_none()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, Option<&RasterImage>)> + '_ {
        self.tiles.iter().map(|(coord, tile)| (*coord, tile.as_ref()))
    }
}

/// Fetches tiles from the configured sources.
///
/// Every distinct coordinate is requested exactly once and all requests run
/// concurrently; `fetch` returns only after all of them settled.
#[derive(Debug, Clone)]
pub struct TileFetcher {
    sources: TileSources,
    timeout: Duration,
}

impl TileFetcher {
    pub fn new(sources: TileSources) -> Self {
        Self {
            sources,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sources(&self) -> &TileSources {
        &self.sources
    }

    pub async fn fetch(
        &self,
        kind: TileKind,
        coords: impl IntoIterator<Item = TileCoord>,
    ) -> Result<FetchedTiles, FetchError> {
        let mut requested = 0usize;
        let unique: BTreeSet<TileCoord> = coords
            .into_iter()
            .inspect(|_| requested += 1)
            .collect();

        let requests = unique.iter().map(|&coord| self.fetch_one(kind, coord));
        let outcomes = join_all(requests).await;

        let mut tiles = BTreeMap::new();
        for (coord, outcome) in unique.into_iter().zip(outcomes) {
            match outcome {
                TileOutcome::Loaded(raster) => {
                    tiles.insert(coord, Some(raster));
                }
                TileOutcome::Missing => {
                    tiles.insert(coord, None);
                }
                TileOutcome::Failed(source) => {
                    return Err(FetchError {
                        kind,
                        key: coord.key(),
                        source,
                    });
                }
            }
        }

        let fetched = FetchedTiles { tiles, requested };
        info!(
            %kind,
            requested = fetched.requested(),
            unique = fetched.unique(),
            missing = fetched.missing(),
            "tiles fetched"
        );
        Ok(fetched)
    }

    async fn fetch_one(&self, kind: TileKind, coord: TileCoord) -> TileOutcome {
        if !coord.is_valid() {
            debug!(%kind, tile = %coord, "tile outside the pyramid");
            return TileOutcome::Missing;
        }

        let source = self.sources.get(kind);
        let bytes = match tokio::time::timeout(self.timeout, source.get_tile(coord)).await {
            Err(_) => {
                warn!(%kind, tile = %coord, timeout = ?self.timeout, "tile request timed out");
                return TileOutcome::Missing;
            }
            Ok(Err(err)) => return TileOutcome::Failed(err),
            Ok(Ok(None)) => {
                debug!(%kind, tile = %coord, "tile not available");
                return TileOutcome::Missing;
            }
            Ok(Ok(Some(bytes))) => bytes,
        };

        match RasterImage::decode(&bytes) {
            Ok(raster) => TileOutcome::Loaded(raster),
            Err(err) => {
                warn!(%kind, tile = %coord, error = %err, "dropping undecodable tile");
                TileOutcome::Missing
            }
        }
    }
}
