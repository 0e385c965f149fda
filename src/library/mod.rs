//! Animation library: rejection sampling, quality gating, persistence
//!
//! Turns the stochastic simulator into a reliable asset store: for each
//! (row count, bucket) slot it keeps a set of verified trajectories, mirrors
//! the whole map to its storage port on every mutation, and hands playback
//! a uniformly random approved animation on request.
//!
//! The library is an explicit instance owned by the composition root; there
//! is no module-level singleton. Generation is an offline tooling operation
//! and is never run concurrently with playback.

pub mod codec;
pub mod quality;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

pub use codec::{BucketMap, CodecError, RowMap};
pub use quality::RejectReason;

use crate::anim::{BallAnimation, Quality};
use crate::layout::{bucket_for_x, calculate_layout, generate_pegs};
use crate::sim::{SimulationConfig, SimulationResult, simulate_ball_drop};
use crate::storage::StoragePort;

/// Storage key the whole library is mirrored under
pub const STORAGE_KEY: &str = "plinko_forge_library";

/// Rejection-sampling budget per needed animation; beyond this the bucket is
/// left under-populated with a warning instead of blocking forever
pub const MAX_ATTEMPTS_PER_ANIMATION: u32 = 10_000;

/// Approvals between progress-hook invocations (the cooperative yield point)
const YIELD_EVERY: u32 = 3;

/// Snapshot handed to the generation progress hook
///
/// The hook doubles as the yield point in a cooperative host: sleep or defer
/// in it and generation never monopolizes the thread.
#[derive(Debug, Clone, Copy)]
pub struct GenerationProgress {
    pub bucket: u32,
    pub approved: u32,
    pub quota: u32,
    pub attempts: u32,
}

/// Per-bucket outcome of a generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketOutcome {
    pub bucket: u32,
    pub approved: u32,
    pub attempts: u32,
    /// Landed in the right bucket but failed a quality gate
    pub rejected: u32,
    /// Quota not reached within the attempt budget
    pub shortfall: u32,
}

/// Outcome of a whole generation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub buckets: Vec<BucketOutcome>,
}

impl GenerationReport {
    pub fn total_approved(&self) -> u32 {
        self.buckets.iter().map(|b| b.approved).sum()
    }

    pub fn fully_populated(&self) -> bool {
        self.buckets.iter().all(|b| b.shortfall == 0)
    }
}

/// One relocation performed by the scrub pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrubDetail {
    pub id: String,
    pub row_count: u32,
    pub from_bucket: u32,
    pub to_bucket: u32,
}

/// Outcome of [`AnimationLibrary::scrub_and_reassign`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrubReport {
    pub checked: u32,
    /// Relocated to a different bucket slot
    pub moved: u32,
    /// Slot already correct, only the stored `target_bucket` was fixed
    pub retargeted: u32,
    pub unchanged: u32,
    pub details: Vec<ScrubDetail>,
}

/// Per-row-count animation asset source, fetched lazily on first use
///
/// Mirrors shipping one JSON asset per supported row count: the runtime pulls
/// the row's asset the first time that row count is requested.
pub trait AssetSource {
    /// The JSON document for a row count, `None` when no asset exists
    fn fetch(&self, row_count: u32) -> Option<String>;
}

/// Assets as `plinko-animations-{rows}.json` files in a directory
#[derive(Debug)]
pub struct FileAssetSource {
    dir: PathBuf,
}

impl FileAssetSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AssetSource for FileAssetSource {
    fn fetch(&self, row_count: u32) -> Option<String> {
        fs::read_to_string(self.dir.join(format!("plinko-animations-{row_count}.json"))).ok()
    }
}

/// The verified trajectory store
pub struct AnimationLibrary {
    rows: RowMap,
    storage: Box<dyn StoragePort>,
    assets: Option<Box<dyn AssetSource>>,
    /// Row counts whose asset fetch already ran (hit or miss); misses are
    /// not retried
    loaded_rows: HashSet<u32>,
}

impl AnimationLibrary {
    /// Open the library over a storage backend, reloading whatever the
    /// backend holds under [`STORAGE_KEY`]
    pub fn new(storage: Box<dyn StoragePort>) -> Self {
        let rows = match storage.get(STORAGE_KEY) {
            None => RowMap::new(),
            Some(json) => match codec::parse_library(&json) {
                Ok(rows) => rows,
                Err(e) => {
                    log::warn!("persisted library unreadable, starting empty: {e}");
                    RowMap::new()
                }
            },
        };
        Self {
            rows,
            storage,
            assets: None,
            loaded_rows: HashSet::new(),
        }
    }

    /// Attach a lazy per-row asset source
    pub fn with_assets(mut self, assets: Box<dyn AssetSource>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Mirror the whole in-memory map to storage (last writer wins)
    fn persist(&mut self) {
        match serde_json::to_string(&self.rows) {
            Ok(json) => {
                if let Err(e) = self.storage.set(STORAGE_KEY, &json) {
                    log::warn!("library persist failed: {e}");
                }
            }
            Err(e) => log::warn!("library serialize failed: {e}"),
        }
    }

    /// Build the approved set for every bucket of `config.row_count`
    ///
    /// Rejection sampling: per bucket, fresh-seeded drops are simulated until
    /// `animations_per_bucket` pass all quality gates or the per-animation
    /// attempt budget runs out, in which case the bucket is left short with a
    /// warning. Seeds derive from `master_seed`, so a (config, master seed)
    /// pair reproduces the identical library. The optional `progress` hook
    /// fires every few approvals and at each bucket boundary.
    pub fn generate_animations(
        &mut self,
        config: &SimulationConfig,
        master_seed: u64,
        mut progress: Option<&mut dyn FnMut(GenerationProgress)>,
    ) -> GenerationReport {
        let layout = calculate_layout(config.row_count);
        let pegs = generate_pegs(&layout);
        let mut seeds = Pcg32::seed_from_u64(master_seed);
        let mut report = GenerationReport::default();

        for bucket in 0..layout.bucket_count {
            let mut outcome = BucketOutcome {
                bucket,
                approved: 0,
                attempts: 0,
                rejected: 0,
                shortfall: 0,
            };

            'quota: while outcome.approved < config.animations_per_bucket {
                let mut attempts_this_animation = 0;
                loop {
                    if attempts_this_animation >= MAX_ATTEMPTS_PER_ANIMATION {
                        outcome.shortfall = config.animations_per_bucket - outcome.approved;
                        log::warn!(
                            "bucket {bucket}: attempt budget exhausted, \
                             {}/{} animations approved",
                            outcome.approved,
                            config.animations_per_bucket
                        );
                        break 'quota;
                    }
                    attempts_this_animation += 1;
                    outcome.attempts += 1;

                    let seed: u64 = seeds.random();
                    let result =
                        simulate_ball_drop(config, &layout, &pegs, bucket, seed);
                    let SimulationResult::Landed {
                        mut animation,
                        stats,
                    } = result
                    else {
                        continue;
                    };

                    match quality::evaluate(
                        &animation,
                        &stats,
                        &config.quality,
                        config.max_duration_ms,
                        &layout,
                    ) {
                        Err(reason) => {
                            log::debug!(
                                "bucket {bucket}: rejected {} ({reason:?})",
                                animation.id
                            );
                            outcome.rejected += 1;
                            continue;
                        }
                        Ok(()) => {
                            animation.quality = Quality::Approved;
                            self.rows
                                .entry(config.row_count)
                                .or_default()
                                .entry(bucket)
                                .or_default()
                                .push(animation);
                            outcome.approved += 1;
                            self.persist();
                            if outcome.approved % YIELD_EVERY == 0 {
                                if let Some(hook) = progress.as_mut() {
                                    (*hook)(GenerationProgress {
                                        bucket,
                                        approved: outcome.approved,
                                        quota: config.animations_per_bucket,
                                        attempts: outcome.attempts,
                                    });
                                }
                            }
                            break;
                        }
                    }
                }
            }

            log::info!(
                "bucket {bucket}: {} approved in {} attempts ({} gate rejections)",
                outcome.approved,
                outcome.attempts,
                outcome.rejected
            );
            if let Some(hook) = progress.as_mut() {
                (*hook)(GenerationProgress {
                    bucket,
                    approved: outcome.approved,
                    quota: config.animations_per_bucket,
                    attempts: outcome.attempts,
                });
            }
            report.buckets.push(outcome);
        }

        self.loaded_rows.insert(config.row_count);
        report
    }

    /// One uniformly random approved animation for the slot, or `None`
    ///
    /// Callers must handle `None` (fall back to a non-animated resolution).
    /// First use of a row count pulls its asset from the attached source.
    pub fn get_animation(
        &mut self,
        row_count: u32,
        bucket: u32,
        rng: &mut impl Rng,
    ) -> Option<&BallAnimation> {
        self.ensure_row_loaded(row_count);
        let candidates: Vec<usize> = self
            .rows
            .get(&row_count)?
            .get(&bucket)?
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_approved())
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let pick = candidates[rng.random_range(0..candidates.len())];
        self.rows.get(&row_count)?.get(&bucket)?.get(pick)
    }

    /// All animations for a slot, sorted by id for deterministic listing
    pub fn list_animations(&self, row_count: u32, bucket: u32) -> Vec<&BallAnimation> {
        let mut animations: Vec<&BallAnimation> = self
            .rows
            .get(&row_count)
            .and_then(|buckets| buckets.get(&bucket))
            .map(|list| list.iter().collect())
            .unwrap_or_default();
        animations.sort_by(|a, b| a.id.cmp(&b.id));
        animations
    }

    /// Total stored animations for a row count
    pub fn animation_count(&self, row_count: u32) -> usize {
        self.rows
            .get(&row_count)
            .map(|buckets| buckets.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn row_counts(&self) -> Vec<u32> {
        self.rows.keys().copied().collect()
    }

    /// Lazy per-row asset load; a missing asset warns once and is marked
    /// loaded so it is not refetched
    fn ensure_row_loaded(&mut self, row_count: u32) {
        if self.loaded_rows.contains(&row_count) {
            return;
        }
        self.loaded_rows.insert(row_count);
        let Some(assets) = self.assets.as_ref() else {
            return;
        };
        match assets.fetch(row_count) {
            None => {
                log::warn!("no animation asset for {row_count} rows");
            }
            Some(json) => match codec::parse_library(&json) {
                Err(e) => log::warn!("animation asset for {row_count} rows unreadable: {e}"),
                Ok(rows) => {
                    let added = self.merge(rows);
                    log::info!("loaded {added} animations for {row_count} rows");
                    self.persist();
                }
            },
        }
    }

    /// Import a library document of any recognized historical shape
    ///
    /// Merged by animation id: re-importing the same file never duplicates.
    /// Returns the number of animations actually added. A document that
    /// parses as JSON but matches no known shape imports nothing with a
    /// warning; only unparseable input is an error.
    pub fn import_json(&mut self, json: &str) -> Result<usize, CodecError> {
        let rows = match codec::parse_library(json) {
            Ok(rows) => rows,
            Err(CodecError::UnrecognizedShape) => {
                log::warn!("import skipped: {}", CodecError::UnrecognizedShape);
                return Ok(0);
            }
            Err(e) => return Err(e),
        };
        let added = self.merge(rows);
        self.persist();
        Ok(added)
    }

    /// Merge parsed rows into the store, deduplicating by id within each row
    fn merge(&mut self, incoming: RowMap) -> usize {
        let mut added = 0;
        for (row_count, buckets) in incoming {
            let target = self.rows.entry(row_count).or_default();
            let mut known: HashSet<String> = target
                .values()
                .flat_map(|list| list.iter().map(|a| a.id.clone()))
                .collect();
            for (bucket, animations) in buckets {
                for animation in animations {
                    if known.contains(&animation.id) {
                        continue;
                    }
                    known.insert(animation.id.clone());
                    target.entry(bucket).or_default().push(animation);
                    added += 1;
                }
            }
        }
        added
    }

    /// Export one row count in the current versioned shape
    pub fn export_json(&self, row_count: u32) -> Result<String, CodecError> {
        let empty = BucketMap::new();
        let buckets = self.rows.get(&row_count).unwrap_or(&empty);
        let export = codec::export_row(row_count, buckets);
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// File-download analogue of the export for offline tooling
    pub fn write_export(&self, row_count: u32, path: &Path) -> Result<(), std::io::Error> {
        let json = self
            .export_json(row_count)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Corrective sweep: re-derive every animation's bucket from its final
    /// keyframe under the current layout and relocate mismatches
    ///
    /// Keyframes are never touched; only the slot and `target_bucket` change.
    /// The safety valve against layout-constant drift: geometry changed since
    /// generation means stored animations may sit in slots their endpoints no
    /// longer map to. Running it twice in a row moves nothing the second time.
    pub fn scrub_and_reassign(&mut self) -> ScrubReport {
        let mut report = ScrubReport::default();

        for (row_count, buckets) in self.rows.iter_mut() {
            let layout = calculate_layout(*row_count);
            let mut relocated: Vec<(u32, BallAnimation)> = Vec::new();

            for (&bucket, animations) in buckets.iter_mut() {
                let mut keep = Vec::with_capacity(animations.len());
                for mut animation in animations.drain(..) {
                    report.checked += 1;
                    let actual = bucket_for_x(&layout, animation.final_keyframe().x);
                    if actual == bucket {
                        if animation.target_bucket != bucket {
                            animation.target_bucket = bucket;
                            report.retargeted += 1;
                        } else {
                            report.unchanged += 1;
                        }
                        keep.push(animation);
                    } else {
                        report.moved += 1;
                        report.details.push(ScrubDetail {
                            id: animation.id.clone(),
                            row_count: *row_count,
                            from_bucket: bucket,
                            to_bucket: actual,
                        });
                        animation.target_bucket = actual;
                        relocated.push((actual, animation));
                    }
                }
                *animations = keep;
            }

            for (bucket, animation) in relocated {
                buckets.entry(bucket).or_default().push(animation);
            }
            buckets.retain(|_, animations| !animations.is_empty());
        }

        if report.moved > 0 || report.retargeted > 0 {
            log::info!(
                "scrub relocated {} and retargeted {} of {} animations",
                report.moved,
                report.retargeted,
                report.checked
            );
            self.persist();
        }
        report
    }
}
