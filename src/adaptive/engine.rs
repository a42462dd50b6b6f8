use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::adaptive::clustering::{self, ClusterResult};
use crate::adaptive::config::EngineConfig;
use crate::adaptive::dda::{Adjustment, DifficultyController, DifficultyState};
use crate::adaptive::error::{ensure_finite, ensure_finite_opt, EngineError, EngineResult};
use crate::adaptive::grouping::{self, Candidate, GroupingOptions};
use crate::adaptive::irt::{self, AbilityEstimate, EstimateInput};
use crate::adaptive::matchmaker::{
    attempt_shares, batch_key, ensure_unique_ids, CacheStats, ClusterCache, PlayerProfile,
};
use crate::adaptive::metrics::MetricsRegistry;
use crate::adaptive::monitoring::{self, AdjustmentObserver, TracingObserver};
use crate::adaptive::opponent::{self, OpponentMatch, Projection};
use crate::adaptive::precision::ser_round3;
use crate::adaptive::sessions::{SessionRegistry, DEFAULT_SESSION};
use crate::adaptive::tiers::achievement::{self, AchievementSource, NoAchievements};
use crate::adaptive::tiers::rank::{self, RankInfo};
use crate::adaptive::tiers::TierCache;
use crate::adaptive::types::{
    sanitize_count, AbilitySnapshot, AlgorithmId, DifficultyLevel, MatchGroup, PlayerStats,
};

#[derive(Debug, Clone)]
pub struct AdjustRequest {
    pub session_id: Option<String>,
    pub previous_difficulty: f64,
    pub snapshot: AbilitySnapshot,
    pub success_count: i64,
    pub fail_count: i64,
    pub target_performance: Option<f64>,
    pub adjustment_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyOutcome {
    pub session_id: String,
    #[serde(flatten)]
    pub adjustment: Adjustment,
    pub success_level: &'static str,
    pub fail_level: &'static str,
}

#[derive(Debug, Clone)]
pub struct PuzzleRequest {
    pub session_id: Option<String>,
    pub player: PlayerStats,
    pub target_performance: Option<f64>,
    pub adjustment_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleSummary {
    #[serde(serialize_with = "ser_round3")]
    pub student_skill: f64,
    #[serde(serialize_with = "ser_round3")]
    pub predicted_success_probability: f64,
    #[serde(serialize_with = "ser_round3")]
    pub actual_success_rate: f64,
    #[serde(serialize_with = "ser_round3")]
    pub actual_fail_rate: f64,
    #[serde(serialize_with = "ser_round3")]
    pub target_performance: f64,
    #[serde(serialize_with = "ser_round3")]
    pub new_difficulty: f64,
    pub next_puzzle_difficulty: DifficultyLevel,
    pub success_level: &'static str,
    pub fail_level: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleOutcome {
    pub estimate: AbilityEstimate,
    pub adjustment: DifficultyOutcome,
    pub summary: PuzzleSummary,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MatchRequest {
    pub match_size: Option<usize>,
    pub allow_cross_cluster: Option<bool>,
    pub min_score: Option<f64>,
    pub cluster_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub total_matches: usize,
    pub total_players: usize,
    pub matched_players: usize,
    pub unmatched_players: usize,
    pub match_size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub groups: Vec<MatchGroup>,
    pub summary: MatchSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOutcome {
    pub player_ids: Vec<String>,
    pub cluster_count: usize,
    #[serde(flatten)]
    pub result: ClusterResult,
}

#[derive(Debug, Clone, Default)]
pub struct OpponentRequest {
    pub player_id: String,
    pub cluster_count: Option<usize>,
    pub target_performance: Option<f64>,
    pub adjustment_rate: Option<f64>,
}

/// Owns every piece of shared engine state: tier memo, clustering cache,
/// per-session difficulty controllers and the metrics registry.
pub struct AdaptiveEngine {
    config: EngineConfig,
    tiers: TierCache,
    cluster_cache: ClusterCache,
    sessions: SessionRegistry,
    metrics: Arc<MetricsRegistry>,
    observer: Arc<dyn AdjustmentObserver>,
    achievements: Arc<dyn AchievementSource>,
}

impl AdaptiveEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self {
            tiers: TierCache::new(config.tier_cache_capacity),
            cluster_cache: ClusterCache::new(config.clustering.cache_capacity),
            sessions: SessionRegistry::new(
                config.dda.clone(),
                config.session_capacity,
                Duration::from_secs(config.session_idle_secs),
            ),
            metrics: Arc::new(MetricsRegistry::new()),
            observer: Arc::new(TracingObserver),
            achievements: Arc::new(NoAchievements),
            config,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn AdjustmentObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_achievements(mut self, source: Arc<dyn AchievementSource>) -> Self {
        self.achievements = source;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn cluster_cache_stats(&self) -> CacheStats {
        self.cluster_cache.stats()
    }

    /// Drops cached clustering results and tier lookups. Returns the number
    /// of clustering entries removed.
    pub fn clear_caches(&self) -> usize {
        self.tiers.clear();
        self.cluster_cache.clear()
    }

    fn rng(&self) -> StdRng {
        match self.config.clustering.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn rank_for(stats: &PlayerStats) -> RankInfo {
        if let Some(exp) = stats.experience {
            rank::rank_from_experience(exp)
        } else if let Some(name) = stats.rank_name.as_deref() {
            rank::rank_from_name(name)
        } else {
            rank::default_rank()
        }
    }

    fn achievements_for(&self, stats: &PlayerStats) -> u32 {
        match stats.achievements_completed {
            Some(n) => sanitize_count(n).min(u32::MAX as u64) as u32,
            None => self.achievements.completed(&stats.id),
        }
    }

    fn estimate_unmetered(&self, stats: &PlayerStats) -> EngineResult<AbilityEstimate> {
        let ability = ensure_finite("ability", stats.ability)?;
        let difficulty = ensure_finite("difficulty", stats.difficulty)?;
        let previous_ability = ensure_finite_opt("previousAbility", stats.previous_ability)?;

        let success_count = sanitize_count(stats.success_count);
        let fail_count = sanitize_count(stats.fail_count);
        let completed = self.achievements_for(stats);

        let input = EstimateInput {
            ability,
            difficulty: self.config.dda.clamp_difficulty(difficulty),
            success_count,
            fail_count,
            sessions_played: sanitize_count(stats.sessions_played).max(1),
            previous_ability,
            success: self.tiers.success(success_count),
            fail: self.tiers.fail(fail_count),
            rank: Self::rank_for(stats),
            achievement_bonus: achievement::bonus(completed),
        };
        Ok(irt::estimate(&self.config.irt, &input))
    }

    pub fn estimate_ability(&self, stats: &PlayerStats) -> EngineResult<AbilityEstimate> {
        self.metrics
            .track(AlgorithmId::Irt, || self.estimate_unmetered(stats))
    }

    fn resolve_target(&self, target: Option<f64>) -> EngineResult<f64> {
        Ok(ensure_finite_opt("targetPerformance", target)?
            .unwrap_or(self.config.dda.target_performance)
            .clamp(0.0, 1.0))
    }

    fn resolve_rate(&self, rate: Option<f64>) -> EngineResult<f64> {
        Ok(ensure_finite_opt("adjustmentRate", rate)?
            .unwrap_or(self.config.dda.adjustment_rate)
            .clamp(0.0, 1.0))
    }

    pub async fn adjust_difficulty(&self, req: AdjustRequest) -> EngineResult<DifficultyOutcome> {
        let start = Instant::now();
        let result = self.adjust_unmetered(req).await;
        self.metrics.record_call(
            AlgorithmId::Dda,
            start.elapsed().as_micros() as u64,
            result.is_err(),
        );
        result
    }

    async fn adjust_unmetered(&self, req: AdjustRequest) -> EngineResult<DifficultyOutcome> {
        let previous = ensure_finite("previousDifficulty", req.previous_difficulty)?;
        ensure_finite("probability", req.snapshot.probability)?;
        ensure_finite("adjustedAbility", req.snapshot.adjusted_ability)?;
        let target = self.resolve_target(req.target_performance)?;
        let rate = self.resolve_rate(req.adjustment_rate)?;

        let success = self.tiers.success(sanitize_count(req.success_count));
        let fail = self.tiers.fail(sanitize_count(req.fail_count));

        let session_id = req
            .session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION.to_string());

        let controller = self.sessions.acquire(&session_id).await;
        let mut guard = controller.lock().await;
        let adjustment = guard.adjust(previous, &req.snapshot, &success, &fail, target, rate);

        monitoring::report(
            "difficulty",
            &monitoring::check_adjustment(&adjustment, &self.config.dda),
        );
        monitoring::notify(self.observer.as_ref(), &session_id, &adjustment);
        drop(guard);

        Ok(DifficultyOutcome {
            session_id,
            adjustment,
            success_level: success.level,
            fail_level: fail.level,
        })
    }

    pub async fn session_state(&self, session_id: &str) -> Option<DifficultyState> {
        self.sessions.state(session_id).await
    }

    pub async fn reset_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).await;
        if removed {
            tracing::info!(session_id, "difficulty session reset");
        }
        removed
    }

    /// Estimate followed by a difficulty adjustment for one player. The
    /// session defaults to the player's id.
    pub async fn adjust_puzzle(&self, req: PuzzleRequest) -> EngineResult<PuzzleOutcome> {
        let estimate = self.estimate_ability(&req.player)?;
        let success_count = sanitize_count(req.player.success_count);
        let fail_count = sanitize_count(req.player.fail_count);

        let session_id = req.session_id.or_else(|| {
            let id = req.player.id.trim();
            (!id.is_empty()).then(|| id.to_string())
        });

        let adjustment = self
            .adjust_difficulty(AdjustRequest {
                session_id,
                previous_difficulty: req.player.difficulty,
                snapshot: estimate.snapshot(),
                success_count: req.player.success_count,
                fail_count: req.player.fail_count,
                target_performance: req.target_performance,
                adjustment_rate: req.adjustment_rate,
            })
            .await?;

        let (actual_success_rate, actual_fail_rate) = attempt_shares(success_count, fail_count);
        let summary = PuzzleSummary {
            student_skill: estimate.adjusted_ability,
            predicted_success_probability: estimate.probability,
            actual_success_rate,
            actual_fail_rate,
            target_performance: adjustment.adjustment.target_performance,
            new_difficulty: adjustment.adjustment.new_difficulty,
            next_puzzle_difficulty: adjustment.adjustment.level,
            success_level: adjustment.success_level,
            fail_level: adjustment.fail_level,
        };

        Ok(PuzzleOutcome {
            estimate,
            adjustment,
            summary,
        })
    }

    fn check_batch(&self, players: &[PlayerStats]) -> EngineResult<()> {
        if players.is_empty() {
            return Err(EngineError::EmptyPlayers);
        }
        let limit = self.config.matchmaking.max_players;
        if players.len() > limit {
            return Err(EngineError::TooManyPlayers {
                count: players.len(),
                limit,
            });
        }
        ensure_unique_ids(players.iter().map(|p| p.id.as_str()))
    }

    pub fn build_profiles(&self, players: &[PlayerStats]) -> EngineResult<Vec<PlayerProfile>> {
        players
            .iter()
            .map(|p| {
                let estimate = self.estimate_ability(p)?;
                Ok(PlayerProfile::from_estimate(
                    &p.id,
                    p.ability,
                    self.config.dda.clamp_difficulty(p.difficulty),
                    sanitize_count(p.success_count),
                    sanitize_count(p.fail_count),
                    self.achievements_for(p),
                    &estimate,
                ))
            })
            .collect()
    }

    /// Normalizes and clusters the profiles' feature vectors, consulting the
    /// clustering cache first. Returns the normalized batch alongside.
    fn cluster_profiles(
        &self,
        profiles: &[PlayerProfile],
        k: usize,
    ) -> EngineResult<(Vec<Vec<f64>>, ClusterResult)> {
        let features: Vec<Vec<f64>> = profiles.iter().map(PlayerProfile::features).collect();
        self.metrics.track(AlgorithmId::Clustering, || -> EngineResult<_> {
            let normalized = clustering::normalize(&features)?;
            let key = batch_key(&features, k);
            if let Some(hit) = self.cluster_cache.get(&key) {
                return Ok((normalized, hit));
            }
            let result =
                clustering::kmeans(&normalized, k, &self.config.clustering, &mut self.rng())?;
            self.cluster_cache.insert(key, result.clone());
            Ok((normalized, result))
        })
    }

    fn cluster_count(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.clustering.cluster_count).max(1)
    }

    pub fn cluster_players(
        &self,
        players: &[PlayerStats],
        cluster_count: Option<usize>,
    ) -> EngineResult<ClusterOutcome> {
        self.check_batch(players)?;
        let profiles = self.build_profiles(players)?;
        let (_, result) = self.cluster_profiles(&profiles, self.cluster_count(cluster_count))?;
        Ok(ClusterOutcome {
            player_ids: profiles.into_iter().map(|p| p.id).collect(),
            cluster_count: result.cluster_count(),
            result,
        })
    }

    pub fn form_matches(
        &self,
        players: &[PlayerStats],
        req: MatchRequest,
    ) -> EngineResult<MatchOutcome> {
        let mm = &self.config.matchmaking;
        let match_size = req.match_size.unwrap_or(mm.default_match_size);
        if match_size < 2 || match_size > mm.max_match_size {
            return Err(EngineError::InvalidMatchSize {
                size: match_size,
                min: 2,
                max: mm.max_match_size,
            });
        }
        let min_score = ensure_finite_opt("minScore", req.min_score)?
            .unwrap_or(mm.min_score)
            .clamp(0.0, 1.0);
        let opts = GroupingOptions {
            match_size,
            allow_cross_cluster: req.allow_cross_cluster.unwrap_or(mm.allow_cross_cluster),
            min_score,
        };

        self.check_batch(players)?;
        let profiles = self.build_profiles(players)?;

        let groups = if profiles.len() < match_size {
            Vec::new()
        } else {
            let (_, clusters) =
                self.cluster_profiles(&profiles, self.cluster_count(req.cluster_count))?;
            let candidates: Vec<Candidate> = profiles
                .iter()
                .zip(&clusters.assignments)
                .map(|(p, &cluster)| Candidate {
                    id: p.id.clone(),
                    ability: p.ability,
                    cluster,
                })
                .collect();
            self.metrics.track(AlgorithmId::Grouping, || {
                Ok::<_, EngineError>(grouping::form_groups(&candidates, &opts))
            })?
        };

        monitoring::report("matchmaking", &monitoring::check_groups(&groups, match_size));

        let matched_players = groups.len() * match_size;
        tracing::debug!(
            players = profiles.len(),
            groups = groups.len(),
            match_size,
            "matches formed"
        );
        Ok(MatchOutcome {
            summary: MatchSummary {
                total_matches: groups.len(),
                total_players: profiles.len(),
                matched_players,
                unmatched_players: profiles.len() - matched_players,
                match_size,
            },
            groups,
        })
    }

    /// Best single opponent for `req.player_id` within the batch; `None`
    /// when the batch has fewer than two players.
    pub fn find_opponent(
        &self,
        players: &[PlayerStats],
        req: &OpponentRequest,
    ) -> EngineResult<Option<OpponentMatch>> {
        self.check_batch(players)?;
        let index = players
            .iter()
            .position(|p| p.id == req.player_id)
            .ok_or_else(|| EngineError::UnknownPlayer(req.player_id.clone()))?;
        if players.len() < 2 {
            return Ok(None);
        }
        let target = self.resolve_target(req.target_performance)?;
        let rate = self.resolve_rate(req.adjustment_rate)?;

        let profiles = self.build_profiles(players)?;
        let (normalized, clusters) =
            self.cluster_profiles(&profiles, self.cluster_count(req.cluster_count))?;

        let me = &profiles[index];
        let snapshot = AbilitySnapshot {
            probability: me.probability,
            adjusted_ability: me.ability,
        };
        let projected = DifficultyController::new(self.config.dda.clone()).adjust(
            me.difficulty,
            &snapshot,
            &self.tiers.success(me.success_count),
            &self.tiers.fail(me.fail_count),
            target,
            rate,
        );
        let projection = Projection {
            ability: me.ability,
            difficulty: projected.new_difficulty,
            consistency: me.success_share,
        };

        let found = opponent::find_best_opponent(index, &profiles, &normalized, &clusters, projection);
        if found.is_none() {
            tracing::warn!(player_id = %req.player_id, "no opponent candidates");
        }
        Ok(found)
    }
}
