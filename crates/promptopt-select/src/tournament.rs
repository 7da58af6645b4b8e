use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use promptopt_core::{compose_effective_prompt, Epic, PatchCandidate, PromptDistReport};
use promptopt_eval::DistributionalEvaluator;

#[derive(Debug, Clone, Copy)]
pub struct TournamentProgress {
    pub candidate_idx: usize,
    pub total_candidates: usize,
    pub runs_completed: usize,
    pub total_runs: usize,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: PatchCandidate,
    pub report: PromptDistReport,
    pub delta_vs_champion: f64,
}

#[derive(Debug, Clone)]
pub struct TournamentResult {
    pub champion_objective: f64,
    pub candidates: Vec<ScoredCandidate>,
    /// The id of the winning candidate, if any met the promotion rule.
    pub winner: Option<String>,
}

/// `tournament(championPatch, candidates, epics, replicates) ->
/// {candidates, winner?, championObjective}`. Distributional evaluation runs
/// for the champion and every candidate in parallel, bounded by the
/// evaluator's own concurrency semaphore.
pub async fn tournament(
    evaluator: Arc<DistributionalEvaluator>,
    base_prompt: &str,
    champion_patch: &str,
    candidates: Vec<PatchCandidate>,
    epics: &[Epic],
    promote_epsilon: f64,
    mut on_progress: impl FnMut(TournamentProgress),
) -> TournamentResult {
    let total_candidates = candidates.len();
    let total_runs = epics.len();

    let champion_prompt = compose_effective_prompt(base_prompt, champion_patch);

    // The champion and every candidate are evaluated concurrently; each
    // `evaluate()` call itself fans out through the evaluator's own
    // concurrency-bounded semaphore, so this layer only needs to keep all of
    // them in flight at once rather than awaiting them one at a time.
    type Outcome = (Option<PatchCandidate>, PromptDistReport);
    let mut in_flight: FuturesUnordered<std::pin::Pin<Box<dyn std::future::Future<Output = Outcome> + Send + '_>>> =
        FuturesUnordered::new();
    in_flight.push(Box::pin({
        let evaluator = &evaluator;
        let champion_prompt = &champion_prompt;
        async move {
            let report = evaluator.evaluate("champion", champion_prompt, epics).await;
            (None, report)
        }
    }));
    for candidate in candidates {
        let prompt = compose_effective_prompt(base_prompt, &candidate.patch);
        let evaluator = &evaluator;
        in_flight.push(Box::pin(async move {
            let report = evaluator.evaluate(&candidate.id, &prompt, epics).await;
            (Some(candidate), report)
        }));
    }

    let mut champion_objective = 0.0;
    let mut raw: Vec<(PatchCandidate, PromptDistReport)> = Vec::with_capacity(total_candidates);
    let mut completed = 0usize;
    while let Some((candidate, report)) = in_flight.next().await {
        completed += 1;
        match candidate {
            None => champion_objective = report.agg.objective,
            Some(candidate) => raw.push((candidate, report)),
        }
        on_progress(TournamentProgress {
            candidate_idx: completed,
            total_candidates: total_candidates + 1,
            runs_completed: total_runs,
            total_runs,
        });
    }

    let mut scored: Vec<ScoredCandidate> = raw
        .into_iter()
        .map(|(candidate, report)| {
            let delta_vs_champion = report.agg.objective - champion_objective;
            ScoredCandidate {
                candidate,
                report,
                delta_vs_champion,
            }
        })
        .collect();

    // Descending objective for presentation; ties broken by id for a
    // deterministic ordering.
    scored.sort_by(|a, b| {
        b.report
            .agg
            .objective
            .partial_cmp(&a.report.agg.objective)
            .unwrap()
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    });

    let winner = is_eligible(&scored, promote_epsilon).map(|c| c.candidate.id.clone());

    TournamentResult {
        champion_objective,
        candidates: scored,
        winner,
    }
}

/// A candidate is eligible iff `delta > ε_promote`. Among eligible
/// candidates, the one with the highest objective wins (the list is already
/// sorted descending by objective).
fn is_eligible(scored: &[ScoredCandidate], promote_epsilon: f64) -> Option<&ScoredCandidate> {
    scored
        .iter()
        .find(|c| c.delta_vs_champion > promote_epsilon)
}
