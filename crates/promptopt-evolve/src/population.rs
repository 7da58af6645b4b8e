use rand::Rng;

use promptopt_core::{MutationPrompt, TaskPrompt};

/// Copies the top-`elite_count` task prompts by fitness into the next
/// generation unchanged.
pub fn elite_carry_over(population: &[TaskPrompt], elite_count: usize) -> Vec<TaskPrompt> {
    let mut sorted: Vec<&TaskPrompt> = population.iter().collect();
    sorted.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap());
    sorted
        .into_iter()
        .take(elite_count)
        .cloned()
        .collect()
}

/// Tournament selection of size `tournament_size`: samples that many
/// candidates uniformly at random (with replacement) and returns the fittest.
pub fn tournament_select<'a, R: Rng + ?Sized>(
    population: &'a [TaskPrompt],
    tournament_size: usize,
    rng: &mut R,
) -> &'a TaskPrompt {
    assert!(!population.is_empty(), "task population must be non-empty");
    let mut best = &population[rng.gen_range(0..population.len())];
    for _ in 1..tournament_size {
        let candidate = &population[rng.gen_range(0..population.len())];
        if candidate.fitness > best.fitness {
            best = candidate;
        }
    }
    best
}

/// Fitness-proportional (roulette) selection over the mutation population.
/// Returns an index rather than a reference so the caller can still mutate
/// the selected entry's track record afterward. Falls back to uniform
/// selection when all fitness values are non-positive.
pub fn roulette_select<R: Rng + ?Sized>(population: &[MutationPrompt], rng: &mut R) -> usize {
    assert!(!population.is_empty(), "mutation population must be non-empty");
    let total: f64 = population.iter().map(|m| m.fitness.max(0.0)).sum();
    if total <= 0.0 {
        return rng.gen_range(0..population.len());
    }
    let mut pick = rng.gen_range(0.0..total);
    for (index, mutation) in population.iter().enumerate() {
        let weight = mutation.fitness.max(0.0);
        if pick < weight {
            return index;
        }
        pick -= weight;
    }
    population.len() - 1
}

/// Picks up to two mutually distinct parents for crossover via tournament
/// selection, retrying a bounded number of times to find a second distinct
/// parent in small populations.
pub fn distinct_crossover_parents<'a, R: Rng + ?Sized>(
    population: &'a [TaskPrompt],
    tournament_size: usize,
    rng: &mut R,
) -> Option<(&'a TaskPrompt, &'a TaskPrompt)> {
    let first = tournament_select(population, tournament_size, rng);
    for _ in 0..8 {
        let second = tournament_select(population, tournament_size, rng);
        if second.id != first.id {
            return Some((first, second));
        }
    }
    None
}

/// Index of the lowest-fitness non-meta (i.e. not HYPERMUTATION or
/// ZERO_ORDER_HYPER) mutation prompt, the hypermutation target.
pub fn lowest_fitness_mutation_index(population: &[MutationPrompt]) -> Option<usize> {
    population
        .iter()
        .enumerate()
        .filter(|(_, m)| {
            !matches!(
                m.kind,
                promptopt_core::MutationKind::Hypermutation | promptopt_core::MutationKind::ZeroOrderHyper
            )
        })
        .min_by(|(_, a), (_, b)| a.fitness.partial_cmp(&b.fitness).unwrap())
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use promptopt_core::MutationKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn task(id: &str, fitness: f64) -> TaskPrompt {
        TaskPrompt {
            id: id.to_string(),
            base: "base".to_string(),
            patch: format!("patch-{id}"),
            fitness,
            generation: 0,
            mutation_id: None,
            parent_id: None,
        }
    }

    fn mutation(id: &str, kind: MutationKind, fitness: f64) -> MutationPrompt {
        MutationPrompt {
            id: id.to_string(),
            text: format!("instruction-{id}"),
            kind,
            fitness,
            usage_count: 0,
            success_rate: fitness,
            generation: 0,
            parent_id: None,
        }
    }

    #[test]
    fn unit_elite_carry_over_keeps_top_n_by_fitness() {
        let population = vec![task("a", 0.2), task("b", 0.9), task("c", 0.5)];
        let elites = elite_carry_over(&population, 2);
        assert_eq!(elites.len(), 2);
        assert_eq!(elites[0].id, "b");
        assert_eq!(elites[1].id, "c");
    }

    #[test]
    fn unit_tournament_select_prefers_highest_fitness_among_sampled() {
        let population = vec![task("a", 0.1), task("b", 0.2), task("c", 0.95)];
        let mut rng = StdRng::seed_from_u64(42);
        let mut saw_c = false;
        for _ in 0..20 {
            if tournament_select(&population, 3, &mut rng).id == "c" {
                saw_c = true;
            }
        }
        assert!(saw_c);
    }

    #[test]
    fn unit_roulette_select_falls_back_to_uniform_when_all_nonpositive() {
        let population = vec![
            mutation("a", MutationKind::Direct, 0.0),
            mutation("b", MutationKind::Eda, 0.0),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let picked = roulette_select(&population, &mut rng);
        assert!(picked == 0 || picked == 1);
    }

    #[test]
    fn unit_lowest_fitness_mutation_index_excludes_meta_kinds() {
        let population = vec![
            mutation("a", MutationKind::Direct, 0.9),
            mutation("b", MutationKind::Hypermutation, 0.0),
            mutation("c", MutationKind::Eda, 0.1),
        ];
        assert_eq!(lowest_fitness_mutation_index(&population), Some(2));
    }
}
