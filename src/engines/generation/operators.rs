use crate::space::ParameterSpace;
use crate::types::Candidate;
use rand::Rng;

/// Tournament selection over rank positions: draw `tournament_size`
/// positions of `ranking` and return the entry at the best (lowest) one.
pub fn tournament_selection<R: Rng>(ranking: &[usize], tournament_size: usize, rng: &mut R) -> usize {
    let mut best_pos = rng.gen_range(0..ranking.len());

    for _ in 1..tournament_size {
        let pos = rng.gen_range(0..ranking.len());
        if pos < best_pos {
            best_pos = pos;
        }
    }

    ranking[best_pos]
}

/// `size` tournament winners, in draw order.
pub fn mating_pool<R: Rng>(ranking: &[usize], size: usize, tournament_size: usize, rng: &mut R) -> Vec<usize> {
    if ranking.is_empty() {
        return Vec::new();
    }
    (0..size)
        .map(|_| tournament_selection(ranking, tournament_size, rng))
        .collect()
}

/// BLX-alpha blend crossover: each gene is drawn uniformly from the parents'
/// interval widened by `alpha` of its length on both sides, then clamped to
/// the space.
pub fn blend_crossover<R: Rng>(
    space: &ParameterSpace,
    parent1: &Candidate,
    parent2: &Candidate,
    alpha: f64,
    rng: &mut R,
) -> Candidate {
    let genes1 = space.to_genes(parent1);
    let genes2 = space.to_genes(parent2);

    let genes: Vec<f64> = genes1
        .iter()
        .zip(&genes2)
        .map(|(&a, &b)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let extent = hi - lo;
            let lo = lo - alpha * extent;
            let hi = hi + alpha * extent;
            lo + rng.gen::<f64>() * (hi - lo)
        })
        .collect();

    space.from_genes(&genes)
}

/// Bounded uniform perturbation of each gene with probability
/// `mutation_rate`, up to `strength` of the dimension's span either way.
/// With `force`, a gene is perturbed even if the draw selected none.
/// Returns the number of genes perturbed.
pub fn mutate<R: Rng>(
    space: &ParameterSpace,
    candidate: &mut Candidate,
    mutation_rate: f64,
    strength: f64,
    force: bool,
    rng: &mut R,
) -> usize {
    let mut genes = space.to_genes(candidate);
    let mut changed = 0;

    for (gene, dimension) in genes.iter_mut().zip(space.dimensions()) {
        if rng.gen::<f64>() < mutation_rate {
            *gene += rng.gen_range(-1.0..=1.0) * strength * dimension.span();
            changed += 1;
        }
    }

    if changed == 0 && force && !genes.is_empty() {
        let index = rng.gen_range(0..genes.len());
        genes[index] += rng.gen_range(-1.0..=1.0) * strength * space.dimensions()[index].span();
        changed = 1;
    }

    if changed > 0 {
        let attrs = std::mem::take(&mut candidate.attrs);
        *candidate = space.from_genes(&genes);
        candidate.attrs = attrs;
    }
    changed
}
