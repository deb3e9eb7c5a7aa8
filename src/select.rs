//! Experiment selection for the next deployment step
//!
//! Selection is a pure function of the battery's presentation order, the
//! candidate experiments (those the worker has not completed) and the number
//! requested. The random source is injected so callers can seed it.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::model::{Experiment, ExperimentTemplate, PresentationOrder};

/// Pick `n` candidates uniformly at random without replacement.
///
/// Returns every candidate (shuffled) when `n` exceeds the candidate count.
#[must_use]
pub fn select_random_n<'a, R: Rng + ?Sized>(
    candidates: &[&'a Experiment],
    n: usize,
    rng: &mut R,
) -> Vec<&'a Experiment> {
    candidates.choose_multiple(rng, n).copied().collect()
}

/// Pick `n` candidates among those sharing the lowest `order`, ties broken
/// uniformly at random.
#[must_use]
pub fn select_ordered<'a, R: Rng + ?Sized>(
    candidates: &[&'a Experiment],
    n: usize,
    rng: &mut R,
) -> Vec<&'a Experiment> {
    let Some(next) = candidates.iter().map(|e| e.order()).min() else {
        return Vec::new();
    };
    let tied: Vec<&Experiment> = candidates
        .iter()
        .copied()
        .filter(|e| e.order() == next)
        .collect();
    select_random_n(&tied, n, rng)
}

/// Select the next experiments according to the battery's presentation order.
///
/// An empty selection means the worker has nothing left in the battery.
#[must_use]
pub fn select_experiments<'a, R: Rng + ?Sized>(
    order: PresentationOrder,
    candidates: &[&'a Experiment],
    n: usize,
    rng: &mut R,
) -> Vec<&'a Experiment> {
    let selected = match order {
        PresentationOrder::Random => select_random_n(candidates, n, rng),
        PresentationOrder::Specified => select_ordered(candidates, n, rng),
    };
    debug!(
        %order,
        candidates = candidates.len(),
        selected = selected.len(),
        "selected experiments"
    );
    selected
}

/// Randomly fill a deployment without exceeding `maximum_seconds`.
///
/// Candidates are drawn in random order; each is kept if its template's
/// duration still fits. `template_of` resolves a candidate's template;
/// candidates without one are skipped.
#[must_use]
pub fn select_experiments_time<'a, 't, R, F>(
    maximum_seconds: u64,
    candidates: &[&'a Experiment],
    template_of: F,
    rng: &mut R,
) -> Vec<&'a Experiment>
where
    R: Rng + ?Sized,
    F: Fn(&Experiment) -> Option<&'t ExperimentTemplate>,
{
    let mut pool = candidates.to_vec();
    pool.shuffle(rng);

    let mut total = 0;
    let mut selected = Vec::new();
    for experiment in pool {
        if total >= maximum_seconds {
            break;
        }
        let Some(template) = template_of(experiment) else {
            continue;
        };
        let seconds = u64::from(template.time_minutes()) * 60;
        if total + seconds <= maximum_seconds {
            total += seconds;
            selected.push(experiment);
        }
    }
    selected
}
