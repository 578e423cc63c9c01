use rand::seq::SliceRandom;
use rand::Rng;
use schedule::{Corpus, CorpusError};

use crate::slots::{SlotIndex, SlotTable};

/// Picks one active slot uniformly at random.
pub fn random_active<H, R>(table: &SlotTable<H>, rng: &mut R) -> Option<SlotIndex>
where
    R: Rng + ?Sized,
{
    table.active_slots().choose(rng).copied()
}

/// Draws one corpus line uniformly at random, with replacement.
///
/// Returns [`None`] for an empty corpus.
pub fn random_line<C, R>(corpus: &C, rng: &mut R) -> Result<Option<String>, CorpusError>
where
    C: Corpus + ?Sized,
    R: Rng + ?Sized,
{
    match corpus.line_count() {
        0 => Ok(None),
        count => corpus.line(rng.gen_range(0..count)).map(Some),
    }
}
