use tally_core::{CategoryId, Transaction, TransactionId};

use crate::tokens::{jaccard, Tokenizer};

pub const DEFAULT_THRESHOLD: f64 = 0.67;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Particulars, code and reference all equal an existing transaction's.
    Reference {
        category: CategoryId,
        matched: TransactionId,
    },
    /// Best description similarity at or above the threshold.
    Similar {
        category: CategoryId,
        matched: TransactionId,
        score: f64,
    },
    NoMatch,
}

impl MatchOutcome {
    pub fn category(&self) -> Option<&CategoryId> {
        match self {
            MatchOutcome::Reference { category, .. } | MatchOutcome::Similar { category, .. } => {
                Some(category)
            }
            MatchOutcome::NoMatch => None,
        }
    }
}

/// Suggests a category for an uncategorized transaction from the ones
/// already categorized.
pub struct MatchEngine {
    pub threshold: f64,
    /// Descriptions containing any of these literals are never auto-matched.
    pub excluded_markers: Vec<String>,
    tokenizer: Tokenizer,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, Vec::new())
    }
}

impl MatchEngine {
    pub fn new(threshold: f64, excluded_markers: Vec<String>) -> Self {
        Self {
            threshold,
            excluded_markers,
            tokenizer: Tokenizer::new(),
        }
    }

    /// Corpus entries without a category, or filed under `excluded`, are
    /// ignored by both strategies.
    pub fn categorise(
        &self,
        tx: &Transaction,
        corpus: &[Transaction],
        excluded: Option<&CategoryId>,
    ) -> MatchOutcome {
        if self
            .excluded_markers
            .iter()
            .any(|marker| !marker.is_empty() && tx.description.contains(marker.as_str()))
        {
            return MatchOutcome::NoMatch;
        }

        if tx.has_any_structured_field() {
            if let Some(fields) = tx.structured_fields() {
                if let Some((other, category)) =
                    eligible(corpus, excluded).find(|(other, _)| other.structured_fields() == Some(fields))
                {
                    return MatchOutcome::Reference {
                        category: category.clone(),
                        matched: other.id.clone(),
                    };
                }
            }
        }

        let tokens = self.tokenizer.tokenize(&tx.description);
        let mut best: Option<(f64, &Transaction, &CategoryId)> = None;
        for (other, category) in eligible(corpus, excluded) {
            if other.description.is_empty() {
                continue;
            }
            let Some(score) = jaccard(&tokens, &self.tokenizer.tokenize(&other.description)) else {
                continue;
            };
            // Disjoint token sets never match, whatever the threshold.
            let best_score = best.map_or(0.0, |(best_score, _, _)| best_score);
            if score > best_score && score >= self.threshold {
                best = Some((score, other, category));
            }
        }

        match best {
            Some((score, other, category)) => {
                tracing::debug!(score, matched = %other.id, "description match");
                MatchOutcome::Similar {
                    category: category.clone(),
                    matched: other.id.clone(),
                    score,
                }
            }
            None => MatchOutcome::NoMatch,
        }
    }
}

fn eligible<'a>(
    corpus: &'a [Transaction],
    excluded: Option<&'a CategoryId>,
) -> impl Iterator<Item = (&'a Transaction, &'a CategoryId)> + 'a {
    corpus.iter().filter_map(move |other| match &other.category {
        Some(category) if Some(category) != excluded => Some((other, category)),
        _ => None,
    })
}
