use std::cmp::Reverse;
use std::sync::Arc;

use regex::Regex;

use crate::error::{MarketDataError, Result};
use crate::types::{Community, TransactionType};

const RENTAL_TERMS: &str = r"(?i)\b(rent|rental|lease|leasing|apartment|renting)\b";

/// Local text signals extracted from a search prompt, independent of the NLP endpoint.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    zip: Regex,
    rental: Regex,
}

impl QueryMatcher {
    pub fn new(zip_pattern: &str) -> Result<Self> {
        let zip = Regex::new(zip_pattern)
            .map_err(|e| MarketDataError::Config(format!("invalid zip pattern {zip_pattern:?}: {e}")))?;
        let rental = Regex::new(RENTAL_TERMS)
            .map_err(|e| MarketDataError::Config(format!("invalid rental pattern: {e}")))?;
        Ok(Self { zip, rental })
    }

    /// First zip in the text. Uses capture group 1 when the pattern has one.
    pub fn extract_zip(&self, text: &str) -> Option<String> {
        let captures = self.zip.captures(text)?;
        captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().to_string())
    }

    /// Rental when any rental term appears as a whole word, otherwise sale.
    pub fn transaction_type(&self, text: &str) -> TransactionType {
        if self.rental.is_match(text) {
            TransactionType::Rental
        } else {
            TransactionType::Sale
        }
    }
}

/// Community name and slug patterns compiled once per community list.
///
/// Names are tried longest first with case-insensitive whole-word matching,
/// so "West Lake Hills" beats "West Lake". Slug words are tried only when no
/// name matches.
pub struct CommunityIndex {
    communities: Arc<Vec<Community>>,
    names: Vec<(usize, Regex)>,
    slugs: Vec<(usize, Regex)>,
}

impl CommunityIndex {
    pub fn new(communities: Arc<Vec<Community>>) -> Self {
        let names = ordered_patterns(&communities, |c| c.name.clone());
        let slugs = ordered_patterns(&communities, Community::slug_words);
        Self {
            communities,
            names,
            slugs,
        }
    }

    /// The list this index was built from.
    pub fn communities(&self) -> &Arc<Vec<Community>> {
        &self.communities
    }

    /// The most specific community named in the text.
    pub fn find(&self, text: &str) -> Option<&Community> {
        self.names
            .iter()
            .chain(&self.slugs)
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(i, _)| &self.communities[*i])
    }
}

fn ordered_patterns(communities: &[Community], phrase: impl Fn(&Community) -> String) -> Vec<(usize, Regex)> {
    let mut patterns: Vec<(usize, usize, Regex)> = communities
        .iter()
        .enumerate()
        .filter_map(|(i, community)| {
            let phrase = phrase(community);
            let phrase = phrase.trim();
            phrase_pattern(phrase).map(|pattern| (phrase.chars().count(), i, pattern))
        })
        .collect();
    patterns.sort_by_key(|(len, _, _)| Reverse(*len));
    patterns.into_iter().map(|(_, i, pattern)| (i, pattern)).collect()
}

/// Case-insensitive phrase pattern. Word boundaries are asserted only at
/// edges that are word characters, so "Travis Heights (South)" still matches.
fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let first = phrase.chars().next()?;
    let last = phrase.chars().last()?;
    let edge = |c: char| if c.is_alphanumeric() || c == '_' { r"\b" } else { "" };
    Regex::new(&format!("(?i){}{}{}", edge(first), regex::escape(phrase), edge(last))).ok()
}
