use std::collections::{HashMap, HashSet};

/// Token valence weights on a -4.0..=4.0 scale, VADER-style. Covers the
/// vocabulary that actually shows up in product reviews; unknown tokens score
/// zero rather than failing.
static WEIGHTS: &[(&str, f64)] = &[
    // positive
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("better", 1.9),
    ("bargain", 1.8),
    ("brilliant", 2.8),
    ("comfortable", 2.1),
    ("convenient", 1.8),
    ("delicious", 2.7),
    ("durable", 2.0),
    ("easy", 1.9),
    ("effective", 2.1),
    ("enjoy", 2.2),
    ("enjoyed", 2.2),
    ("excellent", 3.2),
    ("exceptional", 2.9),
    ("fantastic", 3.0),
    ("fast", 1.7),
    ("favorite", 2.4),
    ("flawless", 2.9),
    ("glad", 2.0),
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("helpful", 1.9),
    ("impressed", 2.3),
    ("impressive", 2.3),
    ("incredible", 2.8),
    ("like", 1.5),
    ("liked", 1.5),
    ("love", 3.2),
    ("loved", 2.9),
    ("loves", 2.9),
    ("nice", 1.8),
    ("outstanding", 3.1),
    ("perfect", 3.0),
    ("perfectly", 2.7),
    ("pleased", 2.1),
    ("pleasant", 2.0),
    ("quality", 1.4),
    ("recommend", 1.9),
    ("recommended", 1.9),
    ("reliable", 2.0),
    ("satisfied", 2.0),
    ("smooth", 1.6),
    ("solid", 1.5),
    ("sturdy", 1.8),
    ("superb", 3.0),
    ("superior", 2.2),
    ("terrific", 2.9),
    ("value", 1.3),
    ("wonderful", 2.7),
    ("worth", 1.7),
    ("wow", 2.6),
    // mildly positive; kept low so a bare "ok" stays inside the neutral band
    ("ok", 0.4),
    ("okay", 0.4),
    ("fine", 0.8),
    ("alright", 0.6),
    ("decent", 1.1),
    ("adequate", 0.6),
    // negative
    ("annoying", -1.9),
    ("awful", -3.1),
    ("bad", -2.5),
    ("broke", -2.1),
    ("broken", -2.3),
    ("cheap", -1.2),
    ("crap", -2.6),
    ("defect", -2.2),
    ("defective", -2.4),
    ("disappointed", -2.2),
    ("disappointing", -2.2),
    ("disappointment", -2.3),
    ("dislike", -1.8),
    ("expensive", -1.1),
    ("fail", -2.4),
    ("failed", -2.4),
    ("failure", -2.5),
    ("faulty", -2.3),
    ("flimsy", -1.8),
    ("frustrated", -2.1),
    ("frustrating", -2.1),
    ("garbage", -2.8),
    ("hate", -2.7),
    ("hated", -2.7),
    ("horrible", -2.9),
    ("junk", -2.5),
    ("lousy", -2.2),
    ("mediocre", -1.4),
    ("misleading", -1.9),
    ("pathetic", -2.5),
    ("poor", -2.1),
    ("poorly", -2.0),
    ("problem", -1.6),
    ("problems", -1.6),
    ("refund", -1.3),
    ("regret", -2.1),
    ("return", -0.9),
    ("returned", -1.2),
    ("returning", -1.2),
    ("slow", -1.3),
    ("terrible", -3.0),
    ("trash", -2.6),
    ("unusable", -2.6),
    ("unreliable", -2.1),
    ("useless", -2.4),
    ("waste", -2.2),
    ("wasted", -2.2),
    ("worse", -2.1),
    ("worst", -3.1),
    ("wrong", -1.7),
];

/// Common English stopwords, superset of the fallback stoplist the keyword
/// extractor filters against.
static STOPWORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "but", "by", "can", "could", "did", "do", "does",
    "doing", "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
    "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in", "into", "is",
    "it", "its", "itself", "just", "me", "more", "most", "my", "myself", "nor", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "out", "over", "own", "s", "same",
    "she", "should", "so", "some", "such", "t", "than", "that", "the", "their", "theirs", "them",
    "then", "there", "these", "they", "this", "those", "through", "to", "too", "under", "until",
    "up", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "would", "you", "your", "yours", "yourself",
];

/// Tokens that flip the valence of the word that follows. Contractions appear
/// in their post-cleaning form ("don't" cleans to "don t").
static NEGATORS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "without", "hardly", "barely", "aint", "cant",
    "cannot", "wont", "dont", "don", "didn", "doesn", "isn", "wasn", "aren", "weren", "couldn",
    "wouldn", "shouldn", "hasn", "haven", "hadn",
    // orphaned contraction suffix: "don't like" cleans to "don t like"
    "t",
];

/// Scaling factor applied to a negated token's weight (magnitude dampened,
/// sign flipped), matching the conventional VADER constant.
pub const NEGATION_SCALAR: f64 = -0.74;

/// Immutable lexicon tables, built once and passed explicitly to the
/// enrichment engine. No module-level mutable state.
#[derive(Debug, Clone)]
pub struct Lexicon {
    weights: HashMap<&'static str, f64>,
    stopwords: HashSet<&'static str>,
    negators: HashSet<&'static str>,
}

impl Lexicon {
    pub fn english() -> Self {
        Self {
            weights: WEIGHTS.iter().copied().collect(),
            stopwords: STOPWORDS.iter().copied().collect(),
            negators: NEGATORS.iter().copied().collect(),
        }
    }

    pub fn weight(&self, token: &str) -> Option<f64> {
        self.weights.get(token).copied()
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn is_negator(&self, token: &str) -> bool {
        self.negators.contains(token)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::english()
    }
}
