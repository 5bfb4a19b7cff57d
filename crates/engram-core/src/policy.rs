//! Category / Type Policy
//!
//! Pure routing rules: the closed category set, the analyzed-type
//! classification, and the analyzed-type → storage-category mapping.
//! No I/O, no state.

use serde::{Deserialize, Serialize};

// ============================================================================
// CATEGORIES
// ============================================================================

/// Storage categories for memory records
///
/// The closed set accepted from callers and written to the relational store.
/// `Programmieren` and `Philosophie` are also targets of the type mapping,
/// so every mapped category is itself storable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Faktenwissen,
    ProzeduralesWissen,
    Erlebnisse,
    Bewusstsein,
    Humor,
    Zusammenarbeit,
    ForgottenMemories,
    Kernerinnerungen,
    ShortMemory,
    Programmieren,
    Philosophie,
}

/// All valid categories, in declaration order
pub const VALID_CATEGORIES: &[Category] = &[
    Category::Faktenwissen,
    Category::ProzeduralesWissen,
    Category::Erlebnisse,
    Category::Bewusstsein,
    Category::Humor,
    Category::Zusammenarbeit,
    Category::ForgottenMemories,
    Category::Kernerinnerungen,
    Category::ShortMemory,
    Category::Programmieren,
    Category::Philosophie,
];

impl Category {
    /// Convert to the stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Faktenwissen => "faktenwissen",
            Category::ProzeduralesWissen => "prozedurales_wissen",
            Category::Erlebnisse => "erlebnisse",
            Category::Bewusstsein => "bewusstsein",
            Category::Humor => "humor",
            Category::Zusammenarbeit => "zusammenarbeit",
            Category::ForgottenMemories => "forgotten_memories",
            Category::Kernerinnerungen => "kernerinnerungen",
            Category::ShortMemory => "short_memory",
            Category::Programmieren => "programmieren",
            Category::Philosophie => "philosophie",
        }
    }

    /// Parse from the stored string form; `None` for anything outside the set
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "faktenwissen" => Some(Category::Faktenwissen),
            "prozedurales_wissen" => Some(Category::ProzeduralesWissen),
            "erlebnisse" => Some(Category::Erlebnisse),
            "bewusstsein" => Some(Category::Bewusstsein),
            "humor" => Some(Category::Humor),
            "zusammenarbeit" => Some(Category::Zusammenarbeit),
            "forgotten_memories" => Some(Category::ForgottenMemories),
            "kernerinnerungen" => Some(Category::Kernerinnerungen),
            "short_memory" => Some(Category::ShortMemory),
            "programmieren" => Some(Category::Programmieren),
            "philosophie" => Some(Category::Philosophie),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ANALYZED TYPES
// ============================================================================

/// Semantic class assigned to a record by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzedType {
    Faktenwissen,
    ProzeduralesWissen,
    Erlebnisse,
    Bewusstsein,
    Humor,
    Zusammenarbeit,
}

impl AnalyzedType {
    /// Convert to the wire string form
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzedType::Faktenwissen => "faktenwissen",
            AnalyzedType::ProzeduralesWissen => "prozedurales_wissen",
            AnalyzedType::Erlebnisse => "erlebnisse",
            AnalyzedType::Bewusstsein => "bewusstsein",
            AnalyzedType::Humor => "humor",
            AnalyzedType::Zusammenarbeit => "zusammenarbeit",
        }
    }

    /// Parse an analyzer-provided type string; `None` for unknown labels
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "faktenwissen" => Some(AnalyzedType::Faktenwissen),
            "prozedurales_wissen" => Some(AnalyzedType::ProzeduralesWissen),
            "erlebnisse" => Some(AnalyzedType::Erlebnisse),
            "bewusstsein" => Some(AnalyzedType::Bewusstsein),
            "humor" => Some(AnalyzedType::Humor),
            "zusammenarbeit" => Some(AnalyzedType::Zusammenarbeit),
            _ => None,
        }
    }

    /// Factual types are indexed semantically but never stored permanently
    /// and never enter the recency cache.
    pub fn is_factual(&self) -> bool {
        matches!(
            self,
            AnalyzedType::Faktenwissen | AnalyzedType::ProzeduralesWissen
        )
    }

    /// The storage category a permanent record of this type relocates to
    pub fn storage_category(&self) -> Category {
        match self {
            AnalyzedType::Faktenwissen => Category::Kernerinnerungen,
            AnalyzedType::ProzeduralesWissen => Category::Programmieren,
            AnalyzedType::Erlebnisse => Category::Kernerinnerungen,
            AnalyzedType::Bewusstsein => Category::Philosophie,
            AnalyzedType::Humor => Category::Humor,
            AnalyzedType::Zusammenarbeit => Category::Zusammenarbeit,
        }
    }
}

impl std::fmt::Display for AnalyzedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map an analyzer-provided type label to its storage category.
///
/// Unknown labels fall back to `kernerinnerungen`.
pub fn storage_category_for(label: &str) -> Category {
    AnalyzedType::parse_name(label)
        .map(|t| t.storage_category())
        .unwrap_or(Category::Kernerinnerungen)
}

// ============================================================================
// TESTS
// ============================================================================
