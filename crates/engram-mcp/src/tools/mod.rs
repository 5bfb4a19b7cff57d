//! Tool Handlers
//!
//! One module per tool: a `schema()` describing the input and an
//! `execute()` running it against the engine.

pub mod concepts;
pub mod graph;
pub mod jobs;
pub mod recall;
pub mod recent;
pub mod save;
pub mod search;
pub mod stats;

use engram_core::Category;

/// Parse an optional list of category names, rejecting unknown ones
pub(crate) fn parse_categories(
    raw: Option<Vec<String>>,
) -> Result<Option<Vec<Category>>, String> {
    match raw {
        None => Ok(None),
        Some(names) if names.is_empty() => Ok(None),
        Some(names) => {
            let mut categories = Vec::with_capacity(names.len());
            for name in names {
                let category = Category::parse_name(&name)
                    .ok_or_else(|| format!("Unknown category: {name}"))?;
                categories.push(category);
            }
            Ok(Some(categories))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories_accepts_valid_names() {
        let parsed = parse_categories(Some(vec![
            "humor".to_string(),
            "kernerinnerungen".to_string(),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(parsed, vec![Category::Humor, Category::Kernerinnerungen]);
    }

    #[test]
    fn test_parse_categories_rejects_unknown() {
        let err = parse_categories(Some(vec!["nope".to_string()])).unwrap_err();
        assert!(err.contains("nope"));
    }

    #[test]
    fn test_parse_categories_empty_is_none() {
        assert!(parse_categories(Some(vec![])).unwrap().is_none());
        assert!(parse_categories(None).unwrap().is_none());
    }
}
