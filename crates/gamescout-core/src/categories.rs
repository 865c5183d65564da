use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Tolerance when checking that category weights sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// How venues of a category are drawn on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub color: String,
    pub icon: String,
}

/// One amenity category searched in the places API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub slug: String,
    pub label: String,
    /// Free-text query sent to the places search endpoint.
    pub query: String,
    /// Contribution of this category to the weighted city score.
    pub weight: f64,
    pub marker: MarkerStyle,
}

#[derive(Debug, Deserialize)]
pub struct CategoriesFile {
    pub categories: Vec<CategoryConfig>,
}

impl CategoriesFile {
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.slug == slug)
    }

    /// `(slug, weight)` pairs in file order.
    #[must_use]
    pub fn weights(&self) -> Vec<(String, f64)> {
        self.categories
            .iter()
            .map(|c| (c.slug.clone(), c.weight))
            .collect()
    }
}

/// Load and validate the amenity categories from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_categories(path: &Path) -> Result<CategoriesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CategoriesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: CategoriesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CategoriesFileParse)?;

    validate_categories(&file)?;

    Ok(file)
}

fn validate_categories(file: &CategoriesFile) -> Result<(), ConfigError> {
    if file.categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category is required".to_string(),
        ));
    }

    let mut seen_slugs = HashSet::new();
    let mut total_weight = 0.0;

    for category in &file.categories {
        let slug = category.slug.trim();
        if slug.is_empty() {
            return Err(ConfigError::Validation(
                "category slug must be non-empty".to_string(),
            ));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "category slug '{slug}' must be lowercase ascii, digits or '-'"
            )));
        }
        if category.query.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "category '{slug}' has an empty query"
            )));
        }
        if !(0.0..=1.0).contains(&category.weight) {
            return Err(ConfigError::Validation(format!(
                "category '{slug}' has invalid weight {}; must be within [0, 1]",
                category.weight
            )));
        }
        if !seen_slugs.insert(slug.to_string()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category slug: '{slug}'"
            )));
        }
        total_weight += category.weight;
    }

    if (total_weight - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(ConfigError::Validation(format!(
            "category weights must sum to 1.0 (got {total_weight})"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(slug: &str, weight: f64) -> CategoryConfig {
        CategoryConfig {
            slug: slug.to_string(),
            label: slug.to_string(),
            query: slug.to_string(),
            weight,
            marker: MarkerStyle {
                color: "blue".to_string(),
                icon: "info".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_weights_summing_to_one() {
        let file = CategoriesFile {
            categories: vec![
                category("coffee", 0.2),
                category("schools", 0.2),
                category("clubs", 0.2),
                category("bars", 0.4),
            ],
        };
        assert!(validate_categories(&file).is_ok());
    }

    #[test]
    fn validate_rejects_empty_list() {
        let file = CategoriesFile { categories: vec![] };
        let err = validate_categories(&file).unwrap_err();
        assert!(err.to_string().contains("at least one category"));
    }

    #[test]
    fn validate_rejects_weight_sum_mismatch() {
        let file = CategoriesFile {
            categories: vec![category("coffee", 0.5), category("bars", 0.4)],
        };
        let err = validate_categories(&file).unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn validate_rejects_weight_out_of_range() {
        let file = CategoriesFile {
            categories: vec![category("coffee", 1.5), category("bars", -0.5)],
        };
        let err = validate_categories(&file).unwrap_err();
        assert!(err.to_string().contains("invalid weight 1.5"));
    }

    #[test]
    fn validate_rejects_duplicate_slug() {
        let file = CategoriesFile {
            categories: vec![category("bars", 0.5), category("bars", 0.5)],
        };
        let err = validate_categories(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate category slug"));
    }

    #[test]
    fn validate_rejects_uppercase_slug() {
        let file = CategoriesFile {
            categories: vec![category("Bars", 1.0)],
        };
        let err = validate_categories(&file).unwrap_err();
        assert!(err.to_string().contains("lowercase"));
    }

    #[test]
    fn validate_rejects_empty_query() {
        let mut c = category("bars", 1.0);
        c.query = " ".to_string();
        let file = CategoriesFile {
            categories: vec![c],
        };
        let err = validate_categories(&file).unwrap_err();
        assert!(err.to_string().contains("empty query"));
    }

    #[test]
    fn weights_and_lookup_follow_file_order() {
        let file = CategoriesFile {
            categories: vec![category("coffee", 0.25), category("bars", 0.75)],
        };
        assert_eq!(
            file.weights(),
            vec![("coffee".to_string(), 0.25), ("bars".to_string(), 0.75)]
        );
        assert!(file.get("bars").is_some());
        assert!(file.get("clubs").is_none());
    }

    #[test]
    fn load_categories_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("categories.yaml");
        let result = load_categories(&path);
        assert!(result.is_ok(), "failed to load categories.yaml: {result:?}");
        let file = result.unwrap();
        assert_eq!(file.categories.len(), 4);
        let bars = file.get("bars").expect("bars category present");
        assert!((bars.weight - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn load_categories_reports_missing_file() {
        let err = load_categories(Path::new("/nonexistent/categories.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::CategoriesFileIo { .. }));
    }
}
