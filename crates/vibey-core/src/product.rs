use std::collections::HashSet;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category used when a result group has no search term.
pub const DEFAULT_CATEGORY: &str = "General";

/// Relative directory product images are served from.
pub const ASSET_DIR: &str = "assets";

// Final `.ext` segment of a file name, not crossing a path separator.
static EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.[^/.]+$").unwrap());

/// A product as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Display string, passed through from the backend unparsed
    pub price: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// One retrieved document inside a result group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchHit {
    pub score: f64,
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
}

/// A group of documents retrieved for one search term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResult {
    pub search_term: String,
    pub search_results: Vec<SearchHit>,
}

/// Retrieval output as the backend sent it.
///
/// `raw` is the `results` array exactly as received and goes to generation
/// untouched; `groups` is the typed view used for the product list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    pub groups: Vec<RawResult>,
    pub raw: String,
}

impl Documents {
    pub fn from_json(raw: String) -> Result<Self> {
        let groups = serde_json::from_str(&raw)?;
        Ok(Self { groups, raw })
    }
}

/// Replace the file extension with `.png`. Names without one are returned as is.
pub fn png_file_name(id: &str) -> String {
    EXTENSION.replace(id, ".png").into_owned()
}

fn dedup_key(hit: &SearchHit) -> (String, String) {
    (hit.id.clone(), hit.name.trim().to_lowercase())
}

/// Merge result groups into one product list.
///
/// Order follows the backend response. A later hit with the same raw id and
/// case/whitespace-insensitive name as an earlier one is dropped.
pub fn flatten_search_results(results: &[RawResult]) -> Vec<Product> {
    let mut products = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for group in results {
        let category = if group.search_term.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            group.search_term.clone()
        };

        for (index, hit) in group.search_results.iter().enumerate() {
            if !seen.insert(dedup_key(hit)) {
                continue;
            }

            let file_name = png_file_name(&hit.id);
            products.push(Product {
                id: format!("{}-{}", file_name, index),
                name: hit.name.clone(),
                description: hit.description.clone(),
                price: hit.price.clone(),
                image_url: format!("{}/{}", ASSET_DIR, file_name),
                category: Some(category.clone()),
            });
        }
    }

    products
}
