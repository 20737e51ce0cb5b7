#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Find products by function and category
    #[default]
    Product,
    /// Find items by aesthetic, via the style complement rewrite
    Style,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Product => "product",
            MatchMode::Style => "style",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "product" => Some(MatchMode::Product),
            "style" => Some(MatchMode::Style),
            _ => None,
        }
    }

    pub fn all() -> Vec<MatchMode> {
        vec![MatchMode::Product, MatchMode::Style]
    }

    pub fn toggle(&self) -> Self {
        match self {
            MatchMode::Product => MatchMode::Style,
            MatchMode::Style => MatchMode::Product,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MatchMode::Product => "Product Matching",
            MatchMode::Style => "Style Matching",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            MatchMode::Product => "Find products by function & category",
            MatchMode::Style => "Find items by aesthetic & style",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            MatchMode::Product => "Looking for wireless headphones...",
            MatchMode::Style => "I love minimalist design...",
        }
    }

    pub fn examples(&self) -> &'static [&'static str] {
        match self {
            MatchMode::Product => &["blue shirt", "pink dress", "long jeans", "accessories"],
            MatchMode::Style => &["minimalist", "vintage", "modern", "casual"],
        }
    }

    /// Reply used when the generation step returns nothing
    pub fn fallback_response(&self, product_count: usize) -> String {
        match self {
            MatchMode::Product => {
                format!("Found {} products matching your requirements:", product_count)
            }
            MatchMode::Style => "Here's what I found for your style.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_round_trips_every_mode() {
        for mode in MatchMode::all() {
            assert_eq!(MatchMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(MatchMode::from_str(" Style "), Some(MatchMode::Style));
        assert_eq!(MatchMode::from_str("vibes"), None);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(MatchMode::Product.toggle(), MatchMode::Style);
        assert_eq!(MatchMode::Style.toggle().toggle(), MatchMode::Style);
    }

    #[test]
    fn test_fallback_response() {
        assert_eq!(
            MatchMode::Product.fallback_response(3),
            "Found 3 products matching your requirements:"
        );
        assert_eq!(MatchMode::Style.fallback_response(3), "Here's what I found for your style.");
    }
}
