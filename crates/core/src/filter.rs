//! Keyword and tag filtering over a cached catalog.
//!
//! Filtering is a pure function of the cached list: it never touches the
//! network and never reorders or mutates its input. It is cheap enough to
//! run on every keystroke for a catalog of this size.

use crate::types::Product;

/// The single active tag narrowing the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Tag {
    #[default]
    All,
    /// Exact match on the product's `type`.
    Category(String),
    /// Exact match on the product's `gender`.
    Gender(String),
}

impl Tag {
    const CATEGORY_PREFIX: &'static str = "type:";
    const GENDER_PREFIX: &'static str = "gender:";

    /// Parse a tag query value (`all`, `type:<v>`, `gender:<v>`). Anything
    /// else, including an empty value, means `All`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(value) = raw.strip_prefix(Self::CATEGORY_PREFIX)
            && !value.is_empty()
        {
            return Self::Category(value.to_string());
        }
        if let Some(value) = raw.strip_prefix(Self::GENDER_PREFIX)
            && !value.is_empty()
        {
            return Self::Gender(value.to_string());
        }
        Self::All
    }

    /// Query value for links; inverse of [`Tag::parse`].
    #[must_use]
    pub fn query_value(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Category(v) => format!("{}{v}", Self::CATEGORY_PREFIX),
            Self::Gender(v) => format!("{}{v}", Self::GENDER_PREFIX),
        }
    }

    /// Label for the tag bar.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::All => "All",
            Self::Category(v) | Self::Gender(v) => v,
        }
    }

    fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Category(v) => product.category.as_deref() == Some(v.as_str()),
            Self::Gender(v) => product.gender.as_deref() == Some(v.as_str()),
        }
    }
}

/// Keyword plus tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    keyword: String,
    tag: Tag,
}

impl ProductFilter {
    /// Build a filter. The keyword is lowercased once here and otherwise
    /// matched as typed, surrounding spaces included.
    #[must_use]
    pub fn new(keyword: &str, tag: Tag) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
            tag,
        }
    }

    /// The normalized keyword.
    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// The active tag.
    #[must_use]
    pub const fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Whether this filter lets everything through.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keyword.is_empty() && self.tag == Tag::All
    }

    /// Whether a single product passes.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.tag.matches(product) && self.matches_keyword(product)
    }

    fn matches_keyword(&self, product: &Product) -> bool {
        if self.keyword.is_empty() {
            return true;
        }
        let contains = |field: &str| field.to_lowercase().contains(&self.keyword);
        contains(&product.name)
            || product.category.as_deref().is_some_and(contains)
            || product.note.as_deref().is_some_and(contains)
    }
}

/// Products passing `filter`, in their original order.
#[must_use]
pub fn filter_products<'a>(products: &'a [Product], filter: &ProductFilter) -> Vec<&'a Product> {
    products.iter().filter(|p| filter.matches(p)).collect()
}

/// Distinct category tags, then distinct gender tags, each in first-seen
/// order.
#[must_use]
pub fn available_tags(products: &[Product]) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();
    let mut push = |tag: Tag| {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    };
    for category in products.iter().filter_map(|p| p.category.clone()) {
        push(Tag::Category(category));
    }
    for gender in products.iter().filter_map(|p| p.gender.clone()) {
        push(Tag::Gender(gender));
    }
    tags
}
