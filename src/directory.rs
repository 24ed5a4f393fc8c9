//! Search, filter and sort over the full listing set, plus the small
//! presentation helpers the pages and the approval flow share.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::models::Business;

pub const ALL_CATEGORIES: &str = "All";
pub const DEFAULT_STATE: &str = "TX";
pub const DEFAULT_CITY: &str = "Dallas-Fort Worth";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "name")]
    NameAsc,
    #[serde(rename = "name-desc")]
    NameDesc,
    #[serde(rename = "rating")]
    Rating,
    #[serde(rename = "reviews")]
    Reviews,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::NameAsc => "name",
            SortOrder::NameDesc => "name-desc",
            SortOrder::Rating => "rating",
            SortOrder::Reviews => "reviews",
        }
    }
}

/// Query string accepted by the listing API and the directory page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub q: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl DirectoryQuery {
    fn category_filter(&self) -> Option<&str> {
        active_filter(self.category.as_deref())
    }

    fn subcategory_filter(&self) -> Option<&str> {
        active_filter(self.subcategory.as_deref())
    }

    fn needle(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }
}

fn active_filter(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ALL_CATEGORIES)
}

/// Filters by exact category/subcategory and case-insensitive name substring,
/// then sorts.
pub fn apply(businesses: Vec<Business>, query: &DirectoryQuery) -> Vec<Business> {
    let category = query.category_filter();
    let subcategory = query.subcategory_filter();
    let needle = query.needle();

    let mut matched: Vec<Business> = businesses
        .into_iter()
        .filter(|b| category.map_or(true, |c| b.category == c))
        .filter(|b| subcategory.map_or(true, |s| b.subcategory.as_deref() == Some(s)))
        .filter(|b| {
            needle
                .as_deref()
                .map_or(true, |n| b.name.to_lowercase().contains(n))
        })
        .collect();

    sort(&mut matched, query.sort);
    matched
}

pub fn sort(businesses: &mut [Business], order: SortOrder) {
    match order {
        SortOrder::NameAsc => businesses.sort_by_cached_key(|b| b.name.to_lowercase()),
        SortOrder::NameDesc => {
            businesses.sort_by_cached_key(|b| b.name.to_lowercase());
            businesses.reverse();
        }
        SortOrder::Rating => businesses.sort_by(|a, b| desc_missing_last(a.rating, b.rating)),
        SortOrder::Reviews => {
            businesses.sort_by(|a, b| desc_missing_last(a.review_count, b.review_count))
        }
    }
}

fn desc_missing_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn categories(businesses: &[Business]) -> Vec<String> {
    businesses
        .iter()
        .map(|b| b.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn subcategories(businesses: &[Business], category: Option<&str>) -> Vec<String> {
    let category = active_filter(category);
    businesses
        .iter()
        .filter(|b| category.map_or(true, |c| b.category == c))
        .filter_map(|b| b.subcategory.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// "Let the universe decide".
pub fn pick_random(businesses: &[Business]) -> Option<&Business> {
    businesses.choose(&mut rand::thread_rng())
}

/// Formats North American numbers as `(972) 555-0101`; anything else is returned
/// trimmed.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let local = match digits.len() {
        10 => Some(digits.as_str()),
        11 if digits.starts_with('1') => Some(&digits[1..]),
        _ => None,
    };

    match local {
        Some(d) => format!("({}) {}-{}", &d[0..3], &d[3..6], &d[6..10]),
        None => raw.trim().to_string(),
    }
}

pub fn google_maps_link(address: &str, city: Option<&str>, state: Option<&str>) -> String {
    let city = city.unwrap_or_default();
    let state = state
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_STATE);
    let full_address = format!("{}, {}, {}", address.trim(), city.trim(), state);
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        urlencoding::encode(&full_address)
    )
}

/// Vietnamese subcategory label for an English category.
pub fn vietnamese_subcategory(category: &str) -> &str {
    match category {
        "Restaurant" | "Food" => "Ẩm Thực Việt",
        "Healthcare" => "Y Khoa",
        "Retail" | "Shopping" => "Bán Lẻ",
        "Automotive" => "Sửa Xe",
        "Beauty & Personal Care" => "Tiệm Nail",
        "Professional Services" | "Services" => "Dịch Vụ",
        "Religious" => "Tôn Giáo",
        "Community" => "Cộng Đồng",
        other => other,
    }
}

/// City for display, falling back to the address and then the metro name.
pub fn display_city(business: &Business) -> String {
    if let Some(city) = business.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        return city.to_string();
    }

    let parts: Vec<&str> = business.address.split(',').collect();
    if parts.len() >= 2 {
        let city: String = parts[parts.len() - 2]
            .chars()
            .filter(|c| !c.is_ascii_digit())
            .collect();
        let city = city.trim();
        if !city.is_empty() {
            return city.to_string();
        }
    }

    DEFAULT_CITY.to_string()
}

pub fn website_href(website: &str) -> String {
    let website = website.trim();
    if website.starts_with("http://") || website.starts_with("https://") {
        website.to_string()
    } else {
        format!("https://{website}")
    }
}
