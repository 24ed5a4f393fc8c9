//! Bilingual page strings. Vietnamese is the default language.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Vi,
    En,
}

impl Language {
    /// Parses `?lang=`; anything unknown falls back to Vietnamese.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("en") => Language::En,
            _ => Language::Vi,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Vi => "vi",
            Language::En => "en",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Language::Vi => Language::En,
            Language::En => Language::Vi,
        }
    }

    pub fn t(self, key: &str) -> &'static str {
        STRINGS
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(_, vi, en)| match self {
                Language::Vi => *vi,
                Language::En => *en,
            })
            .unwrap_or("")
    }

    /// Every page string for this language, keyed for templates.
    pub fn strings(self) -> BTreeMap<&'static str, &'static str> {
        STRINGS.iter().map(|(key, _, _)| (*key, self.t(key))).collect()
    }

    pub fn category_label(self, category: &str) -> String {
        if self == Language::En {
            return category.to_string();
        }
        CATEGORY_LABELS
            .iter()
            .find(|(en, _)| *en == category)
            .map(|(_, vi)| vi.to_string())
            .unwrap_or_else(|| category.to_string())
    }
}

// (key, vi, en)
const STRINGS: &[(&str, &str, &str)] = &[
    ("site_title", "Doanh Nghiệp Việt DFW", "DFW Vietnamese Businesses"),
    (
        "tagline",
        "Danh bạ doanh nghiệp người Việt tại Dallas - Fort Worth",
        "Vietnamese-owned businesses across Dallas - Fort Worth",
    ),
    ("search_placeholder", "Tìm theo tên...", "Search by name..."),
    ("search", "Tìm", "Search"),
    ("all_categories", "Tất cả", "All"),
    ("category", "Danh mục", "Category"),
    ("subcategory", "Phân loại", "Subcategory"),
    ("sort", "Sắp xếp", "Sort"),
    ("sort_name", "Tên A-Z", "Name A-Z"),
    ("sort_name_desc", "Tên Z-A", "Name Z-A"),
    ("sort_rating", "Đánh giá cao", "Top rated"),
    ("sort_reviews", "Nhiều đánh giá", "Most reviewed"),
    ("showing", "Hiển thị", "Showing"),
    ("of", "trên", "of"),
    ("businesses", "doanh nghiệp", "businesses"),
    ("no_results", "Không tìm thấy doanh nghiệp nào.", "No businesses found."),
    ("random", "Để vũ trụ quyết định", "Let the universe decide"),
    ("add_business", "Thêm doanh nghiệp", "Add your business"),
    ("view_details", "Xem chi tiết", "View details"),
    ("call", "Gọi", "Call"),
    ("website", "Trang web", "Website"),
    ("directions", "Chỉ đường", "Directions"),
    ("address", "Địa chỉ", "Address"),
    ("phone", "Điện thoại", "Phone"),
    ("email", "Email", "Email"),
    ("about", "Giới thiệu", "About"),
    ("gallery", "Hình ảnh", "Photos"),
    ("back", "Quay lại danh bạ", "Back to directory"),
    ("not_found_title", "Không tìm thấy", "Not found"),
    (
        "not_found_body",
        "Doanh nghiệp này không tồn tại hoặc đã bị gỡ.",
        "This business does not exist or has been removed.",
    ),
    ("switch_language", "English", "Tiếng Việt"),
    (
        "generated_description",
        "là doanh nghiệp người Việt tại",
        "is a Vietnamese-owned business in",
    ),
];

// (en, vi)
const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("Restaurant", "Nhà Hàng"),
    ("Food", "Ẩm Thực"),
    ("Healthcare", "Y Tế"),
    ("Retail", "Bán Lẻ"),
    ("Shopping", "Mua Sắm"),
    ("Automotive", "Ô Tô"),
    ("Beauty & Personal Care", "Làm Đẹp"),
    ("Professional Services", "Dịch Vụ Chuyên Nghiệp"),
    ("Services", "Dịch Vụ"),
    ("Religious", "Tôn Giáo"),
    ("Community", "Cộng Đồng"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vietnamese_is_the_default() {
        assert_eq!(Language::from_param(None), Language::Vi);
        assert_eq!(Language::from_param(Some("fr")), Language::Vi);
        assert_eq!(Language::from_param(Some(" EN ")), Language::En);
    }

    #[test]
    fn every_key_has_both_languages() {
        for (key, vi, en) in STRINGS {
            assert!(!vi.is_empty() && !en.is_empty(), "{key}");
        }
        assert_eq!(Language::En.strings().len(), STRINGS.len());
        assert_eq!(Language::Vi.t("search"), "Tìm");
        assert_eq!(Language::En.t("missing-key"), "");
    }

    #[test]
    fn category_labels_translate_known_values_only() {
        assert_eq!(Language::Vi.category_label("Restaurant"), "Nhà Hàng");
        assert_eq!(Language::En.category_label("Restaurant"), "Restaurant");
        assert_eq!(Language::Vi.category_label("Florist"), "Florist");
    }
}
