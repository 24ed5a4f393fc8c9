//! Server-rendered HTML pages.

use std::collections::BTreeMap;

use handlebars::RenderError;
use serde::Serialize;

use crate::directory::{self, DirectoryQuery, SortOrder, ALL_CATEGORIES};
use crate::i18n::Language;
use crate::models::Business;
use crate::templates::{Templates, ADMIN, BUSINESS, INDEX, NOT_FOUND};

#[derive(Serialize)]
struct Base {
    lang: &'static str,
    other_lang: &'static str,
    t: BTreeMap<&'static str, &'static str>,
}

impl Base {
    fn new(lang: Language) -> Self {
        Self {
            lang: lang.code(),
            other_lang: lang.other().code(),
            t: lang.strings(),
        }
    }
}

#[derive(Serialize)]
struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Serialize)]
struct Card {
    name: String,
    href: String,
    category: String,
    subcategory: Option<String>,
    city: String,
    phone: Option<String>,
    phone_href: Option<String>,
    image: Option<String>,
    initial: String,
}

impl Card {
    fn new(business: &Business, lang: Language) -> Self {
        let (phone, phone_href) = phone_fields(business);
        Self {
            name: business.name.clone(),
            href: format!("/business/{}?lang={}", business.slug, lang.code()),
            category: lang.category_label(&business.category),
            subcategory: business.subcategory.clone(),
            city: directory::display_city(business),
            phone,
            phone_href,
            image: business.images.first().cloned(),
            initial: initial(&business.name),
        }
    }
}

#[derive(Serialize)]
struct DirectoryPage {
    #[serde(flatten)]
    base: Base,
    query: String,
    categories: Vec<SelectOption>,
    subcategories: Vec<SelectOption>,
    sort_options: Vec<SelectOption>,
    count: usize,
    total: usize,
    cards: Vec<Card>,
    random_href: Option<String>,
}

#[derive(Serialize)]
struct BusinessPage {
    #[serde(flatten)]
    base: Base,
    name: String,
    category: String,
    subcategory: Option<String>,
    address: String,
    city: String,
    phone: Option<String>,
    phone_href: Option<String>,
    email: Option<String>,
    website_href: Option<String>,
    maps_link: Option<String>,
    hero_image: Option<String>,
    initial: String,
    gallery: Vec<String>,
    description: String,
}

fn initial(name: &str) -> String {
    name.chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string())
}

fn phone_fields(business: &Business) -> (Option<String>, Option<String>) {
    match business.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => {
            let href: String = raw
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .collect();
            (Some(directory::format_phone(raw)), Some(href))
        }
        None => (None, None),
    }
}

fn options(values: Vec<String>, selected: Option<&str>, lang: Language) -> Vec<SelectOption> {
    values
        .into_iter()
        .map(|value| SelectOption {
            selected: selected == Some(value.as_str()),
            label: lang.category_label(&value),
            value,
        })
        .collect()
}

fn sort_options(current: SortOrder, lang: Language) -> Vec<SelectOption> {
    [
        (SortOrder::NameAsc, "sort_name"),
        (SortOrder::NameDesc, "sort_name_desc"),
        (SortOrder::Rating, "sort_rating"),
        (SortOrder::Reviews, "sort_reviews"),
    ]
    .into_iter()
    .map(|(order, key)| SelectOption {
        value: order.as_str().to_string(),
        label: lang.t(key).to_string(),
        selected: order == current,
    })
    .collect()
}

/// Directory page: filters, result count and cards.
pub fn render_directory(
    templates: &Templates,
    lang: Language,
    query: &DirectoryQuery,
    businesses: Vec<Business>,
) -> Result<String, RenderError> {
    let total = businesses.len();
    let categories = directory::categories(&businesses);
    let selected_category = query
        .category
        .as_deref()
        .filter(|c| !c.is_empty() && *c != ALL_CATEGORIES);
    let subcategories = match selected_category {
        Some(category) => directory::subcategories(&businesses, Some(category)),
        None => Vec::new(),
    };
    let random_href = directory::pick_random(&businesses)
        .map(|b| format!("/business/{}?lang={}", b.slug, lang.code()));

    let matched = directory::apply(businesses, query);

    let page = DirectoryPage {
        base: Base::new(lang),
        query: query.q.clone().unwrap_or_default(),
        categories: options(categories, selected_category, lang),
        subcategories: options(subcategories, query.subcategory.as_deref(), lang),
        sort_options: sort_options(query.sort, lang),
        count: matched.len(),
        total,
        cards: matched.iter().map(|b| Card::new(b, lang)).collect(),
        random_href,
    };

    templates.render(INDEX, &page)
}

/// Detail page for one listing.
pub fn render_business(
    templates: &Templates,
    lang: Language,
    business: &Business,
) -> Result<String, RenderError> {
    let city = directory::display_city(business);
    let (phone, phone_href) = phone_fields(business);
    let description = business
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("{} {} {}.", business.name, lang.t("generated_description"), city)
        });
    let maps_link = business.google_maps_link.clone().or_else(|| {
        (!business.address.trim().is_empty()).then(|| {
            directory::google_maps_link(
                &business.address,
                business.city.as_deref(),
                business.state.as_deref(),
            )
        })
    });

    let page = BusinessPage {
        base: Base::new(lang),
        name: business.name.clone(),
        category: lang.category_label(&business.category),
        subcategory: business.subcategory.clone(),
        address: business.address.clone(),
        city,
        phone,
        phone_href,
        email: business.email.clone(),
        website_href: business
            .website
            .as_deref()
            .filter(|w| !w.trim().is_empty())
            .map(directory::website_href),
        maps_link,
        hero_image: business.images.first().cloned(),
        initial: initial(&business.name),
        gallery: business.images.iter().skip(1).cloned().collect(),
        description,
    };

    templates.render(BUSINESS, &page)
}

pub fn render_not_found(templates: &Templates, lang: Language) -> Result<String, RenderError> {
    templates.render(NOT_FOUND, &Base::new(lang))
}

/// Moderation dashboard shell; the data is fetched by the page script.
pub fn render_admin(templates: &Templates, lang: Language) -> Result<String, RenderError> {
    templates.render(ADMIN, &Base::new(lang))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn business(id: i64, name: &str, category: &str) -> Business {
        Business {
            id,
            name: name.into(),
            slug: crate::slug::slugify(name),
            category: category.into(),
            original_category: None,
            subcategory: None,
            address: "1 Main St".into(),
            city: Some("Garland".into()),
            state: None,
            phone: Some("9725550101".into()),
            website: Some("phohoa.com".into()),
            email: None,
            description: None,
            google_maps_link: None,
            link_type: None,
            images: vec!["https://cdn/a.jpg".into(), "https://cdn/b.jpg".into()],
            rating: None,
            review_count: None,
            source: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn directory_shows_filtered_count_of_total() {
        let templates = Templates::new().unwrap();
        let query = DirectoryQuery {
            q: Some("phở".into()),
            ..Default::default()
        };
        let html = render_directory(
            &templates,
            Language::En,
            &query,
            vec![business(1, "Phở Hòa", "Restaurant"), business(2, "Lee Auto", "Automotive")],
        )
        .unwrap();

        assert!(html.contains("Showing 1 of 2 businesses"));
        // handlebars escapes `=` inside values
        assert!(html.contains("/business/pho-hoa-dfw?lang&#x3D;en"));
        assert!(!html.contains("Lee Auto</a>"));
        assert!(html.contains("value=\"phở\""));
    }

    #[test]
    fn directory_defaults_to_vietnamese() {
        let templates = Templates::new().unwrap();
        let html = render_directory(
            &templates,
            Language::default(),
            &DirectoryQuery::default(),
            vec![],
        )
        .unwrap();
        assert!(html.contains("lang=\"vi\""));
        assert!(html.contains("Không tìm thấy doanh nghiệp nào."));
    }

    #[test]
    fn detail_page_has_phone_gallery_and_generated_description() {
        let templates = Templates::new().unwrap();
        let html = render_business(&templates, Language::En, &business(1, "Phở Hòa", "Restaurant"))
            .unwrap();

        assert!(html.contains("(972) 555-0101"));
        assert!(html.contains("tel:9725550101"));
        assert!(html.contains("https://phohoa.com"));
        assert!(html.contains("src=\"https://cdn/b.jpg\""));
        assert!(html.contains("is a Vietnamese-owned business in Garland."));
        assert!(html.contains("https://www.google.com/maps/search/?api&#x3D;1&amp;query&#x3D;"));
    }

    #[test]
    fn subcategory_options_follow_the_page_language() {
        let templates = Templates::new().unwrap();
        let mut banh_mi = business(1, "Bánh Mì Thịt", "Restaurant");
        banh_mi.subcategory = Some("Bánh Mì".into());
        let mut market = business(2, "Hong Kong Market", "Restaurant");
        market.subcategory = Some("Food".into());
        let query = DirectoryQuery {
            category: Some("Restaurant".into()),
            ..Default::default()
        };

        let html = render_directory(&templates, Language::Vi, &query, vec![banh_mi, market])
            .unwrap();

        assert!(html.contains("<option value=\"Food\">Ẩm Thực</option>"));
        assert!(html.contains("<option value=\"Bánh Mì\">Bánh Mì</option>"));
    }

    #[test]
    fn initials_fall_back_to_question_mark() {
        assert_eq!(initial("ẩm thực"), "Ẩ");
        assert_eq!(initial("!!"), "?");
    }
}
