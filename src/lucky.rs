//! Lì xì lucky numbers and the red-envelope card they are delivered on.

use handlebars::RenderError;
use rand::Rng;
use serde::Serialize;

use crate::templates::{Templates, LIXI_CARD_SVG, LIXI_EMAIL};

pub const LUCKY_MIN: i32 = 1000;
pub const LUCKY_MAX: i32 = 9999;

/// Uniform draw from `LUCKY_MIN..=LUCKY_MAX`.
pub fn generate_lucky_number() -> i32 {
    rand::thread_rng().gen_range(LUCKY_MIN..=LUCKY_MAX)
}

pub fn is_lucky_number(value: i32) -> bool {
    (LUCKY_MIN..=LUCKY_MAX).contains(&value)
}

/// How a card is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStyle {
    /// Table layout with inline styles, for email clients.
    InlineHtml,
    /// Self-contained SVG image.
    Svg,
}

impl CardStyle {
    pub fn content_type(self) -> &'static str {
        match self {
            CardStyle::InlineHtml => "text/html; charset=utf-8",
            CardStyle::Svg => "image/svg+xml",
        }
    }

    fn template(self) -> &'static str {
        match self {
            CardStyle::InlineHtml => LIXI_EMAIL,
            CardStyle::Svg => LIXI_CARD_SVG,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LuckyCard<'a> {
    pub lucky_number: i32,
    pub email: Option<&'a str>,
    pub business_name: &'a str,
    pub site_url: &'a str,
}

impl<'a> LuckyCard<'a> {
    pub fn new(lucky_number: i32, site_url: &'a str) -> Self {
        Self {
            lucky_number,
            email: None,
            business_name: "N/A",
            site_url,
        }
    }

    pub fn for_entry(
        lucky_number: i32,
        email: &'a str,
        business_name: Option<&'a str>,
        site_url: &'a str,
    ) -> Self {
        Self {
            lucky_number,
            email: Some(email),
            business_name: business_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or("N/A"),
            site_url,
        }
    }

    pub fn site_host(&self) -> &str {
        self.site_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
    }
}

#[derive(Serialize)]
struct CardView<'a> {
    #[serde(flatten)]
    card: &'a LuckyCard<'a>,
    site_host: &'a str,
}

pub fn render_card(
    templates: &Templates,
    style: CardStyle,
    card: &LuckyCard<'_>,
) -> Result<String, RenderError> {
    let view = CardView {
        card,
        site_host: card.site_host(),
    };
    templates.render(style.template(), &view)
}
