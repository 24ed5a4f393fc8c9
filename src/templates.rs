use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

pub const INDEX: &str = "index";
pub const BUSINESS: &str = "business";
pub const NOT_FOUND: &str = "not_found";
pub const ADMIN: &str = "admin";
pub const LIXI_EMAIL: &str = "lixi_email";
pub const LIXI_CARD_SVG: &str = "lixi_card_svg";

/// Handlebars registry with every page, email and card template compiled in.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);

        registry.register_partial("head", include_str!("../templates/partials/head.hbs"))?;
        registry.register_template_string(INDEX, include_str!("../templates/index.hbs"))?;
        registry.register_template_string(BUSINESS, include_str!("../templates/business.hbs"))?;
        registry.register_template_string(NOT_FOUND, include_str!("../templates/not_found.hbs"))?;
        registry.register_template_string(ADMIN, include_str!("../templates/admin.hbs"))?;
        registry.register_template_string(LIXI_EMAIL, include_str!("../templates/lixi_email.hbs"))?;
        registry.register_template_string(
            LIXI_CARD_SVG,
            include_str!("../templates/lixi_card.svg.hbs"),
        )?;

        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        self.registry.render(name, data)
    }
}
