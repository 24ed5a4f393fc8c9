//! URL slugs for listing detail pages.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Regional suffix appended to every listing slug.
pub const SLUG_SUFFIX: &str = "dfw";

/// Turns a business name into an ASCII slug such as `pho-sai-gon-dfw`.
///
/// Diacritics are stripped through canonical decomposition, `đ`/`Đ` become `d`,
/// characters outside `[a-z0-9]` are dropped and runs of whitespace, `_` or `-`
/// collapse into one hyphen. Equal names give equal slugs; collisions are left to
/// the caller.
pub fn slugify(name: &str) -> String {
    let folded = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' | 'Đ' => 'd',
            other => other,
        })
        .flat_map(char::to_lowercase);

    let mut slug = String::with_capacity(name.len() + SLUG_SUFFIX.len() + 1);
    let mut pending_separator = false;

    for c in folded {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        }
    }

    if !slug.is_empty() {
        slug.push('-');
    }
    slug.push_str(SLUG_SUFFIX);
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_vietnamese_diacritics() {
        assert_eq!(slugify("Phở Sài Gòn"), "pho-sai-gon-dfw");
        assert_eq!(slugify("Bánh Mì Đặc Biệt"), "banh-mi-dac-biet-dfw");
        assert_eq!(slugify("ĐẠI HỌC"), "dai-hoc-dfw");
    }

    #[test]
    fn collapses_separators_and_drops_punctuation() {
        assert_eq!(slugify("  Tiệm   Nail__Hoa -- Garland!! "), "tiem-nail-hoa-garland-dfw");
        assert_eq!(slugify("A & B Auto"), "a-b-auto-dfw");
        assert_eq!(slugify("Kim's #1 Café"), "kims-1-cafe-dfw");
    }

    #[test]
    fn output_alphabet_is_restricted() {
        for name in ["Chùa Pháp Quang (Temple)", "Nhà Hàng 中文 🍜", "---", "Ω mega"] {
            let slug = slugify(name);
            assert!(
                slug.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "{slug}"
            );
            assert!(slug.ends_with(SLUG_SUFFIX));
            assert!(!slug.starts_with('-'));
            assert_eq!(slug, slugify(name));
        }
    }

    #[test]
    fn empty_name_yields_bare_suffix() {
        assert_eq!(slugify(""), "dfw");
        assert_eq!(slugify("!!!"), "dfw");
    }
}
