use super::TextNormalizer;
use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));
static SPACES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[ \t\u{00A0}]+").expect("valid spaces regex"));
static NEWLINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\n\s*").expect("valid newline regex"));
static ZWNJ_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\u{200C}\u{200B}\u{200D}\u{FEFF}]+").expect("valid zwnj regex"));
static ZWNJ_EDGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{200C}*(\\s+)\u{200C}*").expect("valid zwnj edge regex"));

const ZWNJ: char = '\u{200C}';

/// Cleans Persian text: unifies Arabic letter and digit forms, strips
/// diacritics and tatweel, and tidies whitespace. URLs pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersianNormalizer;

impl PersianNormalizer {
    fn normalize_segment(segment: &str) -> String {
        let mapped: String = segment.chars().filter_map(map_char).collect();
        let joined = ZWNJ_RE.replace_all(&mapped, ZWNJ.to_string());
        let spaced = SPACES_RE.replace_all(&joined, " ");
        // A joiner next to whitespace is meaningless.
        ZWNJ_EDGE_RE.replace_all(&spaced, "$1").into_owned()
    }
}

impl TextNormalizer for PersianNormalizer {
    fn normalize(&self, text: &str) -> String {
        let text = text.replace("\r\n", "\n").replace('\r', "\n");

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in URL_RE.find_iter(&text) {
            out.push_str(&Self::normalize_segment(&text[last..m.start()]));
            out.push_str(m.as_str());
            last = m.end();
        }
        out.push_str(&Self::normalize_segment(&text[last..]));

        let out = SPACES_RE.replace_all(&out, " ");
        let out = NEWLINES_RE.replace_all(&out, "\n");
        out.trim_matches(|c: char| c.is_whitespace() || c == ZWNJ)
            .to_string()
    }
}

fn map_char(c: char) -> Option<char> {
    match c {
        // diacritics, superscript alef, tatweel
        '\u{064B}'..='\u{0652}' | '\u{0670}' | '\u{0640}' => None,
        'ي' | 'ى' | 'ئ' => Some('ی'),
        'ك' => Some('ک'),
        'ة' => Some('ه'),
        'ؤ' => Some('و'),
        'إ' | 'أ' | 'ٱ' => Some('ا'),
        // Arabic-Indic and ASCII digits to Persian digits
        '\u{0660}'..='\u{0669}' => char::from_u32(c as u32 - 0x0660 + 0x06F0),
        '0'..='9' => char::from_u32(c as u32 - '0' as u32 + 0x06F0),
        '\t' => Some(' '),
        _ => Some(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        PersianNormalizer.normalize(s)
    }

    #[test]
    fn unifies_arabic_letters() {
        assert_eq!(norm("كتاب علي"), "کتاب علی");
    }

    #[test]
    fn converts_digits() {
        assert_eq!(norm("سال 1402 و ١٤٠٢"), "سال ۱۴۰۲ و ۱۴۰۲");
    }

    #[test]
    fn strips_diacritics_and_tatweel() {
        assert_eq!(norm("مُحَمَّد ســلام"), "محمد سلام");
    }

    #[test]
    fn collapses_whitespace_and_joiners() {
        assert_eq!(norm("  می\u{200C}\u{200C}رود \t  به   خانه \n\n\n بعد "), "می\u{200C}رود به خانه\nبعد");
        assert_eq!(norm("کتاب \u{200C}ها"), "کتاب ها");
    }

    #[test]
    fn urls_are_preserved() {
        assert_eq!(
            norm("منبع: https://irna.ir/news/123?ref=1 كامل"),
            "منبع: https://irna.ir/news/123?ref=1 کامل"
        );
    }

    #[test]
    fn idempotent() {
        for input in [
            "  خبرِ فوري 24 ساعته  ",
            "می\u{200C}\u{00A0}رود",
            "می\u{00A0}\u{200C}رود",
            "می\u{200C}\nرود",
            "خبر\u{200C} \n\u{200C}\tبعدی https://irna.ir/a\u{200C} پایان",
        ] {
            let once = norm(input);
            assert_eq!(norm(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn joiners_next_to_any_whitespace_are_dropped() {
        assert_eq!(norm("می\u{200C}\u{00A0}رود"), "می رود");
        assert_eq!(norm("می\u{200C}\nرود"), "می\nرود");
    }

    #[test]
    fn ascii_text_passes_through() {
        assert_eq!(norm("hello"), "hello");
    }
}
