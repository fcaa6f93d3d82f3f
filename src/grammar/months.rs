//! Month name recognition.
//!
//! Built-in tables cover English, German, Norwegian and Swedish three-letter
//! abbreviations plus German textual months. A listing is expected to use one
//! language, so every successful lookup narrows the session's [`Languages`]
//! mask to the languages the name belongs to.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Languages: u8 {
        const ENGLISH   = 1 << 0;
        const GERMAN    = 1 << 1;
        const NORWEGIAN = 1 << 2;
        const SWEDISH   = 1 << 3;
    }
}

const EN: Languages = Languages::ENGLISH;
const DE: Languages = Languages::GERMAN;
const NO: Languages = Languages::NORWEGIAN;
const SV: Languages = Languages::SWEDISH;
const ALL: Languages = Languages::all();

const THREE_LETTER: [(&str, u8, Languages); 18] = [
    ("jan", 1, ALL),
    ("feb", 2, ALL),
    ("mar", 3, EN.union(NO).union(SV)),
    ("apr", 4, ALL),
    ("may", 5, EN),
    ("jun", 6, ALL),
    ("jul", 7, ALL),
    ("aug", 8, ALL),
    ("sep", 9, ALL),
    ("oct", 10, EN),
    ("nov", 11, ALL),
    ("dec", 12, EN.union(SV)),
    ("mär", 3, DE),
    ("mai", 5, DE.union(NO)),
    ("okt", 10, DE.union(NO).union(SV)),
    ("dez", 12, DE),
    ("des", 12, NO),
    ("maj", 5, SV),
];

const TEXTUAL: [(&str, u8, Languages); 12] = [
    ("Jan.", 1, DE),
    ("Feb.", 2, DE),
    ("März", 3, DE),
    ("Apr.", 4, DE),
    ("Mai", 5, DE),
    ("Juni", 6, DE),
    ("Juli", 7, DE),
    ("Aug.", 8, DE),
    ("Sept.", 9, DE),
    ("Okt.", 10, DE),
    ("Nov.", 11, DE),
    ("Dez.", 12, DE),
];

/// Case-insensitive prefix test; returns the byte length of the matched
/// prefix of `hay`.
pub(crate) fn prefix_fold(hay: &[u8], needle: &str) -> Option<usize> {
    let mut at = 0;
    for expected in needle.chars() {
        let (found, len) = decode_char(&hay[at..])?;
        if !found.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
        at += len;
    }
    Some(at)
}

/// Decode one UTF-8 character at the start of `bytes`.
pub(crate) fn decode_char(bytes: &[u8]) -> Option<(char, usize)> {
    let first = *bytes.first()?;
    let len = match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => return None,
    };
    let text = std::str::from_utf8(bytes.get(..len)?).ok()?;
    text.chars().next().map(|c| (c, len))
}

/// Look up a three-letter month in the built-in tables.
pub(crate) fn month_3_builtin(name: &[u8], allowed: &mut Languages) -> Option<u8> {
    let (month, languages) = THREE_LETTER
        .iter()
        .find(|(text, _, _)| prefix_fold(name, text) == Some(name.len()))
        .map(|(_, month, languages)| (*month, *languages))?;
    if !allowed.intersects(languages) {
        return None;
    }
    *allowed &= languages;
    Some(month)
}

/// Look up a three-letter month in a custom list of twelve names.
pub(crate) fn month_3_custom(name: &[u8], names: &str) -> Option<u8> {
    names
        .split_whitespace()
        .position(|candidate| prefix_fold(name, candidate) == Some(name.len()))
        .and_then(|i| u8::try_from(i + 1).ok())
}

/// Match a textual month at the start of `word`; returns the month and the
/// number of bytes consumed.
pub(crate) fn month_txt_builtin(word: &[u8], allowed: &mut Languages) -> Option<(u8, usize)> {
    let (month, languages, len) = TEXTUAL
        .iter()
        .find_map(|(text, month, languages)| prefix_fold(word, text).map(|len| (*month, *languages, len)))?;
    if !allowed.intersects(languages) {
        return None;
    }
    *allowed &= languages;
    Some((month, len))
}

pub(crate) fn month_txt_custom(word: &[u8], names: &str) -> Option<(u8, usize)> {
    names
        .split_whitespace()
        .enumerate()
        .find_map(|(i, candidate)| prefix_fold(word, candidate).map(|len| (i, len)))
        .and_then(|(i, len)| u8::try_from(i + 1).ok().map(|m| (m, len)))
}

/// A custom month list holds twelve space-separated names, of exactly three
/// characters each when `three_letters` is set.
pub(crate) fn is_valid_month_list(names: &str, three_letters: bool) -> bool {
    let mut count = 0;
    for name in names.split_whitespace() {
        count += 1;
        if three_letters && name.chars().count() != 3 {
            return false;
        }
    }
    count == 12
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_letter_months_narrow_languages() {
        let mut allowed = Languages::all();
        assert_eq!(month_3_builtin(b"JAN", &mut allowed), Some(1));
        assert_eq!(allowed, Languages::all());

        assert_eq!(month_3_builtin(b"okt", &mut allowed), Some(10));
        assert_eq!(allowed, DE | NO | SV);

        // English-only name after a non-English one
        assert_eq!(month_3_builtin(b"May", &mut allowed), None);

        assert_eq!(month_3_builtin("Mär".as_bytes(), &mut allowed), Some(3));
        assert_eq!(allowed, DE);
        assert_eq!(month_3_builtin(b"des", &mut allowed), None);
    }

    #[test]
    fn textual_months() {
        let mut allowed = Languages::all();
        assert_eq!(month_txt_builtin("März".as_bytes(), &mut allowed), Some((3, 5)));
        assert_eq!(month_txt_builtin(b"sept.", &mut allowed), Some((9, 5)));
        assert_eq!(month_txt_builtin(b"Mai", &mut allowed), Some((5, 3)));
        assert_eq!(month_txt_builtin(b"Sep", &mut allowed), None);
        assert_eq!(allowed, DE);
    }

    #[test]
    fn custom_lists() {
        let czech = "led úno bře dub kvě čer čec srp zář říj lis pro";
        assert!(is_valid_month_list(czech, true));
        assert_eq!(month_3_custom("Úno".as_bytes(), czech), Some(2));
        assert_eq!(month_3_custom(b"abc", czech), None);

        assert!(!is_valid_month_list("jan feb", false));
        assert!(!is_valid_month_list("janu feb mar apr may jun jul aug sep oct nov dec", true));

        let long = "January February March April May June July August September October November December";
        assert!(is_valid_month_list(long, false));
        assert_eq!(month_txt_custom(b"june", long), Some((6, 4)));
    }
}
