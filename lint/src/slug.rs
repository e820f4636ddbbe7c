//! Heading text to URL-safe identifiers.
//!
//! The transform runs in fixed stages:
//!
//! 1. symbol replacements (`&` → `and`, `♥` → `love`, `🦄` → `unicorn`)
//! 2. English contractions lose their apostrophe (`it's` → `its`)
//! 3. letters are folded to ASCII: a table covers Cyrillic, Greek and the
//!    Latin letters with no decomposition (`ж` → `zh`, `ß` → `ss`), then NFKD
//!    with combining marks removed handles accents; any other non-ASCII
//!    character becomes a separator
//! 4. camel case is split (`fooBar` → `foo Bar`, `XMLHttp` → `XML Http`),
//!    but a plural acronym stays whole (`APIs`)
//! 5. every run of non-alphanumerics becomes a single `-`, the ends are
//!    trimmed and the result is lowercased

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

const REPLACEMENTS: &[(char, &str)] = &[('&', " and "), ('♥', " love "), ('🦄', " unicorn ")];

const TRANSLITERATIONS: &[(char, &str)] = &[
    ('ß', "ss"),
    ('ẞ', "SS"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('ø', "o"),
    ('Ø', "O"),
    ('đ', "d"),
    ('Đ', "D"),
    ('ł', "l"),
    ('Ł', "L"),
    ('œ', "oe"),
    ('Œ', "OE"),
    ('þ', "th"),
    ('Þ', "TH"),
    // Cyrillic
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "g"),
    ('д', "d"),
    ('е', "e"),
    ('ё', "yo"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "i"),
    ('й', "j"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "h"),
    ('ц', "cz"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "shh"),
    ('ъ', ""),
    ('ы', "y"),
    ('ь', ""),
    ('э', "e"),
    ('ю', "yu"),
    ('я', "ya"),
    ('є', "ye"),
    ('і', "i"),
    ('ї', "yi"),
    ('ґ', "g"),
    ('А', "A"),
    ('Б', "B"),
    ('В', "V"),
    ('Г', "G"),
    ('Д', "D"),
    ('Е', "E"),
    ('Ё', "Yo"),
    ('Ж', "Zh"),
    ('З', "Z"),
    ('И', "I"),
    ('Й', "J"),
    ('К', "K"),
    ('Л', "L"),
    ('М', "M"),
    ('Н', "N"),
    ('О', "O"),
    ('П', "P"),
    ('Р', "R"),
    ('С', "S"),
    ('Т', "T"),
    ('У', "U"),
    ('Ф', "F"),
    ('Х', "H"),
    ('Ц', "Cz"),
    ('Ч', "Ch"),
    ('Ш', "Sh"),
    ('Щ', "Shh"),
    ('Ъ', ""),
    ('Ы', "Y"),
    ('Ь', ""),
    ('Э', "E"),
    ('Ю', "Yu"),
    ('Я', "Ya"),
    ('Є', "Ye"),
    ('І', "I"),
    ('Ї', "Yi"),
    ('Ґ', "G"),
    // Greek, accents are stripped by NFKD first
    ('α', "a"),
    ('β', "b"),
    ('γ', "g"),
    ('δ', "d"),
    ('ε', "e"),
    ('ζ', "z"),
    ('η', "h"),
    ('θ', "8"),
    ('ι', "i"),
    ('κ', "k"),
    ('λ', "l"),
    ('μ', "m"),
    ('ν', "n"),
    ('ξ', "3"),
    ('ο', "o"),
    ('π', "p"),
    ('ρ', "r"),
    ('σ', "s"),
    ('ς', "s"),
    ('τ', "t"),
    ('υ', "y"),
    ('φ', "f"),
    ('χ', "x"),
    ('ψ', "4"),
    ('ω', "w"),
    ('Α', "A"),
    ('Β', "B"),
    ('Γ', "G"),
    ('Δ', "D"),
    ('Ε', "E"),
    ('Ζ', "Z"),
    ('Η', "H"),
    ('Θ', "8"),
    ('Ι', "I"),
    ('Κ', "K"),
    ('Λ', "L"),
    ('Μ', "M"),
    ('Ν', "N"),
    ('Ξ', "3"),
    ('Ο', "O"),
    ('Π', "P"),
    ('Ρ', "R"),
    ('Σ', "S"),
    ('Τ', "T"),
    ('Υ', "Y"),
    ('Φ', "F"),
    ('Χ', "X"),
    ('Ψ', "4"),
    ('Ω', "W"),
];

const SEPARATOR: char = '-';

/// Derive a slug from arbitrary text. Returns an empty string when the text
/// has no letters or digits.
pub fn slugify(text: &str) -> String {
    let replaced = replace_symbols(text);
    let contracted = drop_contractions(&replaced);
    let folded = ascii_fold(&contracted);
    let spaced = decamelize(&folded);

    let mut slug = String::with_capacity(spaced.len());
    let mut pending_separator = false;
    for c in spaced.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push(SEPARATOR);
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    slug
}

fn replace_symbols(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match REPLACEMENTS.iter().find(|(symbol, _)| *symbol == c) {
            Some((_, replacement)) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

fn is_apostrophe(c: char) -> bool {
    c == '\'' || c == '\u{2019}'
}

/// `word's` and `don't` keep their letters; other apostrophes separate.
fn drop_contractions(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if is_apostrophe(c) {
            let after_word = i > 0 && chars[i - 1].is_alphanumeric();
            let suffix = chars.get(i + 1).is_some_and(|&n| matches!(n, 's' | 't' | 'S' | 'T'));
            let word_ends = chars.get(i + 2).is_none_or(|&n| !n.is_alphanumeric());
            if after_word && suffix && word_ends {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn transliterate(c: char) -> Option<&'static str> {
    TRANSLITERATIONS
        .iter()
        .find(|(letter, _)| *letter == c)
        .map(|(_, ascii)| *ascii)
}

/// The table is consulted before decomposition (`й` is not `и` + breve)
/// and again after it (`έ` is `ε` + accent).
fn ascii_fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some(ascii) = transliterate(c) {
            out.push_str(ascii);
            continue;
        }
        for d in c.nfkd() {
            if is_combining_mark(d) {
                continue;
            }
            if d.is_ascii() {
                out.push(d);
            } else if let Some(ascii) = transliterate(d) {
                out.push_str(ascii);
            } else {
                out.push(' ');
            }
        }
    }
    out
}

/// Insert spaces at case boundaries. Input is ASCII at this point.
fn decamelize(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut upper_run = 0usize;

    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();

        let boundary = if c.is_ascii_uppercase() {
            match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                // `XMLHttp` splits before `Http`; `APIs` keeps its plural `s`.
                Some(p) if p.is_ascii_uppercase() => {
                    next.is_some_and(|n| n.is_ascii_lowercase() && n != 's')
                }
                _ => false,
            }
        } else if c.is_ascii_digit() {
            upper_run >= 2
        } else {
            false
        };

        if boundary {
            out.push(' ');
        }
        out.push(c);

        upper_run = if c.is_ascii_uppercase() { upper_run + 1 } else { 0 };
    }
    out
}
