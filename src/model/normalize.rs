// Text normalization: the canonical form every other stage builds on.
//
// Both the fingerprint and the keyword matcher consume this output, so it
// must stay pure and deterministic: no locale tables, no OS collation.
use unicode_normalization::UnicodeNormalization;

/// Fixed Spanish stop-word list: articles, prepositions, common pronouns and
/// auxiliary verb forms. Order is irrelevant; membership is what matters.
const STOPWORDS_ES: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "unos", "unas", "de", "del", "al", "a", "en", "con",
    "por", "para", "que", "es", "y", "o", "pero", "si", "no", "me", "te", "se", "lo", "le", "su",
    "mi", "tu", "este", "ese", "aquel", "esta", "esa", "aquella", "muy", "mas", "menos", "como",
    "cuando", "donde", "quien", "cual", "hay", "he", "ha", "hemos", "han", "ser", "estar",
    "tener", "hacer", "ir", "voy", "va", "vamos", "van", "tengo", "tiene", "tienen", "hago",
    "hace", "hacen", "soy", "eres", "somos", "son", "estoy", "estas", "estamos", "estan",
];

pub const KEYWORD_MIN_LENGTH: usize = 3;
pub const KEYWORD_MAX_COUNT: usize = 10;

/// Lowercases and strips diacritical marks (NFD decomposition, combining
/// marks dropped). Punctuation survives; `normalize` removes it.
///
/// The date/time extractor matches against this form so that patterns like
/// "19:30" or "a.m." keep their punctuation.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Canonical text form: folded, punctuation replaced by spaces, whitespace
/// collapsed, trimmed.
pub fn normalize(text: &str) -> String {
    let folded = fold(text);
    let spaced: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ordered keyword set: tokens of the canonical form, minus stop words and
/// short tokens, deduplicated preserving first occurrence, truncated.
pub fn extract_keywords(text: &str, min_length: usize, max_keywords: usize) -> Vec<String> {
    let normalized = normalize(text);
    let mut seen = Vec::new();
    for token in normalized.split(' ') {
        if token.chars().count() < min_length || STOPWORDS_ES.contains(&token) {
            continue;
        }
        if !seen.iter().any(|t| t == token) {
            seen.push(token.to_string());
        }
        if seen.len() == max_keywords {
            break;
        }
    }
    seen
}

/// Keyword extraction with the default limits used across the pipeline.
pub fn keywords(text: &str) -> Vec<String> {
    extract_keywords(text, KEYWORD_MIN_LENGTH, KEYWORD_MAX_COUNT)
}

pub fn remove_stopwords(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| !STOPWORDS_ES.contains(&t.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_punctuation() {
        assert_eq!(normalize("¡Mañana REUNIÓN, a las 10!"), "manana reunion a las 10");
    }

    #[test]
    fn test_fold_keeps_punctuation() {
        assert_eq!(fold("Mañana 19:30 p.m."), "manana 19:30 p.m.");
    }

    #[test]
    fn test_keywords_drop_stopwords_and_short_tokens() {
        let kws = keywords("voy a la reunión de equipo en el club");
        assert_eq!(kws, vec!["reunion", "equipo", "club"]);
    }

    #[test]
    fn test_keywords_dedup_preserves_first_seen_order() {
        let kws = keywords("cena cena familiar amigos amigos cena");
        assert_eq!(kws, vec!["cena", "familiar", "amigos"]);
    }

    #[test]
    fn test_keywords_truncate_to_max() {
        let text = "alfa bravo charlie delta echo foxtrot golf hotel india juliett kilo lima";
        assert_eq!(extract_keywords(text, 3, 10).len(), 10);
    }

    #[test]
    fn test_keywords_are_deterministic() {
        let text = "Cita médica miércoles 10:30 hospital";
        assert_eq!(keywords(text), keywords(text));
    }
}
