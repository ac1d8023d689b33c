//! Tokenization, stemming and edit distance
//!
//! The indexed corpus is predominantly Russian, so stemming is a fixed
//! suffix-stripping pass over known Russian endings rather than a full
//! Porter/Snowball implementation. Latin words pass through mostly
//! unchanged, which is the desired behavior for product names and
//! identifiers.

/// Russian endings tried in order; the first match is stripped.
///
/// Order matters: longer inflectional endings come before the single-vowel
/// ones so that e.g. "настройками" loses "ями" and not just "и".
const RU_ENDINGS: [&str; 54] = [
    "ами", "ями", "ого", "его", "ому", "ему", "ыми", "ими", "ать", "ять",
    "ить", "ение", "ания", "ство", "ость", "ной", "ный", "ная", "ное",
    "ых", "их", "ой", "ий", "ый", "ая", "яя", "ое", "ее", "ие",
    "ам", "ям", "ом", "ем", "ов", "ев", "ей", "ах", "ях",
    "ть", "ся", "ут", "ют", "ат", "ят", "ет", "ит",
    "а", "я", "о", "е", "и", "ы", "у", "ю",
];

/// Split text into lowercase words.
///
/// Every non-alphanumeric character acts as a separator; words shorter than
/// two characters are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Reduce a word to its stem.
///
/// Words shorter than four characters are left alone, and an ending is only
/// stripped when at least two characters remain.
pub fn stem(word: &str) -> String {
    let word_len = word.chars().count();
    if word_len < 4 {
        return word.to_string();
    }

    for ending in RU_ENDINGS {
        let ending_len = ending.chars().count();
        if word_len - ending_len >= 2 {
            if let Some(stripped) = word.strip_suffix(ending) {
                return stripped.to_string();
            }
        }
    }
    word.to_string()
}

/// Levenshtein edit distance between two words, in characters
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=a.len()).collect();
    let mut current = vec![0usize; a.len() + 1];

    for (i, bc) in b.iter().enumerate() {
        current[0] = i + 1;
        for (j, ac) in a.iter().enumerate() {
            current[j + 1] = if ac == bc {
                prev[j]
            } else {
                prev[j].min(current[j]).min(prev[j + 1]) + 1
            };
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[a.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("Hello, World! x 42"),
            vec!["hello", "world", "42"]
        );
    }

    #[test]
    fn test_tokenize_handles_cyrillic() {
        assert_eq!(
            tokenize("Настройка СИСТЕМЫ"),
            vec!["настройка", "системы"]
        );
    }

    #[test]
    fn test_short_words_are_not_stemmed() {
        assert_eq!(stem("дом"), "дом");
        assert_eq!(stem("он"), "он");
    }

    #[test]
    fn test_stem_strips_known_endings() {
        assert_eq!(stem("настройками"), "настройк");
        assert_eq!(stem("пользователя"), "пользовател");
        // Single-vowel endings at the tail of the table still apply
        assert_eq!(stem("дому"), "дом");
        assert_eq!(stem("окны"), "окн");
    }

    #[test]
    fn test_stem_keeps_at_least_two_characters() {
        // "ами" would leave only one character of "мами", so the shorter
        // ending "и" applies instead
        assert_eq!(stem("мами"), "мам");
        assert_eq!(stem("юга"), "юга");
    }

    #[test]
    fn test_stemming_is_idempotent_on_common_forms() {
        for word in ["настройками", "документов", "пользователя", "возможность"] {
            let once = stem(word);
            assert_eq!(stem(&once), once, "restemming {word} changed the stem");
        }
    }

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("поиск", "поиск"), 0);
        assert_eq!(levenshtein("поиск", "писк"), 1);
    }
}
