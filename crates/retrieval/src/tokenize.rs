use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("valid tokenizer regex"));

pub fn tokenize(input: &str) -> Vec<String> {
    let lowered = input.to_lowercase();

    WORD.find_iter(&lowered)
        .map(|token| token.as_str().to_string())
        .collect()
}
