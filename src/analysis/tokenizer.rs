use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

/// Standard Unicode tokenizer
#[derive(Clone)]
pub struct StandardTokenizer {
    pub lowercase: bool,
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            lowercase: true,
            max_token_length: 255,
        }
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        // UAX #29 word boundaries; punctuation and whitespace never form a word
        text.unicode_words()
            .filter(|word| word.len() <= self.max_token_length)
            .map(|word| {
                if self.lowercase {
                    Token::new(word.to_lowercase())
                } else {
                    Token::new(word)
                }
            })
            .collect()
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_words_and_drops_punctuation() {
        let tokens = StandardTokenizer::default().tokenize("The cat, the hat.\tDone!");
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["the", "cat", "the", "hat", "done"]);
    }

    #[test]
    fn overlong_tokens_are_skipped() {
        let tokenizer = StandardTokenizer { lowercase: false, max_token_length: 3 };
        let tokens = tokenizer.tokenize("Cat elephant dog");
        let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["Cat", "dog"]);
    }
}
