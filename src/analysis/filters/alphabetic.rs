use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Drops tokens containing anything but alphabetic characters
pub struct AlphabeticFilter;

impl TokenFilter for AlphabeticFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .filter(Token::is_alphabetic)
            .collect()
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(AlphabeticFilter)
    }
}
