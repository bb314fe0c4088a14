pub mod alphabetic;
pub mod stopword;
pub mod stemmer;
