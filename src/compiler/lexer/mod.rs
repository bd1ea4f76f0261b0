pub mod token;
mod remora_lexer;

use self::token::TokenInformation;

/// TokenSource supplies the LL driver with a finite, non-restartable stream
/// of tokens. The stream ends with a single end_of_file token; a None after
/// that means the source is exhausted.
pub trait TokenSource {
    fn next_token(&mut self) -> Option<TokenInformation>;
}

// Concrete Definition Export
pub use self::remora_lexer::RemoraLexer;
