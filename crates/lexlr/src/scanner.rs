//! Longest-match tokenization driven by a DFA.

use crate::{
    automaton::{AutomatonError, Dfa, InputClass, StateID},
    parser::Token,
    types::Set,
};
use std::hash::Hash;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("no token matches the input at byte offset {} (found {:?})", offset, found)]
    Unmatched { offset: usize, found: char },

    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}

/// A tokenizer that repeatedly runs a DFA for the longest accepted prefix.
///
/// The output of the accepting state becomes the token payload. Outputs
/// registered as trivia are matched but not reported.
#[derive(Debug)]
pub struct Scanner<'d, C, O, F> {
    dfa: &'d Dfa<C, O>,
    classify: F,
    trivia: Set<O>,
}

impl<'d, C, O, F> Scanner<'d, C, O, F>
where
    C: InputClass,
    O: Clone + Eq + Hash,
    F: Fn(char) -> C,
{
    pub fn new(dfa: &'d Dfa<C, O>, classify: F) -> Self {
        Self {
            dfa,
            classify,
            trivia: Set::default(),
        }
    }

    /// Mark the specified outputs as trivia, such as whitespace and comments.
    pub fn with_trivia<I>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = O>,
    {
        self.trivia.extend(outputs);
        self
    }

    pub fn tokens<'a, 's>(&'a self, input: &'s str) -> Tokens<'a, 's, 'd, C, O, F> {
        Tokens {
            scanner: self,
            input,
            offset: 0,
        }
    }

    /// Tokenize the whole input.
    pub fn scan<'s>(&self, input: &'s str) -> Result<Vec<Token<'s, O>>, ScanError> {
        self.tokens(input).collect()
    }

    // Return the end offset and output of the longest match starting at `start`.
    fn longest_match(&self, input: &str, start: usize) -> Result<Option<(usize, &'d O)>, ScanError> {
        let mut state = StateID::START;
        let mut accepted = None;
        for (i, ch) in input[start..].char_indices() {
            match self.dfa.next(state, (self.classify)(ch))? {
                Some(next) => state = next,
                None => break,
            }
            if let Some(output) = self.dfa.output(state)? {
                accepted = Some((start + i + ch.len_utf8(), output));
            }
        }
        Ok(accepted)
    }
}

/// The iterator returned from [`Scanner::tokens`].
#[derive(Debug)]
pub struct Tokens<'a, 's, 'd, C, O, F> {
    scanner: &'a Scanner<'d, C, O, F>,
    input: &'s str,
    offset: usize,
}

impl<'s, 'd, C, O, F> Iterator for Tokens<'_, 's, 'd, C, O, F>
where
    C: InputClass,
    O: Clone + Eq + Hash,
    F: Fn(char) -> C,
{
    type Item = Result<Token<'s, O>, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset < self.input.len() {
            let start = self.offset;
            let (end, output) = match self.scanner.longest_match(self.input, start) {
                Ok(Some(matched)) => matched,
                Ok(None) => {
                    let found = self.input[start..].chars().next().unwrap_or_default();
                    // stop after reporting
                    self.offset = self.input.len();
                    return Some(Err(ScanError::Unmatched {
                        offset: start,
                        found,
                    }));
                }
                Err(err) => {
                    self.offset = self.input.len();
                    return Some(Err(err));
                }
            };
            self.offset = end;
            if self.scanner.trivia.contains(output) {
                continue;
            }
            tracing::trace!(start, end, "scanned token");
            return Some(Ok(Token::new(&self.input[start..end], output.clone())));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{to_dfa, Nfa, Precedence};

    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    enum Class {
        Digit,
        Plus,
        Space,
        Other,
    }

    fn classify(ch: char) -> Class {
        match ch {
            '0'..='9' => Class::Digit,
            '+' => Class::Plus,
            ' ' | '\n' => Class::Space,
            _ => Class::Other,
        }
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    enum Kind {
        Num,
        Plus,
        Space,
    }

    fn dfa() -> Dfa<Class, Kind> {
        let s = StateID::from_raw;
        let nfa = Nfa::new(4, [Class::Digit, Class::Plus, Class::Space, Class::Other])
            .and_then(|n| n.with_transitions([s(0), s(1)], [s(1)], [Class::Digit]))
            .and_then(|n| n.with_output(s(1), Kind::Num))
            .and_then(|n| n.with_transition(s(0), Class::Plus, s(2)))
            .and_then(|n| n.with_output(s(2), Kind::Plus))
            .and_then(|n| n.with_transitions([s(0), s(3)], [s(3)], [Class::Space]))
            .and_then(|n| n.with_output(s(3), Kind::Space))
            .unwrap();
        to_dfa(&nfa, &Precedence::new()).unwrap()
    }

    #[test]
    fn longest_match_and_trivia() {
        let dfa = dfa();
        let scanner = Scanner::new(&dfa, classify).with_trivia([Kind::Space]);
        let tokens = scanner.scan("12 +  3\n").unwrap();
        assert_eq!(
            tokens,
            [
                Token::new("12", Kind::Num),
                Token::new("+", Kind::Plus),
                Token::new("3", Kind::Num),
            ]
        );
    }

    #[test]
    fn tokens_outlive_the_scanner() {
        fn scan_once<'s>(dfa: &Dfa<Class, Kind>, input: &'s str) -> Vec<Token<'s, Kind>> {
            Scanner::new(dfa, classify)
                .with_trivia([Kind::Space])
                .scan(input)
                .unwrap()
        }

        let dfa = dfa();
        let input = String::from("1+23");
        let tokens = scan_once(&dfa, &input);
        assert_eq!(
            tokens,
            [
                Token::new("1", Kind::Num),
                Token::new("+", Kind::Plus),
                Token::new("23", Kind::Num),
            ]
        );
    }

    #[test]
    fn unmatched_input() {
        let dfa = dfa();
        let scanner = Scanner::new(&dfa, classify);
        let err = scanner.scan("1 +x").unwrap_err();
        assert!(matches!(err, ScanError::Unmatched { offset: 3, found: 'x' }));

        let mut tokens = scanner.tokens("x1");
        assert!(matches!(tokens.next(), Some(Err(ScanError::Unmatched { offset: 0, .. }))));
        assert!(tokens.next().is_none());
    }
}
