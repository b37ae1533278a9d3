//! Subset construction.

use super::{AutomatonError, Dfa, InputClass, Nfa, Precedence, StateID, StateSet};
use crate::types::{Map, Queue, Set};
use std::{fmt, hash::Hash};

#[derive(Debug, thiserror::Error)]
pub enum SubsetError {
    #[error("ambiguous accepting state {nfa_states:?}: outputs {} share the highest precedence", .outputs.join(", "))]
    AmbiguousOutput {
        nfa_states: Vec<StateID>,
        outputs: Vec<String>,
    },

    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}

/// Convert an NFA into an equivalent DFA.
///
/// Each DFA state stands for the epsilon-closed set of NFA states reached
/// by the same input, with DFA state 0 standing for the closure of NFA
/// state 0. When several accepting NFA states end up in one DFA state, the
/// output with the highest precedence wins.
#[tracing::instrument(skip_all)]
pub fn to_dfa<C, O>(nfa: &Nfa<C, O>, precedence: &Precedence<O>) -> Result<Dfa<C, O>, SubsetError>
where
    C: InputClass,
    O: Clone + Eq + Hash + fmt::Debug,
{
    let star = nfa.epsilon_star();
    tracing::debug!(rounds = star.rounds(), "computed epsilon-reachable sets");

    let mut indices: Map<StateSet, StateID> = Map::default();
    let mut pending: Queue<StateSet> = Queue::default();
    let mut transitions: Vec<Map<C, StateID>> = vec![];
    let mut outputs: Map<StateID, O> = Map::default();

    let start = star.of(StateID::START).clone();
    indices.insert(start.clone(), StateID::START);
    pending.push(start);

    while let Some(states) = pending.pop() {
        let current = StateID::from_index(transitions.len());

        let candidates: Vec<&O> = nfa.outputs_of(&states).collect();
        match precedence.resolve(&candidates) {
            Ok(Some(output)) => {
                outputs.insert(current, output.clone());
            }
            Ok(None) => (),
            Err(tied) => {
                return Err(SubsetError::AmbiguousOutput {
                    nfa_states: states
                        .iter()
                        .filter(|&s| matches!(nfa.output(s), Ok(Some(_))))
                        .collect(),
                    outputs: tied.into_iter().map(|o| format!("{:?}", o)).collect(),
                });
            }
        }

        let mut moves: Map<C, StateSet> = Map::default();
        for state in states.iter() {
            for (class, targets) in nfa.row(state)? {
                moves.entry(class).or_default().union_with(targets);
            }
        }

        let mut row = Map::default();
        for (class, targets) in moves {
            let closed = star.closure(&targets);
            let next = match indices.get(&closed) {
                Some(&next) => next,
                None => {
                    let next = StateID::from_index(indices.len());
                    tracing::trace!(state = %next, nfa_states = %closed, "new DFA state");
                    indices.insert(closed.clone(), next);
                    pending.push(closed);
                    next
                }
            };
            row.insert(class, next);
        }
        transitions.push(row);
    }

    let alphabet: Set<C> = nfa.alphabet().clone();
    tracing::debug!(num_states = transitions.len(), "subset construction finished");
    Ok(Dfa::from_parts(alphabet, transitions, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(raw: u32) -> StateID {
        StateID::from_raw(raw)
    }

    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    enum Class {
        Letter,
        Digit,
    }

    fn classify(c: char) -> Class {
        if c.is_ascii_digit() {
            Class::Digit
        } else {
            Class::Letter
        }
    }

    // 0 -ε-> 1 (keyword "ab"), 0 -ε-> 4 (identifier [a-z]+), 0 -ε-> 6 (number [0-9]+)
    // Letters are split into the classes 'a', 'b' and other.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    enum Ch {
        A,
        B,
        Other,
        Digit,
    }

    fn ch(c: char) -> Ch {
        match c {
            'a' => Ch::A,
            'b' => Ch::B,
            c if c.is_ascii_digit() => Ch::Digit,
            _ => Ch::Other,
        }
    }

    fn lexer_nfa() -> Nfa<Ch, &'static str> {
        let letters = [Ch::A, Ch::B, Ch::Other];
        Nfa::new(8, [Ch::A, Ch::B, Ch::Other, Ch::Digit])
            .and_then(|n| n.with_epsilon(s(0), s(1)))
            .and_then(|n| n.with_epsilon(s(0), s(4)))
            .and_then(|n| n.with_epsilon(s(0), s(6)))
            .and_then(|n| n.with_transition(s(1), Ch::A, s(2)))
            .and_then(|n| n.with_transition(s(2), Ch::B, s(3)))
            .and_then(|n| n.with_output(s(3), "KW_AB"))
            .and_then(|n| n.with_transitions([s(4), s(5)], [s(5)], letters))
            .and_then(|n| n.with_output(s(5), "IDENT"))
            .and_then(|n| n.with_transitions([s(6), s(7)], [s(7)], [Ch::Digit]))
            .and_then(|n| n.with_output(s(7), "NUMBER"))
            .unwrap()
    }

    fn keywords_first() -> Precedence<&'static str> {
        Precedence::new().level(["KW_AB"]).unwrap()
    }

    #[test]
    fn start_state_is_closure_of_nfa_start() {
        let nfa = Nfa::<Class, ()>::new(3, [Class::Letter])
            .and_then(|n| n.with_epsilon(s(0), s(2)))
            .and_then(|n| n.with_output(s(2), ()))
            .unwrap();
        let dfa = to_dfa(&nfa, &Precedence::new()).unwrap();
        assert_eq!(dfa.num_states(), 1);
        assert_eq!(dfa.output(StateID::START).unwrap(), Some(&()));
        assert_eq!(dfa.run("".chars(), classify).unwrap(), Some(&()));
    }

    #[test]
    fn keyword_outranks_identifier() {
        let dfa = to_dfa(&lexer_nfa(), &keywords_first()).unwrap();
        assert_eq!(dfa.run("ab".chars(), ch).unwrap(), Some(&"KW_AB"));
        assert_eq!(dfa.run("abc".chars(), ch).unwrap(), Some(&"IDENT"));
        assert_eq!(dfa.run("a".chars(), ch).unwrap(), Some(&"IDENT"));
        assert_eq!(dfa.run("042".chars(), ch).unwrap(), Some(&"NUMBER"));
        assert_eq!(dfa.run("a1".chars(), ch).unwrap(), None);
    }

    #[test]
    fn tie_is_an_error() {
        let err = to_dfa(&lexer_nfa(), &Precedence::new()).unwrap_err();
        match err {
            SubsetError::AmbiguousOutput {
                nfa_states,
                outputs,
            } => {
                assert_eq!(nfa_states, [s(3), s(5)]);
                assert_eq!(outputs, ["\"KW_AB\"", "\"IDENT\""]);
            }
            err => panic!("unexpected error: {}", err),
        }

        let same_level = Precedence::new().level(["KW_AB", "IDENT"]).unwrap();
        assert!(matches!(
            to_dfa(&lexer_nfa(), &same_level),
            Err(SubsetError::AmbiguousOutput { .. })
        ));
    }

    #[test]
    fn one_transition_per_defined_class() {
        let nfa = lexer_nfa();
        let dfa = to_dfa(&nfa, &keywords_first()).unwrap();
        let start = nfa.epsilon_star();
        let start = start.get(StateID::START).unwrap();
        let mut classes: Vec<Ch> = vec![];
        for state in start.iter() {
            for (class, _) in nfa.row(state).unwrap() {
                if !classes.contains(&class) {
                    classes.push(class);
                }
            }
        }
        let mut dfa_classes: Vec<Ch> = dfa
            .transitions(StateID::START)
            .unwrap()
            .map(|(class, _)| class)
            .collect();
        classes.sort_by_key(|c| *c as u8);
        dfa_classes.sort_by_key(|c| *c as u8);
        assert_eq!(classes, dfa_classes);
    }

    #[test]
    fn agrees_with_nfa_simulation() {
        let nfa = lexer_nfa();
        let dfa = to_dfa(&nfa, &keywords_first()).unwrap();
        let prec = keywords_first();
        for input in ["", "a", "b", "ab", "aba", "ba", "x", "1", "12", "1a", "a1", "abab"] {
            let reached = nfa.run(input.chars(), ch).unwrap();
            let candidates: Vec<_> = nfa.outputs_of(&reached).collect();
            let expected = prec.resolve(&candidates).unwrap();
            assert_eq!(dfa.run(input.chars(), ch).unwrap(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn states_are_deduplicated() {
        // (a|b)*
        let nfa = Nfa::new(2, ['a', 'b'])
            .and_then(|n| n.with_epsilon(s(0), s(1)))
            .and_then(|n| n.with_transitions([s(1)], [s(0)], ['a', 'b']))
            .and_then(|n| n.with_output(s(1), "any"))
            .unwrap();
        let dfa = to_dfa(&nfa, &Precedence::new()).unwrap();
        assert_eq!(dfa.num_states(), 1);
        assert_eq!(dfa.next(s(0), 'a').unwrap(), Some(s(0)));
        assert_eq!(dfa.run("abba".chars(), |c| c).unwrap(), Some(&"any"));
    }
}
