//! Nondeterministic finite automata with epsilon moves.

use super::{check_class, check_state, make_alphabet, AutomatonError, InputClass, StateID, StateSet};
use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

#[derive(Debug, Clone)]
pub struct Nfa<C, O> {
    alphabet: Set<C>,
    // transitions[s][c] is never empty.
    transitions: Vec<Map<C, StateSet>>,
    epsilons: Vec<StateSet>,
    outputs: Map<StateID, O>,
}

impl<C, O> Nfa<C, O>
where
    C: InputClass,
{
    /// Create an automaton with `num_states` blank states.
    pub fn new<I>(num_states: usize, alphabet: I) -> Result<Self, AutomatonError>
    where
        I: IntoIterator<Item = C>,
    {
        if num_states == 0 {
            return Err(AutomatonError::NoStates);
        }
        Ok(Self {
            alphabet: make_alphabet(alphabet)?,
            transitions: vec![Map::default(); num_states],
            epsilons: vec![StateSet::new(); num_states],
            outputs: Map::default(),
        })
    }

    pub fn num_states(&self) -> usize {
        self.transitions.len()
    }

    pub fn alphabet(&self) -> &Set<C> {
        &self.alphabet
    }

    /// Add a transition `from --class--> to`.
    pub fn with_transition(
        mut self,
        from: StateID,
        class: C,
        to: StateID,
    ) -> Result<Self, AutomatonError> {
        check_state(self.num_states(), from)?;
        check_state(self.num_states(), to)?;
        check_class(&self.alphabet, &class)?;
        self.transitions[from.index()]
            .entry(class)
            .or_default()
            .insert(to);
        Ok(self)
    }

    /// Add a transition for every combination of source state, target state and input class.
    pub fn with_transitions<F, T, K>(
        mut self,
        froms: F,
        tos: T,
        classes: K,
    ) -> Result<Self, AutomatonError>
    where
        F: IntoIterator<Item = StateID>,
        T: IntoIterator<Item = StateID>,
        K: IntoIterator<Item = C>,
    {
        let tos: Vec<_> = tos.into_iter().collect();
        let classes: Vec<_> = classes.into_iter().collect();
        for from in froms {
            for &class in &classes {
                for &to in &tos {
                    self = self.with_transition(from, class, to)?;
                }
            }
        }
        Ok(self)
    }

    /// Add an epsilon move `from --> to`.
    pub fn with_epsilon(mut self, from: StateID, to: StateID) -> Result<Self, AutomatonError> {
        check_state(self.num_states(), from)?;
        check_state(self.num_states(), to)?;
        self.epsilons[from.index()].insert(to);
        Ok(self)
    }

    /// Mark `state` as accepting with the specified output.
    pub fn with_output(mut self, state: StateID, output: O) -> Result<Self, AutomatonError> {
        check_state(self.num_states(), state)?;
        self.outputs.insert(state, output);
        Ok(self)
    }

    /// Replace the whole accepting-state labelling.
    pub fn with_outputs<P, I>(self, outputs: I) -> Result<Nfa<C, P>, AutomatonError>
    where
        I: IntoIterator<Item = (StateID, P)>,
    {
        let mut new_outputs = Map::default();
        for (state, output) in outputs {
            check_state(self.num_states(), state)?;
            new_outputs.insert(state, output);
        }
        Ok(Nfa {
            alphabet: self.alphabet,
            transitions: self.transitions,
            epsilons: self.epsilons,
            outputs: new_outputs,
        })
    }

    /// Convert every output with `f`.
    pub fn map_outputs<P, F>(self, mut f: F) -> Nfa<C, P>
    where
        F: FnMut(O) -> P,
    {
        Nfa {
            alphabet: self.alphabet,
            transitions: self.transitions,
            epsilons: self.epsilons,
            outputs: self.outputs.into_iter().map(|(s, o)| (s, f(o))).collect(),
        }
    }

    /// Renumber every state by `+k`, leaving the lowest `k` states blank.
    pub fn shift(self, k: usize) -> Self {
        if k == 0 {
            return self;
        }
        let mut transitions = vec![Map::default(); k];
        transitions.extend(self.transitions.into_iter().map(|row| {
            row.into_iter()
                .map(|(class, targets)| (class, targets.shifted(k)))
                .collect()
        }));
        let mut epsilons = vec![StateSet::new(); k];
        epsilons.extend(self.epsilons.iter().map(|targets| targets.shifted(k)));
        Self {
            alphabet: self.alphabet,
            transitions,
            epsilons,
            outputs: self
                .outputs
                .into_iter()
                .map(|(s, o)| (s.shifted(k), o))
                .collect(),
        }
    }

    /// Insert `k` blank states in front of the existing ones.
    pub fn prepend_states(self, k: usize) -> Self {
        self.shift(k)
    }

    /// Add `k` blank states after the existing ones.
    pub fn append_states(mut self, k: usize) -> Self {
        let n = self.num_states() + k;
        self.transitions.resize_with(n, Map::default);
        self.epsilons.resize_with(n, StateSet::new);
        self
    }

    /// Place the states of `other` after the states of `self`.
    ///
    /// The states of `other` are renumbered by `self.num_states()`, and the
    /// alphabets, transitions and outputs of both automata are combined.
    pub fn merge(mut self, other: Self) -> Self {
        let other = other.shift(self.num_states());
        let n = self.num_states();
        self.alphabet.extend(other.alphabet);
        self.transitions
            .extend(other.transitions.into_iter().skip(n));
        self.epsilons.extend(other.epsilons.into_iter().skip(n));
        self.outputs.extend(other.outputs);
        self
    }

    /// Return the targets of `state` on `class`.
    pub fn transitions(&self, state: StateID, class: C) -> Result<Option<&StateSet>, AutomatonError> {
        check_state(self.num_states(), state)?;
        check_class(&self.alphabet, &class)?;
        Ok(self.transitions[state.index()].get(&class))
    }

    /// Return the outgoing transitions of `state`.
    pub fn row(&self, state: StateID) -> Result<impl Iterator<Item = (C, &StateSet)> + '_, AutomatonError> {
        check_state(self.num_states(), state)?;
        Ok(self.transitions[state.index()]
            .iter()
            .map(|(class, targets)| (*class, targets)))
    }

    /// Return the direct epsilon successors of `state`.
    pub fn epsilons(&self, state: StateID) -> Result<&StateSet, AutomatonError> {
        check_state(self.num_states(), state)?;
        Ok(&self.epsilons[state.index()])
    }

    /// Return the output of `state`, if it is accepting.
    pub fn output(&self, state: StateID) -> Result<Option<&O>, AutomatonError> {
        check_state(self.num_states(), state)?;
        Ok(self.outputs.get(&state))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (StateID, &O)> + '_ {
        self.outputs.iter().map(|(s, o)| (*s, o))
    }

    /// Compute the epsilon-reachable set of every state.
    #[tracing::instrument(skip_all)]
    pub fn epsilon_star(&self) -> EpsilonStar {
        let mut sets: Vec<StateSet> = self
            .epsilons
            .iter()
            .enumerate()
            .map(|(i, targets)| {
                let mut set = targets.clone();
                set.insert(StateID::from_index(i));
                set
            })
            .collect();

        let mut total: usize = sets.iter().map(StateSet::len).sum();
        let mut rounds = 0;
        loop {
            rounds += 1;
            for i in 0..sets.len() {
                let mut reached = sets[i].clone();
                for j in sets[i].iter() {
                    if j.index() != i {
                        reached.union_with(&sets[j.index()]);
                    }
                }
                sets[i] = reached;
            }

            let new_total = sets.iter().map(StateSet::len).sum();
            tracing::trace!(rounds, total = new_total, "relaxed epsilon-reachable sets");
            if new_total == total {
                break;
            }
            total = new_total;
        }

        EpsilonStar { sets, rounds }
    }

    /// Simulate the automaton and return the set of states reached after reading `input`.
    pub fn run<T, I, F>(&self, input: I, mut classify: F) -> Result<StateSet, AutomatonError>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> C,
    {
        let star = self.epsilon_star();
        let mut current = star.of(StateID::START).clone();
        for value in input {
            let class = classify(value);
            check_class(&self.alphabet, &class)?;
            let mut moved = StateSet::new();
            for state in current.iter() {
                if let Some(targets) = self.transitions[state.index()].get(&class) {
                    moved.union_with(targets);
                }
            }
            current = star.closure(&moved);
        }
        Ok(current)
    }

    /// Return the outputs of the accepting states in `states`.
    pub fn outputs_of<'a>(&'a self, states: &'a StateSet) -> impl Iterator<Item = &'a O> + 'a {
        states.iter().filter_map(|s| self.outputs.get(&s))
    }
}

impl<C, O> Nfa<C, O>
where
    C: InputClass,
    O: fmt::Debug,
{
    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            for (i, (row, epsilons)) in self.transitions.iter().zip(&self.epsilons).enumerate() {
                let state = StateID::from_index(i);
                write!(f, "{}", state)?;
                if let Some(output) = self.outputs.get(&state) {
                    write!(f, " => {:?}", output)?;
                }
                writeln!(f)?;
                for (class, targets) in row {
                    writeln!(f, "  - {:?} -> {}", class, targets)?;
                }
                if !epsilons.is_empty() {
                    writeln!(f, "  - ε -> {}", epsilons)?;
                }
            }
            Ok(())
        })
    }
}

/// The epsilon-reachable sets of all states of an automaton.
#[derive(Debug, Clone)]
pub struct EpsilonStar {
    sets: Vec<StateSet>,
    rounds: usize,
}

impl EpsilonStar {
    /// Return the states reachable from `state` through epsilon moves, including itself.
    pub fn get(&self, state: StateID) -> Option<&StateSet> {
        self.sets.get(state.index())
    }

    pub(crate) fn of(&self, state: StateID) -> &StateSet {
        &self.sets[state.index()]
    }

    /// Return the union of the epsilon-reachable sets of `states`.
    pub fn closure(&self, states: &StateSet) -> StateSet {
        let mut closed = StateSet::new();
        for state in states.iter() {
            closed.union_with(self.of(state));
        }
        closed
    }

    /// Return the number of relaxation rounds that were needed.
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}
