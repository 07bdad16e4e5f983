use std::fmt;

use serde::{Deserialize, Serialize};

/// One run of a candidate's text, tagged with whether it matched the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub is_match: bool,
}

/// A candidate's text split into alternating unmatched/matched runs.
///
/// Even positions are unmatched and odd positions are matched. When the text
/// begins with a match, an empty unmatched run is kept at position 0 so that
/// parity always gives the match status. Adjacent runs never share a status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpans(Vec<String>);

impl MatchSpans {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a run, coalescing it into the previous one if the status agrees.
    pub fn append(&mut self, text: &str, is_match: bool) {
        if text.is_empty() {
            return;
        }

        // The next slot's parity already says "match" for odd and "no match"
        // for even. If it disagrees with is_match, the text belongs to the
        // previous run.
        let next_is_match = self.0.len() % 2 == 1;
        if next_is_match == is_match {
            self.0.push(text.to_string());
            return;
        }

        match self.0.last_mut() {
            Some(last) => last.push_str(text),
            None => {
                self.0.push(String::new());
                self.0.push(text.to_string());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw runs. Parity of the index gives the match status.
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Iterate the runs with their match status, skipping the empty leading run.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_empty())
            .map(|(i, t)| Span {
                text: t.clone(),
                is_match: i % 2 == 1,
            })
    }

    /// Whether any run matched.
    pub fn has_match(&self) -> bool {
        self.0.len() > 1
    }

    /// The full candidate text.
    pub fn text(&self) -> String {
        self.0.concat()
    }
}

/// Renders matched runs wrapped in asterisks, e.g. `Washington *Squ*are Park`.
impl fmt::Display for MatchSpans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.0.iter().enumerate() {
            if i % 2 == 1 {
                write!(f, "*{}*", t)?;
            } else {
                f.write_str(t)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_leading_match_keeps_empty_run() {
        let mut s = MatchSpans::new();
        s.append("Park", true);
        s.append(" Ave", false);
        assert_eq!(s.parts(), &["", "Park", " Ave"]);
        assert_eq!(s.to_string(), "*Park* Ave");
    }

    #[test]
    fn test_coalesce_same_status() {
        let mut s = MatchSpans::new();
        s.append("Wash", false);
        s.append("ington ", false);
        s.append("Squ", true);
        s.append("", true);
        s.append("are", false);
        assert_eq!(s.parts(), &["Washington ", "Squ", "are"]);
    }

    #[test]
    fn test_no_match() {
        let mut s = MatchSpans::new();
        s.append("Union Square", false);
        assert_eq!(s.parts(), &["Union Square"]);
        assert!(!s.has_match());
        assert_eq!(s.spans().count(), 1);
    }

    proptest! {
        #[test]
        fn prop_alternation_and_concat(runs in prop::collection::vec(("[a-z ]{0,4}", any::<bool>()), 0..20)) {
            let mut s = MatchSpans::new();
            let mut want = String::new();
            for (text, m) in &runs {
                s.append(text, *m);
                want.push_str(text);
            }

            prop_assert_eq!(s.text(), want);

            // Only position 0 may be empty, and only when a match follows it.
            for (i, part) in s.parts().iter().enumerate() {
                if i > 0 {
                    prop_assert!(!part.is_empty());
                }
            }

            // Parity gives the status of every run, so no two adjacent runs
            // can share one. Check it against the input directly.
            let spans: Vec<Span> = s.spans().collect();
            for w in spans.windows(2) {
                prop_assert_ne!(w[0].is_match, w[1].is_match);
            }
        }
    }
}
