use difference::{Changeset, Difference};

use super::model::Verdict;

/// Line diff from `got` to `expected`: `-` lines are only in the output,
/// `+` lines are only in the expected answer.
pub fn diff(got: &str, expected: &str) -> String {
    let Changeset { diffs, .. } = Changeset::new(got, expected, "\n");

    fn make_diff_line(ln_diff: &Difference) -> String {
        match ln_diff {
            Difference::Same(ln) => "  ".to_owned() + ln,
            Difference::Rem(ln) => "- ".to_owned() + ln,
            Difference::Add(ln) => "+ ".to_owned() + ln,
        }
    }

    diffs
        .iter()
        .map(make_diff_line)
        .collect::<Vec<String>>()
        .join("\n")
}

/// The diff worth showing for a wrong answer. Passing verdicts and verdicts
/// without output have none.
pub fn verdict_diff(verdict: &Verdict) -> Option<String> {
    match (&verdict.actual, verdict.pass) {
        (Some(actual), false) => Some(diff(actual, &verdict.expected)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tester::model::{ExecutionOutcome, TestCase};

    #[test]
    fn test_diff() {
        let s1 = "Hello,\nworld!\nHi!";
        let s2 = "Hello,\nthis cruel\nworld!";
        let d = diff(s1, s2);
        assert_eq!(
            dbg!(d),
            "  \
              Hello,\n\
            + this cruel\n  \
              world!\n\
            - Hi!"
        );
    }

    #[test]
    fn only_wrong_answers_get_a_diff() {
        let case = TestCase::new("3 5", "8");
        let wrong = Verdict::from_outcome(
            0,
            &case,
            ExecutionOutcome::Success {
                output: "-2".into(),
            },
        );
        let d = verdict_diff(&wrong).unwrap();
        assert!(d.contains("- -2"), "{}", d);
        assert!(d.contains("+ 8"), "{}", d);

        let crashed = Verdict::from_outcome(0, &case, ExecutionOutcome::Timeout);
        assert_eq!(verdict_diff(&crashed), None);
    }
}
