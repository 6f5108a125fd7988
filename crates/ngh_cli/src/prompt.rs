//! Interactive conflict prompts.

use ngh_core::{ConflictKind, Decision, DecisionProvider};
use std::io::{self, BufRead, Write};

/// Asks the user on a terminal, one line per answer.
///
/// Only the first character of an answer counts, in any case. Unknown
/// answers repeat the question. End of input keeps the local side and
/// refuses confirmations.
pub struct ConsolePrompt<I, O> {
    input: I,
    output: O,
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process terminal.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<I: BufRead, O: Write> ConsolePrompt<I, O> {
    /// Prompt over arbitrary streams.
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }

    /// Shows `question` once and returns the answer line, trimmed.
    ///
    /// `None` at end of input.
    pub fn ask_line(&mut self, question: &str) -> Option<String> {
        write!(self.output, "{question} ").ok()?;
        self.output.flush().ok()?;
        let mut line = String::new();
        if self.input.read_line(&mut line).ok()? == 0 {
            return None;
        }
        Some(line.trim().to_string())
    }

    /// Shows `question` until one of `allowed` is answered.
    fn ask(&mut self, question: &str, allowed: &[char]) -> Option<char> {
        loop {
            // A broken terminal is treated like end of input.
            write!(self.output, "{question} ").ok()?;
            self.output.flush().ok()?;

            let mut line = String::new();
            if self.input.read_line(&mut line).ok()? == 0 {
                return None;
            }
            if let Some(key) = line.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
                if allowed.contains(&key) {
                    return Some(key);
                }
            }
        }
    }
}

impl<I: BufRead, O: Write> DecisionProvider for ConsolePrompt<I, O> {
    fn decide(&mut self, kind: ConflictKind, path: &str) -> Decision {
        let (question, take_remote, keep_local) = match kind {
            ConflictKind::BothModified => (
                format!("{path} was modified both locally and remotely.\nDo you want to keep the [L]ocal version or to overwrite it with the [R]emote version?"),
                'R',
                'L',
            ),
            ConflictKind::ModifiedRemotelyDeletedLocally => (
                format!("{path} was modified remotely but deleted locally.\nDo you want to keep the file [D]eleted or to download the [R]emote version?"),
                'R',
                'D',
            ),
            ConflictKind::DeletedRemotelyModifiedLocally => (
                format!("{path} was deleted remotely but modified locally.\nDo you want to [D]elete the local file or [K]eep it?"),
                'D',
                'K',
            ),
            ConflictKind::BothAdded => (
                format!("{path} was added both locally and remotely.\nDo you want to keep the [L]ocal version or to overwrite it with the [R]emote version?"),
                'R',
                'L',
            ),
        };

        match self.ask(&question, &[take_remote, keep_local]) {
            Some(key) if key == take_remote => Decision::TakeRemote,
            _ => Decision::KeepLocal,
        }
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.ask(&format!("{question} (y/n)"), &['Y', 'N']) == Some('Y')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(input: &str) -> ConsolePrompt<&[u8], Vec<u8>> {
        ConsolePrompt::new(input.as_bytes(), Vec::new())
    }

    #[test]
    fn answers_map_to_decisions() {
        let mut p = prompt("r\n");
        assert_eq!(
            p.decide(ConflictKind::BothModified, "a.txt"),
            Decision::TakeRemote
        );

        let mut p = prompt("d\n");
        assert_eq!(
            p.decide(ConflictKind::ModifiedRemotelyDeletedLocally, "a.txt"),
            Decision::KeepLocal
        );

        let mut p = prompt("D\n");
        assert_eq!(
            p.decide(ConflictKind::DeletedRemotelyModifiedLocally, "a.txt"),
            Decision::TakeRemote
        );

        let mut p = prompt("keep\n");
        assert_eq!(
            p.decide(ConflictKind::DeletedRemotelyModifiedLocally, "a.txt"),
            Decision::KeepLocal
        );
    }

    #[test]
    fn unknown_answers_repeat_the_question() {
        let mut p = prompt("x\n\nl\n");
        assert_eq!(p.decide(ConflictKind::BothAdded, "b"), Decision::KeepLocal);
        let shown = String::from_utf8(p.output).unwrap();
        assert_eq!(shown.matches("added both locally and remotely").count(), 3);
    }

    #[test]
    fn free_text_answers() {
        let mut p = prompt("  octo/demo \n");
        assert_eq!(p.ask_line("Name?").as_deref(), Some("octo/demo"));
        assert_eq!(p.ask_line("Name?"), None);
        assert_eq!(String::from_utf8(p.output).unwrap(), "Name? Name? ");
    }

    #[test]
    fn end_of_input_keeps_local_and_refuses() {
        let mut p = prompt("");
        assert_eq!(p.decide(ConflictKind::BothModified, "a"), Decision::KeepLocal);
        assert!(!p.confirm("Delete?"));

        let mut p = prompt("yes\n");
        assert!(p.confirm("Delete?"));
    }
}
