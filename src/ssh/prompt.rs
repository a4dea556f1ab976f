//! Elevation-prompt detection on a session's output stream
//!
//! Many privilege-escalation prompts render as `[sudo] password for user:`.
//! The detector scans the raw byte stream for a `[`-bracketed token starting
//! with `sudo`, then waits for the trailing `:` of the prompt before asking
//! the caller to inject the password. This is a cheap heuristic, not a
//! terminal emulator: any bracketed text beginning with "sudo" anywhere in
//! the output will trigger an injection. That false-positive risk is a known
//! limitation and is accepted.

/// Scans an output byte stream for moments where a credential should be
/// written to the session's input.
///
/// Implementations keep the full transcript for diagnostic output after the
/// stream ends.
pub trait PromptDetector {
    /// Feed one output byte. Returns `true` when the caller should inject
    /// the password now; the detector arms itself again afterwards, so a
    /// stream with two prompts triggers twice.
    fn feed(&mut self, byte: u8) -> bool;

    /// Everything seen so far
    fn transcript(&self) -> &[u8];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Default state; a `[` starts bracket collection
    Scanning,
    /// Collecting bracketed text until `]`
    CollectingBracket,
    /// Bracket matched the sudo prefix; waiting for the prompt's `:`
    CollectingPromptTail,
}

/// The bracket-plus-prefix heuristic detector
#[derive(Debug)]
pub struct SudoPromptDetector {
    state: ScanState,
    bracket: Vec<u8>,
    transcript: Vec<u8>,
}

impl SudoPromptDetector {
    pub fn new() -> Self {
        Self {
            state: ScanState::Scanning,
            bracket: Vec::new(),
            transcript: Vec::new(),
        }
    }
}

impl Default for SudoPromptDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptDetector for SudoPromptDetector {
    fn feed(&mut self, byte: u8) -> bool {
        self.transcript.push(byte);

        match self.state {
            ScanState::Scanning => {
                if byte == b'[' {
                    self.bracket.clear();
                    self.state = ScanState::CollectingBracket;
                }
                false
            }
            ScanState::CollectingBracket => {
                if byte == b']' {
                    self.state = if self.bracket.starts_with(b"sudo") {
                        ScanState::CollectingPromptTail
                    } else {
                        ScanState::Scanning
                    };
                } else {
                    self.bracket.push(byte);
                }
                false
            }
            ScanState::CollectingPromptTail => {
                if byte == b':' {
                    self.state = ScanState::Scanning;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn transcript(&self) -> &[u8] {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triggers(input: &[u8]) -> usize {
        let mut detector = SudoPromptDetector::new();
        input.iter().filter(|&&b| detector.feed(b)).count()
    }

    #[test]
    fn test_sudo_prompt_triggers_once() {
        assert_eq!(triggers(b"...[sudo] password for bob:"), 1);
    }

    #[test]
    fn test_other_bracket_never_triggers() {
        assert_eq!(triggers(b"[other] text"), 0);
    }

    #[test]
    fn test_plain_output_never_triggers() {
        assert_eq!(triggers(b"total 12\ndrwxr-xr-x 3 bob bob 4096 .\n"), 0);
    }

    #[test]
    fn test_two_prompts_trigger_twice() {
        assert_eq!(
            triggers(b"[sudo] password for bob: x\n[sudo] password for bob:"),
            2
        );
    }

    #[test]
    fn test_prefix_match_is_enough() {
        // The heuristic matches on the "sudo" prefix, not the whole token.
        assert_eq!(triggers(b"[sudoers] anything:"), 1);
    }

    #[test]
    fn test_colon_before_bracket_close_does_not_trigger() {
        assert_eq!(triggers(b"[a:b] tail:"), 0);
    }

    #[test]
    fn test_transcript_retains_everything() {
        let mut detector = SudoPromptDetector::new();
        for &b in b"[sudo] password:" {
            detector.feed(b);
        }
        assert_eq!(detector.transcript(), b"[sudo] password:");
    }
}
