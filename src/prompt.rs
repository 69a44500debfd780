/// Interactive input from the operator.
use anyhow::Result;
use dialoguer::Input;
use regex::Regex;

/// Pattern an SSH public key typed at the prompt has to match.
pub const PUBKEY_PATTERN: &str = r"^ssh-.*$";

pub trait Prompter: Send + Sync {
    /// Ask until the answer matches `pattern`, then return it.
    fn prompt(&self, message: &str, pattern: &Regex) -> Result<String>;
}

/// Reads answers from the terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, message: &str, pattern: &Regex) -> Result<String> {
        let answer = Input::<String>::new()
            .with_prompt(message)
            .validate_with(|input: &String| -> Result<(), String> {
                if pattern.is_match(input) {
                    Ok(())
                } else {
                    Err(format!(
                        "Regular expression validation failed: '{}' does not match '{}'",
                        input,
                        pattern.as_str()
                    ))
                }
            })
            .interact_text()?;

        Ok(answer)
    }
}

pub fn pubkey_pattern() -> Result<Regex> {
    Ok(Regex::new(PUBKEY_PATTERN)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkey_pattern_requires_ssh_prefix_at_line_start() {
        let pattern = pubkey_pattern().unwrap();
        assert!(pattern.is_match("ssh-ed25519 AAAAC3Nza bob@host"));
        assert!(pattern.is_match("ssh-rsa AAAA"));
        assert!(!pattern.is_match(" ssh-rsa AAAA"));
        assert!(!pattern.is_match("SSH-RSA AAAA"));
        assert!(!pattern.is_match("ecdsa-sha2-nistp256 AAAA"));
    }
}
