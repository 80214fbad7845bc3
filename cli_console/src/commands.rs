//! Console commands
//!
//! Turns one line typed at the console into a [`ConsoleCommand`].

/// What a console line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Blank line
    Empty,
    /// Run code in the kernel
    Execute(String),
    /// Show the docstring of a dotted name (`name?`)
    Inspect(String),
    /// List completions (`%complete text`)
    Complete(String),
    /// Shut the kernel down and leave (`exit` or `quit`)
    Exit,
}

impl ConsoleCommand {
    /// Parses one console line
    ///
    /// Example: `math.sqrt?` inspects, `%complete ma` completes, anything
    /// else is code.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ConsoleCommand::Empty;
        }
        if matches!(trimmed, "exit" | "quit" | "exit()" | "quit()") {
            return ConsoleCommand::Exit;
        }
        if let Some(rest) = trimmed.strip_prefix("%complete") {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return ConsoleCommand::Complete(rest.trim().to_string());
            }
        }
        if let Some(name) = trimmed.strip_suffix('?') {
            let name = name.trim();
            if is_dotted_name(name) {
                return ConsoleCommand::Inspect(name.to_string());
            }
        }
        ConsoleCommand::Execute(line.to_string())
    }
}

fn is_dotted_name(text: &str) -> bool {
    !text.is_empty()
        && text.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines() {
        assert_eq!(ConsoleCommand::parse(""), ConsoleCommand::Empty);
        assert_eq!(ConsoleCommand::parse("   \t"), ConsoleCommand::Empty);
    }

    #[test]
    fn test_exit_words() {
        for line in ["exit", "quit", " quit() "] {
            assert_eq!(ConsoleCommand::parse(line), ConsoleCommand::Exit);
        }
    }

    #[test]
    fn test_inspect() {
        assert_eq!(
            ConsoleCommand::parse("math.sqrt?"),
            ConsoleCommand::Inspect("math.sqrt".to_string())
        );
        assert_eq!(
            ConsoleCommand::parse("len ?"),
            ConsoleCommand::Inspect("len".to_string())
        );
    }

    #[test]
    fn test_question_mark_in_code_is_code() {
        assert_eq!(
            ConsoleCommand::parse("print('why?')"),
            ConsoleCommand::Execute("print('why?')".to_string())
        );
        assert_eq!(
            ConsoleCommand::parse("1.5?"),
            ConsoleCommand::Execute("1.5?".to_string())
        );
    }

    #[test]
    fn test_complete() {
        assert_eq!(
            ConsoleCommand::parse("%complete math.s"),
            ConsoleCommand::Complete("math.s".to_string())
        );
        assert_eq!(
            ConsoleCommand::parse("%complete"),
            ConsoleCommand::Complete(String::new())
        );
        assert_eq!(
            ConsoleCommand::parse("%completer"),
            ConsoleCommand::Execute("%completer".to_string())
        );
    }

    #[test]
    fn test_code_is_kept_verbatim() {
        assert_eq!(
            ConsoleCommand::parse("  x = 1"),
            ConsoleCommand::Execute("  x = 1".to_string())
        );
    }
}
