// ABOUTME: Terminal detection choosing an image display method from the environment
// ABOUTME: TERMIMG_METHOD overrides; otherwise TERM_PROGRAM, TERM and terminal-specific variables decide

use crate::constants::env;
use serde::Serialize;
use termimg_sdk::BackendKind;

/// Environment variables detection looks at, captured once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalEnv {
    pub method_override: Option<String>,
    pub term_program: String,
    pub term: String,
    pub kitty_window_id: Option<String>,
    pub wezterm_executable: Option<String>,
}

impl TerminalEnv {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            method_override: var(env::METHOD_OVERRIDE),
            term_program: var(env::TERM_PROGRAM).unwrap_or_default(),
            term: var(env::TERM).unwrap_or_default(),
            kitty_window_id: var(env::KITTY_WINDOW_ID),
            wezterm_executable: var(env::WEZTERM_EXECUTABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub terminal: String,
    pub method: Option<String>,
    /// True when the method came from `TERMIMG_METHOD`.
    pub forced: bool,
}

pub fn detect() -> Detection {
    detect_from(&TerminalEnv::from_env())
}

pub fn detect_from(vars: &TerminalEnv) -> Detection {
    let terminal = terminal_name(&vars.term_program, &vars.term);

    if let Some(forced) = &vars.method_override {
        match forced.parse::<BackendKind>() {
            Ok(kind) => {
                return Detection {
                    terminal,
                    method: Some(kind.key().to_string()),
                    forced: true,
                }
            }
            Err(e) => log::warn!("Ignoring {}: {}", env::METHOD_OVERRIDE, e),
        }
    }

    let method = detect_kind(vars).map(|kind| kind.key().to_string());
    log::debug!("Detected terminal {:?}, method {:?}", terminal, method);
    Detection {
        terminal,
        method,
        forced: false,
    }
}

fn detect_kind(vars: &TerminalEnv) -> Option<BackendKind> {
    let program = vars.term_program.as_str();
    let term = vars.term.as_str();

    if supports_kitty(vars) {
        Some(BackendKind::Kitty)
    } else if supports_iterm2(program, term) {
        Some(BackendKind::ITerm2)
    } else if program == "terminology" || term.contains("terminology") {
        Some(BackendKind::Terminology)
    } else if term.starts_with("rxvt") {
        Some(BackendKind::Urxvt)
    } else if ["foot", "mlterm", "yaft"]
        .iter()
        .any(|prefix| term.starts_with(prefix))
    {
        Some(BackendKind::Sixel)
    } else {
        None
    }
}

fn supports_kitty(vars: &TerminalEnv) -> bool {
    if vars.kitty_window_id.is_some() || vars.wezterm_executable.is_some() {
        return true;
    }
    matches!(vars.term_program.as_str(), "kitty" | "WezTerm" | "ghostty")
        || vars.term.contains("kitty")
        || vars.term.contains("ghostty")
}

fn supports_iterm2(program: &str, term: &str) -> bool {
    matches!(
        program,
        "iTerm.app" | "mintty" | "Hyper" | "Warp" | "Tabby" | "Terminus"
    ) || term.contains("iterm")
}

fn terminal_name(term_program: &str, term: &str) -> String {
    if !term_program.is_empty() {
        term_program.to_string()
    } else if !term.is_empty() {
        term.to_string()
    } else {
        "unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn with_term(term_program: &str, term: &str) -> TerminalEnv {
        TerminalEnv {
            term_program: term_program.to_string(),
            term: term.to_string(),
            ..TerminalEnv::default()
        }
    }

    #[test]
    fn test_kitty_detection() {
        let detection = detect_from(&with_term("", "xterm-kitty"));
        assert_eq!(detection.method.as_deref(), Some("kitty"));
        assert_eq!(detection.terminal, "xterm-kitty");

        let vars = TerminalEnv {
            kitty_window_id: Some("1".to_string()),
            ..with_term("", "xterm-256color")
        };
        assert_eq!(detect_from(&vars).method.as_deref(), Some("kitty"));
    }

    #[test]
    fn test_wezterm_prefers_kitty() {
        let detection = detect_from(&with_term("WezTerm", "xterm-256color"));
        assert_eq!(detection.method.as_deref(), Some("kitty"));
        assert_eq!(detection.terminal, "WezTerm");
    }

    #[test]
    fn test_iterm2_detection() {
        let detection = detect_from(&with_term("iTerm.app", "xterm-256color"));
        assert_eq!(detection.method.as_deref(), Some("iterm2"));
    }

    #[test]
    fn test_text_terminals() {
        assert_eq!(
            detect_from(&with_term("", "rxvt-unicode-256color")).method.as_deref(),
            Some("urxvt")
        );
        assert_eq!(
            detect_from(&with_term("", "foot")).method.as_deref(),
            Some("sixel")
        );
        assert_eq!(
            detect_from(&with_term("", "xterm-256color")).method,
            None
        );
        assert_eq!(detect_from(&TerminalEnv::default()).terminal, "unknown");
    }

    #[test]
    fn test_override_wins() {
        let vars = TerminalEnv {
            method_override: Some("w3m".to_string()),
            ..with_term("kitty", "xterm-kitty")
        };
        let detection = detect_from(&vars);
        assert_eq!(detection.method.as_deref(), Some("w3m"));
        assert!(detection.forced);
    }

    #[test]
    fn test_invalid_override_falls_back() {
        let vars = TerminalEnv {
            method_override: Some("carrier-pigeon".to_string()),
            ..with_term("iTerm.app", "")
        };
        let detection = detect_from(&vars);
        assert_eq!(detection.method.as_deref(), Some("iterm2"));
        assert!(!detection.forced);
    }

    #[test]
    #[serial]
    fn test_reads_process_environment() {
        let saved: Vec<_> = [
            env::METHOD_OVERRIDE,
            env::TERM_PROGRAM,
            env::KITTY_WINDOW_ID,
            env::WEZTERM_EXECUTABLE,
        ]
        .iter()
        .map(|name| (*name, std::env::var_os(name)))
        .collect();

        std::env::remove_var(env::TERM_PROGRAM);
        std::env::remove_var(env::KITTY_WINDOW_ID);
        std::env::remove_var(env::WEZTERM_EXECUTABLE);
        std::env::set_var(env::METHOD_OVERRIDE, "ueberzug");
        let detection = detect();

        for (name, value) in saved {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }

        assert_eq!(detection.method.as_deref(), Some("ueberzug"));
        assert!(detection.forced);
    }
}
