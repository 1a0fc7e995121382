// ABOUTME: Shell completion generation using clap_complete for all supported shells
// ABOUTME: Provides static completions for bash, zsh, fish, and powershell

use anyhow::{anyhow, Result};
use clap::{Command, ValueEnum};
use clap_complete::{generate, shells};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

const BIN_NAME: &str = "termimg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[allow(clippy::enum_variant_names)]
    PowerShell,
}

impl Shell {
    pub fn all() -> Vec<Shell> {
        vec![Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell]
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shell_str = match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::PowerShell => "powershell",
        };
        write!(f, "{}", shell_str)
    }
}

impl FromStr for Shell {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            "powershell" | "pwsh" => Ok(Shell::PowerShell),
            _ => Err(anyhow!(
                "Unsupported shell: {}. Supported shells: bash, zsh, fish, powershell",
                s
            )),
        }
    }
}

/// Write the completion script for `shell` to `writer`.
pub fn generate_completions<W: Write>(shell: Shell, cmd: &mut Command, writer: &mut W) {
    match shell {
        Shell::Bash => generate(shells::Bash, cmd, BIN_NAME, writer),
        Shell::Zsh => generate(shells::Zsh, cmd, BIN_NAME, writer),
        Shell::Fish => generate(shells::Fish, cmd, BIN_NAME, writer),
        Shell::PowerShell => generate(shells::PowerShell, cmd, BIN_NAME, writer),
    }
}

pub fn installation_instructions() -> &'static str {
    r#"Shell Completion Installation

The completions subcommand writes the script to stdout. To install:

Bash:
  termimg completions bash > ~/.local/share/bash-completion/completions/termimg

Zsh:
  termimg completions zsh > ~/.zfunc/_termimg
  # fpath=(~/.zfunc $fpath) in ~/.zshrc

Fish:
  termimg completions fish > ~/.config/fish/completions/termimg.fish

PowerShell:
  termimg completions powershell > termimg_completions.ps1
  # then source it from your profile
"#
}
