// ABOUTME: ueberzug backend: fire-and-forget JSON commands to a layer process
// ABOUTME: Never reads replies; shutdown is SIGTERM raced against a one second kill deadline

use crate::constants::ueberzug::{ARGS, IMAGE_ID, KILL_TIMEOUT, PROGRAM};
use crate::context::BackendContext;
use crate::displayer::{CellArea, DisplayRequest, ImageDisplayer};
use crate::error::{ImageError, Result};
use crate::process::CompanionProcess;
use crate::watchdog::{terminate_with_deadline, Shutdown};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One line of the ueberzug layer protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum LayerCommand<'a> {
    Add {
        identifier: &'a str,
        x: u16,
        y: u16,
        max_width: u16,
        max_height: u16,
        path: &'a Path,
    },
    Remove {
        identifier: &'a str,
    },
}

impl LayerCommand<'_> {
    pub fn to_line(&self) -> Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

pub struct UeberzugDisplayer {
    process: CompanionProcess,
    kill_timeout: Duration,
}

impl UeberzugDisplayer {
    pub fn new(ctx: &BackendContext) -> Self {
        Self::with_command(ctx, PROGRAM, ARGS.iter().copied())
    }

    /// Run `program args...` instead of `ueberzug layer --silent`.
    pub fn with_command<I, S>(ctx: &BackendContext, program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            process: CompanionProcess::new(program)
                .args(args)
                .current_dir(ctx.settings.working_dir.clone()),
            kill_timeout: KILL_TIMEOUT,
        }
    }

    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    pub fn is_running(&mut self) -> bool {
        self.process.is_running()
    }

    fn execute(&mut self, command: &LayerCommand<'_>) -> Result<()> {
        let line = command.to_line()?;
        self.process.ensure_running().map_err(|e| match e {
            ImageError::Unsupported(_) => {
                ImageError::unsupported("ueberzug is not installed or could not be started")
            }
            other => other,
        })?;
        self.process.send(line.as_bytes())?;
        Ok(())
    }
}

impl ImageDisplayer for UeberzugDisplayer {
    fn draw(&mut self, request: &DisplayRequest) -> Result<()> {
        let area = request.area;
        self.execute(&LayerCommand::Add {
            identifier: IMAGE_ID,
            x: area.x,
            y: area.y,
            max_width: area.width,
            max_height: area.height,
            path: &request.path,
        })
    }

    /// Removes the placement; does nothing when no layer process is alive.
    fn clear(&mut self, _area: CellArea) -> Result<()> {
        if !self.process.is_running() {
            return Ok(());
        }
        self.execute(&LayerCommand::Remove {
            identifier: IMAGE_ID,
        })
    }

    fn quit(&mut self) -> Result<()> {
        if !self.process.is_running() {
            return Ok(());
        }
        let Some(mut child) = self.process.take_child() else {
            return Ok(());
        };
        match terminate_with_deadline(&mut child, self.kill_timeout)? {
            Shutdown::Graceful(status) => log::debug!("ueberzug exited: {}", status),
            Shutdown::Killed => log::warn!("ueberzug had to be killed"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_command_json() {
        let command = LayerCommand::Add {
            identifier: IMAGE_ID,
            x: 3,
            y: 4,
            max_width: 40,
            max_height: 20,
            path: Path::new("/tmp/cat.png"),
        };
        insta::assert_snapshot!(
            command.to_line().unwrap().trim_end(),
            @r#"{"action":"add","identifier":"preview","x":3,"y":4,"max_width":40,"max_height":20,"path":"/tmp/cat.png"}"#
        );
    }

    #[test]
    fn test_remove_command_json() {
        let line = LayerCommand::Remove {
            identifier: IMAGE_ID,
        }
        .to_line()
        .unwrap();
        assert_eq!(line, "{\"action\":\"remove\",\"identifier\":\"preview\"}\n");
    }

    #[test]
    fn test_clear_without_process_is_noop() {
        let ctx = BackendContext::default();
        let mut display = UeberzugDisplayer::with_command(
            &ctx,
            "/nonexistent/ueberzug",
            std::iter::empty::<&str>(),
        );
        display.clear(CellArea::default()).unwrap();
        display.quit().unwrap();
    }

    #[test]
    fn test_missing_binary_is_unsupported() {
        let ctx = BackendContext::default();
        let mut display = UeberzugDisplayer::with_command(
            &ctx,
            "/nonexistent/ueberzug",
            std::iter::empty::<&str>(),
        );
        let err = display
            .draw(&DisplayRequest::new("/tmp/a.png", CellArea::new(0, 0, 5, 5)))
            .unwrap_err();
        assert!(err.is_permanent());
        assert!(err.help_text().unwrap().contains("ueberzug"));
    }
}
