/// Operator console loop.
///
/// `AwaitTarget -> Capturing -> AwaitContinue`, then back to
/// `AwaitTarget` or `Done`. Reads lines from any `BufRead` and writes
/// prompts to any `Write`, so the firmware drives it from the UART console
/// and tests drive it from a script.

use std::io::{self, BufRead, Write};

use crate::config::CaptureConfig;
use crate::mac::MacAddr;
use crate::radio::Radio;
use crate::session::CaptureSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    AwaitTarget,
    Capturing,
    AwaitContinue,
    Done,
}

pub struct ControlLoop<R: Radio + ?Sized + 'static> {
    session: CaptureSession<R>,
    config: CaptureConfig,
    state: ControlState,
    last_target: Option<MacAddr>,
}

impl<R: Radio + ?Sized + 'static> ControlLoop<R> {
    pub fn new(session: CaptureSession<R>, config: CaptureConfig) -> Self {
        Self {
            session,
            config,
            state: ControlState::AwaitTarget,
            last_target: None,
        }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn session(&self) -> &CaptureSession<R> {
        &self.session
    }

    /// Run until the operator declines to continue or input ends.
    /// Only console I/O errors are returned; capture errors are printed.
    pub fn run<I: BufRead, O: Write>(&mut self, input: &mut I, out: &mut O) -> io::Result<()> {
        while self.state != ControlState::Done {
            self.state = self.step(input, out)?;
        }
        if self.session.is_running() {
            let _ = self.session.stop();
        }
        Ok(())
    }

    fn step<I: BufRead, O: Write>(&mut self, input: &mut I, out: &mut O) -> io::Result<ControlState> {
        match self.state {
            ControlState::AwaitTarget => self.await_target(input, out),
            ControlState::Capturing => self.capture(input, out),
            ControlState::AwaitContinue => self.await_continue(input, out),
            ControlState::Done => Ok(ControlState::Done),
        }
    }

    fn await_target<I: BufRead, O: Write>(
        &mut self,
        input: &mut I,
        out: &mut O,
    ) -> io::Result<ControlState> {
        write!(out, "Enter target MAC address (xx:xx:xx:xx:xx:xx): ")?;
        out.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(ControlState::Done);
        };

        let target = if line.is_empty() {
            match self.last_target {
                Some(target) => target,
                None => return Ok(ControlState::AwaitTarget),
            }
        } else {
            match line.parse::<MacAddr>() {
                Ok(target) => target,
                Err(e) => {
                    writeln!(out, "Invalid MAC address '{}': {}", line, e)?;
                    return Ok(ControlState::AwaitTarget);
                }
            }
        };

        if let Err(e) = self.session.start(target, &self.config) {
            writeln!(out, "Failed to start capture: {}", e)?;
            return Ok(ControlState::AwaitTarget);
        }
        self.last_target = Some(target);
        writeln!(out, "Sniffing for {}", target)?;
        Ok(ControlState::Capturing)
    }

    fn capture<I: BufRead, O: Write>(&mut self, input: &mut I, out: &mut O) -> io::Result<ControlState> {
        let result = if self.config.max_sweeps.is_some() {
            self.session.wait()
        } else {
            writeln!(out, "Press Enter to stop sniffing")?;
            out.flush()?;
            // EOF stops capture too
            read_line(input)?;
            self.session.stop()
        };

        match result {
            Ok(summary) => writeln!(
                out,
                "Captured {} matching frames over {} sweeps",
                self.session.packet_count(),
                summary.sweeps
            )?,
            Err(e) => writeln!(out, "Capture ended with error: {}", e)?,
        }
        Ok(ControlState::AwaitContinue)
    }

    fn await_continue<I: BufRead, O: Write>(
        &mut self,
        input: &mut I,
        out: &mut O,
    ) -> io::Result<ControlState> {
        write!(out, "Continue sniffing? (y/n): ")?;
        out.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(ControlState::Done);
        };
        Ok(match line.chars().next() {
            Some('y' | 'Y') => ControlState::AwaitTarget,
            Some('n' | 'N') => ControlState::Done,
            _ => ControlState::AwaitContinue,
        })
    }
}

/// Next line without its terminator and surrounding whitespace, or `None`
/// at end of input.
fn read_line<I: BufRead>(input: &mut I) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
