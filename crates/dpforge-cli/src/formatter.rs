use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

use dpforge_codegen::{FormatError, Formatter};

use crate::settings::FormatterSettings;

/// Pipes source through an external program, reading the result from stdout.
#[derive(Debug, Clone)]
pub struct CommandFormatter {
    program: String,
    args: Vec<String>,
}

impl CommandFormatter {
    pub fn new(settings: &FormatterSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
        }
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("formatter stdin unavailable"))?;

        // Feed stdin from a second thread so a full stdout pipe cannot stall us.
        let output = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(source.as_bytes()));
            let output = child.wait_with_output();
            match writer.join() {
                // A program may exit without reading all input; its status decides.
                Ok(Err(err)) if err.kind() != ErrorKind::BrokenPipe => Err(err),
                Ok(_) => output,
                Err(_) => Err(std::io::Error::other("formatter stdin writer panicked")),
            }
        })?;

        if !output.status.success() {
            return Err(FormatError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!(event = "formatted", program = %self.program, bytes = output.stdout.len());
        String::from_utf8(output.stdout).map_err(|_| FormatError::InvalidOutput)
    }
}
