//! Line-oriented prompts

use std::io::{BufRead, Write};

use album_dl::{Error, Result};

/// Asks questions on `output` and reads one trimmed line per answer from `input`
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `prompt` and read the answer
    ///
    /// Closed input is an error rather than an empty answer, so a piped run
    /// cannot silently select everything.
    pub fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::InputValidation("input closed".to_string()));
        }
        Ok(line.trim().to_string())
    }
}
