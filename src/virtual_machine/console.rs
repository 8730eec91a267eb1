//! Console I/O used by `PRINT` and `READ`.
//!
//! The [`Console`] trait is the VM's only view of the outside world during
//! execution. [`StreamConsole`] binds it to any buffered reader and writer,
//! usually stdin and stdout.

use std::io::{self, BufRead, Stdout, StdinLock, Write};

/// Line-oriented integer console.
pub trait Console {
    /// Reads one line without its terminator, or `None` once input is exhausted.
    ///
    /// May block until a line is available.
    fn read_line(&mut self) -> io::Result<Option<String>>;
    /// Writes one value followed by a newline.
    fn write_value(&mut self, value: i64) -> io::Result<()>;
}

/// Console over a buffered reader and a writer.
///
/// Every value is flushed as soon as it is written so program output and
/// diagnostics on stderr interleave in execution order.
pub struct StreamConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StreamConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consumes the console and returns the underlying reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl StreamConsole<StdinLock<'static>, Stdout> {
    /// Console bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn write_value(&mut self, value: i64) -> io::Result<()> {
        writeln!(self.output, "{value}")?;
        self.output.flush()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Scripted console recording everything `PRINT` writes.
    pub struct TestConsole {
        input: VecDeque<String>,
        pub output: Vec<i64>,
    }

    impl TestConsole {
        pub fn new() -> Self {
            Self::with_input(&[])
        }

        pub fn with_input(lines: &[&str]) -> Self {
            Self {
                input: lines.iter().map(|l| l.to_string()).collect(),
                output: Vec::new(),
            }
        }
    }

    impl Console for TestConsole {
        fn read_line(&mut self) -> io::Result<Option<String>> {
            Ok(self.input.pop_front())
        }

        fn write_value(&mut self, value: i64) -> io::Result<()> {
            self.output.push(value);
            Ok(())
        }
    }

    #[test]
    fn stream_console_strips_line_endings() {
        let mut console = StreamConsole::new(Cursor::new("12\r\n-4\nlast"), Vec::new());
        assert_eq!(console.read_line().unwrap(), Some("12".to_string()));
        assert_eq!(console.read_line().unwrap(), Some("-4".to_string()));
        assert_eq!(console.read_line().unwrap(), Some("last".to_string()));
        assert_eq!(console.read_line().unwrap(), None);
    }

    #[test]
    fn stream_console_writes_one_value_per_line() {
        let mut console = StreamConsole::new(Cursor::new(""), Vec::new());
        console.write_value(3).unwrap();
        console.write_value(-5).unwrap();
        let (_, out) = console.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "3\n-5\n");
    }

    #[test]
    fn test_console_replays_script() {
        let mut console = TestConsole::with_input(&["1", "2"]);
        assert_eq!(console.read_line().unwrap(), Some("1".to_string()));
        assert_eq!(console.read_line().unwrap(), Some("2".to_string()));
        assert_eq!(console.read_line().unwrap(), None);
        console.write_value(9).unwrap();
        assert_eq!(console.output, vec![9]);
    }
}
