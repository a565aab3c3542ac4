//! Verbose output of the tile scheduler and the tree builder.
//!
//! Both report through a [`PrintTarget`] chosen with the
//! [`ConfigurablePrintTarget`] trait, and format what they report as a
//! [`Summary`]: a heading line followed by indented rows of
//! `name = value` fields.

use itertools::Itertools;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{sink, stderr, stdout, Error, ErrorKind, Result, Sink, Stderr, Stdout, Write};

/// Destination of verbose output
pub enum PrintTarget {
    Stdout(Stdout),
    Stderr(Stderr),
    File(File),
    Buffer(Vec<u8>),
    Stream(Box<dyn Write + Send + Sync>),
    Sink(Sink),
}

impl PrintTarget {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            PrintTarget::Stdout(w) => w,
            PrintTarget::Stderr(w) => w,
            PrintTarget::File(w) => w,
            PrintTarget::Buffer(w) => w,
            PrintTarget::Stream(w) => w.as_mut(),
            PrintTarget::Sink(w) => w,
        }
    }

    /// Write a summary and flush the target.
    pub fn emit(&mut self, summary: &Summary) -> Result<()> {
        write!(self, "{}", summary)?;
        self.flush()
    }
}

impl fmt::Debug for PrintTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrintTarget::Stdout(_) => "Stdout",
            PrintTarget::Stderr(_) => "Stderr",
            PrintTarget::File(_) => "File",
            PrintTarget::Buffer(_) => "Buffer",
            PrintTarget::Stream(_) => "Stream",
            PrintTarget::Sink(_) => "Sink",
        };
        write!(f, "PrintTarget::{}", name)
    }
}

impl Default for PrintTarget {
    fn default() -> Self {
        PrintTarget::Stdout(stdout())
    }
}

impl Write for PrintTarget {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer().flush()
    }
}

/// Trait implemented by objects that allow configurable print targets
pub trait ConfigurablePrintTarget {
    /// redirect print output to stdout
    fn print_to_stdout(&mut self);
    /// redirect print output to stderr
    fn print_to_stderr(&mut self);
    /// redirect print output to a file
    fn print_to_file(&mut self, file: File);
    /// redirect print output to a stream
    fn print_to_stream(&mut self, stream: Box<dyn Write + Send + Sync>);
    /// discard all print output
    fn print_to_sink(&mut self);
    /// redirect print output to an internal buffer
    fn print_to_buffer(&mut self);
    /// get the contents of the internal print buffer
    fn get_print_buffer(&mut self) -> Result<String>;
}

impl ConfigurablePrintTarget for PrintTarget {
    fn print_to_stdout(&mut self) {
        *self = PrintTarget::Stdout(stdout());
    }

    fn print_to_stderr(&mut self) {
        *self = PrintTarget::Stderr(stderr());
    }

    fn print_to_file(&mut self, file: File) {
        *self = PrintTarget::File(file);
    }

    fn print_to_stream(&mut self, stream: Box<dyn Write + Send + Sync>) {
        *self = PrintTarget::Stream(stream);
    }

    fn print_to_sink(&mut self) {
        *self = PrintTarget::Sink(sink());
    }

    fn print_to_buffer(&mut self) {
        *self = PrintTarget::Buffer(Vec::new());
    }

    fn get_print_buffer(&mut self) -> Result<String> {
        match self {
            PrintTarget::Buffer(buffer) => Ok(String::from_utf8_lossy(buffer).to_string()),
            _ => Err(Error::new(
                ErrorKind::Other,
                "Print buffering is not configured.",
            )),
        }
    }
}

/// A block of verbose output.
///
/// ```text
/// tile scheduler: 10 tasks on 4 threads
///   completed = 10, failed = 0
///   POTRF 3, TRSM 3
/// ```
#[derive(Debug, Clone, Default)]
pub struct Summary {
    heading: String,
    rows: Vec<String>,
}

impl Summary {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            rows: Vec::new(),
        }
    }

    /// Row of comma separated `name = value` fields.
    pub fn fields(&mut self, fields: &[(&str, &dyn Display)]) -> &mut Self {
        let row = fields
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value))
            .join(", ");
        self.line(row)
    }

    /// Row of free text.  Empty rows are skipped.
    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.is_empty() {
            self.rows.push(text);
        }
        self
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.heading)?;
        for row in &self.rows {
            writeln!(f, "  {}", row)?;
        }
        Ok(())
    }
}

#[test]
fn test_sink_and_buffer() {
    let mut target = PrintTarget::default();
    target.print_to_sink();
    assert_eq!(target.write(b"discarded").unwrap(), 9);
    assert!(target.get_print_buffer().is_err());

    target.print_to_buffer();
    write!(target, "hello").unwrap();
    assert_eq!(target.get_print_buffer().unwrap(), "hello");
}

#[test]
fn test_summary_layout() {
    let mut s = Summary::new("tile scheduler: 3 tasks");
    s.fields(&[("completed", &3), ("failed", &0)])
        .line("")
        .line("POTRF 1, TRSM 2");

    let mut target = PrintTarget::Buffer(Vec::new());
    target.emit(&s).unwrap();
    assert_eq!(
        target.get_print_buffer().unwrap(),
        "tile scheduler: 3 tasks\n  completed = 3, failed = 0\n  POTRF 1, TRSM 2\n"
    );
}
