use std::io::{self, Write};

/// Writes recorded engine lines as a standalone input script.
///
/// Header lines become `#` comments. A blank line precedes every `run`, so the staged
/// structure of the deck stays readable.
pub fn write_script<'a>(
    header: &[&str],
    lines: impl IntoIterator<Item = &'a str>,
    writer: &mut impl Write,
) -> io::Result<()> {
    for h in header {
        writeln!(writer, "# {}", h)?;
    }
    if !header.is_empty() {
        writeln!(writer)?;
    }
    for line in lines {
        if line.starts_with("run ") {
            writeln!(writer)?;
        }
        writeln!(writer, "{}", line)?;
    }
    writer.flush()
}
