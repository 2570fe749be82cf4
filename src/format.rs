//! Presentation helpers behind the `join*`, `write_to` and `cout` terminals.
//!
//! A rendered sequence is `prefix + e0 + delimiter + e1 + ... + suffix`; the
//! defaults used by [`Collectable::join`](crate::Collectable::join) are
//! `"["`, `","` and `"]"`.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::io::Write;

/// Render `values` with `formatter`, framed by `prefix` and `suffix`.
pub fn render<E, F>(values: &[E], prefix: &str, delimiter: &str, suffix: &str, formatter: F) -> String
where
    F: Fn(&E) -> String,
{
    let mut out = String::with_capacity(prefix.len() + suffix.len() + values.len() * 4);
    out.push_str(prefix);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(delimiter);
        }
        // Writing into a String cannot fail.
        let _ = write!(out, "{}", formatter(v));
    }
    out.push_str(suffix);
    out
}

/// Write `line` and a newline, then flush.
pub(crate) fn write_line<W: Write>(out: &mut W, line: &str) -> Result<()> {
    writeln!(out, "{line}").context("writing rendered sequence")?;
    out.flush().context("flushing rendered sequence")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_with_delimiters() {
        assert_eq!(render(&[1, 2, 3], "[", ",", "]", ToString::to_string), "[1,2,3]");
        assert_eq!(render::<u8, _>(&[], "<", "|", ">", ToString::to_string), "<>");
        assert_eq!(render(&["a", "b"], "", " - ", "", |s| s.to_uppercase()), "A - B");
    }

    #[test]
    fn write_line_appends_newline() -> Result<()> {
        let mut buf = Vec::new();
        write_line(&mut buf, "[1]")?;
        assert_eq!(buf, b"[1]\n");
        Ok(())
    }
}
