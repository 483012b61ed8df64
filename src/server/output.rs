use std::borrow::Cow;
use std::io::{self, Write};

use super::request::HeaderVec;

/// `s` with CR and LF replaced by spaces so it cannot break out of a status
/// line or header.
pub(crate) fn single_line(s: &str) -> Cow<'_, str> {
    if s.contains(['\r', '\n']) {
        Cow::Owned(s.replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(s)
    }
}

/// What the pipeline hands back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub status: u16,
    /// `"<code> <reason>"`
    pub status_line: String,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Output {
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Emit an HTTP/1.1 response: status line, headers, blank line, body.
    /// Line breaks inside the status line or a header are written as spaces.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "HTTP/1.1 {}\r\n", single_line(self.status_line.trim_end()))?;
        for (name, value) in &self.headers {
            write!(writer, "{}: {}\r\n", single_line(name), single_line(value))?;
        }
        writer.write_all(b"\r\n")?;
        if !self.body.is_empty() {
            writer.write_all(&self.body)?;
        }
        writer.flush()
    }

    /// Serialized HTTP/1.1 bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.body.len() + 128);
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }
}
