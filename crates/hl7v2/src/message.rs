use crate::{Hl7Error, Hl7Result};

/// Delimiters declared by a message header (`MSH-1` and `MSH-2`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl Delimiters {
    /// Reads the delimiters from the start of an MSH line.
    fn from_header(line: &str) -> Hl7Result<Self> {
        let mut chars = line.chars().skip(3);
        let field = chars
            .next()
            .ok_or_else(|| Hl7Error::InvalidEncoding("missing field separator".into()))?;
        if field.is_ascii_alphanumeric() || field.is_whitespace() {
            return Err(Hl7Error::InvalidEncoding(format!(
                "'{field}' cannot be used as a field separator"
            )));
        }

        let encoding: Vec<char> = chars.take_while(|c| *c != field).collect();
        if encoding.len() < 4 {
            return Err(Hl7Error::InvalidEncoding(format!(
                "expected 4 encoding characters, found {}",
                encoding.len()
            )));
        }

        let delimiters = Self {
            field,
            component: encoding[0],
            repetition: encoding[1],
            escape: encoding[2],
            subcomponent: encoding[3],
        };

        let all = [
            delimiters.field,
            delimiters.component,
            delimiters.repetition,
            delimiters.escape,
            delimiters.subcomponent,
        ];
        for (idx, c) in all.iter().enumerate() {
            if all[idx + 1..].contains(c) {
                return Err(Hl7Error::InvalidEncoding(format!(
                    "delimiter '{c}' is declared twice"
                )));
            }
        }

        Ok(delimiters)
    }
}

/// One segment: its name and its raw field texts.
///
/// `fields[0]` holds field 1. For `MSH` that is the field separator itself, so
/// header fields line up with their conventional numbering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    name: String,
    fields: Vec<String>,
}

impl Segment {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw text of a 1-based field, escape sequences untouched.
    pub fn raw_field(&self, field: usize) -> Option<&str> {
        field
            .checked_sub(1)
            .and_then(|idx| self.fields.get(idx))
            .map(String::as_str)
    }
}

/// A parsed, addressable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    delimiters: Delimiters,
    segments: Vec<Segment>,
}

impl Message {
    /// Splits message text into segments and fields.
    ///
    /// Segments may be separated by `\r`, `\n` or `\r\n`; blank lines are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Hl7Error`] if:
    /// - the text holds no segments,
    /// - the first segment is not `MSH`,
    /// - the header declares unusable delimiters,
    /// - a segment name is not three upper-case letters or digits.
    pub fn parse(text: &str) -> Hl7Result<Self> {
        let mut lines = text
            .split(['\r', '\n'])
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim_start_matches('\u{feff}')))
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines.next().ok_or(Hl7Error::Empty)?;
        if !header.starts_with("MSH") {
            let found: String = header.chars().take(3).collect();
            return Err(Hl7Error::MissingHeader(found));
        }

        let delimiters = Delimiters::from_header(header)?;

        let mut msh_fields: Vec<String> = header
            .split(delimiters.field)
            .skip(1)
            .map(str::to_string)
            .collect();
        msh_fields.insert(0, delimiters.field.to_string());

        let mut segments = vec![Segment {
            name: "MSH".to_string(),
            fields: msh_fields,
        }];

        for (line_no, line) in lines {
            let mut parts = line.split(delimiters.field);
            let name = parts.next().unwrap_or_default().trim();
            if !is_segment_name(name) {
                return Err(Hl7Error::InvalidSegment {
                    line: line_no,
                    name: name.to_string(),
                });
            }
            segments.push(Segment {
                name: name.to_string(),
                fields: parts.map(str::to_string).collect(),
            });
        }

        tracing::debug!(segments = segments.len(), "parsed HL7v2 message");

        Ok(Self {
            delimiters,
            segments,
        })
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The `repetition`-th (0-based) occurrence of `name`.
    pub fn segment(&self, name: &str, repetition: usize) -> Option<&Segment> {
        self.segments
            .iter()
            .filter(|s| s.name == name)
            .nth(repetition)
    }

    /// Decodes the standard escape sequences of a value.
    ///
    /// Unknown sequences (formatting commands, hex data) are kept verbatim.
    pub(crate) fn unescape(&self, value: &str) -> String {
        let esc = self.delimiters.escape;
        if !value.contains(esc) {
            return value.to_string();
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(esc) {
            out.push_str(&rest[..start]);
            let after = &rest[start + esc.len_utf8()..];
            match after.find(esc) {
                Some(end) => {
                    let decoded = match &after[..end] {
                        "F" => Some(self.delimiters.field),
                        "S" => Some(self.delimiters.component),
                        "T" => Some(self.delimiters.subcomponent),
                        "R" => Some(self.delimiters.repetition),
                        "E" => Some(esc),
                        _ => None,
                    };
                    match decoded {
                        Some(c) => out.push(c),
                        None => {
                            out.push(esc);
                            out.push_str(&after[..end]);
                            out.push(esc);
                        }
                    }
                    rest = &after[end + esc.len_utf8()..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn is_segment_name(name: &str) -> bool {
    name.len() == 3
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
