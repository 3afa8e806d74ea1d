//! Description templates.
//!
//! A template holds exactly one substitution slot that receives the
//! abbreviated commit hash (or the fallback literal). Supported directives:
//!
//! - `%s` / `%1$s` - the slot, inserted as-is
//! - `%S` / `%1$S` - the slot, upper-cased
//! - `%%` - a literal `%`
//! - `%n` - a newline
//!
//! Literal text may also reference properties as `${name}`. References are
//! expanded from a lookup at render time; undefined ones are left untouched.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template {template:?} has no %s substitution slot")]
    MissingSlot { template: String },
    #[error("template {template:?} has {count} substitution slots, expected exactly one")]
    TooManySlots { template: String, count: usize },
    #[error("unsupported conversion '%{conversion}' in template {template:?}")]
    UnsupportedConversion { template: String, conversion: char },
    #[error("template {template:?} ends with a dangling '%'")]
    DanglingPercent { template: String },
    #[error("positional slot {index} in template {template:?} is out of range, only 1 is allowed")]
    PositionOutOfRange { template: String, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot { upper: bool },
}

/// A parsed description template with exactly one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionTemplate {
    segments: Vec<Segment>,
}

impl DescriptionTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut slots = 0;
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            let Some(next) = chars.next() else {
                return Err(TemplateError::DanglingPercent {
                    template: template.to_string(),
                });
            };

            let conversion = match next {
                '%' => {
                    literal.push('%');
                    continue;
                }
                'n' => {
                    literal.push('\n');
                    continue;
                }
                d if d.is_ascii_digit() => {
                    let mut digits = String::from(d);
                    while let Some(&d) = chars.peek()
                        && d.is_ascii_digit()
                    {
                        digits.push(d);
                        chars.next();
                    }
                    if chars.next() != Some('$') {
                        return Err(TemplateError::UnsupportedConversion {
                            template: template.to_string(),
                            conversion: d,
                        });
                    }
                    // Unparseable means the index overflowed, which is out of range anyway
                    let index = digits.parse::<usize>().unwrap_or(usize::MAX);
                    if index != 1 {
                        return Err(TemplateError::PositionOutOfRange {
                            template: template.to_string(),
                            index,
                        });
                    }
                    match chars.next() {
                        Some(c) => c,
                        None => {
                            return Err(TemplateError::DanglingPercent {
                                template: template.to_string(),
                            });
                        }
                    }
                }
                other => other,
            };

            let upper = match conversion {
                's' => false,
                'S' => true,
                other => {
                    return Err(TemplateError::UnsupportedConversion {
                        template: template.to_string(),
                        conversion: other,
                    });
                }
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Slot { upper });
            slots += 1;
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        match slots {
            0 => Err(TemplateError::MissingSlot {
                template: template.to_string(),
            }),
            1 => Ok(Self { segments }),
            count => Err(TemplateError::TooManySlots {
                template: template.to_string(),
                count,
            }),
        }
    }

    /// Substitute `value` into the slot, leaving `${...}` references as written.
    pub fn render(&self, value: &str) -> String {
        self.render_with(value, |_| None)
    }

    /// Substitute `value` into the slot and expand `${name}` references in the
    /// literal text through `lookup`.
    pub fn render_with<F>(&self, value: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(&interpolate(text, &lookup)),
                Segment::Slot { upper: false } => out.push_str(value),
                Segment::Slot { upper: true } => out.push_str(&value.to_uppercase()),
            }
        }
        out
    }
}

/// Expand `${name}` references. Unterminated and undefined references are
/// copied through unchanged.
fn interpolate<F>(text: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
