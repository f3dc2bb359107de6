//! Labels that point a diagnostic at a named design entity.

use serde::{Deserialize, Serialize};

/// The visual style of a diagnostic label.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum LabelStyle {
    /// The entity the diagnostic is primarily about.
    Primary,
    /// An entity providing additional context.
    Secondary,
}

/// An annotation naming one design entity (an update block, a method, or a
/// variable path) with an explanatory message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Display name of the entity, e.g. `block up1 (#0)` or `top.msg.a`.
    pub subject: String,
    /// The message shown next to the subject.
    pub message: String,
    /// Whether this is a primary or secondary label.
    pub style: LabelStyle,
}

impl Label {
    /// Creates a primary label.
    pub fn primary(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    /// Creates a secondary label.
    pub fn secondary(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_label() {
        let label = Label::primary("block up1 (#0)", "writes `a`");
        assert_eq!(label.style, LabelStyle::Primary);
        assert_eq!(label.subject, "block up1 (#0)");
        assert_eq!(label.message, "writes `a`");
    }

    #[test]
    fn secondary_label() {
        let label = Label::secondary("top.a", "declared here");
        assert_eq!(label.style, LabelStyle::Secondary);
    }
}
