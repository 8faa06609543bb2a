use std::fmt::Display;

use serde::Serialize;

/// How an identifier was quoted in the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum QuoteCharacter {
    #[default]
    None,
    /// `"name"`
    Quote,
    /// `` `name` ``
    BackQuote,
    /// `[name]`
    Brackets,
}

impl QuoteCharacter {
    fn wrap(&self, value: &str) -> String {
        match self {
            Self::None => value.to_string(),
            Self::Quote => format!("\"{}\"", value.replace('"', "\"\"")),
            Self::BackQuote => format!("`{}`", value.replace('`', "``")),
            Self::Brackets => format!("[{}]", value),
        }
    }
}

/// Table, column or alias name as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Identifier {
    pub value: String,
    pub quote: QuoteCharacter,
}

impl Identifier {
    /// Unquoted identifier.
    pub fn new(value: &str) -> Self {
        Self {
            value: value.into(),
            quote: QuoteCharacter::None,
        }
    }

    pub fn quoted(value: &str, quote: QuoteCharacter) -> Self {
        Self {
            value: value.into(),
            quote,
        }
    }

    pub fn is_quoted(&self) -> bool {
        self.quote != QuoteCharacter::None
    }

    /// Unquoted on both sides compares case-insensitively,
    /// a quote on either side makes the comparison exact.
    pub fn matches(&self, other: &Identifier) -> bool {
        if self.is_quoted() || other.is_quoted() {
            self.value == other.value
        } else {
            self.value.eq_ignore_ascii_case(&other.value)
        }
    }

    /// Compare against a name from metadata or configuration.
    pub fn matches_name(&self, name: &str) -> bool {
        if self.is_quoted() {
            self.value == name
        } else {
            self.value.eq_ignore_ascii_case(name)
        }
    }

    /// Lookup key: folded to lowercase unless quoted.
    pub fn normalized(&self) -> String {
        if self.is_quoted() {
            self.value.clone()
        } else {
            self.value.to_lowercase()
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.quote.wrap(&self.value))
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_matches() {
        let unquoted = Identifier::new("Order_Id");
        assert!(unquoted.matches(&Identifier::new("order_id")));
        assert!(!unquoted.matches(&Identifier::quoted("order_id", QuoteCharacter::Quote)));
        assert!(Identifier::quoted("Order_Id", QuoteCharacter::BackQuote).matches(&unquoted));
        assert!(unquoted.matches_name("ORDER_ID"));
        assert!(!Identifier::quoted("Order_Id", QuoteCharacter::Quote).matches_name("order_id"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Identifier::new("t").to_string(), "t");
        assert_eq!(
            Identifier::quoted("a\"b", QuoteCharacter::Quote).to_string(),
            "\"a\"\"b\""
        );
        assert_eq!(
            Identifier::quoted("t", QuoteCharacter::Brackets).to_string(),
            "[t]"
        );
    }
}
