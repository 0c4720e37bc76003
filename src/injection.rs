//! Injection Sanitizer (spec.md §4.6): guards write-side output against
//! spreadsheet formula injection.
//!
//! Grounded directly on spec.md's scenarios — no corpus example implements
//! this concern — built as small, pure, enum-dispatched functions in the
//! same style as `state_handlers`
//! (`examples/johnlogsdon-rust-csv-parser/src/lib.rs`).

use crate::config::{Configuration, InjectionOptions};
use crate::error::{Error, Result};
use crate::position::Position;

/// The result of running a field through the sanitizer.
pub(crate) struct Sanitized {
    /// The (possibly rewritten) field content.
    pub content: String,
    /// Forces the serializer's `should_quote` predicate to `true`, used by
    /// [`InjectionOptions::Escape`] on a field that was not already
    /// enclosed in quotes.
    pub force_quote: bool,
    /// When set, `content` is already in its final, fully-quoted wire form
    /// and the serializer must write it verbatim, bypassing the normal
    /// quote/escape encoding pass.
    pub already_quoted: bool,
}

/// Checks `field` against `config.injection_options()` and
/// `config.injection_characters()`, applying the configured policy.
pub(crate) fn sanitize(field: &str, config: &Configuration, position: Position) -> Result<Sanitized> {
    if matches!(config.injection_options(), InjectionOptions::None) {
        return Ok(passthrough(field));
    }

    let quote = config.quote();
    let chars: Vec<char> = field.chars().collect();
    let quoted = chars.len() >= 2 && chars[0] == quote && chars[chars.len() - 1] == quote;
    let check_pos = if quoted { 1 } else { 0 };

    if check_pos >= chars.len() || !config.injection_characters().contains(&chars[check_pos]) {
        return Ok(passthrough(field));
    }

    match config.injection_options() {
        InjectionOptions::None => unreachable!("handled above"),
        InjectionOptions::Exception => {
            Err(Error::InjectionDetected { field: field.to_string(), position })
        }
        InjectionOptions::Escape => {
            let mut out = chars.clone();
            out.insert(check_pos, config.injection_escape_character());
            Ok(Sanitized {
                content: out.into_iter().collect(),
                force_quote: !quoted,
                already_quoted: quoted,
            })
        }
        InjectionOptions::Strip => {
            let mut i = check_pos;
            while i < chars.len() && config.injection_characters().contains(&chars[i]) {
                i += 1;
            }
            let mut out: Vec<char> = chars[..check_pos].to_vec();
            out.extend_from_slice(&chars[i..]);
            Ok(Sanitized { content: out.into_iter().collect(), force_quote: false, already_quoted: quoted })
        }
    }
}

fn passthrough(field: &str) -> Sanitized {
    Sanitized { content: field.to_string(), force_quote: false, already_quoted: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configuration;

    fn cfg(options: InjectionOptions) -> Configuration {
        Configuration::builder().injection_options(options).build().unwrap()
    }

    #[test]
    fn none_leaves_field_untouched() {
        let config = cfg(InjectionOptions::None);
        let s = sanitize("=SUM(A1)", &config, Position::new()).unwrap();
        assert_eq!(s.content, "=SUM(A1)");
        assert!(!s.force_quote);
        assert!(!s.already_quoted);
    }

    #[test]
    fn exception_rejects_injection_prefix() {
        let config = cfg(InjectionOptions::Exception);
        let err = sanitize("=SUM(A1)", &config, Position::new()).unwrap_err();
        assert!(matches!(err, Error::InjectionDetected { .. }));
    }

    #[test]
    fn escape_prefixes_unquoted_field_and_forces_quoting() {
        let config = cfg(InjectionOptions::Escape);
        let s = sanitize("=SUM(A1)", &config, Position::new()).unwrap();
        assert_eq!(s.content, "'=SUM(A1)");
        assert!(s.force_quote);
        assert!(!s.already_quoted);
    }

    #[test]
    fn escape_on_prequoted_field_inserts_after_opening_quote() {
        let config = cfg(InjectionOptions::Escape);
        let s = sanitize("\"=A1\"", &config, Position::new()).unwrap();
        assert_eq!(s.content, "\"'=A1\"");
        assert!(s.already_quoted);
    }

    #[test]
    fn strip_removes_leading_injection_characters() {
        let config = cfg(InjectionOptions::Strip);
        let s = sanitize("@@cmd", &config, Position::new()).unwrap();
        assert_eq!(s.content, "cmd");
        assert!(!s.already_quoted);
    }

    #[test]
    fn strip_preserves_opening_quote_of_a_prequoted_field() {
        let config = cfg(InjectionOptions::Strip);
        let s = sanitize("\"@@cmd\"", &config, Position::new()).unwrap();
        assert_eq!(s.content, "\"cmd\"");
        assert!(s.already_quoted);
    }

    #[test]
    fn field_without_injection_prefix_is_unaffected() {
        let config = cfg(InjectionOptions::Strip);
        let s = sanitize("plain text", &config, Position::new()).unwrap();
        assert_eq!(s.content, "plain text");
    }
}
