//! URI encoding for NGSI v2 attribute names
//!
//! Follows the ECMAScript `encodeURI` rules: every byte of the UTF-8 form is
//! percent-encoded except ASCII alphanumerics and `;,/?:@&=+$-_.!~*'()#`.
//! Brokers fed by other IoT agents see attribute keys encoded this way, so
//! the exact character set matters.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{NgsiClientError, Result};

/// Everything `encodeURI` escapes: all but alphanumerics and `;,/?:@&=+$-_.!~*'()#`
const ENCODE_URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Percent-encode a string the way `encodeURI` does
pub fn encode_uri(input: &str) -> String {
    utf8_percent_encode(input, ENCODE_URI).to_string()
}

/// Reverse [`encode_uri`]
///
/// `decode_uri(&encode_uri(s)) == s` for every `s`. Escapes that do not
/// decode to valid UTF-8 are an error.
pub fn decode_uri(input: &str) -> Result<String> {
    percent_decode_str(input)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| NgsiClientError::InvalidEncoding(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_unchanged() {
        assert_eq!(encode_uri("temperature"), "temperature");
        assert_eq!(encode_uri("Light_Status-1.0"), "Light_Status-1.0");
    }

    #[test]
    fn test_reserved_characters_kept() {
        assert_eq!(encode_uri("a/b?c=d&e#f"), "a/b?c=d&e#f");
    }

    #[test]
    fn test_space_and_percent_encoded() {
        assert_eq!(encode_uri("room temp"), "room%20temp");
        assert_eq!(encode_uri("100%"), "100%25");
        assert_eq!(encode_uri("[x]"), "%5Bx%5D");
    }

    #[test]
    fn test_non_ascii_encoded_as_utf8() {
        assert_eq!(encode_uri("température"), "temp%C3%A9rature");
        assert_eq!(encode_uri("°C"), "%C2%B0C");
        assert_eq!(encode_uri("\u{1F600}"), "%F0%9F%98%80");
        assert_eq!(encode_uri("%2F"), "%252F");
    }

    #[test]
    fn test_round_trip() {
        for name in [
            "temperature",
            "room temp",
            "100%",
            "a/b?c=d&e#f",
            "température °C",
            "%2F",
            "quote\"s<and>{braces}|pipe\\",
            "\u{1F600}",
            "tab\tnl\n",
        ] {
            assert_eq!(decode_uri(&encode_uri(name)).unwrap(), name);
        }
    }

    #[test]
    fn test_decode_plain_escapes() {
        assert_eq!(decode_uri("a%20b").unwrap(), "a b");
        assert_eq!(decode_uri("%F0%9F%98%80").unwrap(), "\u{1F600}");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_uri("%C3").is_err());
        assert!(decode_uri("%FF%FE").is_err());
    }
}
