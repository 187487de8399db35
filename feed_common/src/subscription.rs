//! Subscription request sent once per connection.
//!
//! The server recognizes the request by byte pattern only, so the text produced by
//! [`Subscription::request`] must not drift:
//!
//! ```text
//! GET /!U=<user>;W=<password>|S=<mode>|C=SUBS|P=<SYM>+<SYM>|T=<code>+<code> HTTP/1.1\r\n
//! Accept-Encoding: gzip, deflate\r\n
//! User-Agent: <agent>\r\n
//! Host: <host>:<port>\r\n
//! Connection: Keep-Alive\r\n
//! \r\n
//! ```
//!
//! One `S=` segment is emitted per subscription mode.
use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;
use crate::fields::FieldCode;
use crate::net::MAX_SYMBOLS;
use crate::result::Result;

/// Subscription mode used when none is configured.
pub const DEFAULT_MODE: &str = "QUOTE";
const REQUEST_PREFIX: &str = "GET /!";
const REQUEST_SUFFIX: &str = " HTTP/1.1";
const RESERVED_CHARS: &[char] = &['|', '+', ';', '=', ',', '/'];

/// Validated symbols, fields and credentials for one feed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Account name.
    pub user: String,
    /// Account password, sent in clear text.
    pub password: String,
    /// Subscription modes, in request order.
    pub modes: Vec<String>,
    /// Uppercase symbols without duplicates, in request order.
    pub symbols: Vec<String>,
    /// Requested field codes, ascending, without duplicates.
    pub fields: Vec<FieldCode>,
}

impl Subscription {
    /// Validates and normalizes a subscription with the default mode.
    pub fn new<S: AsRef<str>>(
        user: &str,
        password: &str,
        symbols: &[S],
        fields: &[FieldCode],
    ) -> Result<Self> {
        Self::with_modes(user, password, &[DEFAULT_MODE], symbols, fields)
    }

    /// Validates and normalizes a subscription with explicit modes.
    pub fn with_modes<M: AsRef<str>, S: AsRef<str>>(
        user: &str,
        password: &str,
        modes: &[M],
        symbols: &[S],
        fields: &[FieldCode],
    ) -> Result<Self> {
        check_token("user", user)?;
        check_token("password", password)?;

        if modes.is_empty() {
            return Err(FeedError::Config("at least one subscription mode is required".into()));
        }
        let modes = modes
            .iter()
            .map(|m| check_token("mode", m.as_ref()).map(|_| m.as_ref().to_string()))
            .collect::<Result<Vec<_>>>()?;

        let mut normalized: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = symbol.as_ref().trim().to_ascii_uppercase();
            check_token("symbol", &symbol)?;
            if symbol.is_empty() {
                return Err(FeedError::Config("empty symbol".into()));
            }
            if !normalized.contains(&symbol) {
                normalized.push(symbol);
            }
        }
        if normalized.is_empty() || normalized.len() > MAX_SYMBOLS {
            return Err(FeedError::Config(format!(
                "between 1 and {} symbols required, got {}",
                MAX_SYMBOLS,
                normalized.len()
            )));
        }

        let mut fields = fields.to_vec();
        fields.sort();
        fields.dedup();
        if fields.is_empty() {
            return Err(FeedError::Config("at least one field is required".into()));
        }

        Ok(Subscription {
            user: user.to_string(),
            password: password.to_string(),
            modes,
            symbols: normalized,
            fields,
        })
    }

    /// Renders the exact handshake bytes.
    pub fn request(&self, host: &str, port: u16, user_agent: &str) -> String {
        let mut segments = vec![format!("U={};W={}", self.user, self.password)];
        segments.extend(self.modes.iter().map(|m| format!("S={}", m)));
        segments.push("C=SUBS".to_string());
        segments.push(format!("P={}", self.symbols.join("+")));
        let codes: Vec<String> = self.fields.iter().map(|f| f.code().to_string()).collect();
        segments.push(format!("T={}", codes.join("+")));

        format!(
            "{}{}{}\r\nAccept-Encoding: gzip, deflate\r\nUser-Agent: {}\r\nHost: {}:{}\r\nConnection: Keep-Alive\r\n\r\n",
            REQUEST_PREFIX,
            segments.join("|"),
            REQUEST_SUFFIX,
            user_agent,
            host,
            port
        )
    }

    /// Parses the request line produced by [`Subscription::request`].
    pub fn parse_request(text: &str) -> Result<Self> {
        let line = text.lines().next().unwrap_or_default();
        let body = line
            .strip_prefix(REQUEST_PREFIX)
            .and_then(|l| l.strip_suffix(REQUEST_SUFFIX))
            .ok_or_else(|| FeedError::Format(format!("not a subscription request: {:?}", line)))?;

        let mut segments = body.split('|');
        let credentials = segments.next().unwrap_or_default();
        let (user, password) = credentials
            .strip_prefix("U=")
            .and_then(|c| c.split_once(";W="))
            .ok_or_else(|| FeedError::Format(format!("bad credentials segment: {:?}", credentials)))?;

        let mut modes = Vec::new();
        let mut symbols = Vec::new();
        let mut fields = Vec::new();
        for segment in segments {
            match segment.split_once('=') {
                Some(("S", mode)) => modes.push(mode.to_string()),
                Some(("C", _)) => {}
                Some(("P", list)) => symbols = list.split('+').map(str::to_string).collect(),
                Some(("T", list)) => {
                    fields = list
                        .split('+')
                        .map(|c| {
                            c.parse::<u8>()
                                .ok()
                                .and_then(FieldCode::from_u8)
                                .ok_or_else(|| FeedError::Format(format!("bad field code {:?}", c)))
                        })
                        .collect::<Result<Vec<_>>>()?;
                }
                _ => return Err(FeedError::Format(format!("unexpected segment {:?}", segment))),
            }
        }

        Self::with_modes(user, password, &modes, &symbols, &fields)
    }
}

fn check_token(what: &str, value: &str) -> Result<()> {
    if value.chars().any(|c| c.is_whitespace() || RESERVED_CHARS.contains(&c)) {
        return Err(FeedError::Config(format!(
            "{} {:?} contains a reserved character",
            what, value
        )));
    }
    Ok(())
}

/// Reads symbols separated by commas, spaces or new lines. Lines starting with
/// `#` are ignored.
pub fn read_symbols<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut symbols = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        symbols.extend(
            line.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Subscription {
        Subscription::new(
            "joe",
            "secret",
            &["msft", "aapl", "MSFT"],
            &[FieldCode::Ask, FieldCode::Symbol, FieldCode::Bid, FieldCode::Ask],
        )
        .unwrap()
    }

    #[test]
    fn test_normalization() {
        let sub = sample();
        assert_eq!(sub.symbols, vec!["MSFT", "AAPL"]);
        assert_eq!(sub.fields, vec![FieldCode::Symbol, FieldCode::Bid, FieldCode::Ask]);
        assert_eq!(sub.modes, vec!["QUOTE"]);
    }

    #[test]
    fn test_request_text_is_exact() {
        let text = sample().request("feed.example.com", 80, "Mozilla/4.0");
        assert_eq!(
            text,
            "GET /!U=joe;W=secret|S=QUOTE|C=SUBS|P=MSFT+AAPL|T=0+1+2 HTTP/1.1\r\n\
             Accept-Encoding: gzip, deflate\r\n\
             User-Agent: Mozilla/4.0\r\n\
             Host: feed.example.com:80\r\n\
             Connection: Keep-Alive\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_parse_request_roundtrip() {
        let sub = Subscription::with_modes(
            "joe",
            "pw",
            &["QUOTE", "NEWS"],
            &["IBM"],
            &[FieldCode::Last, FieldCode::Volume],
        )
        .unwrap();
        let parsed = Subscription::parse_request(&sub.request("h", 1, "ua")).unwrap();
        assert_eq!(parsed, sub);
    }

    #[test]
    fn test_symbol_limits() {
        let too_many: Vec<String> = (0..24).map(|i| format!("S{}", i)).collect();
        let err = Subscription::new("u", "p", &too_many, &[FieldCode::Bid]);
        assert!(matches!(err, Err(FeedError::Config(_))));

        let none: [&str; 0] = [];
        assert!(Subscription::new("u", "p", &none, &[FieldCode::Bid]).is_err());
        assert!(Subscription::new("u", "p", &["A+B"], &[FieldCode::Bid]).is_err());
        assert!(Subscription::new("u", "p", &["A"], &[]).is_err());
    }

    fn request_line(body: &str) -> String {
        format!("GET /!{} HTTP/1.1\r\nHost: h:1\r\n\r\n", body)
    }

    #[test]
    fn test_parse_request_rejects_bad_field_codes() {
        let out_of_table = request_line("U=u;W=p|S=QUOTE|C=SUBS|P=IBM|T=1+99");
        assert!(matches!(Subscription::parse_request(&out_of_table), Err(FeedError::Format(_))));

        let not_numeric = request_line("U=u;W=p|S=QUOTE|C=SUBS|P=IBM|T=x");
        assert!(matches!(Subscription::parse_request(&not_numeric), Err(FeedError::Format(_))));

        let empty = request_line("U=u;W=p|S=QUOTE|C=SUBS|P=IBM|T=");
        assert!(Subscription::parse_request(&empty).is_err());
    }

    #[test]
    fn test_parse_request_rejects_unexpected_segment() {
        let text = request_line("U=u;W=p|S=QUOTE|C=SUBS|P=IBM|T=1|Z=1");
        assert!(matches!(Subscription::parse_request(&text), Err(FeedError::Format(_))));

        let no_credentials = request_line("S=QUOTE|C=SUBS|P=IBM|T=1");
        assert!(matches!(Subscription::parse_request(&no_credentials), Err(FeedError::Format(_))));
    }

    #[test]
    fn test_parse_request_rejects_symbol_count() {
        let symbols: Vec<String> = (0..24).map(|i| format!("S{}", i)).collect();
        let text = request_line(&format!("U=u;W=p|S=QUOTE|C=SUBS|P={}|T=1", symbols.join("+")));
        assert!(matches!(Subscription::parse_request(&text), Err(FeedError::Config(_))));

        let accepted = request_line("U=u;W=p|S=QUOTE|C=SUBS|P=IBM+GE|T=1+2");
        let sub = Subscription::parse_request(&accepted).unwrap();
        assert_eq!(sub.symbols, vec!["IBM", "GE"]);
        assert_eq!(sub.fields, vec![FieldCode::Bid, FieldCode::Ask]);
    }

    #[test]
    fn test_read_symbols() {
        let input = "aapl, msft\n# comment\n\n ibm\tge \n";
        let symbols = read_symbols(Cursor::new(input)).unwrap();
        assert_eq!(symbols, vec!["aapl", "msft", "ibm", "ge"]);
    }
}
