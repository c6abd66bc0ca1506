//! The CGI-style environment produced for each request.

use crate::{invalid, Error};
use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;

/// Method token, e.g. `GET`.
pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
/// Path and query, never the fragment.
pub const REQUEST_URI: &str = "REQUEST_URI";
/// Path component of the request uri.
pub const REQUEST_PATH: &str = "REQUEST_PATH";
/// Same as `REQUEST_PATH`.
pub const PATH_INFO: &str = "PATH_INFO";
/// Query component, empty if the uri has no `?`.
pub const QUERY_STRING: &str = "QUERY_STRING";
/// Fragment component. Absent if the uri has no `#`.
pub const FRAGMENT: &str = "FRAGMENT";
/// Version from the request line, e.g. `HTTP/1.1`.
pub const HTTP_VERSION: &str = "HTTP_VERSION";
/// Same as `HTTP_VERSION`.
pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";
/// Always `CGI/1.2`.
pub const GATEWAY_INTERFACE: &str = "GATEWAY_INTERFACE";
/// Always `http`.
pub const URL_SCHEME: &str = "URL_SCHEME";
/// Host name part of the `Host` header, or `localhost`.
pub const SERVER_NAME: &str = "SERVER_NAME";
/// Port part of the `Host` header, or `80`.
pub const SERVER_PORT: &str = "SERVER_PORT";
/// The `Content-Type` header.
pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
/// The `Content-Length` header.
pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
/// The `Host` header.
pub const HTTP_HOST: &str = "HTTP_HOST";

const CGI_VERSION: &str = "CGI/1.2";
const SCHEME: &str = "http";
const DEFAULT_PORT: &str = "80";
const DEFAULT_SERVER_NAME: &str = "localhost";

/// String to string mapping of request metadata, keyed the way CGI gateways expect.
///
/// Header fields end up as `HTTP_<NAME>` with the name uppercased and `-` replaced
/// by `_`, except `Content-Type` and `Content-Length` which are `CONTENT_TYPE` and
/// `CONTENT_LENGTH`. Repeated headers are joined with `, `.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Environment(HashMap<String, String>);

impl Environment {
    pub(crate) fn new() -> Self {
        let mut env = Environment(HashMap::with_capacity(32));
        env.set(GATEWAY_INTERFACE, CGI_VERSION);
        env.set(URL_SCHEME, SCHEME);
        env
    }

    /// Get the value of a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    /// Tells if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Tells if there are no keys. Only the case for a failed request.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate all key/value pairs in arbitrary order.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.0.iter())
    }

    /// The underlying map.
    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }

    fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub(crate) fn clear(&mut self) {
        self.0.clear();
    }

    pub(crate) fn set_method(&mut self, method: &[u8]) {
        self.set(REQUEST_METHOD, &String::from_utf8_lossy(method));
    }

    /// Split the raw request uri at the first `?` and `#` (already located by the parser).
    pub(crate) fn set_uri(
        &mut self,
        raw: &[u8],
        query_at: Option<usize>,
        fragment_at: Option<usize>,
    ) {
        let raw = String::from_utf8_lossy(raw);
        let end = fragment_at.unwrap_or(raw.len());
        let path_end = query_at.unwrap_or(end);

        self.set(REQUEST_URI, &raw[..end]);
        self.set(REQUEST_PATH, &raw[..path_end]);
        self.set(PATH_INFO, &raw[..path_end]);

        match query_at {
            Some(q) => self.set(QUERY_STRING, &raw[(q + 1)..end]),
            None => self.set(QUERY_STRING, ""),
        }

        if let Some(f) = fragment_at {
            self.set(FRAGMENT, &raw[(f + 1)..]);
        }
    }

    pub(crate) fn set_version(&mut self, version: &[u8]) {
        let version = String::from_utf8_lossy(version);
        self.set(HTTP_VERSION, &version);
        self.set(SERVER_PROTOCOL, &version);
    }

    /// Add one header field. Repeats of a header are joined with `, `, except
    /// `host` which must be unique.
    pub(crate) fn add_header(&mut self, name: &[u8], value: &[u8]) -> Result<(), Error> {
        // `_` and `-` map to the same key.
        if name.contains(&b'_') {
            debug!("Ignoring header with underscore: {}", String::from_utf8_lossy(name));
            return Ok(());
        }

        let key = header_key(name);
        let value = String::from_utf8_lossy(value);

        if key == HTTP_VERSION {
            debug!("Ignoring header clashing with request line: {}", key);
            return Ok(());
        }

        match self.0.entry(key) {
            hash_map::Entry::Vacant(e) => {
                e.insert(value.into_owned());
            }
            hash_map::Entry::Occupied(mut e) => {
                if e.key() == CONTENT_LENGTH {
                    // joining lengths makes no sense, and disagreeing ones is an attack.
                    if e.get().as_str() != &*value {
                        debug!("Conflicting content-length: {} != {}", e.get(), value);
                        return invalid("conflicting content-length");
                    }
                    return Ok(());
                }
                if e.key() == HTTP_HOST {
                    debug!("Repeated host: {}, {}", e.get(), value);
                    return invalid("duplicate host");
                }
                let joined = e.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
        }

        Ok(())
    }

    /// Derive the keys that depend on the complete header set.
    pub(crate) fn finish_head(&mut self) {
        let (name, port) = match self.get(HTTP_HOST) {
            Some(host) => split_host(host),
            None => (DEFAULT_SERVER_NAME.to_string(), DEFAULT_PORT.to_string()),
        };
        self.0.insert(SERVER_NAME.to_string(), name);
        self.0.insert(SERVER_PORT.to_string(), port);
    }
}

/// Header name to environment key.
fn header_key(name: &[u8]) -> String {
    if name.eq_ignore_ascii_case(b"content-type") {
        return CONTENT_TYPE.to_string();
    }
    if name.eq_ignore_ascii_case(b"content-length") {
        return CONTENT_LENGTH.to_string();
    }

    let mut key = String::with_capacity(name.len() + 5);
    key.push_str("HTTP_");
    for &b in name {
        let c = if b == b'-' {
            '_'
        } else {
            b.to_ascii_uppercase() as char
        };
        key.push(c);
    }
    key
}

/// `host[:port]` into name and port. Bracketed ipv6 literals keep their colons.
fn split_host(host: &str) -> (String, String) {
    let split_at = if host.starts_with('[') {
        host.find(']')
            .and_then(|end| host[end..].find(':').map(|i| end + i))
    } else {
        host.find(':')
    };

    match split_at {
        Some(i) => (host[..i].to_string(), host[(i + 1)..].to_string()),
        None => (host.to_string(), DEFAULT_PORT.to_string()),
    }
}

/// Iterator over environment entries.
#[derive(Debug)]
pub struct Iter<'a>(hash_map::Iter<'a, String, String>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a Environment {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut keys: Vec<_> = self.0.iter().collect();
        keys.sort();
        f.debug_map().entries(keys).finish()
    }
}
