//! Parsing of provider redirect callbacks.

use url::{form_urlencoded, Url};

/// Parameters recognized on an authorization redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub access_token: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Read callback parameters from the URI fragment and query string.
    ///
    /// A parameter present in the fragment wins over the same parameter in the query.
    pub fn parse(url: &Url) -> Self {
        let mut params = Self::default();
        if let Some(query) = url.query() {
            params.merge(query);
        }
        if let Some(fragment) = url.fragment() {
            params.merge(fragment);
        }
        params
    }

    fn merge(&mut self, encoded: &str) {
        for (key, value) in form_urlencoded::parse(encoded.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "state" => &mut self.state,
                "code" => &mut self.code,
                "access_token" => &mut self.access_token,
                "error" => &mut self.error,
                "error_description" => &mut self.error_description,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
    }
}
