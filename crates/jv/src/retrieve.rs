//! The default out-of-document resolver backend (SPEC_FULL.md §4.1, §10): dispatches
//! on URI scheme, fetching over HTTP(S) or from the local filesystem depending on
//! which `resolve-*` feature is enabled. Not registered automatically - callers that
//! want network/filesystem fetching opt in with `BuilderOptions::with_backend`.
use jv_referencing::{Retrieve, Uri};
use serde_json::Value;

/// Scheme-dispatching retriever: `http`/`https` via `reqwest::blocking` (behind
/// `resolve-http`), `file` via `std::fs` (behind `resolve-file`). Any other scheme,
/// or a disabled feature for the scheme seen, is an error.
pub struct DefaultRetriever;

impl Retrieve for DefaultRetriever {
    fn retrieve(&self, uri: &Uri<&str>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        match uri.scheme().as_str() {
            "http" | "https" => {
                #[cfg(feature = "resolve-http")]
                {
                    Ok(reqwest::blocking::get(uri.as_str())?.json()?)
                }
                #[cfg(not(feature = "resolve-http"))]
                {
                    Err("`resolve-http` feature or a custom backend is required to resolve external schemas via HTTP".into())
                }
            }
            "file" => {
                #[cfg(feature = "resolve-file")]
                {
                    let file = std::fs::File::open(uri.path().as_str())?;
                    Ok(serde_json::from_reader(file)?)
                }
                #[cfg(not(feature = "resolve-file"))]
                {
                    Err("`resolve-file` feature or a custom backend is required to resolve external schemas via files".into())
                }
            }
            scheme => Err(format!("unknown scheme {scheme}").into()),
        }
    }
}

#[cfg(all(test, feature = "resolve-file"))]
mod tests {
    use super::DefaultRetriever;
    use jv_referencing::{uri::from_str, Retrieve};
    use std::io::Write;

    #[test]
    fn reads_a_local_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"type\": \"string\"}}").unwrap();
        let url = url::Url::from_file_path(file.path()).unwrap();
        let uri = from_str(url.as_str()).unwrap();
        let fetched = DefaultRetriever.retrieve(&uri.borrow()).unwrap();
        assert_eq!(fetched, serde_json::json!({"type": "string"}));
    }
}
