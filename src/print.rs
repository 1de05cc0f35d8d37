/// Print view URLs.

use crate::transform::TransformConfig;
use crate::Result;

/// `GET <endpoint>/print?text=<url-encoded text>`
pub fn print_url(config: &TransformConfig, text: &str) -> Result<url::Url> {
    let mut url = config.route("print")?;
    url.query_pairs_mut().append_pair("text", text);
    Ok(url)
}
