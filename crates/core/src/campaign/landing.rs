//! Landing page URL derivation.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

static CHANNEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"channel=([A-Za-z]+)(\d+)").unwrap());

/// Landing URL for the item at `index` (0-based).
///
/// A `channel=<letters><digits>` parameter in `base` gets its number
/// incremented by `index`; without one, `base` is used unchanged. The
/// form-encoded query is appended to the result.
pub fn landing_url(base: &str, query: &str, index: usize) -> String {
    let base = if index == 0 {
        base.to_string()
    } else {
        CHANNEL
            .replace(base, |caps: &Captures| {
                let letters = &caps[1];
                let number = caps[2]
                    .parse::<u64>()
                    .ok()
                    .and_then(|n| n.checked_add(index as u64));
                match number {
                    Some(number) => format!("channel={}{}", letters, number),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    };
    format!("{}{}", base, encode_query(query))
}

fn encode_query(query: &str) -> String {
    urlencoding::encode(query.trim()).replace("%20", "+")
}
