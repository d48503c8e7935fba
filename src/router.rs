//! Decides whether a file needs the null-aware front end at all.
//!
//! The check is a plain byte scan: any `??`, `?.` or `?[` routes the file
//! through the extended pipeline, even inside a string or comment. A false
//! positive only costs a parse; files without these symbols are handed to
//! the host unmodified.

use memchr::memchr_iter;
use serde::Serialize;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Extended,
    Passthrough,
}

pub fn route(name: &str, text: &str) -> Route {
    let bytes = text.as_bytes();
    let hit = memchr_iter(b'?', bytes).find(|&at| {
        matches!(bytes.get(at + 1), Some(b'?') | Some(b'.') | Some(b'['))
    });
    let route = match hit {
        Some(_) => Route::Extended,
        None => Route::Passthrough,
    };
    trace!(file = name, offset = ?hit, ?route, "routed");
    route
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_symbols_route_to_the_extended_pipeline() {
        assert_eq!(route("a", "x = y ?? 1\n"), Route::Extended);
        assert_eq!(route("a", "x ??= 1\n"), Route::Extended);
        assert_eq!(route("a", "x?.y\n"), Route::Extended);
        assert_eq!(route("a", "x?[0]\n"), Route::Extended);
    }

    #[test]
    fn plain_sources_pass_through() {
        assert_eq!(route("a", "x = 1\n"), Route::Passthrough);
        assert_eq!(route("a", "# what?\n"), Route::Passthrough);
        assert_eq!(route("a", "x = '?'\n"), Route::Passthrough);
        assert_eq!(route("a", "?"), Route::Passthrough);
    }
}
