use serde::Serialize;

/// Serialize a parse tree (or any parse result) to a pretty-printed JSON string.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).expect("parse tree serialization cannot fail")
}
