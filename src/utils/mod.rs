pub mod time;

/// Generates a url-safe unique id.
pub fn longid() -> String {
    nanoid::nanoid!()
}
