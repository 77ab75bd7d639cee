pub mod time;

/// Generate a new node id.
pub fn longid() -> String {
    nanoid::nanoid!()
}
