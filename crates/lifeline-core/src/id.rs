/// Generate a new opaque entity id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
