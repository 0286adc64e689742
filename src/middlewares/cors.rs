use actix_cors::Cors;

/// Permissive CORS for the learner web client; the gateway callback is
/// server-to-server and ignores it.
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
