use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub mail: MailConfig,
}

#[derive(Clone)]
pub struct MailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/rendezvous".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            mail: MailConfig::from_env(),
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Self {
        Self {
            // defaults point at a local development relay (e.g. MailHog)
            smtp_server: env::var("SMTP_SERVER").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1025),
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: env::var("MAIL_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@rendezvous.local".to_string()),
            from_name: env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "RendezVous".to_string()),
        }
    }
}
