use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64,
    pub refresh_token_maxage: i64,
    pub redis_url: String,
    pub port: u16,
    pub frontend_url: String,
    pub payment_currency: String,
    pub signed_url_expires_in: u64,
}

impl Config {
    /// Read the configuration from the process environment (after `.env` is loaded)
    pub fn init() -> Config {
        Config::from_lookup(|key| std::env::var(key).ok()).unwrap_or_else(|e| panic!("{}", e))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, String> {
        let required = |key: &str| lookup(key).ok_or_else(|| format!("{} must be set", key));

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET_KEY")?,
            jwt_maxage: parse(&required("JWT_MAXAGE")?, "JWT_MAXAGE")?,
            refresh_token_maxage: parse(
                &required("REFRESH_TOKEN_MAXAGE")?,
                "REFRESH_TOKEN_MAXAGE",
            )?,
            redis_url: required("REDIS_URL")?,
            port: match lookup("PORT") {
                Some(port) => parse(&port, "PORT")?,
                None => 8000,
            },
            frontend_url: required("FRONTEND_URL")?,
            payment_currency: lookup("PAYMENT_CURRENCY").unwrap_or_else(|| "KZT".to_string()),
            signed_url_expires_in: match lookup("SIGNED_URL_EXPIRES_IN") {
                Some(secs) => parse(&secs, "SIGNED_URL_EXPIRES_IN")?,
                None => 300,
            },
        })
    }
}

fn parse<T: FromStr>(value: &str, key: &str) -> Result<T, String> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| format!("{} has an invalid value: {}", key, value))
}
