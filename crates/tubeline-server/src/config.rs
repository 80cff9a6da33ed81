use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

use tubeline_media::CloudinaryConfig;

/// Secrets that must never reach a running server.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "changeme",
    "secret",
    "your-secret-here",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub access_token_secret: String,
    pub access_token_life: Duration,
    pub refresh_token_secret: String,
    pub refresh_token_life: Duration,
    /// `None` means any origin, without credentials.
    pub cors_origins: Option<Vec<String>>,
    pub cookie_secure: bool,
    pub upload_tmp_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cloudinary: Option<CloudinaryConfig>,
    pub media_local_dir: PathBuf,
    pub media_public_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let port = or("PORT", "8000")
            .parse()
            .context("PORT must be a port number")?;
        let max_upload_bytes = or("MAX_UPLOAD_BYTES", "536870912")
            .parse()
            .context("MAX_UPLOAD_BYTES must be a byte count")?;

        let cors_origin = or("CORS_ORIGIN", "*");
        let cors_origins = if cors_origin == "*" {
            None
        } else {
            Some(
                cors_origin
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect(),
            )
        };

        let cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                base_url: or("CLOUDINARY_BASE_URL", "https://api.cloudinary.com"),
            }),
            _ => None,
        };

        Ok(Self {
            host: or("HOST", "0.0.0.0"),
            port,
            database_path: or("DATABASE_PATH", "tubeline.db").into(),
            access_token_secret: secret(var("ACCESS_TOKEN_SECRET"), "ACCESS_TOKEN_SECRET")?,
            access_token_life: parse_lifetime(&or("ACCESS_TOKEN_LIFE", "1d"))
                .context("ACCESS_TOKEN_LIFE")?,
            refresh_token_secret: secret(var("REFRESH_TOKEN_SECRET"), "REFRESH_TOKEN_SECRET")?,
            refresh_token_life: parse_lifetime(&or("REFRESH_TOKEN_LIFE", "10d"))
                .context("REFRESH_TOKEN_LIFE")?,
            cors_origins,
            cookie_secure: matches!(or("COOKIE_SECURE", "false").as_str(), "true" | "1"),
            upload_tmp_dir: or("UPLOAD_TMP_DIR", "./public/temp").into(),
            max_upload_bytes,
            cloudinary,
            media_local_dir: or("MEDIA_LOCAL_DIR", "./public/media").into(),
            media_public_url: or("MEDIA_PUBLIC_URL", "http://localhost:8000/media")
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

fn secret(value: Option<String>, name: &str) -> anyhow::Result<String> {
    match value {
        Some(v) if !PLACEHOLDER_SECRETS.contains(&v.as_str()) => Ok(v),
        _ => bail!("{} is unset or still a placeholder", name),
    }
}

/// Parses `<n>{s|m|h|d}`, e.g. `15m` or `10d`. A bare number is seconds.
pub fn parse_lifetime(value: &str) -> anyhow::Result<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&value[..i], c),
        _ => (value, 's'),
    };
    let n: u64 = digits
        .parse()
        .with_context(|| format!("invalid lifetime {:?}", value))?;
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86_400,
        other => bail!("unknown lifetime unit {:?} in {:?}", other, value),
    };
    let Some(seconds) = n.checked_mul(scale) else {
        bail!("lifetime {:?} is too large", value);
    };
    if seconds == 0 {
        bail!("lifetime must be positive");
    }
    Ok(Duration::from_secs(seconds))
}
