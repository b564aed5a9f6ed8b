use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // Link store errors
    #[error("Failed to save link store to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load link store from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse link store '{path}': {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Seerr user '{seerr_username}' is already linked to Discord ID {discord_id}")]
    Conflict {
        discord_id: String,
        seerr_username: String,
    },

    // Webhook errors
    #[error("Webhook authorization failed")]
    WebhookAuth,

    #[error("Malformed webhook payload: {message}")]
    WebhookParse { message: String },

    // Delivery errors
    #[error("Rate limited by Discord")]
    RateLimited,

    #[error("Delivery failed: {message}")]
    Delivery { message: String },

    // External API errors
    #[error("Seerr API error: {message}")]
    SeerrApi { message: String },

    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        match &err {
            serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(resp))
                if resp.status_code.as_u16() == 429 =>
            {
                BotError::RateLimited
            }
            _ => BotError::Discord {
                message: err.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::SeerrApi {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
