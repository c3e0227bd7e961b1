//! Fehlertypen der HTTP-Schnittstelle

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use levelcast_broadcast::BroadcastError;
use levelcast_library::LibraryError;
use levelcast_protocol::ErrorResponse;
use thiserror::Error;

/// Alle Fehler, die ein Handler als HTTP-Antwort zurueckgeben kann
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Bibliothek(#[from] LibraryError),

    #[error("Server wird heruntergefahren")]
    Herunterfahren,

    #[error("Interner Fehler: {0}")]
    Intern(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<BroadcastError> for ApiError {
    fn from(e: BroadcastError) -> Self {
        match e {
            BroadcastError::RegistryGeschlossen(_) => Self::Herunterfahren,
            andere => Self::Intern(anyhow::Error::new(andere)),
        }
    }
}

/// HTTP-Statuscode fuer REST-Fehler
impl ApiError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Bibliothek(LibraryError::FehlendeDaten) => 400,
            Self::Bibliothek(LibraryError::Broadcast(BroadcastError::RegistryGeschlossen(_))) => {
                503
            }
            Self::Herunterfahren => 503,
            Self::Bibliothek(_) | Self::Intern(_) => 500,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "Anfrage fehlgeschlagen: {self}");
        }
        (status, Json(ErrorResponse::neu(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehlende_waveform_daten_sind_400() {
        let e = ApiError::from(LibraryError::FehlendeDaten);
        assert_eq!(e.http_status(), 400);
        assert_eq!(e.to_string(), "Missing name or data");
    }

    #[test]
    fn geschlossene_registry_ist_503() {
        let e = ApiError::from(BroadcastError::RegistryGeschlossen("audio".into()));
        assert_eq!(e.http_status(), 503);
        let e = ApiError::from(LibraryError::Broadcast(BroadcastError::RegistryGeschlossen(
            "waveform".into(),
        )));
        assert_eq!(e.http_status(), 503);
    }

    #[test]
    fn sonstige_fehler_sind_500() {
        assert_eq!(ApiError::from(BroadcastError::QueueVoll).http_status(), 500);
    }
}
