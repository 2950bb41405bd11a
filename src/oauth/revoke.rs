//! `POST /revoke` — accepted for discovery-document completeness but
//! always a no-op; see `DESIGN.md`'s Open Question on revocation.

use axum::http::StatusCode;

/// `POST /revoke`
pub async fn revoke() -> StatusCode {
    StatusCode::OK
}
