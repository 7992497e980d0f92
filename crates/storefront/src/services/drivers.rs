//! Driver profile creation and edits.
//!
//! Shared by `POST /api/drivers`, `PATCH /api/drivers/{id}` and the
//! onboarding wizard. All of them go through the same handle, region, bio
//! and link checks.

use sqlx::PgPool;
use url::Url;

use openweed_core::chat::MAX_ROOM_LENGTH;
use openweed_core::{DriverHandle, UserRole};

use crate::db::{DriverRepository, RepositoryError};
use crate::error::AppError;
use crate::models::{CurrentUser, Driver, DriverChanges, NewDriver, User};

pub const HANDLE_TAKEN: &str = "Handle already taken";
pub const MIN_BIO_LENGTH: usize = 20;
pub const MAX_BIO_LENGTH: usize = 2000;

/// Fields a new profile starts with.
#[derive(Debug, Clone)]
pub struct ProfileInput {
    pub handle: String,
    pub region: String,
    pub bio: Option<String>,
    pub license: Option<String>,
}

/// A created profile and, when the owner was promoted, their updated account.
#[derive(Debug)]
pub struct CreatedProfile {
    pub driver: Driver,
    pub promoted: Option<User>,
}

pub struct DriverService<'a> {
    drivers: DriverRepository<'a>,
}

impl<'a> DriverService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            drivers: DriverRepository::new(pool),
        }
    }

    /// Create the caller's profile. A buyer is promoted to driver in the
    /// same transaction when `promote` is set.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` for an invalid or taken handle, a blank region,
    /// a bio or license link that fails validation, or a caller who already
    /// owns a profile.
    pub async fn create_profile(
        &self,
        user: &CurrentUser,
        input: &ProfileInput,
        promote: bool,
    ) -> Result<CreatedProfile, AppError> {
        let handle = DriverHandle::parse(&input.handle)?;
        let region = normalize_region(&input.region)?;
        let bio = validate_bio(input.bio.clone())?;
        let license = validate_optional_link("License", input.license.clone())?;

        if self.drivers.get_by_user(user.id).await?.is_some() {
            return Err(AppError::BadRequest(
                "You already have a driver profile".to_string(),
            ));
        }
        if self.drivers.handle_taken(handle.as_str(), None).await? {
            return Err(AppError::BadRequest(HANDLE_TAKEN.to_string()));
        }

        let new = NewDriver {
            user_id: user.id,
            handle,
            region,
            bio,
            license,
        };

        let created = if promote && user.role == UserRole::Buyer {
            self.drivers
                .create_and_promote(&new)
                .await
                .map(|(driver, user)| CreatedProfile {
                    driver,
                    promoted: Some(user),
                })
        } else {
            self.drivers.create(&new).await.map(|driver| CreatedProfile {
                driver,
                promoted: None,
            })
        };

        // A concurrent signup can still win the unique index
        let created = created.map_err(profile_write_error)?;

        tracing::info!(
            driver_id = %created.driver.id,
            handle = %created.driver.handle,
            region = %created.driver.region,
            "driver profile created"
        );
        Ok(created)
    }

    /// Apply `changes` to `driver`. Authorization is the caller's job.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` when a new handle is taken.
    pub async fn update_profile(
        &self,
        driver: &Driver,
        changes: &DriverChanges,
    ) -> Result<Driver, AppError> {
        if let Some(handle) = &changes.handle
            && self
                .drivers
                .handle_taken(handle.as_str(), Some(driver.id))
                .await?
        {
            return Err(AppError::BadRequest(HANDLE_TAKEN.to_string()));
        }

        self.drivers
            .update(driver.id, changes)
            .await
            .map_err(profile_write_error)
    }
}

/// The handle index is the only unique constraint a profile write can hit.
fn profile_write_error(err: RepositoryError) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound("Driver not found".to_string()),
        RepositoryError::Conflict(_) => AppError::BadRequest(HANDLE_TAKEN.to_string()),
        other => other.into(),
    }
}

/// Region keys are lower-case slugs such as `austin-central`.
///
/// # Errors
///
/// `AppError::BadRequest` for a blank or oversized key.
pub fn normalize_region(raw: &str) -> Result<String, AppError> {
    let region = raw.trim().to_lowercase();
    if region.is_empty() {
        return Err(AppError::BadRequest("Region is required".to_string()));
    }
    if region.chars().count() > MAX_ROOM_LENGTH {
        return Err(AppError::BadRequest("Region is too long".to_string()));
    }
    Ok(region)
}

/// Trimmed bio, `None` when blank.
///
/// # Errors
///
/// `AppError::BadRequest` outside [`MIN_BIO_LENGTH`]..=[`MAX_BIO_LENGTH`]
/// characters.
pub fn validate_bio(bio: Option<String>) -> Result<Option<String>, AppError> {
    let Some(bio) = bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()) else {
        return Ok(None);
    };
    let length = bio.chars().count();
    if length < MIN_BIO_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Bio must be at least {MIN_BIO_LENGTH} characters"
        )));
    }
    if length > MAX_BIO_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Bio must be at most {MAX_BIO_LENGTH} characters"
        )));
    }
    Ok(Some(bio))
}

/// Documents and avatars are stored as links; only http(s) is accepted.
///
/// # Errors
///
/// `AppError::BadRequest` naming `field` when `raw` is not an http(s) URL.
pub fn validate_link(field: &str, raw: &str) -> Result<String, AppError> {
    let invalid = || AppError::BadRequest(format!("{field} must be a valid URL"));
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    Ok(url.into())
}

/// [`validate_link`] for optional fields; blank means absent.
///
/// # Errors
///
/// As [`validate_link`].
pub fn validate_optional_link(
    field: &str,
    raw: Option<String>,
) -> Result<Option<String>, AppError> {
    raw.filter(|r| !r.trim().is_empty())
        .map(|r| validate_link(field, &r))
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region("  Austin-Central ").unwrap(), "austin-central");
        assert!(normalize_region("   ").is_err());
        assert!(normalize_region(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_duplicate_handle_is_bad_request() {
        let err = profile_write_error(RepositoryError::Conflict(
            "driver_profile_handle_key".to_string(),
        ));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.client_message(), HANDLE_TAKEN);

        let err = profile_write_error(RepositoryError::NotFound);
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bio_bounds() {
        assert!(validate_bio(Some("too short".into())).is_err());
        assert!(validate_bio(Some("   ".into())).unwrap().is_none());
        assert_eq!(
            validate_bio(Some(format!("  {}  ", "a".repeat(MIN_BIO_LENGTH)))).unwrap(),
            Some("a".repeat(MIN_BIO_LENGTH))
        );
        let err = validate_bio(Some("b".repeat(MAX_BIO_LENGTH + 1))).unwrap_err();
        assert_eq!(err.client_message(), "Bio must be at most 2000 characters");
    }

    #[test]
    fn test_links_must_be_http() {
        assert!(validate_link("License", "https://example.com/l.pdf").is_ok());
        assert!(validate_link("License", "javascript:alert(1)").is_err());
        assert!(validate_link("License", "not a url").is_err());
        assert_eq!(
            validate_link("Avatar", "data:image/png;base64,AAAA")
                .unwrap_err()
                .client_message(),
            "Avatar must be a valid URL"
        );
    }

    #[test]
    fn test_optional_links() {
        assert_eq!(validate_optional_link("License", None).unwrap(), None);
        assert_eq!(validate_optional_link("License", Some("  ".into())).unwrap(), None);
        assert!(validate_optional_link("License", Some("ftp://x.dev/a".into())).is_err());
    }
}
