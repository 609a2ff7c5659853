//! Address creation and lookup use-cases.
//!
//! # Responsibility
//! - Validate submissions, block likely duplicates, assign a unique code and
//!   persist the address together with its verification queue item.
//! - Resolve addresses by code and run paged searches.
//!
//! # Invariants
//! - A conflicting or failed creation writes nothing.
//! - Code uniqueness is guarded by the storage constraint; the existence check
//!   only avoids pointless insert attempts. Both count toward `max_attempts`.
//! - A staged photo is released on every path that does not persist.

use super::duplicate_detector::{DuplicateCheck, DuplicateDetector};
use super::staged_photo::StagedPhoto;
use super::ErrorKind;
use crate::codegen::{validate_code, AddressCode, CodeFormatError, CodeGenerator, SuffixSource};
use crate::config::{CodeGenerationConfig, CoreConfig};
use crate::model::address::{
    normalize_category, validate_coordinates, validate_creation_coordinates, validate_radius,
    Address, AddressValidationError, VerificationStatus,
};
use crate::model::duplicate::DuplicateMatch;
use crate::model::now_epoch_ms;
use crate::model::verification::{QueueStatus, VerificationQueueItem, DEFAULT_VERIFICATION_TYPE};
use crate::repo::address_repo::{AddressPage, AddressRepository, AddressSearchQuery};
use crate::repo::RepoError;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Submission for a new address.
#[derive(Debug)]
pub struct CreateAddressRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub place_name: String,
    pub category: Option<String>,
    pub photo: Option<StagedPhoto>,
}

impl CreateAddressRequest {
    pub fn new(latitude: f64, longitude: f64, place_name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            place_name: place_name.into(),
            category: None,
            photo: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_photo(mut self, photo: StagedPhoto) -> Self {
        self.photo = Some(photo);
        self
    }
}

/// Public links for sharing an address code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    pub share_url: String,
    /// Keyed by the random code suffix.
    pub short_url: String,
}

impl ShareLinks {
    pub fn for_code(base_url: &str, code: &AddressCode) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            share_url: format!("{base}/{code}"),
            short_url: format!("{base}/s/{}", code.suffix()),
        }
    }
}

/// Result of a successful creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedAddress {
    pub address: Address,
    pub queue_item: VerificationQueueItem,
    pub links: ShareLinks,
}

/// Errors from address use-cases.
#[derive(Debug)]
pub enum AddressServiceError {
    Validation(AddressValidationError),
    InvalidCode(CodeFormatError),
    /// At least one likely duplicate exists. Carries the full ranked list.
    Conflict { candidates: Vec<DuplicateMatch> },
    /// No address has this code.
    NotFound(String),
    /// No unique code could be assigned within the attempt bound.
    Exhausted { attempts: u32 },
    Repo(RepoError),
}

impl AddressServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidCode(_) => ErrorKind::Validation,
            Self::Repo(RepoError::Validation(_)) => ErrorKind::Validation,
            Self::Conflict { .. } | Self::Repo(RepoError::CodeTaken(_)) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Exhausted { .. } => ErrorKind::Exhaustion,
            Self::Repo(_) => ErrorKind::Persistence,
        }
    }
}

impl Display for AddressServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidCode(err) => write!(f, "{err}"),
            Self::Conflict { candidates } => write!(
                f,
                "potential duplicate detected ({} nearby candidate(s))",
                candidates.len()
            ),
            Self::NotFound(code) => write!(f, "address not found: {code}"),
            Self::Exhausted { attempts } => write!(
                f,
                "unable to generate a unique address code after {attempts} attempt(s)"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AddressServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidCode(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Conflict { .. } | Self::NotFound(_) | Self::Exhausted { .. } => None,
        }
    }
}

impl From<AddressValidationError> for AddressServiceError {
    fn from(value: AddressValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CodeFormatError> for AddressServiceError {
    fn from(value: CodeFormatError) -> Self {
        Self::InvalidCode(value)
    }
}

impl From<RepoError> for AddressServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Address use-case service.
pub struct AddressService<R: AddressRepository, S: SuffixSource> {
    repo: R,
    generator: CodeGenerator<S>,
    detector: DuplicateDetector,
    codes: CodeGenerationConfig,
}

impl<R: AddressRepository, S: SuffixSource> AddressService<R, S> {
    /// Creates a service with default detection and code settings.
    pub fn new(repo: R, suffixes: S) -> Self {
        Self::with_config(repo, suffixes, CoreConfig::default())
    }

    pub fn with_config(repo: R, suffixes: S, config: CoreConfig) -> Self {
        Self {
            repo,
            generator: CodeGenerator::new(suffixes),
            detector: DuplicateDetector::new(config.detection),
            codes: config.codes,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Registers a new address.
    ///
    /// # Contract
    /// - Coordinates must be finite, on the globe and inside the country.
    /// - Fails with `Conflict` (nothing written) when any nearby address is a
    ///   likely duplicate.
    /// - Fails with `Exhausted` when every code candidate was already taken.
    /// - On success the address is `pending` with confidence 0 and has one
    ///   pending `photo_match` queue item.
    pub fn create_address(
        &mut self,
        request: CreateAddressRequest,
    ) -> Result<CreatedAddress, AddressServiceError> {
        let started_at = Instant::now();
        let CreateAddressRequest {
            latitude,
            longitude,
            place_name,
            category,
            photo,
        } = request;

        validate_creation_coordinates(latitude, longitude)?;
        let place_name = place_name.trim().to_string();
        if place_name.is_empty() {
            return Err(AddressValidationError::BlankPlaceName.into());
        }
        let category = normalize_category(category.as_deref());

        let candidates = self.detector.detect(
            &self.repo,
            &DuplicateCheck {
                latitude,
                longitude,
                place_name: place_name.clone(),
                category: Some(category.clone()),
                radius_m: None,
                exclude_id: None,
            },
        )?;
        if candidates.iter().any(DuplicateMatch::is_likely_duplicate) {
            info!(
                "event=address_create module=address status=conflict candidates={} duration_ms={}",
                candidates.len(),
                started_at.elapsed().as_millis()
            );
            return Err(AddressServiceError::Conflict { candidates });
        }

        let photo_ref = photo.as_ref().map(StagedPhoto::reference);
        let attempts = self.codes.max_attempts;
        for attempt in 1..=attempts {
            let code = match self.generator.generate(latitude, longitude) {
                Ok(code) => code,
                Err(err) => {
                    warn!(
                        "event=code_generate module=address status=error attempt={attempt} error={err}"
                    );
                    continue;
                }
            };
            let code_text = code.to_string();
            if self.repo.code_exists(&code_text)? {
                debug!("event=code_generate module=address status=taken attempt={attempt}");
                continue;
            }

            let now = now_epoch_ms();
            let address = Address {
                id: Uuid::new_v4(),
                code: code_text,
                latitude,
                longitude,
                place_name: place_name.clone(),
                category: category.clone(),
                verification_status: VerificationStatus::Pending,
                confidence_score: 0,
                photo_ref: photo_ref.clone(),
                created_at: now,
                updated_at: now,
            };
            let queue_item = VerificationQueueItem {
                id: Uuid::new_v4(),
                address_id: address.id,
                verification_type: DEFAULT_VERIFICATION_TYPE.to_string(),
                status: QueueStatus::Pending,
                ai_confidence: 0.0,
                created_at: now,
                processed_at: None,
            };

            match self.repo.insert_with_queue_item(&address, &queue_item) {
                Ok(()) => {
                    if let Some(photo) = photo {
                        photo.keep();
                    }
                    info!(
                        "event=address_create module=address status=ok code={} attempts={attempt} duration_ms={}",
                        address.code,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(CreatedAddress {
                        links: ShareLinks::for_code(&self.codes.share_base_url, &code),
                        address,
                        queue_item,
                    });
                }
                Err(RepoError::CodeTaken(taken)) => {
                    warn!(
                        "event=code_generate module=address status=race attempt={attempt} code={taken}"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(
            "event=address_create module=address status=exhausted attempts={attempts} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Err(AddressServiceError::Exhausted { attempts })
    }

    /// Scores an arbitrary submission against existing addresses (read-only).
    pub fn check_duplicates(
        &self,
        check: &DuplicateCheck,
    ) -> Result<Vec<DuplicateMatch>, AddressServiceError> {
        validate_coordinates(check.latitude, check.longitude)?;
        Ok(self.detector.detect(&self.repo, check)?)
    }

    /// Looks up one address by its public code.
    ///
    /// Malformed codes fail validation without touching storage.
    pub fn get_by_code(&self, code: &str) -> Result<Address, AddressServiceError> {
        if !validate_code(code) {
            return Err(CodeFormatError {
                input: code.to_string(),
            }
            .into());
        }
        self.repo
            .get_address_by_code(code)?
            .ok_or_else(|| AddressServiceError::NotFound(code.to_string()))
    }

    /// Paged search, newest first.
    pub fn search(&self, query: &AddressSearchQuery) -> Result<AddressPage, AddressServiceError> {
        if let Some(near) = query.near.as_ref() {
            validate_coordinates(near.latitude, near.longitude)?;
            validate_radius(near.radius_m)?;
        }
        Ok(self.repo.search(query)?)
    }
}
