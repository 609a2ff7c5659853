use maptag_core::codegen::grid_token;
use maptag_core::db::open_db_in_memory;
use maptag_core::model::address::{Address, AddressId, AddressValidationError};
use maptag_core::model::duplicate::NearbyAddress;
use maptag_core::model::now_epoch_ms;
use maptag_core::model::verification::{
    QueueStatus, VerificationQueueItem, DEFAULT_VERIFICATION_TYPE,
};
use maptag_core::repo::address_repo::{
    AddressPage, AddressRepository, AddressSearchQuery, ProximityQuery, SqliteAddressRepository,
};
use maptag_core::repo::{AddressLookup, RepoError, RepoResult};
use maptag_core::{
    AddressService, AddressServiceError, CoreConfig, CreateAddressRequest, ErrorKind,
    RandomSuffix, StagedPhoto, SuffixSource, VerificationStatus,
};
use rusqlite::Connection;
use std::collections::VecDeque;
use uuid::Uuid;

struct ScriptedSuffix {
    queue: VecDeque<&'static str>,
}

impl ScriptedSuffix {
    fn new(suffixes: &[&'static str]) -> Self {
        Self {
            queue: suffixes.iter().copied().collect(),
        }
    }
}

impl SuffixSource for ScriptedSuffix {
    fn next_suffix(&mut self) -> String {
        self.queue.pop_front().unwrap_or("ZZZZ").to_string()
    }
}

#[test]
fn create_address_persists_pending_address_and_queue_item() {
    let mut conn = open_db_in_memory().unwrap();
    let created = {
        let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
        let mut service = AddressService::new(repo, RandomSuffix::seeded(7));
        service
            .create_address(
                CreateAddressRequest::new(12.3714, -1.5197, "  Boutique Wendé  ")
                    .with_category("Commerce"),
            )
            .unwrap()
    };

    let address = &created.address;
    assert!(address.code.starts_with("BF-OUA-7848-"));
    assert_eq!(address.place_name, "Boutique Wendé");
    assert_eq!(address.category, "Commerce");
    assert_eq!(address.verification_status, VerificationStatus::Pending);
    assert_eq!(address.confidence_score, 0);
    assert_eq!(address.photo_ref, None);

    assert_eq!(created.queue_item.address_id, address.id);
    assert_eq!(created.queue_item.status, QueueStatus::Pending);
    assert_eq!(created.queue_item.verification_type, DEFAULT_VERIFICATION_TYPE);
    assert_eq!(created.queue_item.ai_confidence, 0.0);

    let suffix = &address.code[address.code.len() - 4..];
    assert_eq!(
        created.links.share_url,
        format!("https://maptag.bf/{}", address.code)
    );
    assert_eq!(
        created.links.short_url,
        format!("https://maptag.bf/s/{suffix}")
    );

    assert_eq!(count(&conn, "addresses"), 1);
    assert_eq!(count(&conn, "verification_queue"), 1);
}

#[test]
fn missing_category_defaults_to_other() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let mut service = AddressService::new(repo, RandomSuffix::seeded(1));

    let created = service
        .create_address(CreateAddressRequest::new(11.18, -4.29, "Marché"))
        .unwrap();
    assert_eq!(created.address.category, "Other");
    assert!(created.address.code.starts_with("BF-BOB-"));
}

#[test]
fn invalid_input_is_rejected_without_writes() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
        let mut service = AddressService::new(repo, RandomSuffix::seeded(3));

        let outside = service
            .create_address(CreateAddressRequest::new(48.85, 2.35, "Paris"))
            .unwrap_err();
        assert!(matches!(
            outside,
            AddressServiceError::Validation(AddressValidationError::OutsideCountry { .. })
        ));
        assert_eq!(outside.kind(), ErrorKind::Validation);
        assert_eq!(outside.kind().http_status(), 400);

        let nan = service
            .create_address(CreateAddressRequest::new(f64::NAN, -1.5, "Kiosk"))
            .unwrap_err();
        assert!(matches!(
            nan,
            AddressServiceError::Validation(AddressValidationError::NonFiniteCoordinate)
        ));

        let blank = service
            .create_address(CreateAddressRequest::new(12.37, -1.52, "   "))
            .unwrap_err();
        assert!(matches!(
            blank,
            AddressServiceError::Validation(AddressValidationError::BlankPlaceName)
        ));
    }
    assert_eq!(count(&conn, "addresses"), 0);
}

#[test]
fn unusable_detection_radius_is_rejected_instead_of_skipping_conflicts() {
    let mut conn = open_db_in_memory().unwrap();
    for radius_m in [f64::NAN, -1.0, f64::INFINITY] {
        let mut config = CoreConfig::default();
        config.detection.radius_m = radius_m;
        let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
        let mut service = AddressService::with_config(repo, RandomSuffix::seeded(5), config);

        let err = service
            .create_address(CreateAddressRequest::new(12.37, -1.52, "Kiosk"))
            .unwrap_err();
        assert!(matches!(
            err,
            AddressServiceError::Validation(AddressValidationError::InvalidRadius(_))
        ));
        assert_eq!(err.kind().http_status(), 400);
    }
    assert_eq!(count(&conn, "addresses"), 0);
    assert_eq!(count(&conn, "verification_queue"), 0);
}

#[test]
fn search_rejects_negative_near_radius() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let service = AddressService::new(repo, RandomSuffix::seeded(6));

    let err = service
        .search(&AddressSearchQuery {
            near: Some(ProximityQuery {
                latitude: 12.37,
                longitude: -1.52,
                radius_m: -50.0,
                exclude_id: None,
            }),
            ..AddressSearchQuery::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        AddressServiceError::Validation(AddressValidationError::InvalidRadius(r)) if r == -50.0
    ));
}

#[test]
fn likely_duplicate_returns_conflict_and_writes_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
        let mut service = AddressService::new(repo, RandomSuffix::seeded(11));

        let first = service
            .create_address(
                CreateAddressRequest::new(12.3, -1.4, "Shop A").with_category("Commerce"),
            )
            .unwrap();

        let err = service
            .create_address(
                CreateAddressRequest::new(12.3, -1.4, "shop a").with_category("Commerce"),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.kind().http_status(), 409);
        match err {
            AddressServiceError::Conflict { candidates } => {
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].address.id, first.address.id);
                assert!(candidates[0].is_likely_duplicate());
                assert!((candidates[0].duplicate_probability() - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(count(&conn, "addresses"), 1);
    assert_eq!(count(&conn, "verification_queue"), 1);
}

#[test]
fn unrelated_neighbour_does_not_block_creation() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let mut service = AddressService::new(repo, RandomSuffix::seeded(5));

    service
        .create_address(CreateAddressRequest::new(12.3, -1.4, "Shop A").with_category("Commerce"))
        .unwrap();
    // About 14 m north, different name and category.
    let created = service
        .create_address(
            CreateAddressRequest::new(12.30013, -1.4, "Pharmacie du Centre")
                .with_category("Health"),
        )
        .unwrap();
    assert_eq!(created.address.category, "Health");
}

#[test]
fn taken_codes_are_retried_until_a_free_one_is_found() {
    let (lat, lon) = (12.3714, -1.5197);
    let mut conn = open_db_in_memory().unwrap();
    seed_codes(&mut conn, lat, lon, &["AAAA", "BBBB", "CCCC", "DDDD"]);

    let created = {
        let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
        let mut suffixes = ScriptedSuffix::new(&["AAAA", "BBBB", "CCCC", "DDDD", "EEEE"]);
        let mut service = AddressService::new(repo, &mut suffixes);
        service
            .create_address(CreateAddressRequest::new(lat, lon, "Kiosk"))
            .unwrap()
    };

    assert_eq!(
        created.address.code,
        format!("BF-OUA-{}-EEEE", grid_token(lat, lon))
    );
    assert_eq!(count(&conn, "addresses"), 5);
}

#[test]
fn exhausted_code_attempts_fail_without_partial_write() {
    let (lat, lon) = (12.3714, -1.5197);
    let mut conn = open_db_in_memory().unwrap();
    seed_codes(&mut conn, lat, lon, &["AAAA"]);

    {
        let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
        let suffixes = ScriptedSuffix::new(&["AAAA"; 5]);
        let mut service = AddressService::new(repo, suffixes);
        let err = service
            .create_address(CreateAddressRequest::new(lat, lon, "Kiosk"))
            .unwrap_err();
        assert!(matches!(err, AddressServiceError::Exhausted { attempts: 5 }));
        assert_eq!(err.kind(), ErrorKind::Exhaustion);
        assert_eq!(err.kind().http_status(), 500);
    }
    assert_eq!(count(&conn, "addresses"), 1);
    assert_eq!(count(&conn, "verification_queue"), 1);
}

#[test]
fn malformed_suffixes_count_as_failed_attempts() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let suffixes = ScriptedSuffix::new(&["ab", "a-b!", "KEEP"]);
    let mut service = AddressService::new(repo, suffixes);

    let created = service
        .create_address(CreateAddressRequest::new(12.3714, -1.5197, "Kiosk"))
        .unwrap();
    assert!(created.address.code.ends_with("-KEEP"));
}

/// Reports every code as free, then loses the insert race a fixed number of times.
struct RacingRepo {
    races_left: u32,
    inserts: u32,
    stored: Vec<Address>,
}

impl AddressLookup for RacingRepo {
    fn get_address_by_code(&self, code: &str) -> RepoResult<Option<Address>> {
        Ok(self.stored.iter().find(|a| a.code == code).cloned())
    }

    fn get_address(&self, id: AddressId) -> RepoResult<Option<Address>> {
        Ok(self.stored.iter().find(|a| a.id == id).cloned())
    }
}

impl AddressRepository for RacingRepo {
    fn find_nearby(&self, _query: &ProximityQuery) -> RepoResult<Vec<NearbyAddress>> {
        Ok(Vec::new())
    }

    fn code_exists(&self, _code: &str) -> RepoResult<bool> {
        Ok(false)
    }

    fn insert_with_queue_item(
        &mut self,
        address: &Address,
        _queue_item: &VerificationQueueItem,
    ) -> RepoResult<()> {
        self.inserts += 1;
        if self.races_left > 0 {
            self.races_left -= 1;
            return Err(RepoError::CodeTaken(address.code.clone()));
        }
        self.stored.push(address.clone());
        Ok(())
    }

    fn search(&self, _query: &AddressSearchQuery) -> RepoResult<AddressPage> {
        Ok(AddressPage {
            addresses: self.stored.clone(),
            page: 1,
            limit: 20,
            total_count: self.stored.len() as u64,
            total_pages: 1,
        })
    }
}

#[test]
fn insert_constraint_race_is_retried_within_attempt_bound() {
    let repo = RacingRepo {
        races_left: 2,
        inserts: 0,
        stored: Vec::new(),
    };
    let mut service = AddressService::new(repo, RandomSuffix::seeded(9));
    service
        .create_address(CreateAddressRequest::new(12.3714, -1.5197, "Kiosk"))
        .unwrap();
    assert_eq!(service.repo().inserts, 3);
    assert_eq!(service.repo().stored.len(), 1);

    let always_racing = RacingRepo {
        races_left: u32::MAX,
        inserts: 0,
        stored: Vec::new(),
    };
    let mut service = AddressService::new(always_racing, RandomSuffix::seeded(9));
    let err = service
        .create_address(CreateAddressRequest::new(12.3714, -1.5197, "Kiosk"))
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::Exhausted { attempts: 5 }));
    assert_eq!(service.repo().inserts, 5);
    assert!(service.repo().stored.is_empty());
}

#[test]
fn staged_photo_is_kept_on_success_and_released_on_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let kept_path = dir.path().join("kept.jpg");
    let dropped_path = dir.path().join("dropped.jpg");
    std::fs::write(&kept_path, b"jpeg").unwrap();
    std::fs::write(&dropped_path, b"jpeg").unwrap();

    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let mut service = AddressService::new(repo, RandomSuffix::seeded(21));

    let created = service
        .create_address(
            CreateAddressRequest::new(12.3, -1.4, "Shop A")
                .with_category("Commerce")
                .with_photo(StagedPhoto::new(&kept_path)),
        )
        .unwrap();
    assert!(kept_path.exists());
    assert_eq!(
        created.address.photo_ref.as_deref(),
        Some(kept_path.to_string_lossy().as_ref())
    );

    let err = service
        .create_address(
            CreateAddressRequest::new(12.3, -1.4, "Shop A")
                .with_category("Commerce")
                .with_photo(StagedPhoto::new(&dropped_path)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(!dropped_path.exists());
}

#[test]
fn staged_photo_is_released_on_validation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.jpg");
    std::fs::write(&path, b"jpeg").unwrap();

    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let mut service = AddressService::new(repo, RandomSuffix::seeded(2));

    service
        .create_address(
            CreateAddressRequest::new(0.0, 0.0, "Null Island").with_photo(StagedPhoto::new(&path)),
        )
        .unwrap_err();
    assert!(!path.exists());
}

#[test]
fn get_by_code_validates_before_lookup() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let mut service = AddressService::new(repo, RandomSuffix::seeded(4));
    let created = service
        .create_address(CreateAddressRequest::new(12.3714, -1.5197, "Kiosk"))
        .unwrap();

    let found = service.get_by_code(&created.address.code).unwrap();
    assert_eq!(found, created.address);

    let malformed = service.get_by_code("bf-oua-7848-ab12").unwrap_err();
    assert!(matches!(malformed, AddressServiceError::InvalidCode(_)));
    assert_eq!(malformed.kind(), ErrorKind::Validation);

    let missing = service.get_by_code("BF-OUA-0000-ZZZZ").unwrap_err();
    assert!(matches!(missing, AddressServiceError::NotFound(_)));
    assert_eq!(missing.kind().http_status(), 404);
}

#[test]
fn search_filters_and_pages_newest_first() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let mut service = AddressService::new(repo, RandomSuffix::seeded(8));

    let places = [
        (12.37, -1.52, "Boulangerie Wendé", "Commerce"),
        (12.38, -1.53, "Pharmacie Yennenga", "Health"),
        (12.39, -1.54, "Boutique Sira", "Commerce"),
        (11.18, -4.29, "Boulangerie du Marché", "Commerce"),
    ];
    for (lat, lon, name, category) in places {
        service
            .create_address(CreateAddressRequest::new(lat, lon, name).with_category(category))
            .unwrap();
    }

    let commerce = service
        .search(&AddressSearchQuery {
            category: Some("Commerce".to_string()),
            limit: Some(2),
            ..AddressSearchQuery::default()
        })
        .unwrap();
    assert_eq!(commerce.total_count, 3);
    assert_eq!(commerce.total_pages, 2);
    assert_eq!(commerce.page, 1);
    assert_eq!(commerce.addresses.len(), 2);
    assert!(commerce.has_next());
    assert!(!commerce.has_prev());

    let second = service
        .search(&AddressSearchQuery {
            category: Some("Commerce".to_string()),
            page: 2,
            limit: Some(2),
            ..AddressSearchQuery::default()
        })
        .unwrap();
    assert_eq!(second.addresses.len(), 1);
    assert_eq!(second.addresses[0].place_name, "Boulangerie Wendé");

    let bakeries = service
        .search(&AddressSearchQuery {
            text: Some("boulangerie".to_string()),
            ..AddressSearchQuery::default()
        })
        .unwrap();
    assert_eq!(bakeries.total_count, 2);

    let near_ouaga = service
        .search(&AddressSearchQuery {
            near: Some(ProximityQuery {
                latitude: 12.37,
                longitude: -1.52,
                radius_m: 5_000.0,
                exclude_id: None,
            }),
            ..AddressSearchQuery::default()
        })
        .unwrap();
    assert_eq!(near_ouaga.total_count, 3);
    assert!(near_ouaga
        .addresses
        .iter()
        .all(|address| address.code.starts_with("BF-OUA-")));
}

fn seed_codes(conn: &mut Connection, lat: f64, lon: f64, suffixes: &[&str]) {
    let grid = grid_token(lat, lon);
    let mut repo = SqliteAddressRepository::try_new(conn).unwrap();
    for (index, suffix) in suffixes.iter().enumerate() {
        let now = now_epoch_ms();
        // Spread seeds across Bobo-Dioulasso so they never look like duplicates.
        let address = Address {
            id: Uuid::new_v4(),
            code: format!("BF-OUA-{grid}-{suffix}"),
            latitude: 11.0 + 0.01 * (index as f64 + 1.0),
            longitude: -4.29,
            place_name: format!("Seed {index}"),
            category: "Other".to_string(),
            verification_status: VerificationStatus::Pending,
            confidence_score: 0,
            photo_ref: None,
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
        repo.insert_with_queue_item(&address, &queue_item).unwrap();
    }
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
