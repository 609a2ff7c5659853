use maptag_core::db::open_db_in_memory;
use maptag_core::model::address::{Address, AddressValidationError};
use maptag_core::scoring::{DistanceBucket, DuplicateDetectionConfig};
use maptag_core::{
    AddressService, AddressServiceError, CreateAddressRequest, DuplicateCheck, DuplicateDetector,
    ErrorKind, RandomSuffix, RepoError, SqliteAddressRepository,
};
use rusqlite::Connection;

fn seed(conn: &mut Connection) -> Vec<Address> {
    let repo = SqliteAddressRepository::try_new(conn).unwrap();
    let mut service = AddressService::new(repo, RandomSuffix::seeded(13));
    [
        (12.3, -1.4, "Shop A", "Commerce"),
        // ~22 m north of Shop A.
        (12.3002, -1.4, "Pharmacie Yennenga", "Health"),
        // ~1.1 km north, outside every default radius.
        (12.31, -1.4, "Shop A", "Commerce"),
    ]
    .into_iter()
    .map(|(lat, lon, name, category)| {
        service
            .create_address(CreateAddressRequest::new(lat, lon, name).with_category(category))
            .unwrap()
            .address
    })
    .collect()
}

#[test]
fn nearest_same_named_shop_is_top_likely_duplicate() {
    let mut conn = open_db_in_memory().unwrap();
    let seeded = seed(&mut conn);
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let detector = DuplicateDetector::default();

    let mut check = DuplicateCheck::new(12.30005, -1.4, "shop  a");
    check.category = Some("Commerce".to_string());
    let matches = detector.detect(&repo, &check).unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].address.id, seeded[0].id);
    assert!(matches[0].is_likely_duplicate());
    assert!(matches[0].distance_m < 10.0);
    assert_eq!(matches[0].scores.distance, 1.0);
    assert_eq!(matches[0].scores.category, 1.0);

    assert_eq!(matches[1].address.id, seeded[1].id);
    assert!(!matches[1].is_likely_duplicate());
    assert!(matches[1].scores.composite < matches[0].scores.composite);
    assert!(matches
        .iter()
        .all(|m| (0.0..=1.0).contains(&m.duplicate_probability())));
}

#[test]
fn radius_override_and_exclusion_apply() {
    let mut conn = open_db_in_memory().unwrap();
    let seeded = seed(&mut conn);
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
    let detector = DuplicateDetector::default();

    let mut wide = DuplicateCheck::new(12.3, -1.4, "Shop A");
    wide.radius_m = Some(2_000.0);
    let matches = detector.detect(&repo, &wide).unwrap();
    assert_eq!(matches.len(), 3);
    // Beyond every bucket the distance score bottoms out.
    let far = matches
        .iter()
        .find(|m| m.address.id == seeded[2].id)
        .unwrap();
    assert_eq!(far.scores.distance, 0.2);

    let mut excluding = DuplicateCheck::new(12.3, -1.4, "Shop A");
    excluding.exclude_id = Some(seeded[0].id);
    let matches = detector.detect(&repo, &excluding).unwrap();
    assert!(matches.iter().all(|m| m.address.id != seeded[0].id));
}

#[test]
fn empty_area_yields_no_candidates() {
    let mut conn = open_db_in_memory().unwrap();
    seed(&mut conn);
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();

    let matches = DuplicateDetector::default()
        .detect(&repo, &DuplicateCheck::new(10.6, -4.75, "Shop A"))
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn custom_thresholds_change_classification() {
    let mut conn = open_db_in_memory().unwrap();
    let seeded = seed(&mut conn);
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();

    let strict = DuplicateDetector::new(DuplicateDetectionConfig {
        radius_m: 30.0,
        distance_buckets: vec![DistanceBucket {
            max_distance_m: 1.0,
            score: 1.0,
        }],
        beyond_buckets_score: 0.0,
        likely_duplicate_threshold: 0.95,
        ..DuplicateDetectionConfig::default()
    });

    let mut check = DuplicateCheck::new(12.30005, -1.4, "Shop A");
    check.category = Some("Commerce".to_string());
    let matches = strict.detect(&repo, &check).unwrap();
    let shop = matches
        .iter()
        .find(|m| m.address.id == seeded[0].id)
        .unwrap();
    assert_eq!(shop.scores.distance, 0.0);
    assert!(!shop.is_likely_duplicate());
}

#[test]
fn service_check_duplicates_is_read_only() {
    let mut conn = open_db_in_memory().unwrap();
    seed(&mut conn);
    {
        let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();
        let service = AddressService::new(repo, RandomSuffix::seeded(1));
        let matches = service
            .check_duplicates(&DuplicateCheck::new(12.3, -1.4, "Shop A"))
            .unwrap();
        assert!(!matches.is_empty());
    }
    let total: i64 = conn
        .query_row("SELECT COUNT(*) FROM addresses;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(total, 3);
}

#[test]
fn negative_or_nan_radius_is_a_validation_error() {
    let mut conn = open_db_in_memory().unwrap();
    seed(&mut conn);
    let repo = SqliteAddressRepository::try_new(&mut conn).unwrap();

    let mut negative = DuplicateCheck::new(12.3, -1.4, "Shop A");
    negative.radius_m = Some(-1.0);
    assert!(matches!(
        DuplicateDetector::default().detect(&repo, &negative),
        Err(RepoError::Validation(AddressValidationError::InvalidRadius(_)))
    ));

    let nan_config = DuplicateDetector::new(DuplicateDetectionConfig {
        radius_m: f64::NAN,
        ..DuplicateDetectionConfig::default()
    });
    assert!(matches!(
        nan_config.detect(&repo, &DuplicateCheck::new(12.3, -1.4, "Shop A")),
        Err(RepoError::Validation(AddressValidationError::InvalidRadius(_)))
    ));

    let service = AddressService::new(repo, RandomSuffix::seeded(1));
    let mut nan_check = DuplicateCheck::new(12.3, -1.4, "Shop A");
    nan_check.radius_m = Some(f64::NAN);
    let err = service.check_duplicates(&nan_check).unwrap_err();
    assert!(matches!(
        err,
        AddressServiceError::Validation(AddressValidationError::InvalidRadius(_))
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut zero = DuplicateCheck::new(12.3, -1.4, "Shop A");
    zero.radius_m = Some(0.0);
    assert!(service.check_duplicates(&zero).is_ok());
}
