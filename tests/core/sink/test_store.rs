//! On-disk store durability and status

use crate::common::{create_test_services, index_repo, TestRepo};
use sgrep::core::ingest::change::fingerprint;
use sgrep::core::sink::{FileStore, IndexSink};

#[test]
fn test_store_survives_reopen() {
    let (services, store_dir) = create_test_services();
    let repo = TestRepo::small();
    index_repo(&services, repo.path(), false);

    let store = FileStore::open_existing(store_dir.path(), "default").unwrap();
    let info = store.get_info().unwrap();
    assert_eq!(info.name, "default");
    assert_eq!(info.file_count, 8);
    assert!(info.last_updated.is_some());

    let main = "fn main() { println!(\"Hello\"); }\n";
    let entry = store.entry("src/main.rs").unwrap();
    assert_eq!(entry.fingerprint, fingerprint(main.as_bytes()));
    assert_eq!(store.read_content("src/main.rs").unwrap(), main);
}

#[test]
fn test_named_stores_are_isolated() {
    let (services, store_dir) = create_test_services();
    let repo = TestRepo::small();
    index_repo(&services, repo.path(), false);

    let other = services.open_store(Some("other")).unwrap();
    assert_eq!(other.get_info().unwrap().file_count, 0);
    assert_eq!(
        FileStore::list_stores(store_dir.path()).unwrap(),
        vec!["default".to_string(), "other".to_string()]
    );
}

#[test]
fn test_status_of_missing_store_is_error() {
    let (services, _store_dir) = create_test_services();
    assert!(services.open_existing_store(Some("nothing-here")).is_err());
}
