//! End-to-end board tests against a real on-disk store.

use chrono::{Duration, Utc};
use tempfile::TempDir;

use veggieswap_common::identity::UserId;
use veggieswap_common::listing::{
    default_expiry, Availability, Category, ItemType, Listing, ListingDraft, ListingId,
    ListingStatus, RequestDraft,
};
use veggieswap_common::profile::UserProfile;
use veggieswap_node::board::{BoardError, SwapBoard, ADMIN_KEY, LISTINGS_KEY, PENDING_KEY};
use veggieswap_store::{LocalStore, Partition};

fn open_board(dir: &TempDir) -> (LocalStore, SwapBoard) {
    let store = LocalStore::open(&dir.path().join("board.redb")).unwrap();
    let board = SwapBoard::open(store.clone()).unwrap();
    (store, board)
}

fn seeded_listing(id: i64, title: &str, status: ListingStatus) -> Listing {
    Listing {
        id: ListingId(id),
        created_at: Utc::now(),
        title: title.into(),
        description: String::new(),
        category: Category::Vegetables,
        item_type: ItemType::Produce,
        availability: Availability::Swap,
        quantity: None,
        photo: None,
        street: "Elm St".into(),
        house_number: "12".into(),
        street_number: "12 Elm St".into(),
        owner_name: "Alice".into(),
        owner_id: UserId("user_1_abcdefghi".into()),
        owner_photo: None,
        looking_for: None,
        expiry_date: default_expiry(Utc::now()),
        status,
        requests: Vec::new(),
    }
}

fn draft(title: &str) -> ListingDraft {
    ListingDraft {
        title: title.into(),
        description: "homegrown".into(),
        category: Category::Vegetables,
        item_type: ItemType::Produce,
        availability: Availability::Swap,
        quantity: Some("a basket".into()),
        photo: None,
        street: Some("Elm St".into()),
        house_number: Some("12".into()),
        owner_name: Some("Alice".into()),
        looking_for: Some("eggs".into()),
        expiry_date: default_expiry(Utc::now()),
    }
}

fn profile(name: &str) -> UserProfile {
    UserProfile {
        name: name.into(),
        photo: None,
        street: "Oak Ave".into(),
        house_number: "3".into(),
        produces_available: None,
        looking_for: None,
    }
}

#[test]
fn device_id_is_generated_once_and_stable() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);
    let first = board.user_id().clone();
    assert!(first.as_str().starts_with("user_"));

    let reopened = SwapBoard::open(store).unwrap();
    assert_eq!(reopened.user_id(), &first);
}

#[test]
fn loading_duplicates_keeps_first_occurrence() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    let seeded = vec![
        seeded_listing(1, "first", ListingStatus::Approved),
        seeded_listing(2, "second", ListingStatus::Approved),
        seeded_listing(1, "duplicate", ListingStatus::Approved),
    ];
    store.set_json(LISTINGS_KEY, &seeded, Partition::Shared).unwrap();

    let loaded = board.listings();
    let titles: Vec<&str> = loaded.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["first", "second"]);
}

#[test]
fn unreadable_collection_loads_as_empty() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    store.set(LISTINGS_KEY, "not json", Partition::Shared).unwrap();
    assert!(board.listings().is_empty());
    assert!(board.pending_listings().is_empty());
}

#[test]
fn submit_creates_exactly_one_pending_record() {
    let dir = TempDir::new().unwrap();
    let (_store, board) = open_board(&dir);

    let listing = board.submit_listing(draft("Tomato seedlings")).unwrap();
    assert_eq!(listing.status, ListingStatus::Pending);
    assert!(listing.requests.is_empty());
    assert_eq!(listing.street_number, "12 Elm St");
    assert_eq!(&listing.owner_id, board.user_id());

    let pending = board.pending_listings();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, listing.id);
    assert!(board.listings().is_empty());
}

#[test]
fn submit_without_required_fields_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let (_store, board) = open_board(&dir);

    let mut missing_title = draft("");
    missing_title.title = "   ".into();
    assert!(matches!(
        board.submit_listing(missing_title),
        Err(BoardError::MissingField("title"))
    ));

    let mut missing_owner = draft("Kale");
    missing_owner.owner_name = None;
    assert!(matches!(
        board.submit_listing(missing_owner),
        Err(BoardError::MissingField("owner name"))
    ));

    let mut missing_street = draft("Kale");
    missing_street.street = None;
    assert!(matches!(
        board.submit_listing(missing_street),
        Err(BoardError::MissingField("street"))
    ));

    assert!(board.pending_listings().is_empty());
}

#[test]
fn submit_falls_back_to_the_profile_for_owner_and_address() {
    let dir = TempDir::new().unwrap();
    let (_store, board) = open_board(&dir);
    board.save_profile(profile("Alice")).unwrap();

    let mut bare = draft("Zucchini");
    bare.owner_name = None;
    bare.street = None;
    bare.house_number = None;

    let listing = board.submit_listing(bare).unwrap();
    assert_eq!(listing.owner_name, "Alice");
    assert_eq!(listing.street_number, "3 Oak Ave");
}

#[test]
fn approve_moves_the_listing_and_flips_its_status() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    let pending = vec![
        seeded_listing(10, "pending newest", ListingStatus::Pending),
        seeded_listing(11, "pending oldest", ListingStatus::Pending),
    ];
    let active = vec![seeded_listing(20, "already live", ListingStatus::Approved)];
    store.set_json(PENDING_KEY, &pending, Partition::Shared).unwrap();
    store.set_json(LISTINGS_KEY, &active, Partition::Shared).unwrap();

    assert!(board.approve(ListingId(11)).unwrap());

    let pending_after = board.pending_listings();
    assert_eq!(pending_after.len(), 1);
    assert_eq!(pending_after[0].id, ListingId(10));
    assert_eq!(pending_after[0].status, ListingStatus::Pending);

    let active_after = board.listings();
    let ids: Vec<ListingId> = active_after.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![ListingId(11), ListingId(20)]);
    assert_eq!(active_after[0].status, ListingStatus::Approved);
    assert_eq!(active_after[0].title, "pending oldest");
}

#[test]
fn approving_an_absent_id_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    let pending = vec![seeded_listing(10, "pending", ListingStatus::Pending)];
    store.set_json(PENDING_KEY, &pending, Partition::Shared).unwrap();

    assert!(!board.approve(ListingId(999)).unwrap());
    assert_eq!(board.pending_listings().len(), 1);
    assert!(board.listings().is_empty());
}

#[test]
fn reject_drops_the_pending_listing_and_ignores_absent_ids() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    let pending = vec![
        seeded_listing(10, "keep", ListingStatus::Pending),
        seeded_listing(11, "drop", ListingStatus::Pending),
    ];
    store.set_json(PENDING_KEY, &pending, Partition::Shared).unwrap();

    assert!(!board.reject(ListingId(999)).unwrap());
    assert_eq!(board.pending_listings().len(), 2);

    assert!(board.reject(ListingId(11)).unwrap());
    let remaining = board.pending_listings();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ListingId(10));
    assert!(board.listings().is_empty());
}

#[test]
fn delete_removes_an_active_listing() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    let active = vec![
        seeded_listing(20, "keep", ListingStatus::Approved),
        seeded_listing(21, "drop", ListingStatus::Approved),
    ];
    store.set_json(LISTINGS_KEY, &active, Partition::Shared).unwrap();

    assert!(board.delete_listing(ListingId(21)).unwrap());
    assert!(!board.delete_listing(ListingId(21)).unwrap());
    let remaining = board.listings();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ListingId(20));
}

#[test]
fn sweep_removes_exactly_the_expired_listings() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    let now = Utc::now();
    let mut expired = seeded_listing(20, "wilted", ListingStatus::Approved);
    expired.expiry_date = now - Duration::days(1);
    let mut fresh = seeded_listing(21, "fresh", ListingStatus::Approved);
    fresh.expiry_date = now + Duration::days(1);
    store
        .set_json(LISTINGS_KEY, &vec![expired, fresh], Partition::Shared)
        .unwrap();

    assert_eq!(board.sweep_expired(now).unwrap(), 1);
    let remaining = board.listings();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, ListingId(21));

    // Nothing left to remove; the collection is not rewritten.
    assert_eq!(board.sweep_expired(now).unwrap(), 0);
}

#[test]
fn requests_append_to_the_named_listing_only() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    let active = vec![
        seeded_listing(20, "beets", ListingStatus::Approved),
        seeded_listing(21, "chard", ListingStatus::Approved),
    ];
    store.set_json(LISTINGS_KEY, &active, Partition::Shared).unwrap();

    let sent = board
        .add_request(
            ListingId(21),
            RequestDraft {
                requester: Some("Bob".into()),
                message: Some("still available?".into()),
                offer: Some("rhubarb".into()),
            },
        )
        .unwrap();
    assert!(sent);

    let reloaded = board.listings();
    let chard = reloaded.iter().find(|l| l.id == ListingId(21)).unwrap();
    assert_eq!(chard.requests.len(), 1);
    assert_eq!(chard.requests[0].requester, "Bob");
    let beets = reloaded.iter().find(|l| l.id == ListingId(20)).unwrap();
    assert!(beets.requests.is_empty());
}

#[test]
fn request_to_a_missing_listing_is_reported() {
    let dir = TempDir::new().unwrap();
    let (_store, board) = open_board(&dir);

    let sent = board
        .add_request(
            ListingId(404),
            RequestDraft {
                requester: Some("Bob".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!sent);
}

#[test]
fn request_requires_a_requester_name() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);
    store
        .set_json(
            LISTINGS_KEY,
            &vec![seeded_listing(20, "beets", ListingStatus::Approved)],
            Partition::Shared,
        )
        .unwrap();

    assert!(matches!(
        board.add_request(ListingId(20), RequestDraft::default()),
        Err(BoardError::MissingField("requester name"))
    ));
}

#[test]
fn first_profile_save_claims_admin_and_later_saves_do_not() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    assert!(board.admin_id().is_none());
    assert!(board.save_profile(profile("Alice")).unwrap());
    assert!(board.is_admin());
    assert_eq!(board.admin_id().as_ref(), Some(board.user_id()));

    let other = SwapBoard::open_as(store, UserId::generate());
    assert!(!other.save_profile(profile("Bob")).unwrap());
    assert!(!other.is_admin());
    assert_eq!(other.admin_id().as_ref(), Some(board.user_id()));
}

#[test]
fn profile_save_updates_the_shared_directory() {
    let dir = TempDir::new().unwrap();
    let (_store, board) = open_board(&dir);

    board.save_profile(profile("Alice")).unwrap();
    let directory = board.all_profiles();
    assert_eq!(directory.get(board.user_id()).unwrap().name, "Alice");

    let mut renamed = profile("Alice P.");
    renamed.produces_available = Some("squash".into());
    board.save_profile(renamed).unwrap();
    let directory = board.all_profiles();
    assert_eq!(directory.profiles.len(), 1);
    assert_eq!(directory.get(board.user_id()).unwrap().name, "Alice P.");
}

#[test]
fn incomplete_profiles_are_rejected() {
    let dir = TempDir::new().unwrap();
    let (_store, board) = open_board(&dir);

    let mut nameless = profile("  ");
    assert!(matches!(
        board.save_profile(nameless.clone()),
        Err(BoardError::MissingField("name"))
    ));
    nameless.name = "Alice".into();
    nameless.street = String::new();
    assert!(matches!(
        board.save_profile(nameless),
        Err(BoardError::MissingField("street"))
    ));
    assert!(board.profile().is_none());
    assert!(board.admin_id().is_none());
}

#[test]
fn admin_claim_treats_an_empty_value_as_unset() {
    let dir = TempDir::new().unwrap();
    let (store, board) = open_board(&dir);

    store.set(ADMIN_KEY, "", Partition::Shared).unwrap();
    assert!(board.claim_admin().unwrap());
    assert!(board.is_admin());
}
