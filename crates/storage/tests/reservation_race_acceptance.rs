use chrono::Utc;
use shared::domain::RsvpStatus;
use storage::{NewGift, NewGuest, ReserveOutcome, Storage};

#[tokio::test]
async fn concurrent_reservations_of_one_gift_have_single_winner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        dir.path().join("race.db").to_string_lossy().replace('\\', "/")
    );
    let storage = Storage::new(&database_url).await.expect("db");

    let gift_id = storage
        .insert_gift(&NewGift {
            name: "Crib".into(),
            ..NewGift::default()
        })
        .await
        .expect("gift");

    let mut guests = Vec::new();
    for i in 0..8 {
        let guest_id = storage
            .create_guest(&NewGuest {
                name: format!("guest-{i}"),
                contact: format!("guest-{i}@example.com"),
                rsvp_status: RsvpStatus::Attending,
                adults_count: 1,
                children_count: 0,
            })
            .await
            .expect("guest");
        guests.push(guest_id);
    }

    let attempts = guests.iter().map(|&guest_id| {
        let storage = storage.clone();
        async move { storage.reserve_gift(gift_id, guest_id, Utc::now()).await }
    });
    let outcomes = futures::future::join_all(attempts).await;

    let mut winners = Vec::new();
    let mut losers = 0;
    for outcome in outcomes {
        match outcome.expect("reserve call") {
            ReserveOutcome::Reserved(gift) => winners.push(gift.reserved_by()),
            ReserveOutcome::AlreadyReserved(_) => losers += 1,
            ReserveOutcome::NotFound => panic!("gift disappeared"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(losers, guests.len() - 1);

    let stored = storage
        .gift(gift_id)
        .await
        .expect("lookup")
        .expect("gift exists");
    assert_eq!(stored.reserved_by(), winners[0]);
}
