//! Reservation lifecycle tests over the in-memory repository

mod common;

use athenaeum_server::error::AppError;
use common::{add_book, add_user, setup};

#[tokio::test]
async fn reserving_checks_availability_but_holds_no_copy() {
    let (repository, services) = setup();
    let book = add_book(&repository, "The City & the City", "978-0-345-49752-9", 1).await;
    let holder = add_user(&repository, "borlu@beszel.example", "Tyador Borlu").await;
    let borrower = add_user(&repository, "corwi@beszel.example", "Lizbyet Corwi").await;

    let reservation = services.reservations.reserve(book.id, holder.id, 3).await.unwrap();
    assert!(reservation.is_active);
    assert_eq!(
        (reservation.expiry_date - reservation.reservation_date).num_days(),
        3
    );

    // The ledger is untouched: the copy can still be loaned out from under
    // the reservation
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 1);
    services.loans.issue_loan(book.id, borrower.id, 7).await.unwrap();
    assert_eq!(services.loans.get_available_copies(book.id).await.unwrap(), 0);

    // With no copies left, new reservations are refused
    let err = services
        .reservations
        .reserve(book.id, borrower.id, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
}

#[tokio::test]
async fn duplicate_active_reservation_conflicts_until_cancelled() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Perdido Street Station", "978-0-345-44302-1", 2).await;
    let user = add_user(&repository, "isaac@newcrobuzon.example", "Isaac").await;

    let first = services.reservations.reserve(book.id, user.id, 3).await.unwrap();

    let err = services.reservations.reserve(book.id, user.id, 3).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let cancelled = services.reservations.cancel(first.id).await.unwrap();
    assert!(!cancelled.is_active);

    // Cancelling frees the slot for a fresh reservation
    services.reservations.reserve(book.id, user.id, 3).await.unwrap();
}

#[tokio::test]
async fn cancel_is_idempotent_but_missing_reservations_are_reported() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Embassytown", "978-0-345-52449-2", 1).await;
    let user = add_user(&repository, "avice@embassytown.example", "Avice").await;

    let reservation = services.reservations.reserve(book.id, user.id, 5).await.unwrap();
    services.reservations.cancel(reservation.id).await.unwrap();
    let again = services.reservations.cancel(reservation.id).await.unwrap();
    assert!(!again.is_active);

    let err = services.reservations.cancel(9999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn reserve_preconditions_report_typed_failures() {
    let (repository, services) = setup();
    let book = add_book(&repository, "Kraken", "978-0-345-49749-9", 1).await;
    let user = add_user(&repository, "billy@darwin.example", "Billy Harrow").await;

    let err = services.reservations.reserve(book.id, user.id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = services.reservations.reserve(9999, user.id, 3).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services.reservations.reserve(book.id, 9999, 3).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn reservation_queries_order_and_filter() {
    let (repository, services) = setup();
    let near = add_book(&repository, "Railsea", "978-0-345-52452-2", 1).await;
    let far = add_book(&repository, "Un Lun Dun", "978-0-345-49516-7", 1).await;
    let user = add_user(&repository, "sham@medes.example", "Sham").await;
    let other = add_user(&repository, "deeba@unlundun.example", "Deeba").await;

    let far_res = services.reservations.reserve(far.id, user.id, 10).await.unwrap();
    let near_res = services.reservations.reserve(near.id, user.id, 2).await.unwrap();
    services.reservations.reserve(near.id, other.id, 5).await.unwrap();

    // Active reservations come back soonest expiry first
    let mine = services
        .reservations
        .get_active_reservations(Some(user.id))
        .await
        .unwrap();
    assert_eq!(
        mine.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![near_res.id, far_res.id]
    );

    let all = services.reservations.get_active_reservations(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(repository.reservations.has_active(user.id, near.id).await.unwrap());

    // History is most recent first and keeps cancelled reservations
    services.reservations.cancel(far_res.id).await.unwrap();
    assert!(!repository.reservations.has_active(user.id, far.id).await.unwrap());
    let history = services.reservations.get_user_reservations(user.id).await.unwrap();
    assert_eq!(
        history.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![near_res.id, far_res.id]
    );
    assert!(!history[1].is_active);
}
